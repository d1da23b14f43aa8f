//! Request identity.
//!
//! The engine performs its permission checks against a [`User`]. Which user
//! a request acts as is decided by an [`IdentityProvider`]; the relay ships
//! [`StaticIdentity`], which answers every request with the `[user]`
//! section of the config.

use serde::{Deserialize, Serialize};

use crate::cli::serve::ApiRequest;
use crate::config::UserConfig;

/// Identity handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub can_create_restricted: bool,
    pub can_install_recommended: bool,
    pub can_update_and_install_libraries: bool,
}

impl From<&UserConfig> for User {
    fn from(config: &UserConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            kind: config.kind.clone(),
            can_create_restricted: config.can_create_restricted,
            can_install_recommended: config.can_install_recommended,
            can_update_and_install_libraries: config.can_update_and_install_libraries,
        }
    }
}

/// Resolves the acting user of a request.
pub trait IdentityProvider: Send + Sync {
    fn principal(&self, request: &ApiRequest) -> User;
}

/// Same user for every request.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: User,
}

impl StaticIdentity {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn from_config(config: &UserConfig) -> Self {
        Self::new(User::from(config))
    }
}

impl IdentityProvider for StaticIdentity {
    fn principal(&self, _request: &ApiRequest) -> User {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_http::Method;

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User::from(&UserConfig::default());
        let value = serde_json::to_value(&user).unwrap();

        assert_eq!(value["id"], "10000");
        assert_eq!(value["type"], "local");
        assert_eq!(value["canCreateRestricted"], true);
        assert_eq!(value["canUpdateAndInstallLibraries"], true);
    }

    #[test]
    fn test_static_identity_is_request_independent() {
        let identity = StaticIdentity::from_config(&UserConfig::default());
        let a = identity.principal(&ApiRequest::new(Method::Get, "/h5p-editor"));
        let b = identity.principal(&ApiRequest::new(Method::Post, "/h5p/ajax?action=files"));
        assert_eq!(a, b);
    }
}
