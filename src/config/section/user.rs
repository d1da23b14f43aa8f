//! `[user]` and `[engine]` section configuration.
//!
//! `[user]` is the identity handed to the engine for every request when no
//! real identity provider is installed.
//!
//! # Example
//!
//! ```toml
//! [user]
//! id = "10000"
//! name = "local"
//! type = "local"
//! can_create_restricted = true
//! can_install_recommended = true
//! can_update_and_install_libraries = true
//!
//! [engine]
//! default_language = "en"
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub can_create_restricted: bool,
    pub can_install_recommended: bool,
    pub can_update_and_install_libraries: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "10000".to_string(),
            name: "local".to_string(),
            kind: "local".to_string(),
            can_create_restricted: true,
            can_install_recommended: true,
            can_update_and_install_libraries: true,
        }
    }
}

impl UserConfig {
    pub const ID: FieldPath = FieldPath::new("user.id");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.id.trim().is_empty() {
            diag.error(Self::ID, "user id must not be empty");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Language used when a request does not name one.
    pub default_language: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
        }
    }
}

impl EngineConfig {
    pub const DEFAULT_LANGUAGE: FieldPath = FieldPath::new("engine.default_language");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.default_language.trim().is_empty() {
            diag.error_with_hint(
                Self::DEFAULT_LANGUAGE,
                "default language must not be empty",
                "use an ISO 639-1 code such as \"en\"",
            );
        }
    }
}
