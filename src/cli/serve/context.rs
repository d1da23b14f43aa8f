//! Shared state handed to every request handler.

use std::sync::Arc;

use super::request::RequestLimits;
use crate::config::RelayConfig;
use crate::engine::{EngineFactory, Engines};
use crate::identity::IdentityProvider;

pub struct AppContext {
    pub config: Arc<RelayConfig>,
    pub engines: Engines,
    pub identity: Arc<dyn IdentityProvider>,
    pub limits: RequestLimits,
}

impl AppContext {
    pub fn new(
        config: Arc<RelayConfig>,
        factory: Arc<dyn EngineFactory>,
        identity: Arc<dyn IdentityProvider>,
        limits: RequestLimits,
    ) -> Self {
        Self {
            config,
            engines: Engines::new(factory),
            identity,
            limits,
        }
    }

    /// Language for engine calls: the `language` query value or the configured default.
    pub fn language<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.config.engine.default_language)
    }
}
