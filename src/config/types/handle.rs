//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads from request workers.

use crate::config::RelayConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<RelayConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(RelayConfig::default()));

#[inline]
pub fn cfg() -> Arc<RelayConfig> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: RelayConfig) -> Arc<RelayConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
