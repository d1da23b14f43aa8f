//! `[storage]` section configuration.
//!
//! Locations handed to the engine when a handle is first constructed.
//! Their contents are owned by the engine, not by the relay.
//!
//! # Example
//!
//! ```toml
//! [storage]
//! engine_config = "config/h5p.json"
//! libraries = "public/h5p/libraries"
//! temporary = "public/h5p/temporary-storage"
//! content = "public/h5p/content"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::path::normalize_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON settings file read by the engine.
    pub engine_config: PathBuf,

    /// Installed library root.
    pub libraries: PathBuf,

    /// Temporary storage for files uploaded through the editor.
    pub temporary: PathBuf,

    /// Content root.
    pub content: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine_config: PathBuf::from("config/h5p.json"),
            libraries: PathBuf::from("public/h5p/libraries"),
            temporary: PathBuf::from("public/h5p/temporary-storage"),
            content: PathBuf::from("public/h5p/content"),
        }
    }
}

impl StorageConfig {
    pub const ENGINE_CONFIG: FieldPath = FieldPath::new("storage.engine_config");

    /// Resolve every path against `root`.
    pub fn normalize(&mut self, root: &Path) {
        for path in [
            &mut self.engine_config,
            &mut self.libraries,
            &mut self.temporary,
            &mut self.content,
        ] {
            *path = normalize_path(&root.join(&*path));
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        // The engine is only built on first use, so a missing file is not fatal here.
        if !self.engine_config.is_file() {
            diag.warn(
                Self::ENGINE_CONFIG,
                format!(
                    "{} does not exist; engine requests will fail until it is created",
                    self.engine_config.display()
                ),
            );
        }
    }
}
