//! `[upload]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [upload]
//! max_file_size = 524288000   # Per-file limit in bytes
//! max_body_size = 524288000   # JSON / urlencoded body limit in bytes
//! use_temp_files = true       # Spool uploads to disk instead of memory
//! temp_dir = "tmp/uploads"    # Spool directory (default: private, removed on exit)
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::path::normalize_path;

/// 500 MiB.
pub const DEFAULT_SIZE_LIMIT: u64 = 500 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted file part, in bytes.
    pub max_file_size: u64,

    /// Largest accepted non-multipart body, in bytes.
    pub max_body_size: u64,

    /// Spool file parts to temp files (`false` keeps them in memory).
    pub use_temp_files: bool,

    /// Spool directory. When unset a private directory is created at
    /// startup and removed on shutdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_SIZE_LIMIT,
            max_body_size: DEFAULT_SIZE_LIMIT,
            use_temp_files: true,
            temp_dir: None,
        }
    }
}

impl UploadConfig {
    pub const MAX_FILE_SIZE: FieldPath = FieldPath::new("upload.max_file_size");
    pub const MAX_BODY_SIZE: FieldPath = FieldPath::new("upload.max_body_size");

    pub fn normalize(&mut self, root: &Path) {
        if let Some(dir) = self.temp_dir.take() {
            self.temp_dir = Some(normalize_path(&root.join(dir)));
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.max_file_size == 0 {
            diag.error_with_hint(
                Self::MAX_FILE_SIZE,
                "a zero limit rejects every upload",
                format!("use a byte count, e.g. {DEFAULT_SIZE_LIMIT}"),
            );
        }
        if self.max_body_size == 0 {
            diag.error_with_hint(
                Self::MAX_BODY_SIZE,
                "a zero limit rejects every request body",
                format!("use a byte count, e.g. {DEFAULT_SIZE_LIMIT}"),
            );
        }
    }
}
