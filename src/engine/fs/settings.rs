//! Engine settings file (`config/h5p.json`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::read_json;
use crate::engine::EngineResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

/// URLs and versions the engine advertises to the H5P client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub base_url: String,
    pub ajax_url: String,
    pub content_files_url: String,
    pub libraries_url: String,
    pub core_url: String,
    pub editor_library_url: String,
    pub temporary_files_url: String,
    pub platform_name: String,
    pub platform_version: String,
    pub h5p_version: String,
    pub core_api_version: ApiVersion,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: "/h5p".to_string(),
            ajax_url: "/ajax".to_string(),
            content_files_url: "/content".to_string(),
            libraries_url: "/libraries".to_string(),
            core_url: "/core".to_string(),
            editor_library_url: "/editor".to_string(),
            temporary_files_url: "/temporary-storage".to_string(),
            platform_name: env!("CARGO_PKG_NAME").to_string(),
            platform_version: env!("CARGO_PKG_VERSION").to_string(),
            h5p_version: "1.24.0".to_string(),
            core_api_version: ApiVersion {
                major: 1,
                minor: 24,
            },
        }
    }
}

impl EngineSettings {
    pub fn load(path: &Path) -> EngineResult<Self> {
        read_json(path)
    }

    /// `baseUrl` joined with one of the relative URLs.
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), relative)
    }

    /// The ajax endpoint with a trailing `?action=`.
    pub fn ajax_path(&self) -> String {
        format!("{}?action=", self.url(&self.ajax_url))
    }
}
