//! H5P engine contract.
//!
//! The relay forwards requests to two collaborators: an [`Editor`] and a
//! [`Player`]. Both are built on first use by an [`EngineFactory`] and then
//! shared by every request through [`Engines`].
//!
//! [`fs::FsEngine`] implements the contract over the standard on-disk
//! H5P layout.

pub mod fs;
mod handle;

pub use handle::Engines;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::identity::User;
use crate::upload::UploadedFile;

// ============================================================================
// errors
// ============================================================================

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in `{path}`: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("content {0} does not exist")]
    ContentNotFound(String),

    #[error("library {0} is not installed")]
    LibraryNotFound(String),

    #[error("invalid library name `{0}`")]
    InvalidLibraryName(String),

    #[error("invalid content id `{0}`")]
    InvalidContentId(String),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("unknown ajax action `{0}`")]
    UnknownAction(String),

    #[error("missing parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("not supported: {0}")]
    Unsupported(&'static str),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// data
// ============================================================================

/// Library identity: machine name plus major/minor version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRef {
    pub machine_name: String,
    pub major_version: u32,
    pub minor_version: u32,
}

impl LibraryRef {
    pub fn new(machine_name: impl Into<String>, major_version: u32, minor_version: u32) -> Self {
        Self {
            machine_name: machine_name.into(),
            major_version,
            minor_version,
        }
    }

    /// `H5P.Image 1.1`
    pub fn ubername(&self) -> String {
        self.to_string()
    }

    /// `H5P.Image-1.1`, the library's directory name.
    pub fn dir_name(&self) -> String {
        format!(
            "{}-{}.{}",
            self.machine_name, self.major_version, self.minor_version
        )
    }
}

impl fmt::Display for LibraryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}",
            self.machine_name, self.major_version, self.minor_version
        )
    }
}

impl FromStr for LibraryRef {
    type Err = EngineError;

    /// Accepts both `Name 1.2` and `Name-1.2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidLibraryName(s.to_string());
        let s_trim = s.trim();
        let (name, version) = s_trim
            .rsplit_once(' ')
            .or_else(|| s_trim.rsplit_once('-'))
            .ok_or_else(invalid)?;
        let (major, minor) = version.split_once('.').ok_or_else(invalid)?;

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid_name {
            return Err(invalid());
        }

        Ok(Self::new(
            name,
            major.parse().map_err(|_| invalid())?,
            minor.parse().map_err(|_| invalid())?,
        ))
    }
}

/// Content metadata as stored in `h5p.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default = "undetermined")]
    pub language: String,
    #[serde(default = "undetermined")]
    pub license: String,
    #[serde(default)]
    pub main_library: String,
    #[serde(default)]
    pub preloaded_dependencies: Vec<LibraryRef>,
    /// Authors, embed types and whatever else the editor sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn undetermined() -> String {
    "U".to_string()
}

/// Result of a save.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedContent {
    pub id: String,
    pub metadata: Value,
}

/// Query of a `GET /h5p/ajax` request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AjaxGet<'a> {
    pub action: &'a str,
    pub machine_name: Option<&'a str>,
    pub major_version: Option<&'a str>,
    pub minor_version: Option<&'a str>,
    pub language: Option<&'a str>,
}

/// Everything a `POST /h5p/ajax` request carries.
#[derive(Debug, Clone, Copy)]
pub struct AjaxPost<'a> {
    pub action: &'a str,
    pub body: &'a Value,
    pub language: Option<&'a str>,
    pub content_id: Option<&'a str>,
    /// Upload in the `file` field.
    pub file: Option<&'a UploadedFile>,
    /// Package upload in the `h5p` field.
    pub library_file: Option<&'a UploadedFile>,
}

// ============================================================================
// collaborators
// ============================================================================

pub trait Editor: Send + Sync {
    /// Editor page model; `content_id` is `None` for new content.
    fn render(&self, content_id: Option<&str>, language: &str, user: &User) -> EngineResult<Value>;

    fn get_content(&self, content_id: &str, user: &User) -> EngineResult<Value>;

    fn save_or_update_content(
        &self,
        content_id: Option<&str>,
        params: &Value,
        metadata: &Value,
        library: &str,
        user: &User,
    ) -> EngineResult<SavedContent>;

    fn get_ajax(&self, query: &AjaxGet<'_>, user: &User) -> EngineResult<Value>;

    fn post_ajax(&self, request: &AjaxPost<'_>, user: &User) -> EngineResult<Value>;

    fn list_content(&self, user: &User) -> EngineResult<Vec<String>>;

    fn content_metadata(&self, content_id: &str, user: &User) -> EngineResult<ContentMetadata>;
}

pub trait Player: Send + Sync {
    fn render(&self, content_id: &str, user: &User) -> EngineResult<Value>;
}

/// Builds collaborators. Called at most once per handle while it succeeds.
pub trait EngineFactory: Send + Sync {
    fn editor(&self) -> EngineResult<Arc<dyn Editor>>;
    fn player(&self) -> EngineResult<Arc<dyn Player>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_ref_parse() {
        let lib: LibraryRef = "H5P.Image 1.1".parse().unwrap();
        assert_eq!(lib, LibraryRef::new("H5P.Image", 1, 1));
        assert_eq!(lib.ubername(), "H5P.Image 1.1");
        assert_eq!(lib.dir_name(), "H5P.Image-1.1");

        let from_dir: LibraryRef = "H5P.Image-1.1".parse().unwrap();
        assert_eq!(from_dir, lib);
    }

    #[test]
    fn test_library_ref_rejects_garbage() {
        for bad in ["", "H5P.Image", "H5P.Image 1", "H5P.Image a.b", "../x 1.0", " 1.0"] {
            assert!(bad.parse::<LibraryRef>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_metadata_defaults() {
        let meta: ContentMetadata = serde_json::from_value(json!({"title": "Quiz"})).unwrap();
        assert_eq!(meta.title, "Quiz");
        assert_eq!(meta.language, "U");
        assert_eq!(meta.license, "U");
        assert!(meta.preloaded_dependencies.is_empty());
    }

    #[test]
    fn test_metadata_keeps_unknown_keys() {
        let input = json!({
            "title": "Quiz",
            "license": "CC BY",
            "authors": [{"name": "Ada"}],
            "mainLibrary": "H5P.QuestionSet",
            "preloadedDependencies": [
                {"machineName": "H5P.QuestionSet", "majorVersion": 1, "minorVersion": 17}
            ]
        });
        let meta: ContentMetadata = serde_json::from_value(input).unwrap();
        assert_eq!(meta.extra["authors"][0]["name"], "Ada");

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["preloadedDependencies"][0]["minorVersion"], 17);
        assert_eq!(back["authors"][0]["name"], "Ada");
    }
}
