//! Type-safe config field path.

use owo_colors::OwoColorize;
use std::fmt;

/// A dot-separated config field path used in diagnostics.
///
/// Sections expose their validated fields as associated constants:
///
/// ```ignore
/// impl UploadConfig {
///     pub const MAX_FILE_SIZE: FieldPath = FieldPath::new("upload.max_file_size");
/// }
///
/// diag.error(UploadConfig::MAX_FILE_SIZE, "must be positive");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(pub &'static str);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}
