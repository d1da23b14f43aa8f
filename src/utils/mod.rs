//! Shared utilities.
//!
//! - [`date`]: HTTP date formatting
//! - [`mime`]: Content-Type detection
//! - [`path`]: Filesystem path normalization

pub mod date;
pub mod mime;
pub mod path;
