//! `multipart/form-data` decoding.
//!
//! Text fields land in a JSON object, file fields in an [`UploadSet`].
//! Field names ending in `[]` collect into arrays.

use std::io::Read;
use std::path::Path;

use multipart::server::Multipart;
use serde_json::{Map, Value};

use super::{SpoolOptions, UploadError, UploadSet, UploadedFile};
use crate::utils::mime;

/// Extract the boundary parameter from a `multipart/form-data` content type.
pub fn boundary(content_type: &str) -> Option<&str> {
    let mut parts = content_type.split(';');
    let essence = parts.next()?.trim();
    if !essence.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"'))
            .filter(|b| !b.is_empty())
    })
}

/// Decode a multipart body.
pub fn read_multipart<R: Read>(
    body: R,
    boundary: &str,
    options: &SpoolOptions,
) -> Result<(Map<String, Value>, UploadSet), UploadError> {
    let mut multipart = Multipart::with_body(body, boundary);
    let mut fields = Map::new();
    let mut files = UploadSet::new();

    while let Some(mut entry) = multipart
        .read_entry()
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        let name = entry.headers.name.to_string();

        match entry.headers.filename.clone() {
            // An untouched file input is sent with an empty file name.
            Some(filename) if filename.is_empty() => {}
            Some(filename) => {
                let mimetype = entry
                    .headers
                    .content_type
                    .as_ref()
                    .map_or_else(
                        || mime::from_path(Path::new(&filename)).to_string(),
                        ToString::to_string,
                    );
                let upload =
                    UploadedFile::spool(&name, &filename, &mimetype, &mut entry.data, options)?;
                files.push(upload);
            }
            None => {
                let limit = options.max_field_size;
                let mut text = String::new();
                let read = (&mut entry.data)
                    .take(limit.saturating_add(1))
                    .read_to_string(&mut text)
                    .map_err(|e| UploadError::Malformed(e.to_string()))?;
                if read as u64 > limit {
                    return Err(UploadError::FieldTooLarge { field: name, limit });
                }
                insert_field(&mut fields, name, text);
            }
        }
    }

    Ok((fields, files))
}

/// Insert a form value, collecting `name[]` keys into arrays.
pub fn insert_field(fields: &mut Map<String, Value>, name: String, value: String) {
    match name.strip_suffix("[]") {
        Some(base) => {
            let slot = fields
                .entry(base.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => items.push(Value::String(value)),
                other => *other = Value::Array(vec![other.take(), Value::String(value)]),
            }
        }
        None => {
            fields.insert(name, Value::String(value));
        }
    }
}
