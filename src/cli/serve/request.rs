//! Decoded API requests.
//!
//! An [`ApiRequest`] owns everything a route handler reads: method, path,
//! query, the decoded body and the uploaded files. Dropping it releases
//! the uploads.

use std::io::{self, Read};

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tiny_http::{Method, Request};
use url::form_urlencoded;

use crate::upload::{self, SpoolOptions, UploadError, UploadSet};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("failed to read request body: {0}")]
    Io(#[from] io::Error),
}

/// Size limits applied while decoding a body.
#[derive(Debug, Clone)]
pub struct RequestLimits {
    /// Largest JSON or urlencoded body.
    pub max_body_size: u64,
    pub spool: SpoolOptions,
}

#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// URL path without the query string, still percent-encoded.
    pub path: String,
    pub query: FxHashMap<String, String>,
    /// Decoded body; an empty object when there is none.
    pub body: Value,
    pub files: UploadSet,
}

impl ApiRequest {
    /// A request without body or files.
    pub fn new(method: Method, url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            method,
            path: path.to_string(),
            query: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            body: Value::Object(Map::new()),
            files: UploadSet::new(),
        }
    }

    #[cfg(test)]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    #[cfg(test)]
    pub fn with_files(mut self, files: UploadSet) -> Self {
        self.files = files;
        self
    }

    /// Non-empty query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Decode method, URL, body and uploads of an incoming request.
    pub fn read(request: &mut Request, limits: &RequestLimits) -> Result<Self, RequestError> {
        let mut api = Self::new(request.method().clone(), request.url());

        let content_type = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Content-Type"))
            .map(|h| h.value.as_str().to_string())
            .unwrap_or_default();
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if let Some(boundary) = upload::boundary(&content_type) {
            let (fields, files) =
                upload::read_multipart(request.as_reader(), boundary, &limits.spool)?;
            api.body = Value::Object(fields);
            api.files = files;
            return Ok(api);
        }

        let is_json = essence == "application/json" || essence.ends_with("+json");
        let is_form = essence == "application/x-www-form-urlencoded";
        if !is_json && !is_form {
            return Ok(api);
        }

        let limit = limits.max_body_size;
        if request.body_length().is_some_and(|len| len as u64 > limit) {
            return Err(RequestError::TooLarge { limit });
        }
        let bytes = read_limited(request.as_reader(), limit)?;

        if is_json {
            if !bytes.iter().all(u8::is_ascii_whitespace) {
                api.body = serde_json::from_slice(&bytes)?;
            }
        } else {
            let mut fields = Map::new();
            for (key, value) in form_urlencoded::parse(&bytes).into_owned() {
                upload::insert_field(&mut fields, key, value);
            }
            api.body = Value::Object(fields);
        }
        Ok(api)
    }
}

fn read_limited(reader: impl Read, limit: u64) -> Result<Vec<u8>, RequestError> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(RequestError::TooLarge { limit });
    }
    Ok(bytes)
}
