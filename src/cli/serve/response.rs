//! HTTP responses.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use tiny_http::{Header, Request, Response, StatusCode};

use crate::utils::mime::types::{JSON, PLAIN};

/// Body of an API response.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(&'static str),
}

/// Response produced by a route handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

impl ApiResponse {
    pub fn ok(value: Value) -> Self {
        Self {
            status: 200,
            body: Body::Json(value),
        }
    }

    /// 400 `{error: message}`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            body: Body::Json(json!({ "error": message.into() })),
        }
    }

    /// 400 plain text `Malformed request`.
    pub fn malformed() -> Self {
        Self {
            status: 400,
            body: Body::Text("Malformed request"),
        }
    }

    /// JSON body, if any.
    #[cfg(test)]
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            Body::Text(_) => None,
        }
    }

    pub fn send(self, request: Request) -> Result<()> {
        match self.body {
            Body::Json(value) => send_body(request, self.status, JSON, serde_json::to_vec(&value)?),
            Body::Text(text) => send_body(request, self.status, PLAIN, text.as_bytes().to_vec()),
        }
    }
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

pub fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?);
    request.respond(response)?;
    Ok(())
}

pub fn make_header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope() {
        let response = ApiResponse::error("boom");
        assert_eq!(response.status, 400);
        assert_eq!(response.json(), Some(&json!({"error": "boom"})));
    }

    #[test]
    fn test_malformed_is_plain_text() {
        let response = ApiResponse::malformed();
        assert_eq!(response.status, 400);
        assert_eq!(response.body, Body::Text("Malformed request"));
        assert!(response.json().is_none());
    }

    #[test]
    fn test_make_header_rejects_non_ascii() {
        assert!(make_header("ETag", "\"abc\"").is_ok());
        assert!(make_header("ETag", "caf\u{e9}").is_err());
    }
}
