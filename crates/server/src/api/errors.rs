//! API error types mapped to HTTP status codes.
//!
//! Each [`ApiError`] variant maps to a specific HTTP status code and produces
//! a JSON response body `{"error": "message"}`.

use crate::store::BackendError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type that implements `IntoResponse`.
///
/// Each variant maps to an HTTP status code:
/// - `BadRequest` → 400 (upload validation failures)
/// - `Unauthorized` → 401 (with a Basic auth challenge)
/// - `TooManyRequests` → 429
/// - `ServiceUnavailable` → 503 (storage backend unreachable or unreadable)
/// - `Internal` → 500
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request or rejected upload (400).
    BadRequest(String),
    /// Missing or invalid admin credentials (401).
    Unauthorized(String),
    /// Client exceeded the identification rate limit (429).
    TooManyRequests { retry_after_secs: u64 },
    /// Storage backend failed (503).
    ServiceUnavailable(String),
    /// Unexpected server error (500).
    Internal(String),
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        tracing::error!("Storage backend failure: {}", e);
        match e {
            BackendError::Task(msg) => ApiError::Internal(msg),
            other => ApiError::ServiceUnavailable(format!("Storage unavailable: {other}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::TooManyRequests { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string())
            }
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        let mut resp = (status, axum::Json(json!({ "error": message }))).into_response();
        match self {
            ApiError::Unauthorized(_) => {
                resp.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"charid\""),
                );
            }
            ApiError::TooManyRequests { retry_after_secs } => {
                resp.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            _ => {}
        }
        resp
    }
}
