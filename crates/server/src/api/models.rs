//! Request and response data transfer objects for the REST API.
//!
//! Identification and registration responses are the service's own
//! serializable results; this module adds the remaining API shapes.

use serde::Serialize;

pub use crate::service::{
    Identification as IdentifyResponse, Prediction, Registration as RegisterResponse, Warning,
};

/// Multipart text field carrying the identity label.
pub const LABEL_FIELD: &str = "label";
/// Multipart text field carrying free-text notes.
pub const NOTES_FIELD: &str = "notes";
/// Multipart text field carrying the comma-separated tag list.
pub const TAGS_FIELD: &str = "tags";

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backend: &'static str,
    pub model_version: &'static str,
}
