//! HTTP request handlers and shared application state.

use crate::api::auth::AdminCredentials;
use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::*;
use crate::api::rate_limit::SlidingWindowLimiter;
use crate::api::upload::{read_form, validate_image};
use crate::service::IdentityService;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use charid_core::config::MODEL_VERSION;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IdentityService>,
    /// Guards `POST /api/identify`. Lives for the whole process.
    pub limiter: Arc<SlidingWindowLimiter>,
    pub admin: Arc<AdminCredentials>,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backend: state.service.store().kind(),
        model_version: MODEL_VERSION,
    })
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus_handle.render(),
    )
}

/// `POST /api/identify`
pub async fn identify(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let mut form = read_form(multipart, state.max_upload_bytes).await?;
    let file = form.take_file()?;
    validate_image(&file, state.max_upload_bytes).await?;

    let result = state.service.identify(&file.bytes).await?;
    metrics::record_identification(&result.warnings, result.latency_ms);
    if !result.warnings.is_empty() {
        tracing::info!(
            request_id = %result.request_id,
            warnings = ?result.warnings,
            "Identification returned warnings"
        );
    }
    Ok(Json(result))
}

/// `POST /api/admin/identities`
pub async fn register_identity(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RegisterResponse>, ApiError> {
    let mut form = read_form(multipart, state.max_upload_bytes).await?;
    let label = form
        .field(LABEL_FIELD)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::BadRequest("label is required".into()))?
        .to_string();
    let notes = form.field(NOTES_FIELD).unwrap_or_default().to_string();
    let tags = form.field(TAGS_FIELD).map(str::to_string);

    let file = form.take_file()?;
    validate_image(&file, state.max_upload_bytes).await?;

    let registration = state
        .service
        .register(&file.bytes, label, notes, tags.as_deref())
        .await?;
    metrics::record_registration(state.service.store().kind());
    Ok(Json(registration))
}
