//! charid-server: HTTP service for image fingerprint identification.
//!
//! Provides the REST API, the identify/register orchestration, and the
//! storage backends. Fingerprinting and the local store live in `charid-core`.

/// REST API layer: Axum router, HTTP handlers, models, auth, rate limiting, metrics.
pub mod api;
/// Identify and register orchestration over a storage backend.
pub mod service;
/// Storage backends: local JSON file and remote Qdrant index.
pub mod store;
