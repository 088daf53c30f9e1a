//! # charid-core
//!
//! Deterministic image fingerprints and exact similarity search over
//! registered identities.
//!
//! This is the core library crate with zero async dependencies. The HTTP
//! service, the remote vector-index backend and request admission live in
//! `charid-server`.
//!
//! ```text
//! image bytes → SHA-256 → tile to 256 bytes → standardize → L2-normalize
//!             → cosine similarity against stored fingerprints → top-K
//! ```

/// Global configuration constants: fixed dimension, defaults, and response texts.
pub mod config;
/// The fixed-dimension `Embedding` vector type.
pub mod embedding;
/// Error types for embeddings and storage.
pub mod error;
/// SHA-256 based fingerprint generator.
pub mod fingerprint;
/// Identity records, match results, and tag parsing.
pub mod record;
/// Cosine similarity metric.
pub mod similarity;
/// Local file-backed identity store.
pub mod storage;

pub use embedding::Embedding;
pub use error::{EmbeddingError, StorageError};
pub use fingerprint::fingerprint;
pub use record::{parse_tags, IdentityRecord, MatchResult, NewIdentity};
pub use storage::LocalStore;
