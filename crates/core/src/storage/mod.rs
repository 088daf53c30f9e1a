//! Storage layer: the local identity store and its durable document.
//!
//! Records live in memory in a [`LocalStore`]; durability comes from
//! rewriting one JSON document atomically (temp file + rename) on every
//! registration.

/// File-backed store with exact linear-scan search.
pub mod local;
/// Durable document load/save with atomic writes.
pub mod persistence;

pub use local::LocalStore;
pub use persistence::{load_document, load_or_init_document, save_document, IdentityDocument};
