//! Error types for the core crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Raised when a vector cannot be used as an [`Embedding`](crate::embedding::Embedding).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    #[error("expected embedding dimension {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding contains NaN or Inf at index {index}")]
    NonFinite { index: usize },
}

/// Errors raised by the local identity store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("identity document {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}
