//! Storage backends behind one capability interface.
//!
//! [`IdentityStore`] is the `register` / `query` contract. Two backends
//! implement it: the file-backed [`LocalBackend`] and the Qdrant-backed
//! [`RemoteStore`]. [`StoreBackend`] is selected once at startup and
//! dispatches by variant, so call sites never inspect which backend is live.

/// Remote vector-index backend speaking the Qdrant REST protocol.
pub mod qdrant;

use charid_core::{Embedding, IdentityRecord, LocalStore, MatchResult, NewIdentity, StorageError};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

pub use qdrant::{RemoteConfig, RemoteStore};

/// Failures of a storage backend. All of them are fatal for the request.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("local store error: {0}")]
    Local(#[from] StorageError),

    #[error("remote index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid remote index URL: {0}")]
    InvalidUrl(String),

    #[error("remote index returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("storage task failed: {0}")]
    Task(String),
}

/// The storage capability shared by every backend.
///
/// Both operations return results ordered best match first, and `query` on
/// an empty store returns an empty list rather than an error.
pub trait IdentityStore: Send + Sync {
    fn register(
        &self,
        identity: NewIdentity,
    ) -> impl Future<Output = Result<IdentityRecord, BackendError>> + Send;

    fn query(
        &self,
        embedding: &Embedding,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<MatchResult>, BackendError>> + Send;
}

/// Async adapter over the blocking [`LocalStore`].
///
/// Registration rewrites the whole document, so it runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    inner: Arc<LocalStore>,
}

impl LocalBackend {
    pub fn new(store: LocalStore) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner
    }
}

impl IdentityStore for LocalBackend {
    async fn register(&self, identity: NewIdentity) -> Result<IdentityRecord, BackendError> {
        let store = Arc::clone(&self.inner);
        let record = tokio::task::spawn_blocking(move || store.register(identity))
            .await
            .map_err(|e| BackendError::Task(e.to_string()))??;
        Ok(record)
    }

    async fn query(
        &self,
        embedding: &Embedding,
        limit: usize,
    ) -> Result<Vec<MatchResult>, BackendError> {
        Ok(self.inner.query(embedding, limit))
    }
}

/// The backend chosen by configuration.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Local(LocalBackend),
    Remote(RemoteStore),
}

impl StoreBackend {
    /// Short name used in logs and the health endpoint.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreBackend::Local(_) => "local",
            StoreBackend::Remote(_) => "qdrant",
        }
    }
}

impl From<LocalStore> for StoreBackend {
    fn from(store: LocalStore) -> Self {
        StoreBackend::Local(LocalBackend::new(store))
    }
}

impl From<RemoteStore> for StoreBackend {
    fn from(store: RemoteStore) -> Self {
        StoreBackend::Remote(store)
    }
}

impl IdentityStore for StoreBackend {
    async fn register(&self, identity: NewIdentity) -> Result<IdentityRecord, BackendError> {
        match self {
            StoreBackend::Local(store) => store.register(identity).await,
            StoreBackend::Remote(store) => store.register(identity).await,
        }
    }

    async fn query(
        &self,
        embedding: &Embedding,
        limit: usize,
    ) -> Result<Vec<MatchResult>, BackendError> {
        match self {
            StoreBackend::Local(store) => store.query(embedding, limit).await,
            StoreBackend::Remote(store) => store.query(embedding, limit).await,
        }
    }
}
