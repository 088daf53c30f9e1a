//! File-backed identity store with exact linear-scan search.
//!
//! The whole record list lives in memory behind a `RwLock` and is flushed to
//! the durable document on every registration. Queries score every record, so
//! both writes and queries cost O(N) in the number of records. This is the
//! scaling ceiling of the local backend; larger catalogs belong in the remote
//! vector index.

use crate::embedding::Embedding;
use crate::error::StorageError;
use crate::record::{IdentityRecord, MatchResult, NewIdentity};
use crate::storage::persistence::{load_or_init_document, save_document};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};

/// A thread-safe identity store persisted to a single JSON document.
///
/// Registrations are serialized by `writer`, so concurrent read-modify-write
/// cycles never lose updates. The document is written from a snapshot while
/// only `writer` is held; the `items` write lock is taken just to publish the
/// new record, so queries are never blocked on file I/O.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    items: RwLock<Vec<IdentityRecord>>,
    writer: Mutex<()>,
}

impl LocalStore {
    /// Opens the store at `path`, initializing an empty document if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let document = load_or_init_document(&path)?;
        Ok(Self {
            path,
            items: RwLock::new(document.items),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Assigns a fresh id, rewrites the document with the new record, and
    /// then makes it visible to queries.
    ///
    /// If the document cannot be written nothing is published, so the
    /// in-memory state never runs ahead of what is on disk.
    pub fn register(&self, identity: NewIdentity) -> Result<IdentityRecord, StorageError> {
        let record = identity.into_record();
        let _writer = self.writer.lock();

        let mut snapshot = self.items.read().clone();
        snapshot.push(record.clone());
        if let Err(e) = save_document(&self.path, &snapshot) {
            tracing::error!("Failed to persist identity '{}': {}", record.label, e);
            return Err(e);
        }

        let mut items = self.items.write();
        items.push(record.clone());
        tracing::info!(
            id = %record.id,
            label = %record.label,
            records = items.len(),
            "Registered identity"
        );
        Ok(record)
    }

    /// Returns up to `limit` matches, best similarity first.
    ///
    /// Equal scores keep insertion order. An empty store yields no matches.
    pub fn query(&self, embedding: &Embedding, limit: usize) -> Vec<MatchResult> {
        if limit == 0 {
            return Vec::new();
        }
        let items = self.items.read();
        let mut scored: Vec<(f32, &IdentityRecord)> = items
            .iter()
            .map(|record| (embedding.similarity(&record.embedding), record))
            .collect();
        // Vec::sort_by is stable: ties stay in insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(score, record)| MatchResult::from_record(record, score))
            .collect()
    }

    /// Clones all records in insertion order.
    pub fn records(&self) -> Vec<IdentityRecord> {
        self.items.read().clone()
    }
}
