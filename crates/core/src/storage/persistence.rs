//! Durable identity document.
//!
//! The local store keeps all records in a single JSON document of the form
//! `{"items": [...]}`. Every mutation rewrites the whole document; writes go
//! to a temp file that is renamed over the original so a crash never leaves a
//! half-written document behind.

use crate::error::StorageError;
use crate::record::IdentityRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of the identity document.
#[derive(Debug, Default, Deserialize)]
pub struct IdentityDocument {
    #[serde(default)]
    pub items: Vec<IdentityRecord>,
}

#[derive(Serialize)]
struct IdentityDocumentRef<'a> {
    items: &'a [IdentityRecord],
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `items` to `path` with atomic temp-file + rename.
pub fn save_document(path: &Path, items: &[IdentityRecord]) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(&IdentityDocumentRef { items })?;
    let tmp = tmp_path(path);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(
        "Saved identity document {:?} ({} records, {} bytes)",
        path,
        items.len(),
        bytes.len()
    );
    Ok(())
}

/// Reads and validates the document at `path`.
///
/// Every embedding is checked against the fixed dimension while deserializing,
/// so a document written with another dimension is reported as corrupt.
pub fn load_document(path: &Path) -> Result<IdentityDocument, StorageError> {
    let raw = fs::read(path)?;
    let document: IdentityDocument =
        serde_json::from_slice(&raw).map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(
        "Loaded identity document {:?} ({} records)",
        path,
        document.items.len()
    );
    Ok(document)
}

/// Loads the document at `path`, creating it (and its parent directories)
/// with an empty record list if it does not exist yet.
pub fn load_or_init_document(path: &Path) -> Result<IdentityDocument, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        save_document(path, &[])?;
        tracing::info!("Initialized empty identity document {:?}", path);
        return Ok(IdentityDocument::default());
    }
    load_document(path)
}
