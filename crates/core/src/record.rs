//! Identity records and match results.
//!
//! An [`IdentityRecord`] is created once at registration and never changes.
//! A [`MatchResult`] is produced per query and never stored.

use crate::config::DEFAULT_SOURCE;
use crate::embedding::Embedding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A registered identity with its reference fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Unique identifier (UUID v4), assigned at creation.
    pub id: Uuid,
    pub label: String,
    pub embedding: Embedding,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

/// Everything needed to register an identity, minus the id.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub label: String,
    pub embedding: Embedding,
    pub notes: String,
    pub tags: BTreeSet<String>,
    pub source: String,
}

impl NewIdentity {
    /// Creates a registration with no notes, no tags and the default source.
    pub fn new(label: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            label: label.into(),
            embedding,
            notes: String::new(),
            tags: BTreeSet::new(),
            source: default_source(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Assigns a fresh UUID and turns the registration into a record.
    pub fn into_record(self) -> IdentityRecord {
        self.into_record_with_id(Uuid::new_v4())
    }

    pub fn into_record_with_id(self, id: Uuid) -> IdentityRecord {
        IdentityRecord {
            id,
            label: self.label,
            embedding: self.embedding,
            notes: self.notes,
            tags: self.tags,
            source: self.source,
        }
    }
}

/// A scored hit returned by a store query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Record id as reported by the backend.
    pub id: String,
    pub label: String,
    /// Raw cosine similarity.
    pub score: f32,
    pub notes: String,
    pub tags: BTreeSet<String>,
    pub source: String,
}

impl MatchResult {
    /// Builds a match from a stored record and its score.
    pub fn from_record(record: &IdentityRecord, score: f32) -> Self {
        Self {
            id: record.id.to_string(),
            label: record.label.clone(),
            score,
            notes: record.notes.clone(),
            tags: record.tags.clone(),
            source: record.source.clone(),
        }
    }
}

/// Parses a comma-separated tag list into a set of trimmed, non-empty tags.
///
/// `None` and the empty string both yield an empty set.
pub fn parse_tags(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
