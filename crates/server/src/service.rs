//! Identification and registration on top of a storage backend.
//!
//! [`IdentityService`] composes the fingerprint generator, the configured
//! [`StoreBackend`], and response shaping into the two public operations.
//! Inputs are already-validated image bytes; upload checks happen in the
//! API layer before either operation runs.

use crate::store::{BackendError, IdentityStore, StoreBackend};
use charid_core::config::{
    CONFIDENCE_DECIMALS, DEFAULT_SOURCE, MODEL_VERSION, NO_REFERENCE_NOTES, UNKNOWN_LABEL,
};
use charid_core::{fingerprint, parse_tags, MatchResult, NewIdentity};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use uuid::Uuid;

/// Tunables for response shaping.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Number of predictions requested from the store.
    pub top_k: usize,
    /// Best-match confidence below which `low_confidence` is reported.
    pub low_confidence_threshold: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            top_k: charid_core::config::DEFAULT_TOP_K,
            low_confidence_threshold: charid_core::config::DEFAULT_LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Advisory flags attached to an identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// The store holds no identities; the single prediction is a placeholder.
    NoReferenceData,
    /// The best match scored below the configured threshold.
    LowConfidence,
}

impl Warning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Warning::NoReferenceData => "no_reference_data",
            Warning::LowConfidence => "low_confidence",
        }
    }
}

/// One ranked candidate in an identification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Similarity rounded to four decimal places.
    pub confidence: f64,
    pub notes: String,
    pub source: String,
}

impl Prediction {
    fn from_match(m: MatchResult) -> Self {
        Self {
            label: m.label,
            confidence: round_confidence(m.score),
            notes: m.notes,
            source: m.source,
        }
    }

    fn placeholder() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
            notes: NO_REFERENCE_NOTES.to_string(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Result of [`IdentityService::identify`].
#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    pub request_id: Uuid,
    pub top_predictions: Vec<Prediction>,
    pub model_version: &'static str,
    pub latency_ms: u64,
    pub warnings: Vec<Warning>,
}

/// Result of [`IdentityService::register`].
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub id: Uuid,
    pub label: String,
    pub tags: BTreeSet<String>,
}

/// Rounds a raw similarity score to [`CONFIDENCE_DECIMALS`] places.
pub fn round_confidence(score: f32) -> f64 {
    let scale = 10f64.powi(CONFIDENCE_DECIMALS);
    (f64::from(score) * scale).round() / scale
}

/// The identification service shared by all request handlers.
#[derive(Debug, Clone)]
pub struct IdentityService {
    store: StoreBackend,
    config: ServiceConfig,
}

impl IdentityService {
    pub fn new(store: StoreBackend, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &StoreBackend {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Fingerprints `image`, queries the store for the top-K matches, and
    /// shapes the ranked predictions and warnings.
    pub async fn identify(&self, image: &[u8]) -> Result<Identification, BackendError> {
        let start = Instant::now();
        let embedding = fingerprint(image);
        let matches = self.store.query(&embedding, self.config.top_k).await?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut warnings = Vec::new();
        let mut top_predictions: Vec<Prediction> =
            matches.into_iter().map(Prediction::from_match).collect();

        match top_predictions.first() {
            None => {
                warnings.push(Warning::NoReferenceData);
                top_predictions.push(Prediction::placeholder());
            }
            Some(best) if best.confidence < self.config.low_confidence_threshold => {
                warnings.push(Warning::LowConfidence);
            }
            Some(_) => {}
        }

        let result = Identification {
            request_id: Uuid::new_v4(),
            top_predictions,
            model_version: MODEL_VERSION,
            latency_ms,
            warnings,
        };
        tracing::debug!(
            request_id = %result.request_id,
            best = %result.top_predictions[0].label,
            warnings = ?result.warnings,
            latency_ms,
            "Identified image"
        );
        Ok(result)
    }

    /// Fingerprints `image` and stores it under `label`.
    ///
    /// `tags` is a comma-separated list; see [`parse_tags`].
    pub async fn register(
        &self,
        image: &[u8],
        label: String,
        notes: String,
        tags: Option<&str>,
    ) -> Result<Registration, BackendError> {
        let identity = NewIdentity::new(label, fingerprint(image))
            .with_notes(notes)
            .with_tags(parse_tags(tags));
        let record = self.store.register(identity).await?;
        Ok(Registration {
            id: record.id,
            label: record.label,
            tags: record.tags,
        })
    }
}
