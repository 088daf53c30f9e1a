//! The fixed-dimension vector type shared by every component.
//!
//! An [`Embedding`] always holds exactly [`EMBEDDING_DIM`] finite values. The
//! check happens once, at construction and on deserialization, so stores and
//! the similarity metric never see mismatched pairs.

use crate::config::EMBEDDING_DIM;
use crate::error::EmbeddingError;
use crate::similarity;
use serde::{Deserialize, Serialize};

/// A fingerprint vector of dimension [`EMBEDDING_DIM`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Wraps `values`, rejecting wrong dimensions and non-finite entries.
    pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        if values.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                got: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite { index });
        }
        Ok(Self(values))
    }

    /// Wraps values produced inside the crate that are correct by construction.
    pub(crate) fn from_trusted(values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), EMBEDDING_DIM);
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// L2 norm of the vector.
    pub fn norm(&self) -> f32 {
        similarity::l2_norm(&self.0)
    }

    /// Cosine similarity against another embedding.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        similarity::cosine_similarity(&self.0, &other.0)
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = EmbeddingError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.0
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_dimension() {
        let err = Embedding::new(vec![0.5; 3]).unwrap_err();
        assert_eq!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                got: 3
            }
        );
    }

    #[test]
    fn test_rejects_nan() {
        let mut values = vec![0.0; EMBEDDING_DIM];
        values[7] = f32::NAN;
        assert_eq!(
            Embedding::new(values).unwrap_err(),
            EmbeddingError::NonFinite { index: 7 }
        );
    }

    #[test]
    fn test_deserialize_checks_dimension() {
        let short = serde_json::to_string(&vec![1.0f32; 12]).unwrap();
        assert!(serde_json::from_str::<Embedding>(&short).is_err());

        let full = serde_json::to_string(&vec![1.0f32; EMBEDDING_DIM]).unwrap();
        let embedding: Embedding = serde_json::from_str(&full).unwrap();
        assert_eq!(embedding.as_slice().len(), EMBEDDING_DIM);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let embedding = Embedding::new(vec![0.25; EMBEDDING_DIM]).unwrap();
        let json = serde_json::to_value(&embedding).unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(EMBEDDING_DIM));
    }
}
