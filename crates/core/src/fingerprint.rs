//! Deterministic content fingerprints.
//!
//! A fingerprint is the SHA-256 digest of the input bytes, tiled out to
//! [`EMBEDDING_DIM`] bytes, standardized to zero mean and unit variance, and
//! L2-normalized. It is a content address shaped like a vector: identical
//! bytes map to identical vectors, but visually similar images do not map to
//! nearby vectors.

use crate::config::{EMBEDDING_DIM, STANDARDIZE_EPSILON};
use crate::embedding::Embedding;
use crate::similarity::l2_norm;
use sha2::{Digest, Sha256};

/// Computes the fingerprint of `bytes`. Pure and infallible.
pub fn fingerprint(bytes: &[u8]) -> Embedding {
    let digest = Sha256::digest(bytes);
    let values: Vec<f32> = digest
        .iter()
        .cycle()
        .take(EMBEDDING_DIM)
        .map(|&b| f32::from(b))
        .collect();
    Embedding::from_trusted(standardize_and_normalize(values))
}

/// Standardizes `values` (population variance) and scales them to unit length.
///
/// A vector whose standardized form is exactly zero is returned unnormalized.
fn standardize_and_normalize(mut values: Vec<f32>) -> Vec<f32> {
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std = variance.sqrt() + STANDARDIZE_EPSILON;
    for v in values.iter_mut() {
        *v = (*v - mean) / std;
    }

    let norm = l2_norm(&values);
    if norm == 0.0 {
        return values;
    }
    for v in values.iter_mut() {
        *v /= norm;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = fingerprint(b"hero.png contents");
        let b = fingerprint(b"hero.png contents");
        assert_eq!(a, b);
        let bits_a: Vec<u32> = a.as_slice().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_dimension_and_unit_norm() {
        for input in [&b"a"[..], &b"some longer image payload"[..], &[0u8; 4096][..]] {
            let fp = fingerprint(input);
            assert_eq!(fp.as_slice().len(), EMBEDDING_DIM);
            let norm = fp.norm();
            assert!((norm - 1.0).abs() < 1e-4, "norm should be ~1, got {norm}");
        }
    }

    #[test]
    fn test_empty_input_is_defined() {
        let fp = fingerprint(b"");
        assert_eq!(fp, fingerprint(&[]));
        assert!((fp.norm() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_distinct_inputs_differ() {
        assert_ne!(fingerprint(b"blue"), fingerprint(b"red"));
    }

    #[test]
    fn test_tiles_digest() {
        // 256 values from a 32-byte digest repeat every 32 positions.
        let fp = fingerprint(b"tiling");
        let v = fp.as_slice();
        for i in 32..EMBEDDING_DIM {
            assert_eq!(v[i], v[i - 32]);
        }
    }

    #[test]
    fn test_zero_mean() {
        let fp = fingerprint(b"mean check");
        let mean = fp.as_slice().iter().sum::<f32>() / EMBEDDING_DIM as f32;
        assert!(mean.abs() < 1e-5, "mean should be ~0, got {mean}");
    }

    #[test]
    fn test_constant_input_passes_through_zero_vector() {
        let out = standardize_and_normalize(vec![7.0; 16]);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_self_similarity() {
        let fp = fingerprint(b"self");
        assert!(fp.similarity(&fp) > 0.999);
    }
}
