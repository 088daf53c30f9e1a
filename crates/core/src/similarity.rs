//! Cosine similarity between fingerprint vectors.
//!
//! Scores are bounded to roughly \[-1, 1\]; higher is more similar. The
//! denominator carries [`SIMILARITY_EPSILON`] so near-zero vectors score 0
//! instead of dividing by zero.

use crate::config::SIMILARITY_EPSILON;

/// Dot product of two equal-length slices.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// L2 norm of a slice.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity: `dot(a, b) / (|a| * |b| + epsilon)`.
///
/// Both inputs must have the same dimension. Callers hold
/// [`Embedding`](crate::embedding::Embedding)s, which guarantees it.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "cosine similarity of mismatched vectors");
    let denom = l2_norm(a) * l2_norm(b) + SIMILARITY_EPSILON;
    dot_product(a, b) / denom
}
