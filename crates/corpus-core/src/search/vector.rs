//! Vector similarity ranking
//!
//! Exhaustive cosine-similarity search over an in-memory set of vectors. The
//! reference corpus is a few hundred chunks, so a linear scan per query is
//! fast enough and keeps results exact.
//!
//! # Ordering
//!
//! Hits are sorted by descending score. Equal scores keep insertion order,
//! which makes results reproducible across runs over the same index.

use std::cmp::Ordering;

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when the lengths differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Rank `vectors` against `query` and keep the best `k`.
///
/// # Arguments
///
/// * `query` - Query embedding
/// * `vectors` - Candidate embeddings, in insertion order
/// * `k` - Maximum number of hits
///
/// # Returns
///
/// `(position, score)` pairs, exactly `min(k, vectors.len())` of them,
/// sorted by descending score with ties broken by position.
pub fn top_k<'a, I>(query: &[f32], vectors: I, k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = vectors
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let score = cosine_similarity(query, v);
            (i, if score.is_nan() { 0.0 } else { score })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_top_k_orders_by_score() {
        let vectors: Vec<Vec<f32>> = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let hits = top_k(&[1.0, 0.0], vectors.iter().map(Vec::as_slice), 2);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let vectors: Vec<Vec<f32>> = vec![vec![1.0, 0.0]; 4];
        let hits = top_k(&[1.0, 0.0], vectors.iter().map(Vec::as_slice), 3);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    proptest! {
        #[test]
        fn top_k_returns_min_k_n_sorted(
            vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 3), 0..20),
            query in prop::collection::vec(-1.0f32..1.0, 3),
            k in 0usize..25,
        ) {
            let hits = top_k(&query, vectors.iter().map(Vec::as_slice), k);
            prop_assert_eq!(hits.len(), k.min(vectors.len()));
            for pair in hits.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
            }
        }
    }
}
