//! Vector similarity scoring.

use std::cmp::Ordering;

/// Calculate cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Score every candidate against `query` and sort by similarity, highest first.
///
/// The sort is stable: equal scores keep candidate order. NaN scores sort last.
pub fn rank_by_similarity<'a, K, I>(query: &[f32], candidates: I) -> Vec<(K, f32)>
where
    I: IntoIterator<Item = (K, &'a [f32])>,
{
    let mut scored: Vec<(K, f32)> = candidates
        .into_iter()
        .map(|(key, vector)| (key, cosine_similarity(query, vector)))
        .collect();

    scored.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal),
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        // Identical vectors
        let v1 = vec![1.0, 0.0, 0.0];
        let v2 = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v1, &v2) - 1.0).abs() < 0.001);

        // Orthogonal vectors
        let v3 = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&v1, &v3) - 0.0).abs() < 0.001);

        // Opposite vectors
        let v4 = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v1, &v4) - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let v = vec![0.3, -1.7, 4.2, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetry() {
        let u = vec![0.5, 0.1, -0.3];
        let v = vec![0.2, 0.9, 0.4];
        assert_eq!(cosine_similarity(&u, &v), cosine_similarity(&v, &u));
    }

    #[test]
    fn test_zero_norm_scores_zero() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_rank_orders_descending_and_keeps_ties_stable() {
        let query = [1.0, 0.0];
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        let c = [2.0, 0.0];
        let ranked = rank_by_similarity(&query, [("b", &b[..]), ("a", &a[..]), ("c", &c[..])]);

        let keys: Vec<&str> = ranked.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_length_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 1.0, 1.0], &[1.0; 64]), 0.0);
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let query = [f32::MAX, 0.0];
        let good = [1.0, 0.0];
        let huge = [f32::MAX, f32::MAX];
        let ranked = rank_by_similarity(&query, [("huge", &huge[..]), ("good", &good[..])]);

        assert_eq!(ranked[0].0, "good");
        assert!(ranked[1].1.is_nan());
    }
}
