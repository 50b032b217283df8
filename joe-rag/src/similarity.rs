//! Cosine similarity and top-K ranking over stored entries.

use std::cmp::Ordering;

use crate::document::{SearchResult, VectorStoreEntry};

/// Compute cosine similarity between two vectors.
///
/// Returns `None` when the similarity is undefined: either vector has zero
/// magnitude (a failed embedding), the lengths differ, or the result is not
/// finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let score = dot / (norm_a * norm_b);
    score.is_finite().then_some(score)
}

/// Order two optional scores: higher first, undefined last.
fn by_score_desc(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank `entries` against `query` and keep the best `top_k`.
///
/// The sort is stable, so equal scores keep insertion order. Entries with an
/// undefined score rank below every scored entry. Returned chunks carry no
/// embedding.
pub fn rank(entries: &[VectorStoreEntry], query: &[f32], top_k: usize) -> Vec<SearchResult> {
    if entries.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, Option<f32>)> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, query)))
        .collect();
    scored.sort_by(|a, b| by_score_desc(a.1, b.1));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(i, score)| SearchResult { chunk: entries[i].to_chunk(), score })
        .collect()
}
