//! Similarity ranking over the example corpus.
//!
//! Distances are cosine distances (`1 - cosine similarity`). A zero-magnitude
//! vector on either side yields the maximum distance 1.0 — degenerate vectors
//! are "maximally dissimilar", never a division by zero.

use crate::model::ExampleRecord;

/// Cosine distance between two embedding vectors. Symmetric; 0.0 for
/// identical non-zero vectors; exactly 1.0 when either vector has zero
/// magnitude (or the vectors have mismatched/zero length).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 1.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Rank records by ascending cosine distance to the query embedding.
/// Records without an embedding rank at the maximum distance. The sort is
/// stable, so ties keep their original corpus order.
pub fn rank<'a>(
    query_embedding: &[f32],
    records: &'a [ExampleRecord],
) -> Vec<(f32, &'a ExampleRecord)> {
    let mut ranked: Vec<(f32, &ExampleRecord)> = records
        .iter()
        .map(|r| {
            let dist = match &r.embedding {
                Some(e) => cosine_distance(query_embedding, e),
                None => 1.0,
            };
            (dist, r)
        })
        .collect();
    // sort_by is stable — tied distances keep corpus order
    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Few-shot exemplars selected for a generation request.
#[derive(Debug, Default)]
pub struct FewShot<'a> {
    /// Closest successful outcomes — included as worked examples.
    pub successes: Vec<&'a ExampleRecord>,
    /// Closest failed outcomes — included as cautionary notes.
    pub failures: Vec<&'a ExampleRecord>,
}

pub const DEFAULT_K_SUCCESS: usize = 3;
pub const DEFAULT_K_FAIL: usize = 2;

/// Select the top `k_success` successes and `k_fail` failures nearest to the
/// query embedding. Deterministic for identical embeddings.
pub fn select_few_shot<'a>(
    query_embedding: &[f32],
    successes: &'a [ExampleRecord],
    failures: &'a [ExampleRecord],
    k_success: usize,
    k_fail: usize,
) -> FewShot<'a> {
    let top_success = rank(query_embedding, successes)
        .into_iter()
        .take(k_success)
        .map(|(_, r)| r)
        .collect();
    let top_fail = rank(query_embedding, failures)
        .into_iter()
        .take(k_fail)
        .map(|(_, r)| r)
        .collect();
    FewShot {
        successes: top_success,
        failures: top_fail,
    }
}
