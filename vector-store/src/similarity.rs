use crate::error::Result;
use crate::error::VectorStoreError;
use log::debug;
use log::warn;
use serde::Serialize;
use std::cmp::Ordering;

/// A scored search hit. Results are ordered by descending `score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult<K> {
    pub key: K,

    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Cosine similarity of two vectors of equal length.
///
/// Returns `0.0` when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(VectorStoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        Ok(0.0)
    } else {
        Ok((dot / (mag_a * mag_b)).clamp(-1.0, 1.0))
    }
}

/// Scores every candidate against `query` and returns at most `top_n` hits
/// whose score is at least `min_similarity`, best first.
///
/// Candidates with a different dimension are skipped. Equal scores keep
/// candidate order.
pub fn search<'a, K, I>(
    query: &[f32],
    candidates: I,
    top_n: usize,
    min_similarity: f32,
) -> Vec<SimilarityResult<K>>
where
    I: IntoIterator<Item = (K, &'a [f32])>,
{
    let mut scored = 0usize;
    let mut skipped = 0usize;
    let mut results: Vec<SimilarityResult<K>> = Vec::new();

    for (key, vector) in candidates {
        match cosine_similarity(query, vector) {
            Ok(score) => {
                scored += 1;
                if score >= min_similarity {
                    results.push(SimilarityResult { key, score });
                }
            }
            Err(err) => {
                skipped += 1;
                debug!("Skipping candidate: {err}");
            }
        }
    }

    if skipped > 0 {
        warn!(
            "Skipped {skipped} embeddings whose dimension differs from the query ({})",
            query.len()
        );
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(top_n);

    debug!(
        "Scored {scored} candidates, {} above {min_similarity}",
        results.len()
    );
    results
}
