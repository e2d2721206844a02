//! The ranking core: similarity scoring, threshold filtering, top-k.

use crate::embedding::cosine_similarity;
use crate::models::RankedMatch;

/// Maximum number of events a single request can surface.
pub const MAX_RESULTS: usize = 3;

/// Score the retained catalog subset against a query vector.
///
/// `indices` selects rows of the full-catalog vector cache, so a
/// month-filtered request reuses the vectors computed at startup instead
/// of re-embedding the subset.
///
/// Only scores *strictly* greater than `threshold` survive: a score
/// exactly equal to the threshold is excluded. Results are ordered by
/// similarity descending; the sort is stable, so exact ties keep their
/// original catalog order. At most [`MAX_RESULTS`] entries are returned;
/// an empty return is a normal outcome, not an error.
pub fn rank(
    query_vec: &[f32],
    indices: &[usize],
    catalog_vectors: &[Vec<f32>],
    threshold: f32,
) -> Vec<RankedMatch> {
    let mut kept: Vec<RankedMatch> = indices
        .iter()
        .filter_map(|&index| {
            let score = cosine_similarity(query_vec, &catalog_vectors[index]);
            (score > threshold).then_some(RankedMatch { index, score })
        })
        .collect();

    kept.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    kept.truncate(MAX_RESULTS);
    kept
}
