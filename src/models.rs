//! Core data models for the recommendation pipeline.
//!
//! These types represent the catalog entries, per-request context signals,
//! and ranked matches that flow from query to response.

/// One catalog entry, loaded once at startup and immutable afterwards.
///
/// `month` and `description` are the extracted pipeline inputs; `fields`
/// keeps every original column untouched so responses can return the full
/// row exactly as it appeared in the source workbook.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub month: String,
    pub description: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Per-request context extracted from the raw query text.
#[derive(Debug, Clone)]
pub struct QuerySignals {
    /// Canonical month name, if any month is mentioned.
    pub month: Option<&'static str>,
    /// Coarse sentiment class driving the similarity threshold.
    pub mood: crate::sentiment::Mood,
}

/// A catalog index paired with its similarity score for one request.
///
/// Scores are cosine similarities in `[-1, 1]` and always strictly exceed
/// the threshold in effect when the match was produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedMatch {
    pub index: usize,
    pub score: f32,
}
