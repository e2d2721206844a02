//! The recommendation engine: catalog, cached vectors, and providers
//! bundled into one immutable per-process context.
//!
//! Everything the pipeline needs is constructed once by
//! [`Engine::bootstrap`] and shared read-only across requests (behind an
//! `Arc` in the server), so no locking is needed after startup. Tests
//! build engines with stub providers via [`Engine::new`].

use anyhow::{bail, Result};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::models::{EventRecord, QuerySignals};
use crate::month::detect_month;
use crate::rank::rank;
use crate::sentiment::{Mood, SentimentClassifier};

/// One recommended event with the similarity score that ranked it.
#[derive(Debug, Clone)]
pub struct RankedEvent {
    pub record: EventRecord,
    pub score: f32,
}

/// Terminal result of one pipeline run.
///
/// The two empty-handed variants are distinct on purpose: an empty month
/// subset and an empty above-threshold set produce different messages.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A month was mentioned but no catalog row is filed under it.
    NoEventsForMonth(String),
    /// Similarity filtering left nothing above the threshold.
    NoMatches,
    /// One to three events, ranked by similarity descending.
    Events(Vec<RankedEvent>),
}

pub struct Engine {
    catalog: Catalog,
    vectors: Vec<Vec<f32>>,
    embedder: Box<dyn Embedder>,
    classifier: Box<dyn SentimentClassifier>,
}

impl Engine {
    /// Build an engine from already-constructed parts, embedding every
    /// catalog description once up front.
    pub async fn new(
        catalog: Catalog,
        embedder: Box<dyn Embedder>,
        classifier: Box<dyn SentimentClassifier>,
    ) -> Result<Engine> {
        let descriptions = catalog.descriptions();
        let vectors = if descriptions.is_empty() {
            Vec::new()
        } else {
            embedder.embed(&descriptions).await?
        };

        if vectors.len() != catalog.len() {
            bail!(
                "embedder returned {} vectors for {} catalog rows",
                vectors.len(),
                catalog.len()
            );
        }

        Ok(Engine {
            catalog,
            vectors,
            embedder,
            classifier,
        })
    }

    /// Load the catalog and providers from config and precompute the
    /// catalog vectors. This is the startup path used by `serve` and
    /// `query`.
    pub async fn bootstrap(config: &Config) -> Result<Engine> {
        let catalog = Catalog::load(&config.catalog.path)?;
        let embedder = embedding::create_embedder(&config.embedding)?;
        let classifier = crate::sentiment::create_classifier(&config.sentiment)?;

        tracing::info!(
            rows = catalog.len(),
            embedding_model = embedder.model_name(),
            dims = embedder.dims(),
            sentiment_model = classifier.model_name(),
            "embedding catalog"
        );

        Engine::new(catalog, embedder, classifier).await
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run the full pipeline for one query.
    ///
    /// Month detection and filtering happen before any provider call, so
    /// an empty month subset costs neither an embedding nor a
    /// classification. A provider failure is terminal for this request
    /// only; nothing is mutated and no partial result is returned.
    pub async fn recommend(&self, user_input: &str) -> Result<Outcome> {
        if user_input.is_empty() {
            bail!("user input must not be empty");
        }

        let month = detect_month(user_input);

        let indices: Vec<usize> = match month {
            Some(name) => {
                let subset = self.catalog.filter_by_month(name);
                if subset.is_empty() {
                    tracing::debug!(month = name, "no catalog rows for detected month");
                    return Ok(Outcome::NoEventsForMonth(name.to_string()));
                }
                subset
            }
            None => (0..self.catalog.len()).collect(),
        };

        let verdict = self.classifier.classify(user_input).await?;
        let signals = QuerySignals {
            month,
            mood: Mood::from_score(&verdict),
        };
        let threshold = signals.mood.threshold();

        // The query embeds as-is: no lowercasing or other normalization.
        let query_vec = embedding::embed_query(self.embedder.as_ref(), user_input).await?;

        let matches = rank(&query_vec, &indices, &self.vectors, threshold);

        tracing::debug!(
            month = ?signals.month,
            mood = ?signals.mood,
            threshold,
            candidates = indices.len(),
            kept = matches.len(),
            "ranked query"
        );

        if matches.is_empty() {
            return Ok(Outcome::NoMatches);
        }

        Ok(Outcome::Events(
            matches
                .into_iter()
                .map(|m| RankedEvent {
                    record: self.catalog.records()[m.index].clone(),
                    score: m.score,
                })
                .collect(),
        ))
    }
}
