//! Sentiment classification and the sentiment-to-threshold mapping.
//!
//! The classifier only ever influences one thing: which similarity
//! threshold the ranking engine applies for the current request. Backends:
//!
//! - **[`LexiconClassifier`]** — offline word-list matcher, the default.
//! - **[`RemoteClassifier`]** — calls an HTTP text-classification endpoint
//!   (Hugging Face inference shape) with retry and backoff.
//!
//! Use [`create_classifier`] to instantiate the configured backend.

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::SentimentConfig;
use crate::net;

/// Raw polarity reported by a classifier backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

/// A classifier verdict: the winning polarity and its confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct SentimentScore {
    pub label: Polarity,
    pub score: f32,
}

/// Coarse per-request sentiment class.
///
/// Derived from the raw classifier verdict with a fixed 0.7 confidence
/// cutoff: anything below it collapses to `Neutral`, whichever polarity
/// the classifier reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Positive,
    Neutral,
    Negative,
}

impl Mood {
    /// Map a raw verdict to a mood. A confident signal needs `score > 0.7`;
    /// everything else is `Neutral`.
    pub fn from_score(verdict: &SentimentScore) -> Mood {
        match verdict.label {
            Polarity::Negative if verdict.score > 0.7 => Mood::Negative,
            Polarity::Positive if verdict.score > 0.7 => Mood::Positive,
            _ => Mood::Neutral,
        }
    }

    /// The minimum cosine similarity an event must strictly exceed.
    ///
    /// Negative queries demand stronger agreement before an event is
    /// surfaced; neutral queries are the most permissive.
    pub fn threshold(self) -> f32 {
        match self {
            Mood::Positive => 0.4,
            Mood::Neutral => 0.3,
            Mood::Negative => 0.5,
        }
    }
}

/// Trait for sentiment classifier backends.
///
/// Implementations are substitutable: tests inject deterministic stubs,
/// production selects a backend from config via [`create_classifier`].
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Returns the model identifier (e.g. a word-list name or HF model id).
    fn model_name(&self) -> &str;

    /// Classify the full query text. Invoked fresh on every request.
    async fn classify(&self, text: &str) -> Result<SentimentScore>;
}

// ============ Lexicon Classifier ============

/// Word-list sentiment matcher, entirely offline and deterministic.
///
/// Counts case-insensitive hits from fixed positive and negative
/// vocabularies; the winning side's hit share becomes the confidence.
/// Texts with no hits (or an even split) score 0.5, which the 0.7 cutoff
/// collapses to neutral.
pub struct LexiconClassifier {
    positive: aho_corasick::AhoCorasick,
    negative: aho_corasick::AhoCorasick,
}

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "love",
    "amazing",
    "wonderful",
    "happy",
    "fantastic",
    "awesome",
    "fun",
    "excited",
    "best",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "horrible",
    "worst",
    "sad",
    "angry",
    "boring",
    "disappointed",
    "annoyed",
    "poor",
];

impl LexiconClassifier {
    pub fn new() -> Result<Self> {
        let positive = aho_corasick::AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(POSITIVE_WORDS)
            .map_err(|e| anyhow::anyhow!("Failed to build positive lexicon matcher: {e}"))?;
        let negative = aho_corasick::AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(NEGATIVE_WORDS)
            .map_err(|e| anyhow::anyhow!("Failed to build negative lexicon matcher: {e}"))?;
        Ok(Self { positive, negative })
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    fn model_name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, text: &str) -> Result<SentimentScore> {
        let positive_hits = self.positive.find_iter(text).count() as f32;
        let negative_hits = self.negative.find_iter(text).count() as f32;
        let total = positive_hits + negative_hits;

        let positive_share = if total == 0.0 {
            0.5
        } else {
            positive_hits / total
        };

        let (label, score) = if positive_share >= 0.5 {
            (Polarity::Positive, positive_share)
        } else {
            (Polarity::Negative, 1.0 - positive_share)
        };

        Ok(SentimentScore { label, score })
    }
}

// ============ Remote Classifier ============

/// Classifier backed by an HTTP text-classification endpoint.
///
/// Speaks the Hugging Face inference shape: request `{"inputs": text}`,
/// response `[[{"label": ..., "score": ...}, ...]]`. An `HF_API_TOKEN`
/// environment variable, when present, is sent as a bearer token.
pub struct RemoteClassifier {
    model: String,
    url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl RemoteClassifier {
    pub fn new(config: &SentimentConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("sentiment.model required for remote provider"))?;
        let url = config.url.clone().unwrap_or_else(|| {
            format!("https://api-inference.huggingface.co/models/{}", model)
        });
        Ok(Self {
            model,
            url,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl SentimentClassifier for RemoteClassifier {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, text: &str) -> Result<SentimentScore> {
        let client = net::client(self.timeout_secs)?;
        let bearer = std::env::var("HF_API_TOKEN").ok();
        let body = serde_json::json!({ "inputs": text });

        let json = net::post_json_with_retry(
            &client,
            &self.url,
            bearer.as_deref(),
            &body,
            self.max_retries,
            "sentiment endpoint",
        )
        .await?;

        parse_classification_response(&json)
    }
}

/// Parse a text-classification response into the top-scoring verdict.
///
/// Accepts both the nested (`[[{label, score}]]`) and flat
/// (`[{label, score}]`) shapes the inference API produces.
fn parse_classification_response(json: &serde_json::Value) -> Result<SentimentScore> {
    let outer = json
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid classification response: not an array"))?;

    let entries = match outer.first() {
        Some(serde_json::Value::Array(inner)) => inner.as_slice(),
        Some(serde_json::Value::Object(_)) => outer.as_slice(),
        _ => bail!("Invalid classification response: empty or malformed"),
    };

    let mut best: Option<SentimentScore> = None;
    for entry in entries {
        let label = entry
            .get("label")
            .and_then(|l| l.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid classification response: missing label"))?;
        let score = entry
            .get("score")
            .and_then(|s| s.as_f64())
            .ok_or_else(|| anyhow::anyhow!("Invalid classification response: missing score"))?
            as f32;

        let polarity = match label.to_ascii_uppercase().as_str() {
            "POSITIVE" | "POS" | "LABEL_1" => Polarity::Positive,
            "NEGATIVE" | "NEG" | "LABEL_0" => Polarity::Negative,
            other => bail!("Unknown sentiment label: {}", other),
        };

        if best.map(|b| score > b.score).unwrap_or(true) {
            best = Some(SentimentScore {
                label: polarity,
                score,
            });
        }
    }

    best.ok_or_else(|| anyhow::anyhow!("Classification response contained no entries"))
}

/// Create the configured [`SentimentClassifier`] backend.
pub fn create_classifier(config: &SentimentConfig) -> Result<Box<dyn SentimentClassifier>> {
    match config.provider.as_str() {
        "lexicon" => Ok(Box::new(LexiconClassifier::new()?)),
        "remote" => Ok(Box::new(RemoteClassifier::new(config)?)),
        other => bail!("Unknown sentiment provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_table_is_fixed() {
        assert_eq!(Mood::Positive.threshold(), 0.4);
        assert_eq!(Mood::Neutral.threshold(), 0.3);
        assert_eq!(Mood::Negative.threshold(), 0.5);
    }

    #[test]
    fn low_confidence_collapses_to_neutral() {
        let verdict = SentimentScore {
            label: Polarity::Negative,
            score: 0.7,
        };
        // exactly 0.7 is not enough
        assert_eq!(Mood::from_score(&verdict), Mood::Neutral);

        let verdict = SentimentScore {
            label: Polarity::Positive,
            score: 0.69,
        };
        assert_eq!(Mood::from_score(&verdict), Mood::Neutral);
    }

    #[test]
    fn confident_polarities_map_through() {
        let negative = SentimentScore {
            label: Polarity::Negative,
            score: 0.71,
        };
        assert_eq!(Mood::from_score(&negative), Mood::Negative);

        let positive = SentimentScore {
            label: Polarity::Positive,
            score: 0.95,
        };
        assert_eq!(Mood::from_score(&positive), Mood::Positive);
    }

    #[tokio::test]
    async fn lexicon_scores_positive_text() {
        let classifier = LexiconClassifier::new().unwrap();
        let verdict = classifier
            .classify("this is an amazing, wonderful, fun idea")
            .await
            .unwrap();
        assert_eq!(verdict.label, Polarity::Positive);
        assert!(verdict.score > 0.7);
    }

    #[tokio::test]
    async fn lexicon_scores_negative_text() {
        let classifier = LexiconClassifier::new().unwrap();
        let verdict = classifier
            .classify("terrible, boring and awful")
            .await
            .unwrap();
        assert_eq!(verdict.label, Polarity::Negative);
        assert!(verdict.score > 0.7);
    }

    #[tokio::test]
    async fn lexicon_neutral_on_no_hits() {
        let classifier = LexiconClassifier::new().unwrap();
        let verdict = classifier.classify("events in october").await.unwrap();
        assert_eq!(verdict.score, 0.5);
        assert_eq!(Mood::from_score(&verdict), Mood::Neutral);
    }

    #[test]
    fn parses_nested_classification_response() {
        let json = serde_json::json!([[
            { "label": "NEGATIVE", "score": 0.91 },
            { "label": "POSITIVE", "score": 0.09 }
        ]]);
        let verdict = parse_classification_response(&json).unwrap();
        assert_eq!(verdict.label, Polarity::Negative);
        assert!((verdict.score - 0.91).abs() < 1e-6);
    }

    #[test]
    fn parses_flat_classification_response() {
        let json = serde_json::json!([{ "label": "LABEL_1", "score": 0.8 }]);
        let verdict = parse_classification_response(&json).unwrap();
        assert_eq!(verdict.label, Polarity::Positive);
    }

    #[test]
    fn rejects_unknown_label() {
        let json = serde_json::json!([[{ "label": "MIXED", "score": 0.8 }]]);
        assert!(parse_classification_response(&json).is_err());
    }
}
