//! Pairwise (query, passage) relevance scoring
//!
//! [`RelevanceScorer`] returns raw logits. Mapping them into [0, 1] is a
//! separate, explicit step ([`normalize_scores`]) owned by the retrieval
//! engine, so the transform is applied exactly once per query.

#[cfg(feature = "local-models")]
pub mod cross_encoder;

use std::sync::Arc;

use tracing::debug;

#[cfg(feature = "local-models")]
pub use cross_encoder::FastEmbedReranker;

use crate::embeddings::clean_for_model;
use crate::errors::Result;
use crate::errors::VerseRagError;

/// Raw cross-encoder model.
///
/// `score` returns one unbounded logit per candidate, in candidate order.
pub trait ScoringBackend: Send + Sync {
    fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

/// Shared, cheaply clonable scorer handle
#[derive(Clone)]
pub struct RelevanceScorer {
    backend: Arc<dyn ScoringBackend>,
}

impl RelevanceScorer {
    pub fn new(backend: Arc<dyn ScoringBackend>) -> Self {
        Self { backend }
    }

    pub fn model_name(&self) -> &str {
        self.backend.name()
    }

    /// Raw scores for `(query, candidate)` pairs; empty in, empty out
    pub fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query = clean_for_model(query);
        let cleaned: Vec<String> = candidates.iter().map(|c| clean_for_model(c)).collect();
        let scores = self.backend.score(&query, &cleaned)?;

        if scores.len() != candidates.len() {
            return Err(VerseRagError::Inference(format!(
                "scorer returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(VerseRagError::Inference(format!(
                "scorer returned non-finite score {bad}"
            )));
        }

        debug!(
            model = self.backend.name(),
            count = scores.len(),
            "scored candidates"
        );
        Ok(scores)
    }
}

/// Logistic function; `sigmoid(0.0) == 0.5` exactly
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Map raw logits into [0, 1]
pub fn normalize_scores(raw: &[f32]) -> Vec<f32> {
    raw.iter().copied().map(sigmoid).collect()
}
