//! Deterministic model doubles
//!
//! Real models are large downloads; these stand in for them in unit and
//! integration tests. Both are pure functions of their input.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::embeddings::EmbeddingBackend;
use crate::embeddings::TextEncoder;
use crate::errors::Result;
use crate::index::LoadedArtifacts;
use crate::ingest::build_index;
use crate::models::CorpusUnit;
use crate::rag::RetrievalEngine;
use crate::reranker::RelevanceScorer;
use crate::reranker::ScoringBackend;

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Bag-of-words hashing encoder: texts sharing words get similar vectors.
pub struct HashEncoder {
    dimension: usize,
}

impl HashEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(2),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        // Constant component keeps every vector non-zero
        vector[0] = 0.1;
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = 1 + (hash as usize % (self.dimension - 1));
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl EmbeddingBackend for HashEncoder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &str {
        "hash-encoder"
    }
}

/// Scores by word overlap: one shared word is the 0.0 logit boundary.
pub struct KeywordScorer;

impl ScoringBackend for KeywordScorer {
    fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        let query_tokens: std::collections::HashSet<String> = tokens(query).collect();
        Ok(candidates
            .iter()
            .map(|candidate| {
                let shared = tokens(candidate)
                    .collect::<std::collections::HashSet<_>>()
                    .intersection(&query_tokens)
                    .count();
                shared as f32 - 1.0
            })
            .collect())
    }

    fn name(&self) -> &str {
        "keyword-scorer"
    }
}

/// Gives every candidate the same logit
pub struct ConstantScorer(pub f32);

impl ScoringBackend for ConstantScorer {
    fn score(&self, _query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        Ok(vec![self.0; candidates.len()])
    }

    fn name(&self) -> &str {
        "constant-scorer"
    }
}

/// Engine over `units` using [`HashEncoder`] and [`KeywordScorer`], no files involved
pub fn in_memory_engine(units: Vec<CorpusUnit>, config: &AppConfig) -> Result<RetrievalEngine> {
    let dimension = config.embedding_dimension();
    let encoder = TextEncoder::new(
        Arc::new(HashEncoder::new(dimension)),
        dimension,
        config.embeddings.batch_size,
    );
    let index = build_index(&encoder, &units)?;
    RetrievalEngine::new(
        LoadedArtifacts {
            index,
            entries: units,
            build_id: "in-memory".to_string(),
        },
        encoder,
        RelevanceScorer::new(Arc::new(KeywordScorer)),
        config,
    )
}
