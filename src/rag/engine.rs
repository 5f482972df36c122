//! Two-stage retrieval: exact vector recall, then cross-encoder reranking

use std::time::Instant;

use tracing::debug;
use tracing::error;
use tracing::info;

use super::CorpusArena;
use crate::config::AppConfig;
use crate::config::RetrievalConfig;
use crate::embeddings::sanitize_query;
use crate::embeddings::text_preprocessing::word_count;
use crate::embeddings::TextEncoder;
use crate::errors::ErrorKind;
use crate::errors::Result;
use crate::errors::VerseRagError;
use crate::index::FlatIndex;
use crate::index::LoadedArtifacts;
use crate::models::SearchResult;
use crate::reranker::normalize_scores;
use crate::reranker::RelevanceScorer;

/// Per-call knobs of [`RetrievalEngine::search_with`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub top_k_candidates: usize,
    pub top_k_results: usize,
    pub context_radius: usize,
    pub min_score: Option<f32>,
}

impl SearchParams {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            top_k_candidates: config.top_k_candidates,
            top_k_results: config.top_k_results,
            context_radius: config.context_radius,
            min_score: config.min_score,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k_results == 0 {
            return Err(VerseRagError::Config(
                "top_k_results must be at least 1".to_string(),
            ));
        }
        if self.top_k_candidates < self.top_k_results {
            return Err(VerseRagError::Config(format!(
                "top_k_candidates ({}) must be >= top_k_results ({})",
                self.top_k_candidates, self.top_k_results
            )));
        }
        Ok(())
    }
}

/// Query rules applied once, at the engine boundary
#[derive(Debug, Clone)]
struct QueryRules {
    min_words: usize,
    max_chars: usize,
    prefix: String,
}

/// Candidate after reranking
#[derive(Debug, Clone, Copy)]
struct Ranked {
    slot: usize,
    recall_rank: usize,
    score: f32,
}

/// Long-lived search handle.
///
/// Holds the loaded index, the mapping and both models. Everything inside is
/// read-only after construction, so one instance behind an `Arc` serves any
/// number of concurrent searches.
pub struct RetrievalEngine {
    index: FlatIndex,
    arena: CorpusArena,
    build_id: String,
    encoder: TextEncoder,
    scorer: RelevanceScorer,
    rules: QueryRules,
    defaults: SearchParams,
}

impl RetrievalEngine {
    pub fn new(
        artifacts: LoadedArtifacts,
        encoder: TextEncoder,
        scorer: RelevanceScorer,
        config: &AppConfig,
    ) -> Result<Self> {
        config.retrieval.validate()?;
        if artifacts.index.len() != artifacts.entries.len() {
            return Err(VerseRagError::Artifact(format!(
                "index has {} vectors but mapping has {} entries",
                artifacts.index.len(),
                artifacts.entries.len()
            )));
        }
        if artifacts.index.dimension() != encoder.dimension() {
            return Err(VerseRagError::Config(format!(
                "index dimension {} does not match encoder dimension {}",
                artifacts.index.dimension(),
                encoder.dimension()
            )));
        }

        Ok(Self {
            index: artifacts.index,
            arena: CorpusArena::new(artifacts.entries),
            build_id: artifacts.build_id,
            encoder,
            scorer,
            rules: QueryRules {
                min_words: config.retrieval.min_query_words,
                max_chars: config.retrieval.max_query_length,
                prefix: config.embeddings.query_prefix.clone(),
            },
            defaults: SearchParams::from_config(&config.retrieval),
        })
    }

    /// Load artifacts and the local ONNX models named in `config`.
    ///
    /// Blocking and slow (model download on first use); call it once at
    /// startup, off any async executor thread.
    #[cfg(feature = "local-models")]
    pub fn load(config: &AppConfig) -> Result<Self> {
        use std::sync::Arc;

        use crate::embeddings::FastEmbedBackend;
        use crate::index::load_artifacts;
        use crate::reranker::FastEmbedReranker;

        let artifacts = load_artifacts(&config.paths.index, &config.paths.mapping)?;
        let embedder = FastEmbedBackend::load(config.embedding_model(), &config.paths.model_cache)?;
        let reranker = FastEmbedReranker::load(config.reranker_model(), &config.paths.model_cache)?;

        let encoder = TextEncoder::new(
            Arc::new(embedder),
            config.embedding_dimension(),
            config.embeddings.batch_size,
        );
        let scorer = RelevanceScorer::new(Arc::new(reranker));
        Self::new(artifacts, encoder, scorer, config)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    pub fn defaults(&self) -> SearchParams {
        self.defaults
    }

    pub fn arena(&self) -> &CorpusArena {
        &self.arena
    }

    /// Search with the configured defaults
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with(query, &self.defaults)
    }

    /// Search with explicit parameters.
    ///
    /// Errors are one of `Validation`, `NotReady`, `Config` or an opaque
    /// `Inference`; the detail of internal failures is logged, not returned.
    pub fn search_with(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchResult>> {
        self.run_search(query, params).map_err(|err| match err.kind() {
            ErrorKind::Validation | ErrorKind::NotReady | ErrorKind::Config => err,
            _ => {
                error!("Search failed: {}", err);
                VerseRagError::Inference("search pipeline failed".to_string())
            }
        })
    }

    /// Same-section neighbors of a unit
    pub fn context(&self, unit_id: i64, radius: usize) -> Result<Vec<crate::models::CorpusUnit>> {
        self.arena.context(unit_id, radius)
    }

    /// Sanitize and validate a raw query
    pub fn prepare_query(&self, raw: &str) -> Result<String> {
        let query = sanitize_query(raw, self.rules.max_chars);
        let words = word_count(&query);
        if words < self.rules.min_words {
            debug!(words, "query rejected: too short");
            return Err(VerseRagError::Validation(format!(
                "Query must contain at least {} words (got {})",
                self.rules.min_words, words
            )));
        }
        Ok(query)
    }

    fn run_search(&self, raw_query: &str, params: &SearchParams) -> Result<Vec<SearchResult>> {
        params.validate()?;
        if self.index.is_empty() || self.arena.is_empty() {
            return Err(VerseRagError::NotReady(
                "vector index or mapping is empty".to_string(),
            ));
        }

        let started = Instant::now();
        let query = self.prepare_query(raw_query)?;

        let query_vector = self.encoder.encode(&format!("{}{}", self.rules.prefix, query))?;

        // Stage 1: recall
        let neighbors = self.index.search(&query_vector, params.top_k_candidates)?;
        let mut texts = Vec::with_capacity(neighbors.len());
        for neighbor in &neighbors {
            let unit = self.arena.get(neighbor.slot).ok_or_else(|| {
                VerseRagError::Artifact(format!("index slot {} has no mapping entry", neighbor.slot))
            })?;
            texts.push(unit.text.clone());
        }
        let recall_ms = started.elapsed().as_millis();

        // Stage 2: precision
        let raw_scores = self.scorer.score(&query, &texts)?;
        let scores = normalize_scores(&raw_scores);

        let mut ranked: Vec<Ranked> = neighbors
            .iter()
            .zip(&scores)
            .enumerate()
            .map(|(recall_rank, (neighbor, &score))| Ranked {
                slot: neighbor.slot,
                recall_rank,
                score,
            })
            .collect();
        rank_by_score(&mut ranked);

        let results: Vec<SearchResult> = ranked
            .into_iter()
            .filter(|r| params.min_score.map_or(true, |min| r.score >= min))
            .take(params.top_k_results)
            .filter_map(|r| {
                self.arena.get(r.slot).map(|unit| SearchResult {
                    unit: unit.clone(),
                    score: r.score,
                    context: self.arena.context_at(r.slot, params.context_radius),
                })
            })
            .collect();

        info!(
            candidates = neighbors.len(),
            results = results.len(),
            recall_ms,
            total_ms = started.elapsed().as_millis(),
            "search completed"
        );
        Ok(results)
    }
}

/// Score descending; equal scores keep their stage-1 order
fn rank_by_score(ranked: &mut [Ranked]) {
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.recall_rank.cmp(&b.recall_rank))
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::CorpusUnit;
    use crate::testing::ConstantScorer;
    use crate::testing::HashEncoder;
    use crate::testing::KeywordScorer;

    const DIM: usize = 64;

    fn corpus() -> Vec<CorpusUnit> {
        let texts = [
            "In the beginning God created the heaven and the earth",
            "And the earth was without form and void",
            "And God said let there be light and there was light",
            "And God saw the light that it was good",
            "Love your neighbour as yourself says the law",
            "Blessed are the peacemakers for they shall be called children of God",
            "The lord is my shepherd I shall not want",
            "He maketh me to lie down in green pastures",
        ];
        // two books of four verses each
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                CorpusUnit::new(i as i64 + 1, (i / 4) as i64 + 1, (i % 4) as u32, *text)
            })
            .collect()
    }

    fn engine_with(scorer: Arc<dyn crate::reranker::ScoringBackend>, units: Vec<CorpusUnit>) -> RetrievalEngine {
        let encoder = TextEncoder::new(Arc::new(HashEncoder::new(DIM)), DIM, 8);
        let mut index = FlatIndex::new(DIM);
        let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
        if !texts.is_empty() {
            for vector in encoder.encode_batch(&texts).unwrap() {
                index.add(&vector).unwrap();
            }
        }
        let mut config = AppConfig::default();
        config.embeddings.dimension = DIM;
        config.retrieval.top_k_candidates = 6;
        config.retrieval.top_k_results = 3;
        config.retrieval.context_radius = 1;
        RetrievalEngine::new(
            LoadedArtifacts {
                index,
                entries: units,
                build_id: "test".to_string(),
            },
            encoder,
            RelevanceScorer::new(scorer),
            &config,
        )
        .unwrap()
    }

    fn engine() -> RetrievalEngine {
        engine_with(Arc::new(KeywordScorer), corpus())
    }

    #[test]
    fn test_four_words_fail_five_words_pass() {
        let engine = engine();
        let err = engine.search("God created the heaven").unwrap_err();
        assert!(matches!(err, VerseRagError::Validation(_)));
        assert!(engine.search("God created the heaven earth").is_ok());
    }

    #[test]
    fn test_markup_does_not_count_as_words() {
        let engine = engine();
        let err = engine
            .search("<b>God</b> <i>created</i> <br/> <p>light</p>")
            .unwrap_err();
        assert!(matches!(err, VerseRagError::Validation(_)));
    }

    #[test]
    fn test_best_match_ranks_first_with_context() {
        let engine = engine();
        let results = engine
            .search("let there be light said God")
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].unit.id, 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));

        let context_ids: Vec<i64> = results[0].context.iter().map(|u| u.id).collect();
        assert_eq!(context_ids, vec![2, 4]);
    }

    #[test]
    fn test_context_never_leaves_the_book() {
        let engine = engine();
        // unit 4 is the last verse of book 1, unit 5 the first of book 2
        let context = engine.context(4, 3).unwrap();
        assert!(context.iter().all(|u| u.section_id == 1));
        let context = engine.context(5, 3).unwrap();
        assert!(context.iter().all(|u| u.section_id == 2));
    }

    #[test]
    fn test_repeated_searches_are_identical() {
        let engine = engine();
        let first = engine.search("the lord is my shepherd always").unwrap();
        for _ in 0..5 {
            assert_eq!(engine.search("the lord is my shepherd always").unwrap(), first);
        }
    }

    #[test]
    fn test_equal_scores_keep_recall_order() {
        let engine = engine_with(Arc::new(ConstantScorer(0.0)), corpus());
        let query = "And God said let there be light";
        let results = engine.search(query).unwrap();

        let recall_vector = engine.encoder.encode(query).unwrap();
        let recall: Vec<i64> = engine
            .index
            .search(&recall_vector, 3)
            .unwrap()
            .iter()
            .map(|n| engine.arena.get(n.slot).unwrap().id)
            .collect();
        let ids: Vec<i64> = results.iter().map(|r| r.unit.id).collect();
        assert_eq!(ids, recall);
        assert!(results.iter().all(|r| r.score == 0.5));
    }

    #[test]
    fn test_rank_by_score_tie_break() {
        let mut ranked = vec![
            Ranked { slot: 9, recall_rank: 0, score: 0.4 },
            Ranked { slot: 7, recall_rank: 1, score: 0.9 },
            Ranked { slot: 3, recall_rank: 2, score: 0.4 },
            Ranked { slot: 1, recall_rank: 3, score: 0.9 },
        ];
        rank_by_score(&mut ranked);
        let slots: Vec<usize> = ranked.iter().map(|r| r.slot).collect();
        assert_eq!(slots, vec![7, 1, 9, 3]);
    }

    #[test]
    fn test_min_score_cutoff_applies_only_when_set() {
        let engine = engine_with(Arc::new(ConstantScorer(-3.0)), corpus());
        let query = "the lord is my shepherd always";
        assert_eq!(engine.search(query).unwrap().len(), 3);

        let params = SearchParams {
            min_score: Some(0.5),
            ..engine.defaults()
        };
        assert!(engine.search_with(query, &params).unwrap().is_empty());
    }

    #[test]
    fn test_candidates_below_results_is_config_error() {
        let engine = engine();
        let params = SearchParams {
            top_k_candidates: 2,
            top_k_results: 3,
            ..engine.defaults()
        };
        let err = engine
            .search_with("the lord is my shepherd always", &params)
            .unwrap_err();
        assert!(matches!(err, VerseRagError::Config(_)));
    }

    #[test]
    fn test_empty_index_is_not_ready() {
        let engine = engine_with(Arc::new(KeywordScorer), Vec::new());
        let err = engine.search("the lord is my shepherd always").unwrap_err();
        assert!(matches!(err, VerseRagError::NotReady(_)));
    }

    struct BrokenScorer;

    impl crate::reranker::ScoringBackend for BrokenScorer {
        fn score(&self, _query: &str, _candidates: &[String]) -> Result<Vec<f32>> {
            Err(VerseRagError::Inference(
                "CUDA error 700 at /opt/models/rerank.onnx".to_string(),
            ))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_inference_failure_is_opaque() {
        let engine = engine_with(Arc::new(BrokenScorer), corpus());
        let err = engine.search("the lord is my shepherd always").unwrap_err();
        assert!(matches!(err, VerseRagError::Inference(_)));
        let rendered = err.to_string();
        assert!(!rendered.contains("CUDA"));
        assert!(!rendered.contains("/opt/models"));
    }
}
