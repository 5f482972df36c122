//! Cross-encoder reranking backend via fastembed's `TextRerank`

use std::path::Path;
use std::sync::Mutex;

use fastembed::RerankInitOptions;
use fastembed::RerankerModel;
use fastembed::TextRerank;
use tracing::info;

use super::ScoringBackend;
use crate::errors::Result;
use crate::errors::VerseRagError;

pub struct FastEmbedReranker {
    model: Mutex<TextRerank>,
    model_name: String,
}

impl FastEmbedReranker {
    pub fn load(model_name: &str, cache_dir: &Path) -> Result<Self> {
        let model = resolve_model(model_name)?;
        info!("Loading cross-encoder model: {}", model_name);

        let options = RerankInitOptions::new(model)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(true);
        let reranker = TextRerank::try_new(options).map_err(|e| {
            VerseRagError::Inference(format!("failed to load reranker {model_name}: {e}"))
        })?;

        info!("Cross-encoder ready: {}", model_name);
        Ok(Self {
            model: Mutex::new(reranker),
            model_name: model_name.to_string(),
        })
    }
}

impl ScoringBackend for FastEmbedReranker {
    fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        let documents: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let mut model = self
            .model
            .lock()
            .map_err(|_| VerseRagError::Inference("reranker lock poisoned".to_string()))?;
        let ranked = model
            .rerank(query, documents, false, None)
            .map_err(|e| VerseRagError::Inference(format!("reranking failed: {e}")))?;

        // fastembed returns results sorted by score; put them back in input order
        let mut scores = vec![f32::NAN; candidates.len()];
        for result in ranked {
            let slot = scores.get_mut(result.index).ok_or_else(|| {
                VerseRagError::Inference(format!(
                    "reranker returned out-of-range index {}",
                    result.index
                ))
            })?;
            *slot = result.score;
        }
        Ok(scores)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

fn resolve_model(name: &str) -> Result<RerankerModel> {
    let short = name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase();
    match short.as_str() {
        "bge-reranker-v2-m3" => Ok(RerankerModel::BGERerankerV2M3),
        "bge-reranker-base" => Ok(RerankerModel::BGERerankerBase),
        "jina-reranker-v1-turbo-en" => Ok(RerankerModel::JINARerankerV1TurboEn),
        _ => Err(VerseRagError::Config(format!(
            "unsupported reranker model: {name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model() {
        assert!(matches!(
            resolve_model("BAAI/bge-reranker-v2-m3"),
            Ok(RerankerModel::BGERerankerV2M3)
        ));
        assert!(resolve_model("cross-encoder/unknown").is_err());
    }
}
