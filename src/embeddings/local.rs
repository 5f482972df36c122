//! Local ONNX sentence-embedding backend via fastembed
//!
//! Only available with the `local-models` feature (on by default).

use std::path::Path;
use std::sync::Mutex;

use fastembed::EmbeddingModel;
use fastembed::InitOptions;
use fastembed::TextEmbedding;
use tracing::info;

use super::EmbeddingBackend;
use crate::errors::Result;
use crate::errors::VerseRagError;

/// fastembed model behind a mutex.
///
/// The ONNX session needs exclusive access per run, so concurrent callers
/// queue on the lock; this stays invisible to [`super::TextEncoder`] users.
pub struct FastEmbedBackend {
    model: Mutex<TextEmbedding>,
    model_name: String,
}

impl FastEmbedBackend {
    /// Load (downloading on first use) the named model into `cache_dir`
    pub fn load(model_name: &str, cache_dir: &Path) -> Result<Self> {
        let model = resolve_model(model_name)?;
        info!("Loading embedding model: {}", model_name);

        let options = InitOptions::new(model)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(true);
        let embedding = TextEmbedding::try_new(options).map_err(|e| {
            VerseRagError::Inference(format!("failed to load embedding model {model_name}: {e}"))
        })?;

        info!("Embedding model ready: {}", model_name);
        Ok(Self {
            model: Mutex::new(embedding),
            model_name: model_name.to_string(),
        })
    }
}

impl EmbeddingBackend for FastEmbedBackend {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| VerseRagError::Inference("embedding model lock poisoned".to_string()))?;
        model
            .embed(texts.to_vec(), Some(texts.len().max(1)))
            .map_err(|e| VerseRagError::Inference(format!("embedding failed: {e}")))
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Map a Hugging Face model id to the fastembed model enum
fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    let short = name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase();
    match short.as_str() {
        "paraphrase-multilingual-minilm-l12-v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        _ => Err(VerseRagError::Config(format!(
            "unsupported embedding model: {name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_accepts_full_and_short_ids() {
        assert!(matches!(
            resolve_model("sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"),
            Ok(EmbeddingModel::ParaphraseMLMiniLML12V2)
        ));
        assert!(matches!(
            resolve_model("all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
    }

    #[test]
    fn test_resolve_model_rejects_unknown() {
        assert!(matches!(
            resolve_model("acme/secret-model"),
            Err(VerseRagError::Config(_))
        ));
    }
}
