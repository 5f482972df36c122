use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::VerseRagError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// SQLite corpus database (read-only)
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// Binary flat inner-product index
    #[serde(default = "default_index_path")]
    pub index: PathBuf,
    /// JSON mapping, parallel to the index
    #[serde(default = "default_mapping_path")]
    pub mapping: PathBuf,
    /// Where downloaded ONNX models are cached
    #[serde(default = "default_model_cache")]
    pub model_cache: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/bible.db")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/index.bin")
}

fn default_mapping_path() -> PathBuf {
    PathBuf::from("data/mapping.json")
}

fn default_model_cache() -> PathBuf {
    PathBuf::from(".fastembed_cache")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            index: default_index_path(),
            mapping: default_mapping_path(),
            model_cache: default_model_cache(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Prepended to queries (not to corpus texts) before encoding
    #[serde(default)]
    pub query_prefix: String,
}

fn default_embedding_model() -> String {
    "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string()
}

pub(crate) fn default_dimension() -> usize {
    384
}

pub(crate) fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            query_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    #[serde(default = "default_reranker_model")]
    pub model: String,
}

fn default_reranker_model() -> String {
    "BAAI/bge-reranker-v2-m3".to_string()
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            model: default_reranker_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,
}

pub(crate) fn default_min_text_length() -> usize {
    10
}

pub(crate) fn default_min_word_count() -> usize {
    3
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            min_text_length: default_min_text_length(),
            min_word_count: default_min_word_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Stage-1 candidate count
    #[serde(default = "default_top_k_candidates")]
    pub top_k_candidates: usize,
    /// Results kept after reranking
    #[serde(default = "default_top_k_results")]
    pub top_k_results: usize,
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
    #[serde(default = "default_min_query_words")]
    pub min_query_words: usize,
    /// Characters kept after sanitization
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    /// Optional absolute cutoff on the sigmoid score
    #[serde(default)]
    pub min_score: Option<f32>,
}

pub(crate) fn default_top_k_candidates() -> usize {
    20
}

pub(crate) fn default_top_k_results() -> usize {
    5
}

pub(crate) fn default_context_radius() -> usize {
    2
}

pub(crate) fn default_min_query_words() -> usize {
    5
}

pub(crate) fn default_max_query_length() -> usize {
    300
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_candidates: default_top_k_candidates(),
            top_k_results: default_top_k_results(),
            context_radius: default_context_radius(),
            min_query_words: default_min_query_words(),
            max_query_length: default_max_query_length(),
            min_score: None,
        }
    }
}

impl RetrievalConfig {
    /// Reject combinations that would otherwise be silently truncated
    pub fn validate(&self) -> crate::Result<()> {
        if self.top_k_results == 0 {
            return Err(VerseRagError::Config(
                "retrieval.top_k_results must be at least 1".to_string(),
            ));
        }
        if self.top_k_candidates < self.top_k_results {
            return Err(VerseRagError::Config(format!(
                "retrieval.top_k_candidates ({}) must be >= retrieval.top_k_results ({})",
                self.top_k_candidates, self.top_k_results
            )));
        }
        if self.min_query_words == 0 {
            return Err(VerseRagError::Config(
                "retrieval.min_query_words must be at least 1".to_string(),
            ));
        }
        if self.max_query_length == 0 {
            return Err(VerseRagError::Config(
                "retrieval.max_query_length must be at least 1".to_string(),
            ));
        }
        if let Some(min_score) = self.min_score {
            if !(0.0..=1.0).contains(&min_score) {
                return Err(VerseRagError::Config(format!(
                    "retrieval.min_score must be within [0, 1], got {min_score}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Results below this score are hidden from HTTP responses
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:8000".to_string(),
        "http://127.0.0.1:8000".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_relevance_threshold() -> f32 {
    0.5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            relevance_threshold: default_relevance_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            tracing::warn!("No config file found, using built-in defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.embeddings.dimension == 0 {
            return Err(VerseRagError::Config(
                "embeddings.dimension must be positive".to_string(),
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(VerseRagError::Config(
                "embeddings.batch_size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.server.relevance_threshold) {
            return Err(VerseRagError::Config(format!(
                "server.relevance_threshold must be within [0, 1], got {}",
                self.server.relevance_threshold
            )));
        }
        self.retrieval.validate()
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get reranker model name
    pub fn reranker_model(&self) -> &str {
        &self.reranker.model
    }
}
