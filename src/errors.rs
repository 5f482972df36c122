use thiserror::Error;

/// Caller-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller; never retried, never a system fault
    Validation,
    /// Index/mapping or models not loaded yet
    NotReady,
    /// Model runtime failure; detail stays server-side
    Inference,
    /// Offline index build failure
    Ingestion,
    /// Invalid configuration
    Config,
    /// Everything else (I/O, corrupt artifacts, database)
    Internal,
}

#[derive(Error, Debug)]
pub enum VerseRagError {
    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Search index not ready: {0}")]
    NotReady(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid index artifacts: {0}")]
    Artifact(String),

    #[error("Search engine failed to load: {0}")]
    LoadFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerseRagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotReady(_) => ErrorKind::NotReady,
            Self::Inference(_) => ErrorKind::Inference,
            Self::Ingestion(_) => ErrorKind::Ingestion,
            Self::Config(_) | Self::TomlParsing(_) => ErrorKind::Config,
            Self::Artifact(_)
            | Self::LoadFailed(_)
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to hand to an end user.
    ///
    /// Validation and readiness messages are passed through; anything that
    /// could carry runtime internals collapses to a generic text.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotReady(_) => "The search index is still loading, please retry shortly".to_string(),
            Self::Config(_) | Self::TomlParsing(_) => "Search is misconfigured".to_string(),
            _ => "Search failed, please try again later".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VerseRagError>;
