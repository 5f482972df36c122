//! CLI command handlers module
//!
//! One file per command group:
//! - ingest: index build
//! - search: one-shot queries
//! - bench: query set timing
//! - serve: API server
//! - info: configuration display

pub mod bench;
pub mod info;
pub mod ingest;
pub mod search;
pub mod serve;

pub use bench::*;
pub use info::*;
pub use ingest::*;
pub use search::*;
pub use serve::*;

use crate::errors::VerseRagError;
use crate::rag::RetrievalEngine;
use crate::AppConfig;
use crate::Result;

/// Load index and models on the blocking pool
#[cfg(feature = "local-models")]
pub async fn load_engine(config: &AppConfig) -> Result<RetrievalEngine> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || RetrievalEngine::load(&config))
        .await
        .map_err(|e| VerseRagError::Inference(format!("model loading task failed: {e}")))?
}

#[cfg(not(feature = "local-models"))]
pub async fn load_engine(_config: &AppConfig) -> Result<RetrievalEngine> {
    Err(VerseRagError::Config(
        "this binary was built without the local-models feature".to_string(),
    ))
}
