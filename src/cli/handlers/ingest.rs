//! Index build handler

use std::path::PathBuf;

use tracing::info;

use crate::cli::output::*;
use crate::corpus::SqliteCorpus;
use crate::errors::VerseRagError;
use crate::index::artifacts::artifacts_exist;
use crate::ingest::IngestionPipeline;
use crate::AppConfig;
use crate::Result;

pub async fn handle_ingest_command(
    config: &AppConfig,
    database: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let database = database.unwrap_or_else(|| config.paths.database.clone());

    if artifacts_exist(&config.paths.index, &config.paths.mapping) && !force {
        print_warning(&format!(
            "Artifacts already exist at {} and {}",
            config.paths.index.display(),
            config.paths.mapping.display()
        ));
        return Err(VerseRagError::Ingestion(
            "refusing to overwrite existing artifacts without --force".to_string(),
        ));
    }

    print_info(&format!("Loading embedding model {}", config.embedding_model()));
    let encoder = load_encoder(config).await?;

    let pipeline = IngestionPipeline::from_config(config, encoder);
    let report = pipeline.run(&SqliteCorpus::new(&database)).await?;
    info!("Ingestion report: {}", serde_json::to_string(&report)?);

    print_ingest_report(&report);
    print_success("Index built");
    Ok(())
}

#[cfg(feature = "local-models")]
async fn load_encoder(config: &AppConfig) -> Result<crate::embeddings::TextEncoder> {
    use std::sync::Arc;

    use crate::embeddings::FastEmbedBackend;
    use crate::embeddings::TextEncoder;

    let model = config.embedding_model().to_string();
    let cache_dir = config.paths.model_cache.clone();
    let backend = tokio::task::spawn_blocking(move || FastEmbedBackend::load(&model, &cache_dir))
        .await
        .map_err(|e| VerseRagError::Ingestion(format!("model loading task failed: {e}")))??;

    Ok(TextEncoder::new(
        Arc::new(backend),
        config.embedding_dimension(),
        config.embeddings.batch_size,
    ))
}

#[cfg(not(feature = "local-models"))]
async fn load_encoder(_config: &AppConfig) -> Result<crate::embeddings::TextEncoder> {
    Err(VerseRagError::Config(
        "this binary was built without the local-models feature".to_string(),
    ))
}
