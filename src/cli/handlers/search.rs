//! One-shot query handler

use crate::cli::handlers::load_engine;
use crate::cli::output::*;
use crate::errors::VerseRagError;
use crate::rag::SearchParams;
use crate::AppConfig;
use crate::Result;

/// Apply CLI overrides to the configured parameters
pub fn params_with_overrides(
    defaults: SearchParams,
    top_k: Option<usize>,
    radius: Option<usize>,
) -> SearchParams {
    let mut params = defaults;
    if let Some(k) = top_k {
        params.top_k_results = k;
        params.top_k_candidates = params.top_k_candidates.max(k);
    }
    if let Some(r) = radius {
        params.context_radius = r;
    }
    params
}

pub async fn handle_search_command(
    config: &AppConfig,
    query: String,
    top_k: Option<usize>,
    radius: Option<usize>,
    json: bool,
) -> Result<()> {
    let engine = load_engine(config).await?;
    let params = params_with_overrides(engine.defaults(), top_k, radius);

    let text = query.clone();
    let results = tokio::task::spawn_blocking(move || engine.search_with(&text, &params))
        .await
        .map_err(|e| VerseRagError::Inference(format!("search task failed: {e}")))??;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_search_results(&query, &results);
    }
    Ok(())
}
