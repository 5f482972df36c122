//! Query-set benchmark

use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use crate::cli::handlers::load_engine;
use crate::cli::output::*;
use crate::errors::VerseRagError;
use crate::rag::RetrievalEngine;
use crate::AppConfig;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchQuery {
    pub category: String,
    pub text: String,
}

/// Outcome of one benchmark query
#[derive(Debug, Clone, Serialize)]
pub struct BenchRecord {
    pub category: String,
    pub query: String,
    pub latency_ms: u64,
    pub results: usize,
    pub top_score: Option<f32>,
    pub top_reference: Option<String>,
    pub error: Option<String>,
}

/// Built-in French queries, one per category
pub fn default_queries() -> Vec<BenchQuery> {
    [
        ("basic_topic", "Que dit la Bible sur l'amour de Dieu"),
        (
            "complex_theology",
            "Comment la grace divine opere-t-elle dans la redemption des pecheurs",
        ),
        (
            "proper_noun",
            "Quelles sont les paroles de Moise devant le buisson ardent",
        ),
        (
            "poetic_language",
            "Les images poetiques de la nature dans les Psaumes de louange",
        ),
        (
            "cross_testament",
            "La promesse d'un messie dans les propheties et son accomplissement",
        ),
        (
            "moral_teaching",
            "Comment la Bible enseigne-t-elle le pardon envers ses ennemis",
        ),
        ("narrative_event", "Le recit de la multiplication des pains par Jesus"),
        (
            "wisdom_literature",
            "La sagesse et la crainte de Dieu dans les Proverbes de Salomon",
        ),
        (
            "eschatology",
            "Les signes de la fin des temps dans l'Apocalypse de Jean",
        ),
        (
            "daily_life",
            "Que dit la Bible sur le travail et la perseverance quotidienne",
        ),
    ]
    .into_iter()
    .map(|(category, text)| BenchQuery {
        category: category.to_string(),
        text: text.to_string(),
    })
    .collect()
}

pub fn load_queries(path: &Path) -> Result<Vec<BenchQuery>> {
    let content = std::fs::read_to_string(path)?;
    let queries: Vec<BenchQuery> = serde_json::from_str(&content)?;
    if queries.is_empty() {
        return Err(VerseRagError::Config(format!(
            "no queries in {}",
            path.display()
        )));
    }
    Ok(queries)
}

/// Run every query once, sequentially; failures are recorded, not raised
pub fn run_benchmark(engine: &RetrievalEngine, queries: &[BenchQuery]) -> Vec<BenchRecord> {
    queries
        .iter()
        .map(|query| {
            let started = Instant::now();
            let outcome = engine.search(&query.text);
            let latency_ms = started.elapsed().as_millis() as u64;

            let mut record = BenchRecord {
                category: query.category.clone(),
                query: query.text.clone(),
                latency_ms,
                results: 0,
                top_score: None,
                top_reference: None,
                error: None,
            };
            match outcome {
                Ok(results) => {
                    record.results = results.len();
                    if let Some(top) = results.first() {
                        record.top_score = Some(top.score);
                        record.top_reference = Some(top.unit.reference());
                    }
                }
                Err(e) => record.error = Some(e.public_message()),
            }
            record
        })
        .collect()
}

pub async fn handle_bench_command(config: &AppConfig, queries: Option<PathBuf>) -> Result<()> {
    let queries = match queries {
        Some(path) => load_queries(&path)?,
        None => default_queries(),
    };

    let load_started = Instant::now();
    let engine = load_engine(config).await?;
    print_info(&format!(
        "Engine loaded in {:.1}s ({} verses)",
        load_started.elapsed().as_secs_f64(),
        engine.len()
    ));

    let records = tokio::task::spawn_blocking(move || run_benchmark(&engine, &queries))
        .await
        .map_err(|e| VerseRagError::Inference(format!("benchmark task failed: {e}")))?;

    print_bench_report(&records);
    Ok(())
}
