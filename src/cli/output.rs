//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `verserag` CLI

use crate::cli::handlers::BenchRecord;
use crate::ingest::IngestReport;
use crate::models::SearchResult;
use crate::rag::relevance_label;
use crate::rag::score_percent;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// # Arguments
/// * `s` - The string to truncate
/// * `max_chars` - Maximum number of characters (not bytes)
///
/// # Returns
/// Truncated string with "..." suffix if truncated, otherwise the original string
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Single-line rendering of verse text
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn print_search_results(query: &str, results: &[SearchResult]) {
    println!("🔍 {query}");
    if results.is_empty() {
        println!("No results.");
        return;
    }
    println!();
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} [{}% · {}]",
            rank + 1,
            result.unit.reference(),
            score_percent(result.score),
            relevance_label(result.score)
        );
        println!("   {}", one_line(&result.unit.text));
        for neighbor in &result.context {
            let label = if neighbor.verse.is_empty() {
                "·".to_string()
            } else {
                neighbor.verse.clone()
            };
            println!("     {label:>3} {}", truncate_str(&one_line(&neighbor.text), 100));
        }
        println!();
    }
}

pub fn print_ingest_report(report: &IngestReport) {
    println!("📚 Source: {}", report.source);
    println!("  Total units:    {}", report.total_units);
    println!("  Retained:       {}", report.retained_units);
    println!("  Dropped:        {}", report.dropped_units);
    println!("  Dimension:      {}", report.dimension);
    println!("  Build id:       {}", report.build_id);
    println!("  Index:          {}", report.index_path.display());
    println!("  Mapping:        {}", report.mapping_path.display());
    println!("  Elapsed:        {:.1}s", report.elapsed_ms as f64 / 1000.0);
}

pub fn print_bench_report(records: &[BenchRecord]) {
    println!("{:<20} {:>9} {:>7}  Top result", "Category", "Latency", "Score");
    println!("{}", "-".repeat(72));
    for record in records {
        match &record.error {
            Some(error) => println!("{:<20} {:>9} {:>7}  {}", record.category, "-", "-", error),
            None => println!(
                "{:<20} {:>7}ms {:>7.3}  {}",
                record.category,
                record.latency_ms,
                record.top_score.unwrap_or(0.0),
                truncate_str(record.top_reference.as_deref().unwrap_or("-"), 30)
            ),
        }
    }

    let timed: Vec<u64> = records
        .iter()
        .filter(|r| r.error.is_none())
        .map(|r| r.latency_ms)
        .collect();
    if !timed.is_empty() {
        let mean = timed.iter().sum::<u64>() as f64 / timed.len() as f64;
        println!("{}", "-".repeat(72));
        println!("Mean latency: {mean:.1}ms over {} queries", timed.len());
    }
}

pub fn print_config(config: &AppConfig) {
    println!("📋 verserag Configuration:");
    println!();

    println!("📁 Paths:");
    println!("  Database:    {}", config.paths.database.display());
    println!("  Index:       {}", config.paths.index.display());
    println!("  Mapping:     {}", config.paths.mapping.display());
    println!("  Model cache: {}", config.paths.model_cache.display());
    println!();

    println!("🧠 Models:");
    println!(
        "  Embeddings: {} (dim {}, batch {})",
        config.embeddings.model, config.embeddings.dimension, config.embeddings.batch_size
    );
    if !config.embeddings.query_prefix.is_empty() {
        println!("  Query prefix: {:?}", config.embeddings.query_prefix);
    }
    println!("  Reranker:   {}", config.reranker.model);
    println!();

    println!("📥 Ingestion:");
    println!("  Min text length: {}", config.ingestion.min_text_length);
    println!("  Min word count:  {}", config.ingestion.min_word_count);
    println!();

    println!("🔎 Retrieval:");
    println!("  Candidates: {}", config.retrieval.top_k_candidates);
    println!("  Results:    {}", config.retrieval.top_k_results);
    println!("  Context radius: {}", config.retrieval.context_radius);
    println!("  Min query words: {}", config.retrieval.min_query_words);
    println!("  Max query length: {}", config.retrieval.max_query_length);
    match config.retrieval.min_score {
        Some(min) => println!("  Min score: {min}"),
        None => println!("  Min score: none"),
    }
    println!();

    println!("🌐 Server:");
    println!("  Address: {}:{}", config.server.host, config.server.port);
    println!("  CORS origins: {}", config.server.cors_origins.join(", "));
    println!("  Relevance threshold: {}", config.server.relevance_threshold);
    println!();

    println!("📝 Logging: {}", config.logging.level);
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_str("Alléluia", 4), "Allé...");
        assert_eq!(truncate_str("court", 10), "court");
    }

    #[test]
    fn test_one_line_flattens_newlines() {
        assert_eq!(one_line("Dieu dit :\n« Que la lumière soit. »"), "Dieu dit : « Que la lumière soit. »");
    }
}
