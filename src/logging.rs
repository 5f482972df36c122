//! Logging configuration for VerseRAG

use std::path::Path;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{
    self,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::Result;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "verserag.log";

/// Initialize logging with configuration
///
/// A non-empty `RUST_LOG` wins over `logging.level`.
pub fn init_logging_with_config(config: Option<&crate::config::AppConfig>) -> Result<()> {
    let level = config.map_or("info", |c| c.logging.level.as_str());
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(rust_log.as_deref(), level);

    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e);
        build_filter(level)
    });
    install(env_filter)?;

    tracing::info!(
        "Logging initialized with filter: {} - console and file output enabled",
        directives
    );
    Ok(())
}

/// Initialize logging with custom log level
pub fn init_logging_with_level(level: &str) -> Result<()> {
    install(build_filter(level))?;
    tracing::info!(
        "Logging initialized with level: {} - console and file output enabled",
        level
    );
    Ok(())
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::new(default_directives(level))
}

fn default_directives(level: &str) -> String {
    // ort and hyper are chatty at debug
    format!("{level},verserag={level},ort=warn,hyper=info")
}

fn filter_directives(rust_log: Option<&str>, level: &str) -> String {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => directives.to_string(),
        None => default_directives(level),
    }
}

fn install(env_filter: EnvFilter) -> Result<()> {
    let logs_dir = Path::new(LOG_DIR);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false); // No colors in file

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // The writer thread must outlive main
    std::mem::forget(guard);

    Ok(())
}

/// Initialize simple logging for testing
pub fn init_simple_logging() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_logging_is_reentrant() {
        assert!(init_simple_logging().is_ok());
        assert!(init_simple_logging().is_ok());
    }

    #[test]
    fn test_rust_log_overrides_configured_level() {
        assert_eq!(
            filter_directives(Some("verserag::rag=trace"), "info"),
            "verserag::rag=trace"
        );
        assert_eq!(
            filter_directives(None, "warn"),
            "warn,verserag=warn,ort=warn,hyper=info"
        );
        assert_eq!(
            filter_directives(Some("  "), "debug"),
            "debug,verserag=debug,ort=warn,hyper=info"
        );
    }
}
