use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing::info;
use verserag::cli::handle_bench_command;
use verserag::cli::handle_config_command;
use verserag::cli::handle_ingest_command;
use verserag::cli::handle_search_command;
use verserag::cli::handle_serve_api;
use verserag::cli::print_error;
use verserag::cli::Cli;
use verserag::cli::Commands;
use verserag::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };

    // Initialize logging
    if cli.verbose {
        verserag::logging::init_logging_with_level("debug")?;
    } else {
        verserag::logging::init_logging_with_config(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    // Execute the requested command
    let outcome = match cli.command {
        Commands::Ingest { database, force } => {
            handle_ingest_command(&config, database, force).await
        }
        Commands::Search {
            query,
            top_k,
            radius,
            json,
        } => handle_search_command(&config, query, top_k, radius, json).await,
        Commands::Serve { host, port } => handle_serve_api(&config, host, port).await,
        Commands::Bench { queries } => handle_bench_command(&config, queries).await,
        Commands::Config => handle_config_command(&config),
    };

    if let Err(e) = &outcome {
        error!("Command failed: {}", e);
        print_error(&e.to_string());
    }
    outcome.map_err(anyhow::Error::from)
}
