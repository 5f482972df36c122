//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "verserag")]
#[command(about = "Semantic verse search: vector recall plus cross-encoder reranking")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the vector index and mapping from the verse database
    Ingest {
        /// SQLite database (overrides paths.database)
        #[arg(long)]
        database: Option<PathBuf>,
        /// Overwrite existing artifacts
        #[arg(short, long)]
        force: bool,
    },
    /// Run one query against the index
    Search {
        /// Free-text query
        query: String,
        /// Results to show (overrides retrieval.top_k_results)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Context verses on each side (overrides retrieval.context_radius)
        #[arg(short, long)]
        radius: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Host to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Time a set of queries and report their top scores
    Bench {
        /// JSON file with `[{"category": ..., "text": ...}]` (default: built-in set)
        #[arg(short, long)]
        queries: Option<PathBuf>,
    },
    /// Show current configuration
    Config,
}
