//! Semantic verse retrieval.
//!
//! Verses are embedded once into a flat inner-product index ([`ingest`]).
//! Queries run a two-stage search: vector recall, then cross-encoder
//! reranking with section-bounded context windows ([`rag`]).

pub mod api;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod rag;
pub mod reranker;
pub mod testing;

pub use config::AppConfig;
pub use errors::*;
pub use models::CorpusUnit;
pub use models::SearchResult;
pub use rag::RetrievalEngine;
pub use rag::SearchParams;
