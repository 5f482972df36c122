//! Query-time retrieval
//!
//! A query is sanitized, encoded and matched against every indexed verse by
//! inner product (stage 1). The best candidates are rescored by a
//! cross-encoder and squashed into [0, 1] with a sigmoid (stage 2). Each
//! survivor is returned with its neighbors from the same book.
//!
//! # Examples
//!
#![cfg_attr(feature = "local-models", doc = "```rust,no_run")]
#![cfg_attr(not(feature = "local-models"), doc = "```rust,ignore")]
//! use verserag::config::AppConfig;
//! use verserag::rag::RetrievalEngine;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let engine = RetrievalEngine::load(&config)?;
//!
//!     for hit in engine.search("Que la lumière soit et la lumière fut")? {
//!         println!("{:.2} {}", hit.score, hit.unit.reference());
//!     }
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod engine;
pub mod labels;
pub mod slot;

pub use context::CorpusArena;
pub use engine::RetrievalEngine;
pub use engine::SearchParams;
pub use labels::relevance_label;
pub use labels::score_percent;
pub use slot::EngineSlot;
