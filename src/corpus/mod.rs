//! Read-only corpus sources feeding the ingestion pipeline

pub mod sqlite;

pub use sqlite::SqliteCorpus;

use crate::errors::Result;
use crate::models::CorpusUnit;

/// A queryable store of corpus units.
///
/// Units must come back in storage order: grouped by section, ordinals
/// strictly increasing inside each section. Sources never write.
#[allow(async_fn_in_trait)]
pub trait CorpusSource {
    async fn fetch_units(&self) -> Result<Vec<CorpusUnit>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Fixed, in-memory corpus
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    units: Vec<CorpusUnit>,
}

impl MemoryCorpus {
    pub fn new(units: Vec<CorpusUnit>) -> Self {
        Self { units }
    }
}

impl CorpusSource for MemoryCorpus {
    async fn fetch_units(&self) -> Result<Vec<CorpusUnit>> {
        Ok(self.units.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory corpus ({} units)", self.units.len())
    }
}
