//! Ordinal-aligned metadata file (`mapping.json`)

use serde::Deserialize;
use serde::Serialize;

use crate::models::CorpusUnit;

/// `entries[i]` describes the vector at index slot `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingFile {
    /// Hex fingerprint shared with the index header of the same build
    pub build_id: String,
    pub dimension: usize,
    pub entries: Vec<CorpusUnit>,
}

impl MappingFile {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
