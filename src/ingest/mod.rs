//! Offline index build: corpus rows -> {vector index, mapping}
//!
//! The run is all-or-nothing. Any failure (corpus read, encoding, write)
//! surfaces as [`VerseRagError::Ingestion`] and leaves previously persisted
//! artifacts untouched.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::corpus::CorpusSource;
use crate::embeddings::is_unit_norm;
use crate::embeddings::TextEncoder;
use crate::embeddings::UNIT_NORM_TOLERANCE;
use crate::errors::Result;
use crate::errors::VerseRagError;
use crate::index::save_artifacts;
use crate::index::FlatIndex;
use crate::models::CorpusUnit;

/// Minimum size a unit needs to be searchable.
///
/// Headings ("LUI", "Alléluia") and numeric lists fail one of the two rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFilter {
    pub min_text_length: usize,
    pub min_word_count: usize,
}

impl UnitFilter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_text_length: config.ingestion.min_text_length,
            min_word_count: config.ingestion.min_word_count,
        }
    }

    /// Both thresholds must hold
    pub fn accepts(&self, unit: &CorpusUnit) -> bool {
        unit.char_count() >= self.min_text_length && unit.word_count() >= self.min_word_count
    }

    /// Keep accepted units in their original order
    pub fn apply(&self, units: Vec<CorpusUnit>) -> Vec<CorpusUnit> {
        units.into_iter().filter(|u| self.accepts(u)).collect()
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub total_units: usize,
    pub retained_units: usize,
    pub dropped_units: usize,
    pub dimension: usize,
    pub build_id: String,
    pub index_path: PathBuf,
    pub mapping_path: PathBuf,
    pub elapsed_ms: u128,
    pub finished_at: DateTime<Utc>,
}

/// Check the storage-order invariants the context windows depend on.
///
/// Ids are unique, every section occupies one contiguous run, and ordinals
/// increase within a section.
pub fn validate_corpus(units: &[CorpusUnit]) -> Result<()> {
    let mut seen_ids = HashSet::with_capacity(units.len());
    let mut last_ordinal: HashMap<i64, u32> = HashMap::new();
    let mut current_section: Option<i64> = None;
    let mut closed_sections: HashSet<i64> = HashSet::new();

    for unit in units {
        if !seen_ids.insert(unit.id) {
            return Err(VerseRagError::Ingestion(format!(
                "duplicate unit id {}",
                unit.id
            )));
        }
        if current_section != Some(unit.section_id) {
            if let Some(previous) = current_section {
                closed_sections.insert(previous);
            }
            if closed_sections.contains(&unit.section_id) {
                return Err(VerseRagError::Ingestion(format!(
                    "section {} is not contiguous in storage order (unit {})",
                    unit.section_id, unit.id
                )));
            }
            current_section = Some(unit.section_id);
        }
        if let Some(previous) = last_ordinal.insert(unit.section_id, unit.ordinal) {
            if unit.ordinal <= previous {
                return Err(VerseRagError::Ingestion(format!(
                    "ordinal of unit {} ({}) does not increase within section {} (previous {})",
                    unit.id, unit.ordinal, unit.section_id, previous
                )));
            }
        }
    }
    Ok(())
}

/// Encode `units` and insert the vectors in the same order
pub fn build_index(encoder: &TextEncoder, units: &[CorpusUnit]) -> Result<FlatIndex> {
    let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
    let vectors = encoder.encode_batch(&texts)?;

    let mut index = FlatIndex::new(encoder.dimension());
    for (unit, vector) in units.iter().zip(&vectors) {
        if !is_unit_norm(vector, UNIT_NORM_TOLERANCE) {
            return Err(VerseRagError::Ingestion(format!(
                "encoder produced a non-normalized vector for unit {}",
                unit.id
            )));
        }
        index.add(vector)?;
    }
    Ok(index)
}

pub struct IngestionPipeline {
    encoder: TextEncoder,
    filter: UnitFilter,
    index_path: PathBuf,
    mapping_path: PathBuf,
}

impl IngestionPipeline {
    pub fn new(
        encoder: TextEncoder,
        filter: UnitFilter,
        index_path: impl Into<PathBuf>,
        mapping_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            encoder,
            filter,
            index_path: index_path.into(),
            mapping_path: mapping_path.into(),
        }
    }

    pub fn from_config(config: &AppConfig, encoder: TextEncoder) -> Self {
        Self::new(
            encoder,
            UnitFilter::from_config(config),
            config.paths.index.clone(),
            config.paths.mapping.clone(),
        )
    }

    /// Run the whole build; nothing is written unless every step succeeds
    pub async fn run<S: CorpusSource>(&self, source: &S) -> Result<IngestReport> {
        let started = Instant::now();
        let source_name = source.describe();

        let units = source
            .fetch_units()
            .await
            .map_err(|e| stage_error("reading corpus", e))?;
        let total_units = units.len();
        info!("Total units: {}", total_units);

        validate_corpus(&units)?;

        let retained = self.filter.apply(units);
        let dropped = total_units - retained.len();
        info!("After filtering: {} (dropped {})", retained.len(), dropped);
        if retained.is_empty() {
            return Err(VerseRagError::Ingestion(
                "no corpus unit passed the length filters".to_string(),
            ));
        }

        info!(
            "Encoding {} units with {}",
            retained.len(),
            self.encoder.model_name()
        );
        let encoder = self.encoder.clone();
        let (index, retained) = tokio::task::spawn_blocking(move || {
            build_index(&encoder, &retained).map(|index| (index, retained))
        })
        .await
        .map_err(|e| VerseRagError::Ingestion(format!("encoding task failed: {e}")))?
        .map_err(|e| stage_error("encoding corpus", e))?;
        info!("Index size: {}", index.len());

        let build_id = save_artifacts(&index, &retained, &self.index_path, &self.mapping_path)
            .map_err(|e| stage_error("writing artifacts", e))?;

        let report = IngestReport {
            source: source_name,
            total_units,
            retained_units: retained.len(),
            dropped_units: dropped,
            dimension: index.dimension(),
            build_id,
            index_path: self.index_path.clone(),
            mapping_path: self.mapping_path.clone(),
            elapsed_ms: started.elapsed().as_millis(),
            finished_at: Utc::now(),
        };
        info!(
            "Ingestion finished in {} ms: {} vectors",
            report.elapsed_ms, report.retained_units
        );
        Ok(report)
    }
}

fn stage_error(stage: &str, err: VerseRagError) -> VerseRagError {
    match err {
        VerseRagError::Ingestion(_) => err,
        other => {
            warn!("Ingestion aborted while {}: {}", stage, other);
            VerseRagError::Ingestion(format!("{stage}: {other}"))
        }
    }
}
