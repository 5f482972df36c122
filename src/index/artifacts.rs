//! Paired persistence of the vector index and the mapping
//!
//! Both files carry the same build fingerprint (SHA-256 over the mapping
//! entries and the raw vector bytes). They are written through temporary
//! files in the destination directory and renamed into place, mapping
//! first, index last. The loader only accepts a pair whose fingerprints,
//! lengths and dimensions agree, so a half-replaced pair is rejected
//! instead of silently misaligning slots and verses.

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use sha2::Digest;
use sha2::Sha256;
use tempfile::NamedTempFile;
use tracing::info;

use super::FlatIndex;
use super::MappingFile;
use crate::embeddings::is_unit_norm;
use crate::errors::Result;
use crate::errors::VerseRagError;
use crate::models::CorpusUnit;

/// Stored f32 vectors are re-checked with a looser bound than at creation
pub const LOAD_NORM_TOLERANCE: f32 = 1e-3;

/// Index and mapping of one ingestion run, verified to belong together
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub index: FlatIndex,
    pub entries: Vec<CorpusUnit>,
    pub build_id: String,
}

/// Deterministic fingerprint of a build
pub fn fingerprint(index: &FlatIndex, entries: &[CorpusUnit]) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update((index.dimension() as u64).to_le_bytes());
    hasher.update((entries.len() as u64).to_le_bytes());
    hasher.update(serde_json::to_vec(entries)?);
    for bytes in index.vector_bytes() {
        hasher.update(bytes);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

/// Write both artifacts; returns the build id
pub fn save_artifacts(
    index: &FlatIndex,
    entries: &[CorpusUnit],
    index_path: &Path,
    mapping_path: &Path,
) -> Result<String> {
    if index.len() != entries.len() {
        return Err(VerseRagError::Artifact(format!(
            "index has {} vectors but mapping has {} entries",
            index.len(),
            entries.len()
        )));
    }

    let digest = fingerprint(index, entries)?;
    let build_id = hex::encode(digest);
    let mapping = MappingFile {
        build_id: build_id.clone(),
        dimension: index.dimension(),
        entries: entries.to_vec(),
    };

    let mapping_tmp = write_temp(mapping_path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, &mapping)?;
        Ok(())
    })?;
    let index_tmp = write_temp(index_path, |writer| index.write_to(writer, &digest))?;

    // Both bodies are on disk before either name changes
    mapping_tmp.persist(mapping_path).map_err(|e| e.error)?;
    index_tmp.persist(index_path).map_err(|e| e.error)?;

    info!(
        "Saved {} vectors to {} and mapping to {} (build {})",
        index.len(),
        index_path.display(),
        mapping_path.display(),
        short_id(&build_id)
    );
    Ok(build_id)
}

fn write_temp<F>(destination: &Path, write_body: F) -> Result<NamedTempFile>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<()>,
{
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write_body(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Read and cross-check both artifacts
pub fn load_artifacts(index_path: &Path, mapping_path: &Path) -> Result<LoadedArtifacts> {
    let mut index_reader = BufReader::new(File::open(index_path)?);
    let (index, header_fingerprint) = FlatIndex::read_from(&mut index_reader)?;

    let mapping: MappingFile = serde_json::from_reader(BufReader::new(File::open(mapping_path)?))?;

    let header_id = hex::encode(header_fingerprint);
    if mapping.build_id != header_id {
        return Err(VerseRagError::Artifact(format!(
            "index build {} does not match mapping build {}",
            short_id(&header_id),
            short_id(&mapping.build_id)
        )));
    }
    if mapping.len() != index.len() {
        return Err(VerseRagError::Artifact(format!(
            "index has {} vectors but mapping has {} entries",
            index.len(),
            mapping.len()
        )));
    }
    if mapping.dimension != index.dimension() {
        return Err(VerseRagError::Artifact(format!(
            "index dimension {} does not match mapping dimension {}",
            index.dimension(),
            mapping.dimension
        )));
    }
    if fingerprint(&index, &mapping.entries)? != header_fingerprint {
        return Err(VerseRagError::Artifact(
            "artifact contents do not match their fingerprint".to_string(),
        ));
    }
    if let Some(slot) = index
        .iter()
        .position(|v| !is_unit_norm(v, LOAD_NORM_TOLERANCE))
    {
        return Err(VerseRagError::Artifact(format!(
            "vector at slot {slot} is not unit length"
        )));
    }

    info!(
        "Loaded {} vectors (dimension {}) from build {}",
        index.len(),
        index.dimension(),
        short_id(&header_id)
    );
    Ok(LoadedArtifacts {
        index,
        entries: mapping.entries,
        build_id: header_id,
    })
}

/// Both artifact files are present
pub fn artifacts_exist(index_path: &Path, mapping_path: &Path) -> bool {
    index_path.exists() && mapping_path.exists()
}

/// Leading characters of a build id, for logs
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
