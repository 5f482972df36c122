//! Exact inner-product vector index and its persisted artifacts
//!
//! The slot of a vector (its 0-based insertion position) is the join key
//! into the mapping. Vectors are expected to be unit length, which makes
//! the inner product a cosine similarity.

pub mod artifacts;
pub mod mapping;

use std::io::Read;
use std::io::Write;

pub use artifacts::load_artifacts;
pub use artifacts::save_artifacts;
pub use artifacts::LoadedArtifacts;
pub use mapping::MappingFile;

use crate::errors::Result;
use crate::errors::VerseRagError;

const MAGIC: &[u8; 4] = b"VRIX";
const FORMAT_VERSION: u16 = 1;

/// Nearest-neighbor hit: index slot and inner product
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub slot: usize,
    pub similarity: f32,
}

/// Flat (brute-force) inner-product index.
///
/// Vectors live in one row-major buffer. Search is exact and linear in the
/// number of stored vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector; its slot is the previous `len()`
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(VerseRagError::Artifact(format!(
                "vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VerseRagError::Artifact(
                "vector contains non-finite values".to_string(),
            ));
        }
        let slot = self.len();
        self.data.extend_from_slice(vector);
        Ok(slot)
    }

    pub fn vector(&self, slot: usize) -> Option<&[f32]> {
        let start = slot.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.max(1))
    }

    /// The `k` stored vectors with the largest inner product with `query`.
    ///
    /// Ordered by similarity descending; equal similarities keep insertion
    /// order (lower slot first).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(VerseRagError::Inference(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = self
            .iter()
            .enumerate()
            .map(|(slot, stored)| Neighbor {
                slot,
                similarity: dot(stored, query),
            })
            .collect();

        let by_rank = |a: &Neighbor, b: &Neighbor| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.slot.cmp(&b.slot))
        };
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, by_rank);
            hits.truncate(k);
        }
        hits.sort_unstable_by(by_rank);
        Ok(hits)
    }

    /// Serialize with `fingerprint` embedded in the header
    pub fn write_to<W: Write>(&self, writer: &mut W, fingerprint: &[u8; 32]) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(self.dimension as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        writer.write_all(fingerprint)?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Deserialize, returning the index and its header fingerprint
    pub fn read_from<R: Read>(reader: &mut R) -> Result<(Self, [u8; 32])> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(VerseRagError::Artifact(
                "index file has an unknown format".to_string(),
            ));
        }

        let mut u16_buf = [0u8; 2];
        reader.read_exact(&mut u16_buf)?;
        let version = u16::from_le_bytes(u16_buf);
        if version != FORMAT_VERSION {
            return Err(VerseRagError::Artifact(format!(
                "unsupported index format version {version}"
            )));
        }

        let mut u32_buf = [0u8; 4];
        reader.read_exact(&mut u32_buf)?;
        let dimension = u32::from_le_bytes(u32_buf) as usize;
        let mut u64_buf = [0u8; 8];
        reader.read_exact(&mut u64_buf)?;
        let count = u64::from_le_bytes(u64_buf) as usize;
        let mut fingerprint = [0u8; 32];
        reader.read_exact(&mut fingerprint)?;

        if dimension == 0 {
            return Err(VerseRagError::Artifact("index dimension is zero".to_string()));
        }
        let values = count.checked_mul(dimension).ok_or_else(|| {
            VerseRagError::Artifact("index header overflows".to_string())
        })?;
        let byte_len = values.checked_mul(4).ok_or_else(|| {
            VerseRagError::Artifact("index header overflows".to_string())
        })?;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.len() != byte_len {
            return Err(VerseRagError::Artifact(format!(
                "index body has {} bytes, header promises {byte_len}",
                bytes.len()
            )));
        }

        let mut data = Vec::with_capacity(values);
        for chunk in bytes.chunks_exact(4) {
            let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if !value.is_finite() {
                return Err(VerseRagError::Artifact(
                    "index contains non-finite values".to_string(),
                ));
            }
            data.push(value);
        }

        Ok((Self { dimension, data }, fingerprint))
    }

    /// Raw little-endian bytes of all vectors, in slot order
    pub(crate) fn vector_bytes(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data.iter().map(|v| v.to_le_bytes())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
