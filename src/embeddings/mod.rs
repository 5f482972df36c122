//! Text encoding into unit-length embedding vectors
//!
//! [`TextEncoder`] is the only producer of vectors in the crate. It wraps an
//! [`EmbeddingBackend`] (the raw model) and enforces the contract every
//! consumer relies on:
//! - output dimension is fixed and checked
//! - every vector is L2-normalized
//! - batches are order-preserving (`output[i]` belongs to `input[i]`)
//! - empty text is rejected with a validation error, never encoded
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use verserag::embeddings::TextEncoder;
//! use verserag::testing::HashEncoder;
//!
//! let encoder = TextEncoder::new(Arc::new(HashEncoder::new(16)), 16, 8);
//! let vector = encoder.encode("In the beginning was the Word").unwrap();
//! assert_eq!(vector.len(), 16);
//! ```

#[cfg(feature = "local-models")]
pub mod local;
pub mod text_preprocessing;

use std::sync::Arc;

use tracing::debug;
use tracing::info;

#[cfg(feature = "local-models")]
pub use local::FastEmbedBackend;
pub use text_preprocessing::clean_for_model;
pub use text_preprocessing::sanitize_query;

use crate::errors::Result;
use crate::errors::VerseRagError;

/// Tolerance used when checking freshly produced vectors
pub const UNIT_NORM_TOLERANCE: f32 = 1e-5;

/// Raw sentence-embedding model.
///
/// Implementations may return unnormalized vectors; [`TextEncoder`] fixes
/// that. Implementations that are not reentrant must serialize internally.
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch, one vector per input, same order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier for logs
    fn name(&self) -> &str;
}

/// Shared, cheaply clonable encoder handle
#[derive(Clone)]
pub struct TextEncoder {
    backend: Arc<dyn EmbeddingBackend>,
    dimension: usize,
    batch_size: usize,
}

impl TextEncoder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, dimension: usize, batch_size: usize) -> Self {
        Self {
            backend,
            dimension,
            batch_size: batch_size.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        self.backend.name()
    }

    /// Encode a single text
    pub fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.encode_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| VerseRagError::Inference("encoder returned no vector".to_string()))
    }

    /// Encode many texts in fixed-size batches
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(VerseRagError::Validation(format!(
                "cannot encode empty text (input #{pos})"
            )));
        }

        let total_batches = texts.len().div_ceil(self.batch_size);
        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_idx, batch) in texts.chunks(self.batch_size).enumerate() {
            let cleaned: Vec<String> = batch.iter().map(|t| clean_for_model(t)).collect();
            let embedded = self.backend.embed(&cleaned)?;
            if embedded.len() != cleaned.len() {
                return Err(VerseRagError::Inference(format!(
                    "encoder returned {} vectors for {} inputs",
                    embedded.len(),
                    cleaned.len()
                )));
            }
            for mut vector in embedded {
                if vector.len() != self.dimension {
                    return Err(VerseRagError::Inference(format!(
                        "encoder returned dimension {}, expected {}",
                        vector.len(),
                        self.dimension
                    )));
                }
                l2_normalize(&mut vector)?;
                vectors.push(vector);
            }

            if total_batches > 1 && (batch_idx + 1) % 50 == 0 {
                info!(
                    "Encoded {}/{} batches ({} texts)",
                    batch_idx + 1,
                    total_batches,
                    vectors.len()
                );
            }
        }

        debug!(
            model = self.backend.name(),
            count = vectors.len(),
            "encoded texts"
        );
        Ok(vectors)
    }
}

/// Euclidean norm
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place.
///
/// A zero or non-finite vector has no direction; it is reported as an
/// inference failure instead of being stored.
pub fn l2_normalize(vector: &mut [f32]) -> Result<()> {
    let norm = l2_norm(vector);
    if !norm.is_finite() || norm <= f32::EPSILON {
        return Err(VerseRagError::Inference(format!(
            "degenerate embedding (norm = {norm})"
        )));
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    Ok(())
}

pub fn is_unit_norm(vector: &[f32], tolerance: f32) -> bool {
    (l2_norm(vector) - 1.0).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEncoder;

    struct FixedBackend(Vec<Vec<f32>>);

    impl EmbeddingBackend for FixedBackend {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(self.0.iter().take(texts.len()).cloned().collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_outputs_are_unit_norm() {
        let encoder = TextEncoder::new(Arc::new(FixedBackend(vec![vec![3.0, 4.0]])), 2, 4);
        let vector = encoder.encode("some text").unwrap();
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
        assert!(is_unit_norm(&vector, UNIT_NORM_TOLERANCE));
    }

    #[test]
    fn test_empty_text_rejected() {
        let encoder = TextEncoder::new(Arc::new(HashEncoder::new(8)), 8, 4);
        let err = encoder.encode("   ").unwrap_err();
        assert!(matches!(err, VerseRagError::Validation(_)));
    }

    #[test]
    fn test_zero_vector_is_inference_error() {
        let encoder = TextEncoder::new(Arc::new(FixedBackend(vec![vec![0.0, 0.0]])), 2, 4);
        assert!(matches!(
            encoder.encode("text"),
            Err(VerseRagError::Inference(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_inference_error() {
        let encoder = TextEncoder::new(Arc::new(FixedBackend(vec![vec![1.0, 0.0, 0.0]])), 2, 4);
        assert!(matches!(
            encoder.encode("text"),
            Err(VerseRagError::Inference(_))
        ));
    }

    #[test]
    fn test_batches_preserve_order_and_match_single_calls() {
        let encoder = TextEncoder::new(Arc::new(HashEncoder::new(32)), 32, 3);
        let texts: Vec<String> = (0..10).map(|i| format!("verse number {i} text")).collect();
        let batch = encoder.encode_batch(&texts).unwrap();
        assert_eq!(batch.len(), texts.len());
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&encoder.encode(text).unwrap(), vector);
        }
    }

    #[test]
    fn test_newlines_do_not_change_encoding() {
        let encoder = TextEncoder::new(Arc::new(HashEncoder::new(32)), 32, 3);
        assert_eq!(
            encoder.encode("Dieu dit\nque la lumière soit").unwrap(),
            encoder.encode("Dieu dit que la lumière soit").unwrap()
        );
    }
}
