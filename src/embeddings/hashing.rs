//! A deterministic, model-free text embedder.

use crate::error::EmbedError;
use crate::tokenizer::term_frequencies;

use super::TextEmbedder;

/// A bag-of-words embedder based on feature hashing.
///
/// This embedder does not use a real AI model. Each token is hashed into one
/// of `dimension` buckets with a pseudo-random sign, term counts are
/// accumulated and the result is L2-normalised. Texts sharing words land
/// close together, which is enough for offline use and for tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
  /// The dimensionality of the vectors to be generated.
  dimension: usize,
}

impl HashingEmbedder {
  /// Creates a new `HashingEmbedder` with a specified vector dimension.
  pub fn new(dimension: usize) -> Self {
    Self { dimension }
  }
}

impl Default for HashingEmbedder {
  /// Creates a `HashingEmbedder` with a default dimension of 384.
  fn default() -> Self {
    Self::new(384)
  }
}

impl TextEmbedder for HashingEmbedder {
  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
    if self.dimension == 0 {
      return Err(EmbedError::Provider(
        "hashing embedder needs a non-zero dimension".into(),
      ));
    }

    let mut vector = vec![0.0f32; self.dimension];
    for (term, count) in term_frequencies(text) {
      let hash = term_hash(&term);
      let bucket = (hash % self.dimension as u64) as usize;
      let sign = if (hash >> 47) & 1 == 0 { 1.0 } else { -1.0 };
      vector[bucket] += sign * count as f32;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
      vector.iter_mut().for_each(|v| *v /= norm);
    }
    Ok(vector)
  }
}

fn term_hash(term: &str) -> u64 {
  let hash = term
    .bytes()
    .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
  // One LCG step spreads short-token hashes over the high bits.
  hash.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)
}
