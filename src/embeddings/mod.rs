//! Provides abstractions for generating embeddings from text.
//!
//! This module defines the [`TextEmbedder`] trait, the common interface for
//! embedding providers, and the [`Embedder`] adapter that the store uses on
//! top of it. The adapter pins the vector length to the configured dimension
//! and switches itself off for the rest of the process after the first
//! failure, so a broken provider is never called twice.

mod hashing;
#[cfg(feature = "remote")]
mod http;

pub use hashing::HashingEmbedder;
#[cfg(feature = "remote")]
pub use http::HttpEmbedder;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::error::EmbedError;

/// A trait for providers that can generate embeddings from text.
///
/// The `Send` and `Sync` bounds are required because the store calls the
/// embedder from concurrent searches.
pub trait TextEmbedder: Send + Sync {
  /// Generates an embedding vector for a given string slice.
  ///
  /// # Arguments
  ///
  /// * `text` - The text to be embedded.
  ///
  /// # Returns
  ///
  /// A `Result` containing the embedding as a `Vec<f32>` on success, or an
  /// [`EmbedError`] on failure.
  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

  /// Generates embeddings for a batch of string slices.
  ///
  /// This method provides a default implementation that iterates through the
  /// texts and calls `embed` for each one. Implementors can override this
  /// to provide a more efficient, batch-oriented implementation if their
  /// underlying model supports it.
  fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
    texts.iter().map(|t| self.embed(t)).collect()
  }
}

/// The store-side wrapper around an optional [`TextEmbedder`].
///
/// An `Embedder` is either backed by a provider or permanently unavailable.
/// Once a provider call fails, or returns a vector of the wrong length, the
/// adapter disables itself: every later call returns
/// [`EmbedError::Unavailable`] without touching the provider again.
pub struct Embedder {
  inner: Option<Box<dyn TextEmbedder>>,
  dimension: usize,
  disabled: AtomicBool,
}

impl Embedder {
  /// Wraps a provider producing vectors of length `dimension`.
  pub fn new(inner: Box<dyn TextEmbedder>, dimension: usize) -> Self {
    Self {
      inner: Some(inner),
      dimension,
      disabled: AtomicBool::new(false),
    }
  }

  /// An embedder that is unavailable from the start.
  pub fn unavailable(dimension: usize) -> Self {
    Self {
      inner: None,
      dimension,
      disabled: AtomicBool::new(true),
    }
  }

  /// The vector length every successful call returns.
  pub fn dimension(&self) -> usize {
    self.dimension
  }

  /// Whether the next call may reach the provider.
  pub fn is_available(&self) -> bool {
    self.inner.is_some() && !self.disabled.load(Ordering::Acquire)
  }

  /// Embeds `text`, disabling the adapter on the first failure.
  pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
    let inner = match &self.inner {
      Some(inner) if self.is_available() => inner,
      _ => return Err(EmbedError::Unavailable),
    };
    let result = inner.embed(text).and_then(|vector| {
      if vector.len() == self.dimension {
        Ok(vector)
      } else {
        Err(EmbedError::DimensionMismatch {
          expected: self.dimension,
          found: vector.len(),
        })
      }
    });
    if let Err(err) = &result {
      self.disable(err);
    }
    result
  }

  fn disable(&self, reason: &EmbedError) {
    if !self.disabled.swap(true, Ordering::AcqRel) {
      warn!(error = %reason, "embedder failed; disabling it for the rest of the process");
    }
  }
}

impl std::fmt::Debug for Embedder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Embedder")
      .field("dimension", &self.dimension)
      .field("available", &self.is_available())
      .finish()
  }
}
