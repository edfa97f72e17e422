//! Error types for every layer of the store.
//!
//! Backend-specific errors never leave the crate through the facade: the
//! [`RetrievalStore`](crate::store::RetrievalStore) either absorbs them by
//! downgrading to a weaker tier or reports a generic [`StoreError`].

use thiserror::Error;

use crate::types::TierKind;

/// Errors raised while turning text into a vector.
#[derive(Debug, Error)]
pub enum EmbedError {
  /// The embedder was never constructed or has been disabled after a failure.
  #[error("embedder is unavailable")]
  Unavailable,
  /// The provider returned a vector of the wrong length.
  #[error("expected embedding dimension {expected}, found {found}")]
  DimensionMismatch { expected: usize, found: usize },
  /// The provider reported a failure of its own.
  #[error("embedding provider failed: {0}")]
  Provider(String),
  /// Transport failure talking to a remote provider.
  #[cfg(feature = "remote")]
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

/// Errors raised by a managed index client.
#[derive(Debug, Error)]
pub enum ManagedError {
  /// The named index could not be found or created.
  #[error("managed index '{0}' is unavailable")]
  IndexUnavailable(String),
  /// The index exists but was created with another dimension.
  #[error("managed index has dimension {found}, expected {expected}")]
  DimensionMismatch { expected: usize, found: usize },
  /// The service answered with a non-success status.
  #[error("managed index returned status {status}: {body}")]
  Status { status: u16, body: String },
  /// Any other failure reported by a client implementation.
  #[error("managed index call failed: {0}")]
  Backend(String),
  /// Transport failure.
  #[cfg(feature = "remote")]
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

/// Errors raised while reading or writing snapshot files.
#[derive(Debug, Error)]
pub enum PersistenceError {
  /// Filesystem interaction failed.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  /// JSON encoding or decoding of an item table failed.
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
  /// Binary encoding or decoding of the vector index failed.
  #[error("bincode error: {0}")]
  Bincode(#[from] bincode::Error),
  /// The index file does not end with a checksum footer.
  #[error("index snapshot has no checksum footer")]
  MissingChecksum,
  /// The index file checksum does not match its payload.
  #[error("index snapshot checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
  ChecksumMismatch { stored: u32, computed: u32 },
  /// Only one of the two local snapshot files exists.
  #[error("local snapshot is incomplete: missing {0}")]
  IncompleteSnapshot(&'static str),
  /// The index and the item table disagree on the number of entries.
  #[error("index holds {vectors} vectors but the item table holds {items} items")]
  InconsistentPayload { vectors: usize, items: usize },
}

/// Errors raised by a backend tier.
///
/// The degradation controller treats every variant as a failure of the
/// tier that produced it.
#[derive(Debug, Error)]
pub enum TierError {
  #[error(transparent)]
  Embed(#[from] EmbedError),
  #[error(transparent)]
  Managed(#[from] ManagedError),
  #[error(transparent)]
  Persistence(#[from] PersistenceError),
  /// A vector did not match the dimension of the index.
  #[error("expected vector dimension {expected}, found {found}")]
  DimensionMismatch { expected: usize, found: usize },
}

/// The only error type visible to callers of the store.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The weakest available tier failed and there is nothing left to fall back to.
  #[error("{tier} tier failed: {message}")]
  BackendFailed { tier: TierKind, message: String },
  /// The supplied configuration cannot be used.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(&'static str),
}

impl StoreError {
  pub(crate) fn backend(tier: TierKind, err: &TierError) -> Self {
    StoreError::BackendFailed {
      tier,
      message: err.to_string(),
    }
  }
}
