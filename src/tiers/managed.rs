//! Managed vector index tier.

use std::collections::HashSet;

use crate::embeddings::Embedder;
use crate::error::{ManagedError, TierError};
use crate::types::{EntityId, Item, Metadata, SearchHit};

/// A match returned by a managed index query.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedMatch {
  pub id: EntityId,
  pub score: f32,
  pub metadata: Metadata,
}

/// A client for a remote vector index service.
///
/// Implementations own their connection and are expected to be already
/// attached to an index of the configured dimension when handed to the
/// store.
pub trait ManagedIndex: Send + Sync {
  /// Inserts or replaces the vector stored under `id`.
  ///
  /// # Arguments
  ///
  /// * `id` - The identifier of the item.
  /// * `vector` - The item embedding.
  /// * `metadata` - Metadata stored alongside the vector.
  fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<(), ManagedError>;

  /// Returns up to `top_k` matches for `vector`, best first.
  ///
  /// # Arguments
  ///
  /// * `vector` - The query embedding.
  /// * `top_k` - The maximum number of matches to return.
  fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ManagedMatch>, ManagedError>;
}

/// Tier backed by a [`ManagedIndex`].
///
/// The service holds the data, so this tier only tracks the ids it upserted
/// during the current process; that count drives id allocation. Hits never
/// carry text because the service only returns ids, scores and metadata.
pub struct ManagedTier {
  client: Box<dyn ManagedIndex>,
  ids: HashSet<EntityId>,
}

impl ManagedTier {
  pub fn new(client: Box<dyn ManagedIndex>) -> Self {
    Self {
      client,
      ids: HashSet::new(),
    }
  }

  /// Number of distinct ids upserted by this process.
  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn store(&mut self, embedder: &Embedder, item: Item) -> Result<(), TierError> {
    let vector = embedder.embed(&item.text)?;
    self.client.upsert(&item.id, &vector, &item.metadata)?;
    self.ids.insert(item.id);
    Ok(())
  }

  pub fn query(&self, embedder: &Embedder, text: &str, top_k: usize) -> Result<Vec<SearchHit>, TierError> {
    let vector = embedder.embed(text)?;
    let matches = self.client.query(&vector, top_k)?;
    Ok(
      matches
        .into_iter()
        .take(top_k)
        .map(|m| SearchHit::new(m.id, m.score, m.metadata))
        .collect(),
    )
  }
}

impl std::fmt::Debug for ManagedTier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ManagedTier").field("ids", &self.ids.len()).finish()
  }
}
