//! Backend tiers.
//!
//! The set of tiers is closed: a managed remote index, a local vector index
//! and a keyword brute-force store. [`Tier`] dispatches the two operations
//! every tier supports, storing an item and answering a query.

pub mod brute_force;
pub mod local;
pub mod managed;
#[cfg(feature = "remote")]
pub mod pinecone;

pub use brute_force::BruteForceTier;
pub use local::LocalTier;
pub use managed::{ManagedIndex, ManagedMatch, ManagedTier};
#[cfg(feature = "remote")]
pub use pinecone::PineconeIndex;

use crate::embeddings::Embedder;
use crate::error::TierError;
use crate::types::{Item, SearchHit, TierKind};

/// The active backend of a store.
#[derive(Debug)]
pub enum Tier {
  Managed(ManagedTier),
  Local(LocalTier),
  BruteForce(BruteForceTier),
}

impl Tier {
  pub fn kind(&self) -> TierKind {
    match self {
      Tier::Managed(_) => TierKind::Managed,
      Tier::Local(_) => TierKind::Local,
      Tier::BruteForce(_) => TierKind::BruteForce,
    }
  }

  /// Number of distinct ids known to the tier.
  pub fn len(&self) -> usize {
    match self {
      Tier::Managed(tier) => tier.len(),
      Tier::Local(tier) => tier.len(),
      Tier::BruteForce(tier) => tier.len(),
    }
  }

  /// Whether the tier is known to hold nothing.
  ///
  /// Always `false` for the managed tier: the remote index may hold items
  /// written by other processes.
  pub fn is_empty(&self) -> bool {
    match self {
      Tier::Managed(_) => false,
      Tier::Local(tier) => tier.is_empty(),
      Tier::BruteForce(tier) => tier.is_empty(),
    }
  }

  pub fn store(&mut self, embedder: &Embedder, item: Item) -> Result<(), TierError> {
    match self {
      Tier::Managed(tier) => tier.store(embedder, item),
      Tier::Local(tier) => tier.store(embedder, item),
      Tier::BruteForce(tier) => {
        tier.store(item);
        Ok(())
      }
    }
  }

  pub fn query(&self, embedder: &Embedder, text: &str, top_k: usize) -> Result<Vec<SearchHit>, TierError> {
    match self {
      Tier::Managed(tier) => tier.query(embedder, text, top_k),
      Tier::Local(tier) => tier.query(embedder, text, top_k),
      Tier::BruteForce(tier) => Ok(tier.query(text, top_k)),
    }
  }
}
