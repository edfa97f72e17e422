//! Core data types for the tiered retrieval store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type alias for item identifiers.
///
/// Identifiers are opaque strings. They are either supplied by the caller or
/// allocated by the store as the decimal count of stored items.
pub type EntityId = String;

/// Consumer-defined metadata attached to an item.
///
/// The store never inspects these values. They are persisted and returned
/// verbatim with every search hit.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored snippet of text together with its identifier and metadata.
///
/// Items are created by [`RetrievalStore::add_item`](crate::store::RetrievalStore::add_item)
/// and never mutated afterwards. The embedding of an item lives in the local
/// vector index at the same position as the item itself, so it is not part
/// of this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  /// The unique identifier of the item within the store.
  pub id: EntityId,
  /// The original, non-empty text content.
  pub text: String,
  /// Opaque consumer metadata, e.g. source filename or content type.
  #[serde(default)]
  pub metadata: Metadata,
}

impl Item {
  /// Creates a new item.
  pub fn new(id: impl Into<EntityId>, text: impl Into<String>, metadata: Metadata) -> Self {
    Self {
      id: id.into(),
      text: text.into(),
      metadata,
    }
  }
}

/// A single ranked result returned by a search.
///
/// The meaning of `score` depends on the tier that produced the hit, see
/// [`TierKind::higher_is_better`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
  /// Identifier of the matched item.
  pub id: EntityId,
  /// Tier-specific relevance score.
  ///
  /// - Managed: similarity as defined by the managed index metric.
  /// - Local: squared L2 distance, smaller is better.
  /// - Brute-force: fraction of query terms found, in `[0, 1]`, larger is better.
  pub score: f32,
  /// The metadata stored with the item.
  pub metadata: Metadata,
  /// The original text. Present for local and brute-force hits only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub text: Option<String>,
}

impl SearchHit {
  /// Creates a hit without text.
  pub fn new(id: impl Into<EntityId>, score: f32, metadata: Metadata) -> Self {
    Self {
      id: id.into(),
      score,
      metadata,
      text: None,
    }
  }

  /// Attaches the original text to the hit.
  pub fn with_text(mut self, text: impl Into<String>) -> Self {
    self.text = Some(text.into());
    self
  }

  /// Builds a hit from a stored item, carrying over its text and metadata.
  pub fn from_item(item: &Item, score: f32) -> Self {
    Self::new(item.id.clone(), score, item.metadata.clone()).with_text(item.text.clone())
  }
}

/// The capability level of a backend tier.
///
/// Variants are declared from weakest to strongest so that the derived
/// ordering reads `Managed > Local > BruteForce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TierKind {
  /// Dependency-free keyword overlap search. The guaranteed floor.
  BruteForce,
  /// In-process flat L2 index persisted to the data directory.
  Local,
  /// External managed vector index service.
  Managed,
}

impl TierKind {
  /// Whether the tier needs a working embedder.
  pub fn needs_embeddings(self) -> bool {
    !matches!(self, TierKind::BruteForce)
  }

  /// Whether larger scores mean better matches for this tier.
  pub fn higher_is_better(self) -> bool {
    !matches!(self, TierKind::Local)
  }
}

impl fmt::Display for TierKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TierKind::BruteForce => "brute-force",
      TierKind::Local => "local",
      TierKind::Managed => "managed",
    };
    f.write_str(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn tier_kinds_are_ordered_by_capability() {
    assert!(TierKind::Managed > TierKind::Local);
    assert!(TierKind::Local > TierKind::BruteForce);
    assert_eq!(TierKind::Local.to_string(), "local");
  }

  #[test]
  fn hit_from_item_keeps_text_and_metadata() {
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), json!("report.pdf"));
    let item = Item::new("7", "gold rallied", metadata.clone());

    let hit = SearchHit::from_item(&item, 0.5);
    assert_eq!(hit.id, "7");
    assert_eq!(hit.text.as_deref(), Some("gold rallied"));
    assert_eq!(hit.metadata, metadata);
  }

  #[test]
  fn managed_hits_serialize_without_text() {
    let hit = SearchHit::new("1", 0.9, Metadata::new());
    let value = serde_json::to_value(&hit).unwrap();
    assert!(value.get("text").is_none());
  }
}
