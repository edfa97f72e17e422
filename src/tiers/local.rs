//! Local vector index tier with write-through persistence.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::embeddings::Embedder;
use crate::error::TierError;
use crate::index::FlatL2Index;
use crate::persistence::{LocalSnapshot, SnapshotDir};
use crate::types::{EntityId, Item, SearchHit};

/// Exact L2 search over embeddings held in process.
///
/// `items` is an arena addressed by the same position as the vector index:
/// the item stored at `items[p]` owns the vector at index position `p`.
/// `positions` maps every id to its latest arena slot. Storing an id twice
/// appends a new slot and repoints the id; the superseded slot stays in the
/// arena so positions remain aligned, but it is never returned.
#[derive(Debug)]
pub struct LocalTier {
  index: FlatL2Index,
  items: Vec<Item>,
  positions: HashMap<EntityId, usize>,
  snapshots: SnapshotDir,
}

impl LocalTier {
  /// Opens the tier, loading both snapshot files if they exist.
  ///
  /// A corrupt, incomplete or misaligned snapshot, or one written with
  /// another dimension, is an error: the caller falls back to a weaker tier.
  pub fn open(snapshots: SnapshotDir, dimension: usize) -> Result<Self, TierError> {
    let (index, items) = match snapshots.load_local()? {
      Some(LocalSnapshot { index, items }) => {
        if index.dimension() != dimension {
          return Err(TierError::DimensionMismatch {
            expected: dimension,
            found: index.dimension(),
          });
        }
        (index, items)
      }
      None => (FlatL2Index::new(dimension), Vec::new()),
    };

    let positions = items
      .iter()
      .enumerate()
      .map(|(position, item)| (item.id.clone(), position))
      .collect::<HashMap<_, _>>();
    if !items.is_empty() {
      debug!(items = positions.len(), slots = items.len(), "restored local tier");
    }

    Ok(Self {
      index,
      items,
      positions,
      snapshots,
    })
  }

  /// Number of distinct ids held.
  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  /// Embeds and appends an item, then writes both snapshot files.
  ///
  /// Nothing is modified if embedding fails. A failed snapshot write is
  /// logged and the item stays stored in memory.
  pub fn store(&mut self, embedder: &Embedder, item: Item) -> Result<(), TierError> {
    let vector = embedder.embed(&item.text)?;
    let position = self.index.add(&vector)?;
    debug_assert_eq!(position, self.items.len());
    self.positions.insert(item.id.clone(), position);
    self.items.push(item);

    if let Err(err) = self.snapshots.save_local(&self.index, &self.items) {
      warn!(error = %err, "failed to persist local tier; keeping in-memory state");
    }
    Ok(())
  }

  /// Returns up to `top_k` live items closest to the query, closest first.
  ///
  /// Scores are squared L2 distances.
  pub fn query(&self, embedder: &Embedder, text: &str, top_k: usize) -> Result<Vec<SearchHit>, TierError> {
    let vector = embedder.embed(text)?;
    let limit = top_k.min(self.len());
    if limit == 0 {
      return Ok(Vec::new());
    }

    let hits = self
      .index
      .search(&vector, self.index.len())?
      .into_iter()
      .filter_map(|neighbor| {
        let item = self.items.get(neighbor.position)?;
        let live = self.positions.get(&item.id) == Some(&neighbor.position);
        live.then(|| SearchHit::from_item(item, neighbor.distance))
      })
      .take(limit)
      .collect();
    Ok(hits)
  }

  /// Consumes the tier, returning its live items in insertion order.
  pub fn into_items(self) -> Vec<Item> {
    let positions = self.positions;
    self
      .items
      .into_iter()
      .enumerate()
      .filter(|(position, item)| positions.get(&item.id) == Some(position))
      .map(|(_, item)| item)
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embeddings::HashingEmbedder;
  use crate::types::Metadata;
  use tempfile::tempdir;

  const DIM: usize = 128;

  fn embedder() -> Embedder {
    Embedder::new(Box::new(HashingEmbedder::new(DIM)), DIM)
  }

  fn item(id: &str, text: &str) -> Item {
    Item::new(id, text, Metadata::new())
  }

  #[test]
  fn nearest_item_ranks_first() {
    let dir = tempdir().unwrap();
    let embedder = embedder();
    let mut tier = LocalTier::open(SnapshotDir::new(dir.path()), DIM).unwrap();
    tier.store(&embedder, item("0", "gold price trend")).unwrap();
    tier.store(&embedder, item("1", "support and resistance levels")).unwrap();

    let hits = tier.query(&embedder, "gold price", 5).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "0");
    assert!(hits[0].score <= hits[1].score);
    assert_eq!(hits[0].text.as_deref(), Some("gold price trend"));
  }

  #[test]
  fn top_k_is_clamped_to_stored_items() {
    let dir = tempdir().unwrap();
    let embedder = embedder();
    let mut tier = LocalTier::open(SnapshotDir::new(dir.path()), DIM).unwrap();
    tier.store(&embedder, item("0", "gold")).unwrap();
    assert_eq!(tier.query(&embedder, "gold", 10).unwrap().len(), 1);
  }

  #[test]
  fn superseded_slots_are_hidden() {
    let dir = tempdir().unwrap();
    let embedder = embedder();
    let mut tier = LocalTier::open(SnapshotDir::new(dir.path()), DIM).unwrap();
    tier.store(&embedder, item("a", "gold bullion")).unwrap();
    tier.store(&embedder, item("a", "silver coins")).unwrap();
    assert_eq!(tier.len(), 1);

    let hits = tier.query(&embedder, "gold bullion", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text.as_deref(), Some("silver coins"));
    assert_eq!(tier.into_items(), vec![item("a", "silver coins")]);
  }

  #[test]
  fn store_writes_through_to_disk() {
    let dir = tempdir().unwrap();
    let embedder = embedder();
    let mut tier = LocalTier::open(SnapshotDir::new(dir.path()), DIM).unwrap();
    tier.store(&embedder, item("0", "gold price trend")).unwrap();
    tier.store(&embedder, item("1", "silver")).unwrap();
    let before = tier.query(&embedder, "gold", 5).unwrap();

    let reopened = LocalTier::open(SnapshotDir::new(dir.path()), DIM).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.query(&embedder, "gold", 5).unwrap(), before);
  }

  #[test]
  fn snapshot_with_other_dimension_is_rejected() {
    let dir = tempdir().unwrap();
    let embedder = embedder();
    let mut tier = LocalTier::open(SnapshotDir::new(dir.path()), DIM).unwrap();
    tier.store(&embedder, item("0", "gold")).unwrap();

    assert!(matches!(
      LocalTier::open(SnapshotDir::new(dir.path()), DIM * 2),
      Err(TierError::DimensionMismatch { .. })
    ));
  }

  #[test]
  fn unavailable_embedder_fails_without_side_effects() {
    let dir = tempdir().unwrap();
    let mut tier = LocalTier::open(SnapshotDir::new(dir.path()), DIM).unwrap();
    let embedder = Embedder::unavailable(DIM);
    assert!(tier.store(&embedder, item("0", "gold")).is_err());
    assert!(tier.is_empty());
    assert!(!dir.path().join(crate::persistence::INDEX_FILE).exists());
  }
}
