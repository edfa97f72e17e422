//! Keyword-overlap search with no external dependencies.

use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::persistence::SnapshotDir;
use crate::tokenizer::query_terms;
use crate::types::{EntityId, Item, SearchHit};

/// The last-resort tier.
///
/// Items are kept in insertion order. Storing an id that already exists
/// replaces the item in place, so it keeps its original rank among ties.
/// Every store rewrites the snapshot file; a failed write is logged and the
/// in-memory store still succeeds.
#[derive(Debug)]
pub struct BruteForceTier {
  items: Vec<Item>,
  positions: HashMap<EntityId, usize>,
  snapshots: SnapshotDir,
}

impl BruteForceTier {
  /// Opens the tier, loading the snapshot file if one exists.
  ///
  /// An unreadable snapshot is logged and the tier starts empty.
  pub fn open(snapshots: SnapshotDir) -> Self {
    let mut tier = Self {
      items: Vec::new(),
      positions: HashMap::new(),
      snapshots,
    };
    match tier.snapshots.load_keyword() {
      Ok(Some(items)) => {
        for item in items {
          tier.insert(item);
        }
        debug!(items = tier.items.len(), "restored brute-force tier");
      }
      Ok(None) => {}
      Err(err) => {
        warn!(error = %err, dir = %tier.snapshots.root().display(), "could not load brute-force snapshot; starting empty");
      }
    }
    tier
  }

  /// Number of distinct ids held.
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Stores an item and rewrites the snapshot.
  pub fn store(&mut self, item: Item) {
    self.insert(item);
    self.persist();
  }

  /// Merges items carried over from a stronger tier.
  ///
  /// Ids already present keep their current item.
  pub fn absorb(&mut self, items: impl IntoIterator<Item = Item>) {
    let before = self.items.len();
    for item in items {
      if !self.positions.contains_key(&item.id) {
        self.insert(item);
      }
    }
    if self.items.len() != before {
      debug!(carried = self.items.len() - before, "carried items into brute-force tier");
      self.persist();
    }
  }

  /// Ranks stored items by the fraction of query terms they contain.
  ///
  /// The score of an item is the number of lowercase, whitespace-delimited
  /// query terms found as substrings of its lowercased text, divided by the
  /// number of terms. Items scoring zero are dropped. Ties keep insertion
  /// order.
  pub fn query(&self, text: &str, top_k: usize) -> Vec<SearchHit> {
    let terms = query_terms(text);
    let denominator = terms.len().max(1) as f32;

    let score = |item: &Item| -> Option<SearchHit> {
      let haystack = item.text.to_lowercase();
      let found = terms.iter().filter(|term| haystack.contains(term.as_str())).count();
      (found > 0).then(|| SearchHit::from_item(item, found as f32 / denominator))
    };

    #[cfg(feature = "parallel")]
    let mut hits: Vec<SearchHit> = self.items.par_iter().filter_map(score).collect();

    #[cfg(not(feature = "parallel"))]
    let mut hits: Vec<SearchHit> = self.items.iter().filter_map(score).collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(top_k);
    hits
  }

  fn insert(&mut self, item: Item) {
    match self.positions.get(&item.id) {
      Some(&position) => self.items[position] = item,
      None => {
        self.positions.insert(item.id.clone(), self.items.len());
        self.items.push(item);
      }
    }
  }

  fn persist(&self) {
    if let Err(err) = self.snapshots.save_keyword(&self.items) {
      warn!(error = %err, "failed to persist brute-force tier; keeping in-memory state");
    }
  }
}
