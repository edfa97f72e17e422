mod common;

use std::collections::HashSet;

use common::{config, meta};
use rstest::rstest;
use tempfile::tempdir;
use tierstore::embeddings::HashingEmbedder;
use tierstore::prelude::*;

fn store(dir: &std::path::Path, local_index: bool) -> RetrievalStore {
  RetrievalStore::builder(config(dir).local_index(local_index))
    .embedder(Box::new(HashingEmbedder::new(common::DIM)))
    .build()
    .unwrap()
}

#[rstest]
#[case::local(true, TierKind::Local)]
#[case::brute_force(false, TierKind::BruteForce)]
fn stored_item_is_found_by_shared_term(#[case] local_index: bool, #[case] tier: TierKind) {
  let dir = tempdir().unwrap();
  let store = store(dir.path(), local_index);
  assert_eq!(store.tier(), tier);

  store.add_item("support and resistance levels", meta("a.pdf"), None).unwrap();
  let id = store.add_item("gold price trend", meta("b.pdf"), None).unwrap();
  store.add_item("central bank policy", meta("c.pdf"), None).unwrap();

  let hits = store.search("gold outlook", None).unwrap();
  let hit = hits.iter().find(|h| h.id == id).expect("stored item should be returned");
  assert_eq!(hit.text.as_deref(), Some("gold price trend"));
  assert_eq!(hit.metadata, meta("b.pdf"));
  if tier == TierKind::BruteForce {
    assert_eq!(hit.score, 0.5);
  }
}

#[rstest]
#[case::local(true)]
#[case::brute_force(false)]
fn empty_store_and_empty_query_return_nothing(#[case] local_index: bool) {
  let dir = tempdir().unwrap();
  let store = store(dir.path(), local_index);
  assert!(store.search("gold", None).unwrap().is_empty());

  store.add_item("gold", Metadata::new(), None).unwrap();
  assert!(store.search("", None).unwrap().is_empty());
  assert!(store.search("   ", Some(3)).unwrap().is_empty());
}

#[rstest]
#[case::local(true)]
#[case::brute_force(false)]
fn empty_text_creates_nothing(#[case] local_index: bool) {
  let dir = tempdir().unwrap();
  let store = store(dir.path(), local_index);
  assert_eq!(store.add_item("", Metadata::new(), None).unwrap(), "0");
  assert!(store.is_empty());
  assert!(store.search("anything", None).unwrap().is_empty());
}

#[test]
fn brute_force_scores_fraction_of_terms() {
  let dir = tempdir().unwrap();
  let store = store(dir.path(), false);
  store.add_item("gold price trend", Metadata::new(), None).unwrap();
  store.add_item("unrelated text", Metadata::new(), None).unwrap();

  let hits = store.search("gold price", Some(5)).unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].id, "0");
  assert_eq!(hits[0].score, 1.0);
}

#[test]
fn local_ranks_closest_first() {
  let dir = tempdir().unwrap();
  let store = store(dir.path(), true);
  store.add_item("gold price trend", Metadata::new(), None).unwrap();
  store.add_item("gold", Metadata::new(), None).unwrap();

  let hits = store.search("gold price trend", Some(1)).unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].id, "0");
  assert!(hits[0].score < 1e-4);
}

#[test]
fn duplicate_ids_keep_latest_write() {
  let dir = tempdir().unwrap();
  let store = store(dir.path(), true);
  store.add_item("gold bars", meta("old"), Some("doc".into())).unwrap();
  store.add_item("silver coins", meta("new"), Some("doc".into())).unwrap();

  assert_eq!(store.len(), 1);
  let hits = store.search("gold bars", None).unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].metadata, meta("new"));
}

#[rstest]
#[case::local(true)]
#[case::brute_force(false)]
fn concurrent_adds_get_distinct_ids(#[case] local_index: bool) {
  const THREADS: usize = 8;
  const PER_THREAD: usize = 10;

  let dir = tempdir().unwrap();
  let store = store(dir.path(), local_index);

  let ids: Vec<EntityId> = std::thread::scope(|scope| {
    let handles: Vec<_> = (0..THREADS)
      .map(|t| {
        let store = &store;
        scope.spawn(move || {
          (0..PER_THREAD)
            .map(|i| {
              store
                .add_item(&format!("note {t} {i} gold"), Metadata::new(), None)
                .unwrap()
            })
            .collect::<Vec<_>>()
        })
      })
      .collect();
    handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
  });

  let distinct: HashSet<&EntityId> = ids.iter().collect();
  assert_eq!(ids.len(), THREADS * PER_THREAD);
  assert_eq!(distinct.len(), THREADS * PER_THREAD);
  assert_eq!(store.len(), THREADS * PER_THREAD);
  assert_eq!(store.search("gold", Some(1000)).unwrap().len(), THREADS * PER_THREAD);
}
