//! Walks the store down its tiers by breaking one dependency at a time.
//!
//! ```text
//! cargo run --example degradation
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tierstore::embeddings::HashingEmbedder;
use tierstore::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DIMENSION: usize = 64;

/// Embeds with `HashingEmbedder` until switched off.
struct SwitchableEmbedder {
  inner: HashingEmbedder,
  up: Arc<AtomicBool>,
}

impl TextEmbedder for SwitchableEmbedder {
  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
    if self.up.load(Ordering::SeqCst) {
      self.inner.embed(text)
    } else {
      Err(EmbedError::Provider("embedding endpoint timed out".into()))
    }
  }
}

/// A managed index kept in memory that can be switched off.
#[derive(Clone)]
struct InMemoryManaged {
  up: Arc<AtomicBool>,
  rows: Arc<Mutex<Vec<(String, Vec<f32>, Metadata)>>>,
}

impl ManagedIndex for InMemoryManaged {
  fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<(), ManagedError> {
    if !self.up.load(Ordering::SeqCst) {
      return Err(ManagedError::Status { status: 503, body: "service unavailable".into() });
    }
    let mut rows = self.rows.lock();
    rows.retain(|(existing, _, _)| existing != id);
    rows.push((id.to_string(), vector.to_vec(), metadata.clone()));
    Ok(())
  }

  fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ManagedMatch>, ManagedError> {
    if !self.up.load(Ordering::SeqCst) {
      return Err(ManagedError::Status { status: 503, body: "service unavailable".into() });
    }
    let mut matches: Vec<ManagedMatch> = self
      .rows
      .lock()
      .iter()
      .map(|(id, row, metadata)| ManagedMatch {
        id: id.clone(),
        score: row.iter().zip(vector).map(|(a, b)| a * b).sum(),
        metadata: metadata.clone(),
      })
      .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(top_k);
    Ok(matches)
  }
}

fn show(store: &RetrievalStore, query: &str) -> Result<(), StoreError> {
  let hits = store.search(query, Some(3))?;
  println!("{} tier answered {query:?} with {} hits", store.tier(), hits.len());
  for hit in hits {
    println!("  #{} score={:.4} text={:?}", hit.id, hit.score, hit.text);
  }
  Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_target(false))
    .init();

  let data_dir = tempfile::tempdir()?;
  let embedder_up = Arc::new(AtomicBool::new(true));
  let managed = InMemoryManaged {
    up: Arc::new(AtomicBool::new(true)),
    rows: Arc::default(),
  };

  let connector = managed.clone();
  let store = RetrievalStore::builder(StoreConfig::new(data_dir.path()).dimension(DIMENSION))
    .embedder(Box::new(SwitchableEmbedder {
      inner: HashingEmbedder::new(DIMENSION),
      up: embedder_up.clone(),
    }))
    .managed(move |_dimension| Ok(Box::new(connector) as Box<dyn ManagedIndex>))
    .build()?;

  store.add_item("gold price trend", Metadata::new(), None)?;
  show(&store, "gold price")?;

  println!("\n-- managed index goes down");
  managed.up.store(false, Ordering::SeqCst);
  store.add_item("support and resistance levels", Metadata::new(), None)?;
  store.add_item("central bank gold reserves", Metadata::new(), None)?;
  show(&store, "gold reserves")?;

  println!("\n-- embedding provider goes down");
  embedder_up.store(false, Ordering::SeqCst);
  show(&store, "gold reserves")?;

  println!("\n-- both come back; the store stays where it is");
  managed.up.store(true, Ordering::SeqCst);
  embedder_up.store(true, Ordering::SeqCst);
  store.add_item("gold miners rally", Metadata::new(), None)?;
  show(&store, "gold")?;

  Ok(())
}
