#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tierstore::embeddings::HashingEmbedder;
use tierstore::prelude::*;

pub const DIM: usize = 256;

pub fn config(dir: &Path) -> StoreConfig {
  StoreConfig::new(dir).dimension(DIM)
}

pub fn meta(source: &str) -> Metadata {
  let mut metadata = Metadata::new();
  metadata.insert("source".into(), source.into());
  metadata
}

/// A shared on/off switch for a fake dependency.
#[derive(Clone, Default)]
pub struct Switch(Arc<AtomicBool>);

impl Switch {
  pub fn on() -> Self {
    Self(Arc::new(AtomicBool::new(true)))
  }

  pub fn set(&self, healthy: bool) {
    self.0.store(healthy, Ordering::SeqCst);
  }

  pub fn is_on(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Hashing embedder that fails while its switch is off.
pub struct FlakyEmbedder {
  inner: HashingEmbedder,
  healthy: Switch,
  pub calls: Arc<AtomicUsize>,
}

impl FlakyEmbedder {
  pub fn new(healthy: Switch) -> Self {
    Self {
      inner: HashingEmbedder::new(DIM),
      healthy,
      calls: Arc::new(AtomicUsize::new(0)),
    }
  }
}

impl TextEmbedder for FlakyEmbedder {
  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.healthy.is_on() {
      self.inner.embed(text)
    } else {
      Err(EmbedError::Provider("embedding service down".into()))
    }
  }
}

/// In-memory stand-in for a managed index service.
#[derive(Clone, Default)]
pub struct FakeManaged {
  pub healthy: Switch,
  pub upserts: Arc<AtomicUsize>,
  pub connects: Arc<AtomicUsize>,
  vectors: Arc<Mutex<Vec<(String, Vec<f32>, Metadata)>>>,
}

impl FakeManaged {
  pub fn new() -> Self {
    Self {
      healthy: Switch::on(),
      ..Self::default()
    }
  }

  /// A connector for [`RetrievalStoreBuilder::managed`].
  ///
  /// Connecting fails while the switch is off.
  pub fn connector(&self) -> impl FnOnce(usize) -> Result<Box<dyn ManagedIndex>, ManagedError> + Send + 'static {
    let fake = self.clone();
    move |_dimension| {
      fake.connects.fetch_add(1, Ordering::SeqCst);
      if fake.healthy.is_on() {
        Ok(Box::new(fake) as Box<dyn ManagedIndex>)
      } else {
        Err(ManagedError::IndexUnavailable("knowledge".into()))
      }
    }
  }

  fn check(&self) -> Result<(), ManagedError> {
    if self.healthy.is_on() {
      Ok(())
    } else {
      Err(ManagedError::Status {
        status: 503,
        body: "unavailable".into(),
      })
    }
  }
}

impl ManagedIndex for FakeManaged {
  fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<(), ManagedError> {
    self.check()?;
    self.upserts.fetch_add(1, Ordering::SeqCst);
    let mut vectors = self.vectors.lock();
    vectors.retain(|(existing, _, _)| existing != id);
    vectors.push((id.to_string(), vector.to_vec(), metadata.clone()));
    Ok(())
  }

  fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ManagedMatch>, ManagedError> {
    self.check()?;
    let mut matches: Vec<ManagedMatch> = self
      .vectors
      .lock()
      .iter()
      .map(|(id, stored, metadata)| ManagedMatch {
        id: id.clone(),
        score: stored.iter().zip(vector).map(|(a, b)| a * b).sum(),
        metadata: metadata.clone(),
      })
      .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(top_k);
    Ok(matches)
  }
}
