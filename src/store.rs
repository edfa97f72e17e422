//! The retrieval store facade.

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::controller::{Capabilities, DegradationController};
use crate::embeddings::{Embedder, TextEmbedder};
use crate::error::{EmbedError, ManagedError, StoreError, TierError};
use crate::ids::IdAllocator;
use crate::persistence::SnapshotDir;
use crate::tiers::{BruteForceTier, LocalTier, ManagedIndex, ManagedTier, Tier};
use crate::types::{EntityId, Item, Metadata, SearchHit, TierKind};

/// Builds the embedding provider when the store is constructed.
pub type EmbedderFactory = Box<dyn FnOnce() -> Result<Box<dyn TextEmbedder>, EmbedError> + Send>;

/// Connects to a managed index of the given dimension.
pub type ManagedConnector = Box<dyn FnOnce(usize) -> Result<Box<dyn ManagedIndex>, ManagedError> + Send>;

/// A text store that keeps answering queries as its backends fail.
///
/// `RetrievalStore` writes items to the strongest backend tier available
/// and searches the same tier. Tiers are tried in the order managed index,
/// local vector index, keyword brute force. When the active tier fails, the
/// store moves to the next weaker one for the rest of its lifetime and
/// retries the failed call exactly once there. It never moves back up, even
/// if the failed dependency recovers.
///
/// The store is `Send + Sync`. Searches run concurrently with each other;
/// writes and tier changes are exclusive.
///
/// Create a `RetrievalStore` with [`RetrievalStore::from_config`] or, to
/// supply your own providers, with [`RetrievalStore::builder`].
///
/// # Examples
///
/// ```rust
/// use tierstore::prelude::*;
/// use tierstore::embeddings::HashingEmbedder;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = StoreConfig::new(dir.path()).dimension(64);
/// let store = RetrievalStore::builder(config)
///   .embedder(Box::new(HashingEmbedder::new(64)))
///   .build()
///   .unwrap();
///
/// let id = store.add_item("gold price trend", Metadata::new(), None).unwrap();
/// assert_eq!(id, "0");
///
/// let hits = store.search("gold price", None).unwrap();
/// assert_eq!(hits[0].id, "0");
/// assert_eq!(store.tier(), TierKind::Local);
/// ```
pub struct RetrievalStore {
  config: StoreConfig,
  embedder: Embedder,
  allocator: IdAllocator,
  snapshots: SnapshotDir,
  inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
  controller: DegradationController,
  tier: Tier,
}

/// A builder for creating [`RetrievalStore`] instances.
pub struct RetrievalStoreBuilder {
  config: StoreConfig,
  embedder: Option<EmbedderFactory>,
  managed: Option<ManagedConnector>,
}

impl RetrievalStoreBuilder {
  /// Creates a builder with no embedding provider and no managed index.
  pub fn new(config: StoreConfig) -> Self {
    Self {
      config,
      embedder: None,
      managed: None,
    }
  }

  /// Uses an already constructed embedding provider.
  pub fn embedder(self, embedder: Box<dyn TextEmbedder>) -> Self {
    self.embedder_with(move || Ok(embedder))
  }

  /// Constructs the embedding provider during [`build`](Self::build).
  ///
  /// If the factory fails, the store runs without embeddings.
  pub fn embedder_with<F>(mut self, factory: F) -> Self
  where
    F: FnOnce() -> Result<Box<dyn TextEmbedder>, EmbedError> + Send + 'static,
  {
    self.embedder = Some(Box::new(factory));
    self
  }

  /// Enables the managed tier through `connector`.
  ///
  /// The connector is called at most once, during [`build`](Self::build),
  /// and only if an embedding provider is available.
  pub fn managed<F>(mut self, connector: F) -> Self
  where
    F: FnOnce(usize) -> Result<Box<dyn ManagedIndex>, ManagedError> + Send + 'static,
  {
    self.managed = Some(Box::new(connector));
    self
  }

  /// Probes the configured providers and opens the strongest usable tier.
  ///
  /// # Returns
  ///
  /// The store, or [`StoreError::InvalidConfiguration`] if the config does
  /// not validate. Unavailable providers are not errors: they only lower
  /// the starting tier.
  pub fn build(self) -> Result<RetrievalStore, StoreError> {
    let RetrievalStoreBuilder {
      config,
      embedder,
      managed,
    } = self;
    config.validate()?;

    let embedder = match embedder {
      Some(factory) => match factory() {
        Ok(provider) => Embedder::new(provider, config.dimension),
        Err(err) => {
          warn!(error = %err, "embedding provider could not be constructed");
          Embedder::unavailable(config.dimension)
        }
      },
      None => {
        info!("no embedding provider configured");
        Embedder::unavailable(config.dimension)
      }
    };
    if managed.is_none() {
      info!("no managed index configured");
    }

    let capabilities = Capabilities {
      managed: managed.is_some(),
      local_index: config.local_index,
      embedder: embedder.is_available(),
    };
    let mut controller = DegradationController::new(capabilities);
    let snapshots = SnapshotDir::new(config.data_dir.clone());

    let mut connector = managed;
    let mut kind = controller.active();
    let tier = loop {
      match open_tier(kind, &embedder, &snapshots, config.dimension, &mut connector) {
        Ok(tier) => break tier,
        Err(err) => {
          warn!(tier = %kind, error = %err, "could not initialise tier");
          match controller.downgrade(kind, embedder.is_available()) {
            Some(next) => kind = next,
            None => return Err(StoreError::backend(kind, &err)),
          }
        }
      }
    };
    info!(tier = %tier.kind(), items = tier.len(), dir = %snapshots.root().display(), "retrieval store ready");

    Ok(RetrievalStore {
      config,
      embedder,
      allocator: IdAllocator::new(),
      snapshots,
      inner: RwLock::new(Inner { controller, tier }),
    })
  }
}

impl RetrievalStore {
  /// Creates a new `RetrievalStoreBuilder`.
  pub fn builder(config: StoreConfig) -> RetrievalStoreBuilder {
    RetrievalStoreBuilder::new(config)
  }

  /// Builds a store wired to the remote providers named in `config`.
  ///
  /// With the `remote` feature, an [`EmbeddingConfig`](crate::config::EmbeddingConfig)
  /// selects [`HttpEmbedder`](crate::embeddings::HttpEmbedder) and a
  /// [`ManagedConfig`](crate::config::ManagedConfig) selects
  /// [`PineconeIndex`](crate::tiers::PineconeIndex). Without the feature,
  /// or without those sections, the store starts on a weaker tier.
  pub fn from_config(config: StoreConfig) -> Result<Self, StoreError> {
    #[allow(unused_mut)]
    let mut builder = RetrievalStoreBuilder::new(config.clone());

    #[cfg(feature = "remote")]
    {
      use crate::embeddings::HttpEmbedder;
      use crate::tiers::PineconeIndex;

      if let Some(embedding) = config.embedding.clone() {
        builder = builder.embedder_with(move || {
          HttpEmbedder::new(embedding).map(|e| Box::new(e) as Box<dyn TextEmbedder>)
        });
      }
      if let Some(managed) = config.managed.clone() {
        builder = builder.managed(move |dimension| {
          PineconeIndex::connect(&managed, dimension).map(|i| Box::new(i) as Box<dyn ManagedIndex>)
        });
      }
    }

    #[cfg(not(feature = "remote"))]
    {
      if config.embedding.is_some() || config.managed.is_some() {
        info!("remote providers configured but the `remote` feature is disabled");
      }
    }

    builder.build()
  }

  /// Stores a snippet of text and returns its id.
  ///
  /// Empty or whitespace-only text is ignored: nothing is stored and the
  /// supplied id, or `"0"`, is returned. When `id` is `None` the store
  /// allocates one from the number of items held by the active tier.
  /// Storing an id that already exists replaces the earlier item.
  ///
  /// # Arguments
  ///
  /// * `text` - The text to index.
  /// * `metadata` - Opaque metadata returned with every hit for this item.
  /// * `id` - An optional caller-chosen identifier.
  ///
  /// # Returns
  ///
  /// The id of the stored item, or [`StoreError`] if the weakest tier
  /// failed as well.
  pub fn add_item(&self, text: &str, metadata: Metadata, id: Option<EntityId>) -> Result<EntityId, StoreError> {
    if text.trim().is_empty() {
      debug!("ignoring empty item");
      return Ok(id.unwrap_or_else(|| self.allocator.next_id(0)));
    }

    let mut inner = self.inner.write();
    let allocated = id.is_none();
    let id = self.allocator.resolve(id, inner.tier.len());
    let mut item = Item::new(id, text, metadata);

    let first = inner.tier.store(&self.embedder, item.clone());
    let Err(err) = first else {
      debug!(id = %item.id, tier = %inner.tier.kind(), "stored item");
      return Ok(item.id);
    };

    let failed = inner.tier.kind();
    self.fall_back(&mut inner, failed, err)?;
    // The weaker tier may hold more items than the failed one did.
    if allocated {
      item.id = self.allocator.next_id(inner.tier.len());
    }
    let id = item.id.clone();
    match inner.tier.store(&self.embedder, item) {
      Ok(()) => {
        debug!(id = %id, tier = %inner.tier.kind(), "stored item after fallback");
        Ok(id)
      }
      Err(err) => {
        let failed = inner.tier.kind();
        let surfaced = StoreError::backend(failed, &err);
        let _ = self.fall_back(&mut inner, failed, err);
        Err(surfaced)
      }
    }
  }

  /// Returns up to `top_k` items ranked by relevance to `query`.
  ///
  /// `top_k` defaults to [`StoreConfig::default_top_k`]. An empty query, a
  /// zero `top_k` or a store known to be empty yields an empty result.
  /// How to read the scores depends on [`RetrievalStore::tier`]; see
  /// [`SearchHit::score`].
  pub fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchHit>, StoreError> {
    let top_k = top_k.unwrap_or(self.config.default_top_k);
    if query.trim().is_empty() || top_k == 0 {
      return Ok(Vec::new());
    }

    let (failed, err) = {
      let inner = self.inner.read();
      if inner.tier.is_empty() {
        return Ok(Vec::new());
      }
      match inner.tier.query(&self.embedder, query, top_k) {
        Ok(hits) => {
          debug!(tier = %inner.tier.kind(), hits = hits.len(), "search finished");
          return Ok(hits);
        }
        Err(err) => (inner.tier.kind(), err),
      }
    };

    let mut inner = self.inner.write();
    self.fall_back(&mut inner, failed, err)?;
    if inner.tier.is_empty() {
      return Ok(Vec::new());
    }
    match inner.tier.query(&self.embedder, query, top_k) {
      Ok(hits) => Ok(hits),
      Err(err) => {
        let failed = inner.tier.kind();
        let surfaced = StoreError::backend(failed, &err);
        let _ = self.fall_back(&mut inner, failed, err);
        Err(surfaced)
      }
    }
  }

  /// The tier currently serving requests.
  pub fn tier(&self) -> TierKind {
    self.inner.read().tier.kind()
  }

  /// Number of distinct ids known to the active tier.
  ///
  /// For the managed tier this only counts ids written by this process.
  pub fn len(&self) -> usize {
    self.inner.read().tier.len()
  }

  /// Whether the active tier is known to hold nothing.
  pub fn is_empty(&self) -> bool {
    self.inner.read().tier.is_empty()
  }

  /// The embedding dimension the store was configured with.
  pub fn dimension(&self) -> usize {
    self.config.dimension
  }

  /// The capabilities probed when the store was built.
  pub fn capabilities(&self) -> Capabilities {
    self.inner.read().controller.capabilities()
  }

  /// Moves off `failed` to the next weaker tier that opens.
  ///
  /// A no-op when another caller already moved off `failed`. Fails only
  /// when `failed` is the weakest tier.
  fn fall_back(&self, inner: &mut Inner, failed: TierKind, cause: TierError) -> Result<(), StoreError> {
    if inner.controller.active() != failed {
      return Ok(());
    }

    let mut failed = failed;
    let mut cause = cause;
    loop {
      warn!(tier = %failed, error = %cause, "tier failed");
      let Some(next) = inner.controller.downgrade(failed, self.embedder.is_available()) else {
        return Err(StoreError::backend(failed, &cause));
      };
      match open_tier(next, &self.embedder, &self.snapshots, self.config.dimension, &mut None) {
        Ok(tier) => {
          let previous = std::mem::replace(&mut inner.tier, tier);
          carry_over(previous, &mut inner.tier);
          return Ok(());
        }
        Err(err) => {
          failed = next;
          cause = err;
        }
      }
    }
  }
}

impl std::fmt::Debug for RetrievalStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RetrievalStore")
      .field("config", &self.config)
      .field("embedder", &self.embedder)
      .field("inner", &*self.inner.read())
      .finish()
  }
}

fn open_tier(
  kind: TierKind,
  embedder: &Embedder,
  snapshots: &SnapshotDir,
  dimension: usize,
  connector: &mut Option<ManagedConnector>,
) -> Result<Tier, TierError> {
  if kind.needs_embeddings() && !embedder.is_available() {
    return Err(EmbedError::Unavailable.into());
  }
  match kind {
    TierKind::Managed => {
      let connect = connector
        .take()
        .ok_or_else(|| ManagedError::Backend("no managed index connector".into()))?;
      let client = connect(dimension)?;
      Ok(Tier::Managed(ManagedTier::new(client)))
    }
    TierKind::Local => Ok(Tier::Local(LocalTier::open(snapshots.clone(), dimension)?)),
    TierKind::BruteForce => Ok(Tier::BruteForce(BruteForceTier::open(snapshots.clone()))),
  }
}

/// Seeds a freshly opened brute-force tier with the items of a local tier.
fn carry_over(previous: Tier, next: &mut Tier) {
  if let (Tier::Local(local), Tier::BruteForce(brute_force)) = (previous, next) {
    brute_force.absorb(local.into_items());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embeddings::HashingEmbedder;
  use tempfile::tempdir;

  fn local_store(dir: &std::path::Path) -> RetrievalStore {
    RetrievalStore::builder(StoreConfig::new(dir).dimension(32))
      .embedder(Box::new(HashingEmbedder::new(32)))
      .build()
      .unwrap()
  }

  #[test]
  fn allocated_ids_follow_item_count() {
    let dir = tempdir().unwrap();
    let store = local_store(dir.path());
    assert_eq!(store.add_item("first", Metadata::new(), None).unwrap(), "0");
    assert_eq!(store.add_item("second", Metadata::new(), None).unwrap(), "1");
    assert_eq!(store.add_item("named", Metadata::new(), Some("doc-9".into())).unwrap(), "doc-9");
    assert_eq!(store.add_item("third", Metadata::new(), None).unwrap(), "3");
    assert_eq!(store.len(), 4);
  }

  #[test]
  fn empty_text_returns_supplied_or_zero_id() {
    let dir = tempdir().unwrap();
    let store = local_store(dir.path());
    assert_eq!(store.add_item("  \n", Metadata::new(), None).unwrap(), "0");
    assert_eq!(store.add_item("", Metadata::new(), Some("x".into())).unwrap(), "x");
    assert!(store.is_empty());
  }

  #[test]
  fn zero_top_k_is_empty() {
    let dir = tempdir().unwrap();
    let store = local_store(dir.path());
    store.add_item("gold", Metadata::new(), None).unwrap();
    assert!(store.search("gold", Some(0)).unwrap().is_empty());
  }

  #[test]
  fn invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let result = RetrievalStore::builder(StoreConfig::new(dir.path()).dimension(0)).build();
    assert!(matches!(result, Err(StoreError::InvalidConfiguration(_))));
  }

  #[test]
  fn embedder_dimension_mismatch_degrades_on_first_use() {
    let dir = tempdir().unwrap();
    let store = RetrievalStore::builder(StoreConfig::new(dir.path()).dimension(32))
      .embedder(Box::new(HashingEmbedder::new(16)))
      .build()
      .unwrap();
    assert_eq!(store.tier(), TierKind::Local);

    store.add_item("gold price", Metadata::new(), None).unwrap();
    assert_eq!(store.tier(), TierKind::BruteForce);
    assert_eq!(store.search("gold", None).unwrap()[0].score, 1.0);
  }

  #[test]
  fn without_local_index_starts_on_brute_force() {
    let dir = tempdir().unwrap();
    let store = RetrievalStore::builder(StoreConfig::new(dir.path()).dimension(32).local_index(false))
      .embedder(Box::new(HashingEmbedder::new(32)))
      .build()
      .unwrap();
    assert_eq!(store.tier(), TierKind::BruteForce);
    assert!(store.capabilities().embedder);
  }
}
