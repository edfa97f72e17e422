//! Configuration for a [`RetrievalStore`](crate::store::RetrievalStore).
//!
//! Every value has a default so a store can be built without any
//! environment at all. In that case only the brute-force tier (and the
//! local tier, if an embedder is supplied programmatically) is available.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::StoreError;

/// Default dimensionality of embedding vectors.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Default directory for snapshot files.
pub const DEFAULT_DATA_DIR: &str = "./processed_files";

/// Default name of the managed index.
pub const DEFAULT_INDEX_NAME: &str = "gotex-knowledge";

/// Default number of hits returned by a search.
pub const DEFAULT_TOP_K: usize = 5;

/// Default embedding model for the OpenAI-compatible embedder.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default base URL for the OpenAI-compatible embedder.
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";

/// Default control-plane URL of the managed index service.
pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";

/// Default per-request timeout for remote collaborators.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API key value shipped in sample `.env` files. Treated as "not configured".
const PLACEHOLDER_API_KEY: &str = "your_pinecone_api_key";

/// Top-level store configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
  /// Length of every embedding vector, shared by all tiers.
  pub dimension: usize,
  /// Directory holding the local and brute-force snapshot files.
  pub data_dir: PathBuf,
  /// Whether the in-process vector index may be used.
  pub local_index: bool,
  /// Number of hits returned when a search does not specify `top_k`.
  pub default_top_k: usize,
  /// Credentials for the managed index. `None` skips the managed tier.
  pub managed: Option<ManagedConfig>,
  /// Settings for the remote embedder. `None` means no embedder is built
  /// by [`RetrievalStore::from_config`](crate::store::RetrievalStore::from_config).
  pub embedding: Option<EmbeddingConfig>,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      dimension: DEFAULT_DIMENSION,
      data_dir: PathBuf::from(DEFAULT_DATA_DIR),
      local_index: true,
      default_top_k: DEFAULT_TOP_K,
      managed: None,
      embedding: None,
    }
  }
}

impl StoreConfig {
  /// Creates a configuration rooted at `data_dir` with default values.
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self {
      data_dir: data_dir.into(),
      ..Self::default()
    }
  }

  /// Loads the configuration from environment variables.
  ///
  /// | Variable | Field |
  /// |---|---|
  /// | `EMBEDDING_DIMENSION` | `dimension` |
  /// | `PROCESSED_DIR` | `data_dir` |
  /// | `TIERSTORE_LOCAL_INDEX` | `local_index` (`false`/`0` disables) |
  /// | `PINECONE_API_KEY`, `PINECONE_ENVIRONMENT`, `VECTOR_INDEX_NAME` | `managed` |
  /// | `OPENAI_API_KEY`, `EMBEDDING_MODEL`, `EMBEDDING_BASE_URL` | `embedding` |
  ///
  /// Unparseable numbers fall back to their defaults.
  pub fn from_env() -> Self {
    let mut config = Self::default();
    if let Some(dimension) = env_var("EMBEDDING_DIMENSION").and_then(|v| v.parse().ok()) {
      config.dimension = dimension;
    }
    if let Some(dir) = env_var("PROCESSED_DIR") {
      config.data_dir = PathBuf::from(dir);
    }
    if let Some(flag) = env_var("TIERSTORE_LOCAL_INDEX") {
      config.local_index = !matches!(flag.to_ascii_lowercase().as_str(), "false" | "0" | "off");
    }
    config.managed = ManagedConfig::from_env();
    config.embedding = EmbeddingConfig::from_env();
    config
  }

  /// Sets the embedding dimension.
  pub fn dimension(mut self, dimension: usize) -> Self {
    self.dimension = dimension;
    self
  }

  /// Enables or disables the local vector index tier.
  pub fn local_index(mut self, enabled: bool) -> Self {
    self.local_index = enabled;
    self
  }

  /// Sets the default `top_k`.
  pub fn default_top_k(mut self, top_k: usize) -> Self {
    self.default_top_k = top_k;
    self
  }

  /// Sets the managed index credentials.
  pub fn managed(mut self, managed: ManagedConfig) -> Self {
    self.managed = Some(managed);
    self
  }

  /// Sets the remote embedder settings.
  pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
    self.embedding = Some(embedding);
    self
  }

  /// Validates the configuration.
  pub fn validate(&self) -> Result<(), StoreError> {
    if self.dimension == 0 {
      return Err(StoreError::InvalidConfiguration(
        "embedding dimension must be greater than zero",
      ));
    }
    if self.default_top_k == 0 {
      return Err(StoreError::InvalidConfiguration(
        "default_top_k must be greater than zero",
      ));
    }
    if self.data_dir.as_os_str().is_empty() {
      return Err(StoreError::InvalidConfiguration("data_dir cannot be empty"));
    }
    Ok(())
  }
}

/// Credentials and addressing for the managed index service.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedConfig {
  /// API key sent with every request.
  pub api_key: String,
  /// Region the index is created in when it does not exist yet.
  pub environment: String,
  /// Cloud provider the index is created in when it does not exist yet.
  pub cloud: String,
  /// Name of the index.
  pub index_name: String,
  /// Base URL of the control plane.
  pub controller_url: String,
  /// Per-request timeout.
  pub timeout: Duration,
}

impl ManagedConfig {
  /// Creates a configuration for `index_name` with default addressing.
  pub fn new(api_key: impl Into<String>, index_name: impl Into<String>) -> Self {
    Self {
      api_key: api_key.into(),
      environment: "us-east-1".to_string(),
      cloud: "aws".to_string(),
      index_name: index_name.into(),
      controller_url: DEFAULT_CONTROLLER_URL.to_string(),
      timeout: DEFAULT_REQUEST_TIMEOUT,
    }
  }

  /// Reads `PINECONE_API_KEY`, `PINECONE_ENVIRONMENT` and `VECTOR_INDEX_NAME`.
  ///
  /// Returns `None` when no usable API key is set.
  pub fn from_env() -> Option<Self> {
    let api_key = env_var("PINECONE_API_KEY").filter(|key| is_usable_key(key))?;
    let index_name = env_var("VECTOR_INDEX_NAME").unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string());
    let mut config = Self::new(api_key, index_name);
    if let Some(environment) = env_var("PINECONE_ENVIRONMENT") {
      config.environment = environment;
    }
    Some(config)
  }
}

/// Settings for the OpenAI-compatible embedding endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
  /// Bearer token.
  pub api_key: String,
  /// Model name sent with every request.
  pub model: String,
  /// Base URL, without the trailing `/embeddings`.
  pub base_url: String,
  /// Per-request timeout.
  pub timeout: Duration,
}

impl EmbeddingConfig {
  /// Creates a configuration with the default model and endpoint.
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key: api_key.into(),
      model: DEFAULT_EMBEDDING_MODEL.to_string(),
      base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
      timeout: DEFAULT_REQUEST_TIMEOUT,
    }
  }

  /// Reads `OPENAI_API_KEY`, `EMBEDDING_MODEL` and `EMBEDDING_BASE_URL`.
  pub fn from_env() -> Option<Self> {
    let mut config = Self::new(env_var("OPENAI_API_KEY")?);
    if let Some(model) = env_var("EMBEDDING_MODEL") {
      config.model = model;
    }
    if let Some(base_url) = env_var("EMBEDDING_BASE_URL") {
      config.base_url = base_url;
    }
    Some(config)
  }
}

fn env_var(name: &str) -> Option<String> {
  std::env::var(name)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

fn is_usable_key(key: &str) -> bool {
  !key.is_empty() && key != PLACEHOLDER_API_KEY
}
