//! Pinecone REST client implementing [`ManagedIndex`].

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::ManagedConfig;
use crate::error::ManagedError;
use crate::types::Metadata;

use super::managed::{ManagedIndex, ManagedMatch};

const API_VERSION: &str = "2024-07";

/// A connection to one Pinecone serverless index.
pub struct PineconeIndex {
  http: Client,
  api_key: String,
  host: String,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
  host: String,
  #[serde(default)]
  dimension: Option<usize>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
  vectors: [UpsertVector<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
  id: &'a str,
  values: &'a [f32],
  metadata: &'a Metadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
  vector: &'a [f32],
  top_k: usize,
  include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
  #[serde(default)]
  matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
  id: String,
  #[serde(default)]
  score: f32,
  #[serde(default)]
  metadata: Option<Metadata>,
}

impl PineconeIndex {
  /// Attaches to the configured index, creating it if it does not exist.
  ///
  /// Fails if the index exists with a dimension other than `dimension`.
  pub fn connect(config: &ManagedConfig, dimension: usize) -> Result<Self, ManagedError> {
    if config.api_key.is_empty() {
      return Err(ManagedError::IndexUnavailable(config.index_name.clone()));
    }
    let http = Client::builder().timeout(config.timeout).build()?;
    let controller = config.controller_url.trim_end_matches('/');
    let describe_url = format!("{controller}/indexes/{}", config.index_name);

    let response = authorize(http.get(&describe_url), &config.api_key).send()?;
    let description: IndexDescription = if response.status() == reqwest::StatusCode::NOT_FOUND {
      info!(index = %config.index_name, dimension, "creating managed index");
      let body = create_request(config, dimension);
      let response = authorize(http.post(format!("{controller}/indexes")), &config.api_key)
        .json(&body)
        .send()?;
      check(response)?.json()?
    } else {
      check(response)?.json()?
    };

    if let Some(found) = description.dimension {
      if found != dimension {
        return Err(ManagedError::DimensionMismatch {
          expected: dimension,
          found,
        });
      }
    }
    if description.host.is_empty() {
      return Err(ManagedError::IndexUnavailable(config.index_name.clone()));
    }

    let host = normalize_host(&description.host);
    debug!(index = %config.index_name, host = %host, "attached to managed index");
    Ok(Self {
      http,
      api_key: config.api_key.clone(),
      host,
    })
  }
}

impl ManagedIndex for PineconeIndex {
  fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<(), ManagedError> {
    let body = UpsertRequest {
      vectors: [UpsertVector {
        id,
        values: vector,
        metadata,
      }],
    };
    let response = authorize(self.http.post(format!("{}/vectors/upsert", self.host)), &self.api_key)
      .json(&body)
      .send()?;
    check(response)?;
    Ok(())
  }

  fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ManagedMatch>, ManagedError> {
    let body = QueryRequest {
      vector,
      top_k,
      include_metadata: true,
    };
    let response = authorize(self.http.post(format!("{}/query", self.host)), &self.api_key)
      .json(&body)
      .send()?;
    let parsed: QueryResponse = check(response)?.json()?;
    Ok(into_matches(parsed))
  }
}

fn authorize(request: RequestBuilder, api_key: &str) -> RequestBuilder {
  request
    .header("Api-Key", api_key)
    .header("X-Pinecone-API-Version", API_VERSION)
}

fn check(response: Response) -> Result<Response, ManagedError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().unwrap_or_default();
  Err(ManagedError::Status {
    status: status.as_u16(),
    body,
  })
}

fn create_request(config: &ManagedConfig, dimension: usize) -> serde_json::Value {
  json!({
    "name": config.index_name,
    "dimension": dimension,
    "metric": "cosine",
    "spec": {
      "serverless": {
        "cloud": config.cloud,
        "region": config.environment,
      }
    }
  })
}

fn normalize_host(host: &str) -> String {
  let host = host.trim_end_matches('/');
  if host.starts_with("http://") || host.starts_with("https://") {
    host.to_string()
  } else {
    format!("https://{host}")
  }
}

fn into_matches(response: QueryResponse) -> Vec<ManagedMatch> {
  response
    .matches
    .into_iter()
    .map(|m| ManagedMatch {
      id: m.id,
      score: m.score,
      metadata: m.metadata.unwrap_or_default(),
    })
    .collect()
}
