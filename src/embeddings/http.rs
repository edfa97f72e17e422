//! OpenAI-compatible `/embeddings` client.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::EmbedError;

use super::TextEmbedder;

/// Embedder backed by an OpenAI-compatible HTTP endpoint.
pub struct HttpEmbedder {
  config: EmbeddingConfig,
  http: Client,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  #[serde(default)]
  index: usize,
  embedding: Vec<f32>,
}

impl HttpEmbedder {
  /// Builds the HTTP client. Fails if the client cannot be constructed.
  pub fn new(config: EmbeddingConfig) -> Result<Self, EmbedError> {
    if config.api_key.is_empty() {
      return Err(EmbedError::Provider("embedding api key is empty".into()));
    }
    let http = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { config, http })
  }

  fn endpoint(&self) -> String {
    format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
  }
}

impl TextEmbedder for HttpEmbedder {
  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
    self
      .embed_batch(&[text])?
      .into_iter()
      .next()
      .ok_or_else(|| EmbedError::Provider("provider returned no embeddings".into()))
  }

  fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
    let request = EmbeddingRequest {
      model: &self.config.model,
      input: texts,
    };
    let response = self
      .http
      .post(self.endpoint())
      .bearer_auth(&self.config.api_key)
      .json(&request)
      .send()?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_default();
      return Err(EmbedError::Provider(format!("status {status}: {body}")));
    }
    let parsed: EmbeddingResponse = response.json()?;
    into_vectors(parsed, texts.len())
  }
}

fn into_vectors(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
  let mut data = response.data;
  if data.len() != expected {
    return Err(EmbedError::Provider(format!(
      "expected {expected} embeddings, received {}",
      data.len()
    )));
  }
  data.sort_by_key(|entry| entry.index);
  Ok(data.into_iter().map(|entry| entry.embedding).collect())
}
