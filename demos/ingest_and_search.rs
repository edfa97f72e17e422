//! Ingests a few notes and queries them.
//!
//! Reads its configuration from the environment. Without `OPENAI_API_KEY`
//! the demo embeds locally with `HashingEmbedder`, so it runs offline.
//!
//! ```text
//! RUST_LOG=tierstore=debug cargo run --example ingest_and_search -- "gold outlook"
//! ```

use serde_json::json;
use tierstore::embeddings::HashingEmbedder;
use tierstore::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn notes() -> Vec<(&'static str, Metadata)> {
  let meta = |source: &str, kind: &str| {
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), json!(source));
    metadata.insert("content_type".into(), json!(kind));
    metadata
  };
  vec![
    ("Gold price trend turned higher after the rate decision.", meta("weekly.pdf", "market_update")),
    ("Support and resistance levels for XAUUSD this week.", meta("levels.png", "chart_analysis")),
    ("Central banks added to gold reserves for the third quarter.", meta("reserves.pdf", "report")),
    ("Risk management: never move a stop loss further away.", meta("handbook.pdf", "education")),
  ]
}

fn main() -> Result<(), StoreError> {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_target(false))
    .init();

  let config = StoreConfig::from_env();
  let store = if config.embedding.is_some() {
    RetrievalStore::from_config(config)?
  } else {
    let dimension = config.dimension;
    RetrievalStore::builder(config)
      .embedder(Box::new(HashingEmbedder::new(dimension)))
      .build()?
  };

  if store.is_empty() {
    for (text, metadata) in notes() {
      let id = store.add_item(text, metadata, None)?;
      println!("stored #{id}: {text}");
    }
  }

  let query = std::env::args()
    .skip(1)
    .collect::<Vec<_>>()
    .join(" ");
  let query = if query.trim().is_empty() { "gold price".to_string() } else { query };

  let tier = store.tier();
  let order = if tier.higher_is_better() { "higher is better" } else { "lower is better" };
  println!("\n{tier} tier, {} items, query {query:?} (score: {order})", store.len());
  for hit in store.search(&query, None)? {
    let text = hit.text.as_deref().unwrap_or("<text not returned by tier>");
    println!("  [{:>8.4}] #{} {} {}", hit.score, hit.id, text, json!(hit.metadata));
  }
  Ok(())
}
