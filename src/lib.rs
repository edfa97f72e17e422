//! Tierstore - A text retrieval store that degrades gracefully.
//!
//! Tierstore indexes short snippets of text with metadata and answers
//! similarity queries over them. It serves requests from the strongest
//! backend it can reach: a managed vector index service, a local vector
//! index persisted under a data directory, or a keyword brute-force scan
//! that needs nothing but the filesystem. When a backend fails the store
//! moves to the next weaker one and keeps answering.

pub mod config;
pub mod controller;
pub mod embeddings;
pub mod error;
pub mod ids;
pub mod index;
pub mod persistence;
pub mod store;
pub mod tiers;
pub mod tokenizer;
pub mod types;

pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::controller::Capabilities;
    pub use crate::embeddings::{Embedder, TextEmbedder};
    pub use crate::error::*;
    pub use crate::store::*;
    pub use crate::tiers::{ManagedIndex, ManagedMatch};
    pub use crate::types::*;
}
