//! In-process vector index used by the local tier.

pub mod flat;

pub use flat::{FlatL2Index, Neighbor};
