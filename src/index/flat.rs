//! Exact nearest-neighbour index over squared L2 distance.

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::TierError;

/// A neighbour returned by [`FlatL2Index::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the matched vector.
    pub position: usize,
    /// Squared L2 distance to the query.
    pub distance: f32,
}

/// Flat index storing vectors row-major in insertion order.
///
/// Positions are dense and assigned in insertion order, so the caller can
/// keep a parallel arena of payloads addressed by the same position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatL2Index {
    /// Create a new empty index for vectors of length `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector, returning its position.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize, TierError> {
        self.check_dimension(vector)?;
        let position = self.len();
        self.vectors.extend_from_slice(vector);
        Ok(position)
    }

    /// Return the `k` nearest vectors, closest first.
    ///
    /// Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, TierError> {
        self.check_dimension(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        #[cfg(feature = "parallel")]
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .par_chunks(self.dimension)
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: squared_l2(query, v),
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .chunks(self.dimension)
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: squared_l2(query, v),
            })
            .collect();

        // Stable sort keeps insertion order among ties.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), TierError> {
        if vector.len() != self.dimension {
            return Err(TierError::DimensionMismatch {
                expected: self.dimension,
                found: vector.len(),
            });
        }
        Ok(())
    }
}

/// Squared Euclidean distance between two vectors of equal length.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(rows: &[[f32; 2]]) -> FlatL2Index {
        let mut index = FlatL2Index::new(2);
        for row in rows {
            index.add(row).unwrap();
        }
        index
    }

    #[test]
    fn positions_follow_insertion_order() {
        let mut index = FlatL2Index::new(2);
        assert_eq!(index.add(&[1.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(&[0.0, 1.0]).unwrap(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn search_ranks_by_squared_distance() {
        let index = index_with(&[[0.0, 3.0], [1.0, 0.0], [2.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 1);
        assert!((hits[0].distance - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].position, 2);
        assert!((hits[1].distance - 4.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = index_with(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]]);
        let positions: Vec<usize> = index
            .search(&[0.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|n| n.position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn nan_distances_rank_last() {
        let index = index_with(&[[f32::NAN, 0.0], [2.0, 0.0], [1.0, 0.0]]);
        let positions: Vec<usize> = index
            .search(&[0.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|n| n.position)
            .collect();
        assert_eq!(positions, vec![2, 1, 0]);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut index = FlatL2Index::new(2);
        assert!(matches!(
            index.add(&[1.0, 2.0, 3.0]),
            Err(TierError::DimensionMismatch { expected: 2, found: 3 })
        ));
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 1).is_err());
    }
}
