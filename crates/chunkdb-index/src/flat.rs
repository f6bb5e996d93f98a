//! Brute-force flat vector index.
//!
//! Corpus sizes here are bounded by a single user's document set, so an
//! O(n*d) scan with squared Euclidean distance is acceptable and keeps
//! nearest-neighbor results exact and reproducible.

use serde::{Deserialize, Serialize};

use chunkdb_core::error::{Error, Result};

/// Dense row-major storage of fixed-dimension vectors, searchable by
/// squared-L2 distance. Row position is the global index position:
/// assigned at append time, never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig(
                "vector dimension must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            dim,
            data: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        Some(&self.data[position * self.dim..(position + 1) * self.dim])
    }

    /// Append a batch of vectors. Dimensions are validated up front so a
    /// failed batch leaves the index untouched.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for v in vectors {
            if v.len() != self.dim {
                return Err(Error::DimensionMismatch {
                    expected: self.dim,
                    actual: v.len(),
                });
            }
        }
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// Exact k-nearest-neighbor search: the `k` smallest squared-L2
    /// distances in ascending order, ties broken by ascending position so
    /// the earlier-appended vector wins. `k` larger than the stored count
    /// returns everything.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, row)| (position, squared_l2(query, row)))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
