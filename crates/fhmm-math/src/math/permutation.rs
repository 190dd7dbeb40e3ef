//! Explicit index permutations for canonical state ordering.
//!
//! A permutation `p` maps new position `i` to old position `p[i]`, so
//! `new[i] = old[p[i]]`. For a transition matrix both axes move together:
//! `new[i][j] = old[p[i]][p[j]]`.

use crate::math::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A permutation of `0..n`, stored as the source index for each target slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Wrap an explicit mapping.
    ///
    /// Returns None unless every index in `0..n` appears exactly once.
    pub fn new(mapping: Vec<usize>) -> Option<Self> {
        let n = mapping.len();
        let mut seen = vec![false; n];
        for &src in &mapping {
            if src >= n || seen[src] {
                return None;
            }
            seen[src] = true;
        }
        Some(Self(mapping))
    }

    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// The permutation that sorts `keys` ascending.
    ///
    /// Stable: equal keys keep their original relative order. NaN keys sort
    /// last.
    pub fn sorting(keys: &[f64]) -> Self {
        let mut idx: Vec<usize> = (0..keys.len()).collect();
        idx.sort_by(|&a, &b| match (keys[a].is_nan(), keys[b].is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => keys[a].partial_cmp(&keys[b]).unwrap_or(Ordering::Equal),
        });
        Self(idx)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &src)| i == src)
    }

    /// Source index for each target slot.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// The permutation that undoes this one.
    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.0.len()];
        for (target, &src) in self.0.iter().enumerate() {
            inv[src] = target;
        }
        Self(inv)
    }

    /// Reorder a vector: `out[i] = values[p[i]]`.
    ///
    /// Returns None on length mismatch.
    pub fn apply<T: Clone>(&self, values: &[T]) -> Option<Vec<T>> {
        if values.len() != self.0.len() {
            return None;
        }
        Some(self.0.iter().map(|&src| values[src].clone()).collect())
    }

    /// Reorder rows and columns of a square matrix together:
    /// `out[i][j] = m[p[i]][p[j]]`.
    ///
    /// Returns None unless `m` is square with side `len()`.
    pub fn apply_square(&self, m: &Matrix) -> Option<Matrix> {
        let n = self.0.len();
        if m.rows() != n || m.cols() != n {
            return None;
        }
        let mut out = Matrix::zeros(n, n);
        for (i, &pi) in self.0.iter().enumerate() {
            for (j, &pj) in self.0.iter().enumerate() {
                out.set(i, j, m.get(pi, pj));
            }
        }
        Some(out)
    }
}
