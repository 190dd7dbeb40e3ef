//! Dense row-major matrices and Kronecker (tensor) products.
//!
//! The factorial model's joint prior and transition matrix are the
//! Kronecker products of the per-chain priors and transition matrices:
//!
//! - `(A ⊗ B)[i·p + k, j·q + l] = A[i, j] · B[k, l]` for `B` of shape `p×q`
//! - `(a ⊗ b)[i·|b| + k] = a[i] · b[k]`
//!
//! The left operand varies slowest, which fixes the flat joint-state order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when matrix data does not describe a rectangular shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid matrix shape: {detail}")]
pub struct ShapeError {
    /// Human-readable description of the offending shape.
    pub detail: String,
}

/// Dense `rows × cols` matrix of `f64` stored row-major.
///
/// Serializes as a list of rows so request documents can write
/// `[[0.9, 0.1], [0.2, 0.8]]` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Build a matrix from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, ShapeError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(ShapeError {
                detail: format!("{}x{} needs {} values, got {}", rows, cols, rows.saturating_mul(cols), data.len()),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from a list of equally long rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ShapeError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(ShapeError {
                    detail: format!("row {} has {} columns, expected {}", i, row.len(), n_cols),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// `n × n` identity.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Entry at `(r, c)`. Panics when out of bounds, like slice indexing.
    pub fn get(&self, r: usize, c: usize) -> f64 {
        assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        self.data[r * self.cols + c] = value;
    }

    /// Row `r` as a slice.
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Iterate over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics; an empty matrix has no rows to yield.
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Sum of each row.
    pub fn row_sums(&self) -> Vec<f64> {
        self.iter_rows().map(|row| row.iter().sum()).collect()
    }

    /// Raw row-major data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy out as a list of rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }

    /// Kronecker product `self ⊗ other`.
    pub fn kron(&self, other: &Matrix) -> Matrix {
        let rows = self.rows * other.rows;
        let cols = self.cols * other.cols;
        let mut data = vec![0.0; rows * cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                let a = self.data[i * self.cols + j];
                if a == 0.0 {
                    continue;
                }
                for k in 0..other.rows {
                    let out_row = i * other.rows + k;
                    let base = out_row * cols + j * other.cols;
                    let b_row = other.row(k);
                    for (l, &b) in b_row.iter().enumerate() {
                        data[base + l] = a * b;
                    }
                }
            }
        }
        Matrix { rows, cols, data }
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Matrix::from_rows(rows)
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(m: Matrix) -> Self {
        m.to_rows()
    }
}

/// Kronecker product of two vectors.
pub fn kron_vec(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for &x in a {
        for &y in b {
            out.push(x * y);
        }
    }
    out
}

/// Left-to-right Kronecker product of a sequence of vectors.
///
/// Returns None for an empty sequence.
pub fn kron_vec_all<'a, I>(vectors: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut iter = vectors.into_iter();
    let first = iter.next()?.to_vec();
    Some(iter.fold(first, |acc, v| kron_vec(&acc, v)))
}

/// Left-to-right Kronecker product of a sequence of matrices.
///
/// Returns None for an empty sequence.
pub fn kron_all<'a, I>(matrices: I) -> Option<Matrix>
where
    I: IntoIterator<Item = &'a Matrix>,
{
    let mut iter = matrices.into_iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, m| acc.kron(m)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn shape_error_is_a_std_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(Matrix::new(2, 2, vec![1.0; 3]).unwrap_err());
        assert_eq!(err.to_string(), "invalid matrix shape: 2x2 needs 4 values, got 3");
        assert!(err.source().is_none());

        let ragged = serde_json::from_str::<Matrix>("[[1.0, 2.0], [3.0]]").unwrap_err();
        assert!(ragged.to_string().contains("invalid matrix shape: row 1"), "{}", ragged);
    }

    #[test]
    fn new_checks_length() {
        assert!(Matrix::new(2, 2, vec![1.0; 3]).is_err());
        assert!(Matrix::new(2, 3, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn kron_of_2x2_matches_hand_expansion() {
        let a = m(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = m(vec![vec![0.0, 5.0], vec![6.0, 7.0]]);
        let k = a.kron(&b);
        assert_eq!(k.rows(), 4);
        assert_eq!(k.cols(), 4);
        assert_eq!(
            k.to_rows(),
            vec![
                vec![0.0, 5.0, 0.0, 10.0],
                vec![6.0, 7.0, 12.0, 14.0],
                vec![0.0, 15.0, 0.0, 20.0],
                vec![18.0, 21.0, 24.0, 28.0],
            ]
        );
    }

    #[test]
    fn kron_with_identity_is_block_diagonal() {
        let a = m(vec![vec![0.5, 0.5], vec![0.1, 0.9]]);
        let k = Matrix::identity(2).kron(&a);
        assert_eq!(k.get(0, 0), 0.5);
        assert_eq!(k.get(3, 3), 0.9);
        assert_eq!(k.get(0, 2), 0.0);
    }

    #[test]
    fn kron_vec_left_varies_slowest() {
        let out = kron_vec(&[0.9, 0.1], &[0.95, 0.05]);
        let expected = [0.855, 0.045, 0.095, 0.005];
        for (o, e) in out.iter().zip(expected.iter()) {
            assert!((o - e).abs() < 1e-12);
        }
    }

    #[test]
    fn kron_all_empty_is_none() {
        assert!(kron_all(std::iter::empty::<&Matrix>()).is_none());
        assert!(kron_vec_all(std::iter::empty::<&[f64]>()).is_none());
    }

    #[test]
    fn kron_all_three_factors_shape() {
        let a = Matrix::identity(2);
        let b = Matrix::identity(3);
        let c = Matrix::identity(2);
        let k = kron_all([&a, &b, &c]).unwrap();
        assert_eq!(k.rows(), 12);
        assert_eq!(k, Matrix::identity(12));
    }

    #[test]
    fn row_sums_and_iter_rows() {
        let a = m(vec![vec![0.2, 0.8], vec![0.6, 0.3]]);
        let sums = a.row_sums();
        assert!((sums[0] - 1.0).abs() < 1e-12);
        assert!((sums[1] - 0.9).abs() < 1e-12);
        assert_eq!(Matrix::zeros(0, 0).iter_rows().count(), 0);
    }

    #[test]
    fn serde_as_nested_rows() {
        let a = m(vec![vec![0.9, 0.1], vec![0.2, 0.8]]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "[[0.9,0.1],[0.2,0.8]]");
        let back: Matrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
        assert!(serde_json::from_str::<Matrix>("[[1.0],[1.0,2.0]]").is_err());
    }
}
