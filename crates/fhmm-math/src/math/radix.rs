//! Mixed-radix addressing of a Cartesian product of small state spaces.
//!
//! A joint state over chains with `k_0, k_1, ..., k_{n-1}` states is
//! addressed either as a tuple `(s_0, ..., s_{n-1})` or as a flat index
//!
//! `flat = Σ_i s_i · stride_i` where `stride_i = Π_{j>i} k_j`.
//!
//! The first chain varies slowest, matching the axis order of a
//! left-to-right Kronecker product.

use serde::{Deserialize, Serialize};

/// Mixed-radix codec for a fixed sequence of radices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixedRadix {
    radices: Vec<usize>,
    strides: Vec<usize>,
    size: usize,
}

impl MixedRadix {
    /// Create a codec for the given radices.
    ///
    /// Returns None if the list is empty, any radix is zero, or the product
    /// overflows `usize`.
    pub fn new(radices: Vec<usize>) -> Option<Self> {
        if radices.is_empty() || radices.contains(&0) {
            return None;
        }
        let mut strides = vec![1usize; radices.len()];
        let mut size = 1usize;
        for i in (0..radices.len()).rev() {
            strides[i] = size;
            size = size.checked_mul(radices[i])?;
        }
        Some(Self {
            radices,
            strides,
            size,
        })
    }

    /// Per-position radix (state count).
    pub fn radices(&self) -> &[usize] {
        &self.radices
    }

    /// Per-position stride in the flat index.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of positions (chains).
    pub fn len(&self) -> usize {
        self.radices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radices.is_empty()
    }

    /// Total number of joint states, `Π k_i`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flat index to per-position digits.
    ///
    /// Returns None if `flat >= size()`.
    pub fn decode(&self, flat: usize) -> Option<Vec<usize>> {
        if flat >= self.size {
            return None;
        }
        let mut digits = Vec::with_capacity(self.radices.len());
        self.decode_into(flat, &mut digits);
        Some(digits)
    }

    /// Decode into a reusable buffer. Caller guarantees `flat < size()`.
    pub(crate) fn decode_into(&self, flat: usize, out: &mut Vec<usize>) {
        out.clear();
        for (&stride, &radix) in self.strides.iter().zip(self.radices.iter()) {
            out.push((flat / stride) % radix);
        }
    }

    /// Digit at one position of a flat index.
    ///
    /// Returns None if `flat` or `position` is out of range.
    pub fn digit(&self, flat: usize, position: usize) -> Option<usize> {
        if flat >= self.size || position >= self.radices.len() {
            return None;
        }
        Some((flat / self.strides[position]) % self.radices[position])
    }

    /// Per-position digits to flat index.
    ///
    /// Returns None on length mismatch or when any digit exceeds its radix.
    pub fn encode(&self, digits: &[usize]) -> Option<usize> {
        if digits.len() != self.radices.len() {
            return None;
        }
        let mut flat = 0;
        for ((&d, &radix), &stride) in digits.iter().zip(&self.radices).zip(&self.strides) {
            if d >= radix {
                return None;
            }
            flat += d * stride;
        }
        Some(flat)
    }

    /// Enumerate every digit tuple in flat-index order.
    ///
    /// This is the same order as a nested loop with the first position
    /// outermost.
    pub fn iter(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        let mut buf = Vec::with_capacity(self.radices.len());
        (0..self.size).map(move |flat| {
            self.decode_into(flat, &mut buf);
            buf.clone()
        })
    }
}
