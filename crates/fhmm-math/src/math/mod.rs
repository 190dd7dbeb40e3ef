//! Core math modules.

pub mod gaussian;
pub mod matrix;
pub mod permutation;
pub mod radix;
pub mod stable;
