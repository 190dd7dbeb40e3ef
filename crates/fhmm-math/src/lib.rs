//! FHMM math utilities.

pub mod math;

pub use math::gaussian::*;
pub use math::matrix::{kron_all, kron_vec, kron_vec_all, Matrix, ShapeError};
pub use math::permutation::Permutation;
pub use math::radix::MixedRadix;
pub use math::stable::*;
