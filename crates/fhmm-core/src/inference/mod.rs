//! Inference engines for scalar-emission hidden Markov models.

pub mod gaussian_hmm;

pub use gaussian_hmm::GaussianHmm;
