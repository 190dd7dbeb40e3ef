//! Power reconstruction for decoded appliance states.
//!
//! The off state (index 0) never reaches a power source; it is always 0 W.
//! Draws are floored at zero by the caller.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Which power source an engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSourceKind {
    /// The state's emission mean.
    #[default]
    Mean,
    /// A seeded draw from `N(mean, variance)`.
    Normal,
}

impl std::fmt::Display for PowerSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerSourceKind::Mean => write!(f, "mean"),
            PowerSourceKind::Normal => write!(f, "normal"),
        }
    }
}

/// Turns a decoded state's emission parameters into a power estimate.
pub trait PowerSource {
    fn power(&mut self, mean: f64, variance: f64) -> f64;
}

/// Deterministic source: the emission mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanPower;

impl PowerSource for MeanPower {
    fn power(&mut self, mean: f64, _variance: f64) -> f64 {
        mean
    }
}

/// Stochastic source drawing from `N(mean, sqrt(variance))`.
#[derive(Debug, Clone)]
pub struct NormalPower<R> {
    rng: R,
}

impl<R: Rng> NormalPower<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl NormalPower<ChaCha8Rng> {
    /// Reproducible source: the same seed yields the same draws.
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> PowerSource for NormalPower<R> {
    fn power(&mut self, mean: f64, variance: f64) -> f64 {
        match Normal::new(mean, variance.max(0.0).sqrt()) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => mean,
        }
    }
}

/// Construct the configured power source.
pub fn power_source(kind: PowerSourceKind, seed: u64) -> Box<dyn PowerSource> {
    match kind {
        PowerSourceKind::Mean => Box::new(MeanPower),
        PowerSourceKind::Normal => Box::new(NormalPower::seeded(seed)),
    }
}
