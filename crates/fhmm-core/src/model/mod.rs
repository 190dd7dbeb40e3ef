//! Appliance models, the model registry and candidate scoring.

pub mod appliance;
pub mod registry;
pub mod scoring;

pub use appliance::{ApplianceModel, OnOffParams, STOCHASTIC_TOLERANCE};
pub use registry::{ModelRegistry, ModelSelection};
pub use scoring::{rank_candidates, CandidateScore, Ranking};
