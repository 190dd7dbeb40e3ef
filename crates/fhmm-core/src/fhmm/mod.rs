//! Factorial HMM engine: combine, decode, de-combine.
//!
//! # Pipeline
//!
//! ```text
//! models ──combine──▶ CombinedFhmm + state tables
//!                          │
//! observations ──decode────┘──▶ joint path ──decombine──▶ per-appliance power
//! ```
//!
//! [`Engine`] runs the stages in order with one [`EngineConfig`]. Each
//! stage is also exposed as a free function.

pub mod combine;
pub mod decode;
pub mod decombine;
pub mod power;

pub use combine::{
    combine, Combination, CombinedFhmm, StateTable, COMBINED_MODEL_NAME, DEFAULT_JOINT_VARIANCE,
};
pub use decode::{decode, score};
pub use decombine::{decombine, ApplianceTrace, ClipPolicy, Decombined};
pub use power::{power_source, MeanPower, NormalPower, PowerSource, PowerSourceKind};

use crate::config::EngineConfig;
use crate::logging::{event_names, Stage};
use crate::model::ApplianceModel;
use fhmm_common::Result;
use std::borrow::Borrow;

/// Runs the disaggregation pipeline under one configuration.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Combine models with the configured joint variance.
    ///
    /// Logs a warning past `max_joint_states`; the size is not enforced.
    pub fn combine<M: Borrow<ApplianceModel>>(&self, models: &[M]) -> Result<Combination> {
        let combination = combine(models, self.config.joint_variance)?;
        let joint_states = combination.fhmm.n_states();
        if joint_states > self.config.max_joint_states {
            tracing::warn!(
                event = event_names::COMBINE_LARGE_STATE_SPACE,
                stage = %Stage::Combine,
                joint_states,
                max_joint_states = self.config.max_joint_states,
                "joint state space is large; decoding costs O(T·N²)"
            );
        }
        Ok(combination)
    }

    /// De-combine a decoded path with the configured power source and clip
    /// policy. A fresh source is built per call, so seeded runs repeat.
    pub fn decombine(
        &self,
        combination: &Combination,
        joint_states: &[usize],
        observations: &[f64],
    ) -> Result<Decombined> {
        let mut source = power_source(self.config.power_source, self.config.seed);
        decombine(
            joint_states,
            observations,
            &combination.means,
            &combination.variances,
            combination.fhmm.appliance_order(),
            source.as_mut(),
            self.config.clip_policy,
        )
    }

    /// Full pipeline: combine, decode, de-combine.
    pub fn disaggregate<M: Borrow<ApplianceModel>>(
        &self,
        models: &[M],
        observations: &[f64],
    ) -> Result<Decombined> {
        let combination = self.combine(models)?;
        self.disaggregate_with(&combination, observations)
    }

    /// Decode and de-combine against an existing combination.
    pub fn disaggregate_with(
        &self,
        combination: &Combination,
        observations: &[f64],
    ) -> Result<Decombined> {
        let joint_states = decode(&combination.fhmm, observations)?;
        let result = self.decombine(combination, &joint_states, observations)?;
        tracing::info!(
            stage = %Stage::Decombine,
            steps = observations.len(),
            appliances = result.appliances.len(),
            clipped = result.clipped,
            "disaggregation complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelRegistry, ModelSelection};
    use fhmm_common::Error;

    fn registry() -> ModelRegistry {
        ModelRegistry::from_models([
            ApplianceModel::from_rows(
                "a",
                vec![0.9, 0.1],
                vec![vec![0.9, 0.1], vec![0.2, 0.8]],
                vec![0.0, 100.0],
                vec![1.0, 1.0],
            )
            .unwrap(),
            ApplianceModel::from_rows(
                "b",
                vec![0.95, 0.05],
                vec![vec![0.9, 0.1], vec![0.2, 0.8]],
                vec![0.0, 50.0],
                vec![1.0, 1.0],
            )
            .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn engine_runs_full_pipeline() {
        let reg = registry();
        let models = reg.select(&ModelSelection::All).unwrap();
        let out = Engine::default()
            .disaggregate(&models, &[0.0, 100.0, 150.0, 50.0, 0.0])
            .unwrap();
        assert_eq!(out.joint_states, vec![0, 2, 3, 1, 0]);
        assert_eq!(out.get(&"a".into()).unwrap().states, vec![0, 1, 1, 0, 0]);
        assert_eq!(out.get(&"b".into()).unwrap().power, vec![0.0, 0.0, 50.0, 50.0, 0.0]);
    }

    #[test]
    fn engine_empty_observation_yields_no_output() {
        let reg = registry();
        let models = reg.select(&ModelSelection::All).unwrap();
        assert!(matches!(
            Engine::default().disaggregate(&models, &[]),
            Err(Error::EmptyObservation)
        ));
    }

    #[test]
    fn engine_seeded_normal_runs_repeat() {
        let reg = registry();
        let models = reg.select(&ModelSelection::All).unwrap();
        let engine = Engine::new(EngineConfig {
            power_source: PowerSourceKind::Normal,
            seed: 9,
            ..Default::default()
        });
        let obs = [0.0, 100.0, 150.0, 50.0, 0.0];
        let first = engine.disaggregate(&models, &obs).unwrap();
        let second = engine.disaggregate(&models, &obs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn engine_uses_configured_variance() {
        let reg = registry();
        let models = reg.select(&ModelSelection::All).unwrap();
        let engine = Engine::new(EngineConfig {
            joint_variance: 12.0,
            max_joint_states: 2,
            ..Default::default()
        });
        let combo = engine.combine(&models).unwrap();
        assert_eq!(combo.fhmm.joint_variance(), 12.0);
        assert_eq!(combo.fhmm.n_states(), 4);
    }
}
