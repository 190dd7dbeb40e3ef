//! Splitting joint states back into per-appliance states and power.
//!
//! Every estimate is clamped into `[0, max(observed, 0)]`. Under the default
//! [`ClipPolicy::Budget`] appliances are additionally clamped, in order, to
//! what earlier appliances left of the observation, so the per-step sum
//! never exceeds it.

use super::combine::StateTable;
use super::power::PowerSource;
use crate::logging::event_names;
use fhmm_common::{ApplianceKey, Error, Result};
use fhmm_math::MixedRadix;
use serde::{Deserialize, Serialize};

/// How estimates are clipped against the observed total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipPolicy {
    /// Each estimate is clamped to the observation on its own; the
    /// per-step sum may exceed it.
    PerAppliance,
    /// Estimates share the observation as a budget, in appliance order.
    #[default]
    Budget,
}

impl std::fmt::Display for ClipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipPolicy::PerAppliance => write!(f, "per_appliance"),
            ClipPolicy::Budget => write!(f, "budget"),
        }
    }
}

/// Decoded series for one appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceTrace {
    pub key: ApplianceKey,
    /// Canonical state index per step.
    pub states: Vec<usize>,
    /// Reconstructed, clipped power per step.
    pub power: Vec<f64>,
}

/// Output of [`decombine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decombined {
    pub joint_states: Vec<usize>,
    /// One trace per appliance, in combination order.
    pub appliances: Vec<ApplianceTrace>,
    /// Number of estimates that were lowered by clipping.
    pub clipped: usize,
}

impl Decombined {
    pub fn get(&self, key: &ApplianceKey) -> Option<&ApplianceTrace> {
        self.appliances.iter().find(|a| &a.key == key)
    }

    /// Sum of all appliance estimates at each step.
    pub fn total_power(&self) -> Vec<f64> {
        let steps = self.joint_states.len();
        let mut total = vec![0.0; steps];
        for trace in &self.appliances {
            for (t, p) in trace.power.iter().enumerate() {
                total[t] += p;
            }
        }
        total
    }
}

/// Split a joint path into per-appliance states and clipped power.
///
/// State 0 always maps to 0 W. Any other state asks `source` for a value
/// from the state's mean and variance; negative values floor at 0.
///
/// Errors: `LengthMismatch` when the tables, order or observations do not
/// line up, `IndexOutOfRange` for a joint index outside `[0, Π k_i)`.
pub fn decombine(
    joint_states: &[usize],
    observations: &[f64],
    means: &StateTable,
    variances: &StateTable,
    appliance_order: &[ApplianceKey],
    source: &mut dyn PowerSource,
    policy: ClipPolicy,
) -> Result<Decombined> {
    if means.len() != appliance_order.len() {
        return Err(Error::LengthMismatch {
            what: "means table".to_string(),
            expected: appliance_order.len(),
            got: means.len(),
        });
    }
    if variances.radices() != means.radices() {
        return Err(Error::LengthMismatch {
            what: "variances table".to_string(),
            expected: means.radices().iter().sum(),
            got: variances.radices().iter().sum(),
        });
    }
    if observations.len() != joint_states.len() {
        return Err(Error::LengthMismatch {
            what: "observations".to_string(),
            expected: joint_states.len(),
            got: observations.len(),
        });
    }
    let radix = MixedRadix::new(means.radices()).ok_or_else(|| Error::DimensionMismatch {
        appliance: super::combine::COMBINED_MODEL_NAME.to_string(),
        detail: "means table has an appliance without states".to_string(),
    })?;

    let steps = joint_states.len();
    let mut appliances: Vec<ApplianceTrace> = appliance_order
        .iter()
        .map(|key| ApplianceTrace {
            key: key.clone(),
            states: Vec::with_capacity(steps),
            power: Vec::with_capacity(steps),
        })
        .collect();
    let mut clipped = 0usize;

    for (step, (&joint, &observed)) in joint_states.iter().zip(observations).enumerate() {
        let digits = radix.decode(joint).ok_or(Error::IndexOutOfRange {
            step,
            index: joint,
            bound: radix.size(),
        })?;
        let ceiling = observed.max(0.0);
        let mut remaining = ceiling;

        for (position, (trace, &state)) in appliances.iter_mut().zip(&digits).enumerate() {
            let raw = if state == 0 {
                0.0
            } else {
                // Digits are bounded by the radices, which come from these tables.
                let mean = means.value(position, state).unwrap_or(0.0);
                let variance = variances.value(position, state).unwrap_or(0.0);
                source.power(mean, variance).max(0.0)
            };
            let cap = match policy {
                ClipPolicy::PerAppliance => ceiling,
                ClipPolicy::Budget => remaining,
            };
            let estimate = raw.min(cap);
            if estimate < raw {
                clipped += 1;
            }
            remaining = (remaining - estimate).max(0.0);
            trace.states.push(state);
            trace.power.push(estimate);
        }
    }

    if clipped > 0 {
        tracing::debug!(
            event = event_names::DECOMBINE_CLIPPED,
            clipped,
            policy = %policy,
            "clipped estimates to the observed total"
        );
    }
    tracing::debug!(
        event = event_names::DECOMBINE_DONE,
        steps,
        appliances = appliances.len(),
        "de-combined joint states"
    );

    Ok(Decombined {
        joint_states: joint_states.to_vec(),
        appliances,
        clipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhmm::power::{MeanPower, NormalPower};

    fn tables() -> (StateTable, StateTable, Vec<ApplianceKey>) {
        (
            StateTable::new(vec![vec![0.0, 100.0], vec![0.0, 50.0]]),
            StateTable::new(vec![vec![1.0, 25.0], vec![1.0, 9.0]]),
            vec!["a".into(), "b".into()],
        )
    }

    #[test]
    fn splits_joint_indices_in_kronecker_order() {
        let (means, vars, order) = tables();
        let out = decombine(
            &[0, 2, 3, 1, 0],
            &[0.0, 100.0, 150.0, 50.0, 0.0],
            &means,
            &vars,
            &order,
            &mut MeanPower,
            ClipPolicy::PerAppliance,
        )
        .unwrap();
        assert_eq!(out.appliances[0].states, vec![0, 1, 1, 0, 0]);
        assert_eq!(out.appliances[1].states, vec![0, 0, 1, 1, 0]);
        assert_eq!(out.appliances[0].power, vec![0.0, 100.0, 100.0, 0.0, 0.0]);
        assert_eq!(out.appliances[1].power, vec![0.0, 0.0, 50.0, 50.0, 0.0]);
        assert_eq!(out.clipped, 0);
        assert_eq!(out.total_power(), vec![0.0, 100.0, 150.0, 50.0, 0.0]);
    }

    #[test]
    fn per_appliance_clip_to_observation() {
        let (means, vars, order) = tables();
        let out = decombine(
            &[3],
            &[80.0],
            &means,
            &vars,
            &order,
            &mut MeanPower,
            ClipPolicy::PerAppliance,
        )
        .unwrap();
        assert_eq!(out.appliances[0].power, vec![80.0]);
        assert_eq!(out.appliances[1].power, vec![50.0]);
        assert_eq!(out.clipped, 1);
    }

    #[test]
    fn budget_clip_bounds_the_sum() {
        let (means, vars, order) = tables();
        let out = decombine(
            &[3],
            &[120.0],
            &means,
            &vars,
            &order,
            &mut MeanPower,
            ClipPolicy::Budget,
        )
        .unwrap();
        assert_eq!(out.appliances[0].power, vec![100.0]);
        assert_eq!(out.appliances[1].power, vec![20.0]);
        assert_eq!(out.total_power(), vec![120.0]);
    }

    #[test]
    fn negative_observation_forces_zero() {
        let (means, vars, order) = tables();
        let out = decombine(
            &[3],
            &[-5.0],
            &means,
            &vars,
            &order,
            &mut MeanPower,
            ClipPolicy::PerAppliance,
        )
        .unwrap();
        assert_eq!(out.appliances[0].power, vec![0.0]);
        assert_eq!(out.appliances[1].power, vec![0.0]);
    }

    #[test]
    fn out_of_range_joint_index() {
        let (means, vars, order) = tables();
        let err = decombine(
            &[0, 4],
            &[0.0, 0.0],
            &means,
            &vars,
            &order,
            &mut MeanPower,
            ClipPolicy::PerAppliance,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::IndexOutOfRange {
                step: 1,
                index: 4,
                bound: 4
            }
        ));
    }

    #[test]
    fn misaligned_observations_rejected() {
        let (means, vars, order) = tables();
        let err = decombine(
            &[0, 1],
            &[0.0],
            &means,
            &vars,
            &order,
            &mut MeanPower,
            ClipPolicy::PerAppliance,
        )
        .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
    }

    #[test]
    fn order_must_match_tables() {
        let (means, vars, _) = tables();
        let err = decombine(
            &[0],
            &[0.0],
            &means,
            &vars,
            &["only".into()],
            &mut MeanPower,
            ClipPolicy::PerAppliance,
        )
        .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
    }

    #[test]
    fn seeded_normal_source_is_reproducible_and_bounded() {
        let (means, vars, order) = tables();
        let joint = [3, 3, 2, 1, 3];
        let obs = [150.0, 140.0, 100.0, 50.0, 200.0];
        let run = |seed| {
            decombine(
                &joint,
                &obs,
                &means,
                &vars,
                &order,
                &mut NormalPower::seeded(seed),
                ClipPolicy::PerAppliance,
            )
            .unwrap()
        };
        let first = run(42);
        assert_eq!(first, run(42));
        for trace in &first.appliances {
            for (p, o) in trace.power.iter().zip(obs) {
                assert!(*p >= 0.0 && *p <= o);
            }
        }
    }

    #[test]
    fn off_state_never_consults_source() {
        struct Panicking;
        impl PowerSource for Panicking {
            fn power(&mut self, _: f64, _: f64) -> f64 {
                panic!("off state must not draw power");
            }
        }
        let (means, vars, order) = tables();
        let out = decombine(
            &[0, 0],
            &[10.0, 10.0],
            &means,
            &vars,
            &order,
            &mut Panicking,
            ClipPolicy::PerAppliance,
        )
        .unwrap();
        assert_eq!(out.total_power(), vec![0.0, 0.0]);
    }
}
