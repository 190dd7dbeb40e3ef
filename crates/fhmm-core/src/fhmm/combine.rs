//! Kronecker composition of per-appliance HMMs into one joint chain.
//!
//! For appliances `1..=m` with `k_i` states each:
//!
//! - joint prior      `π = π_1 ⊗ π_2 ⊗ … ⊗ π_m`
//! - joint transition `A = A_1 ⊗ A_2 ⊗ … ⊗ A_m`
//! - joint mean       `μ(s) = Σ_i μ_i(s_i)` over the decoded tuple of `s`
//! - joint variance   one shared constant
//!
//! The Kronecker order makes the first appliance the slowest-varying digit
//! of the flat joint index, which is exactly the [`MixedRadix`] layout.

use crate::inference::GaussianHmm;
use crate::logging::event_names;
use crate::model::ApplianceModel;
use fhmm_common::{ApplianceKey, Error, Result};
use fhmm_math::{kron_all, kron_vec_all, Matrix, MixedRadix};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;

/// Shared emission variance of every joint state unless configured.
pub const DEFAULT_JOINT_VARIANCE: f64 = 5.0;

/// Name used for the combined model in errors and logs.
pub const COMBINED_MODEL_NAME: &str = "combined";

/// Per-appliance, per-state values (means or variances) in appliance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateTable(Vec<Vec<f64>>);

impl StateTable {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self(rows)
    }

    /// Number of appliances.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values for the appliance at `position`.
    pub fn appliance(&self, position: usize) -> Option<&[f64]> {
        self.0.get(position).map(Vec::as_slice)
    }

    /// Value for one appliance state.
    pub fn value(&self, position: usize, state: usize) -> Option<f64> {
        self.0.get(position)?.get(state).copied()
    }

    /// State count of every appliance.
    pub fn radices(&self) -> Vec<usize> {
        self.0.iter().map(Vec::len).collect()
    }
}

/// The joint chain built from an ordered set of appliance models.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedFhmm {
    appliance_order: Vec<ApplianceKey>,
    radix: MixedRadix,
    prior: Vec<f64>,
    transition: Matrix,
    joint_means: Vec<f64>,
    joint_variance: f64,
}

impl CombinedFhmm {
    /// Appliance keys in combination order.
    pub fn appliance_order(&self) -> &[ApplianceKey] {
        &self.appliance_order
    }

    /// Flat index layout of the joint state space.
    pub fn radix(&self) -> &MixedRadix {
        &self.radix
    }

    /// Number of joint states, `Π k_i`.
    pub fn n_states(&self) -> usize {
        self.radix.size()
    }

    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    pub fn joint_means(&self) -> &[f64] {
        &self.joint_means
    }

    pub fn joint_variance(&self) -> f64 {
        self.joint_variance
    }

    /// Scalar Gaussian HMM over the joint states.
    pub fn to_hmm(&self) -> Result<GaussianHmm> {
        GaussianHmm::new(
            COMBINED_MODEL_NAME,
            &self.prior,
            &self.transition,
            self.joint_means.clone(),
            vec![self.joint_variance; self.n_states()],
        )
    }
}

/// Output of [`combine`]: the joint chain plus the per-appliance tables the
/// de-combiner needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub fhmm: CombinedFhmm,
    pub means: StateTable,
    pub variances: StateTable,
}

/// Compose appliance models, in the given order, into one joint chain.
///
/// Models are used as given. Register them through
/// [`ModelRegistry`](crate::model::ModelRegistry) first to get canonical
/// state order (state 0 = lowest mean).
///
/// Errors: `NoModels` for an empty list, `DuplicateAppliance` for a
/// repeated key, `DimensionMismatch`/`InvalidModel` for a malformed model
/// or a joint space too large to index, `Config` for a non-positive joint
/// variance.
pub fn combine<M: Borrow<ApplianceModel>>(models: &[M], joint_variance: f64) -> Result<Combination> {
    if models.is_empty() {
        return Err(Error::NoModels);
    }
    if !joint_variance.is_finite() || joint_variance <= 0.0 {
        return Err(Error::Config(format!(
            "joint_variance must be finite and > 0, got {}",
            joint_variance
        )));
    }

    let models: Vec<&ApplianceModel> = models.iter().map(Borrow::<ApplianceModel>::borrow).collect();
    let mut seen = HashSet::new();
    for model in &models {
        model.validate()?;
        if !seen.insert(model.key()) {
            return Err(Error::DuplicateAppliance {
                key: model.key().to_string(),
            });
        }
    }

    let radices: Vec<usize> = models.iter().map(|m| m.n_states()).collect();
    let radix = MixedRadix::new(radices.clone()).ok_or_else(|| Error::DimensionMismatch {
        appliance: COMBINED_MODEL_NAME.to_string(),
        detail: format!("joint state space {:?} overflows the index type", radices),
    })?;

    let prior = kron_vec_all(models.iter().map(|m| m.prior())).ok_or(Error::NoModels)?;
    let transition = kron_all(models.iter().map(|m| m.transition())).ok_or(Error::NoModels)?;
    let joint_means = sum_means(models.iter().map(|m| m.means()));

    let appliance_order: Vec<ApplianceKey> = models.iter().map(|m| m.key().clone()).collect();
    let means = StateTable::new(models.iter().map(|m| m.means().to_vec()).collect());
    let variances = StateTable::new(models.iter().map(|m| m.variances().to_vec()).collect());

    tracing::debug!(
        event = event_names::COMBINE_DONE,
        appliances = appliance_order.len(),
        joint_states = radix.size(),
        joint_variance,
        "combined appliance models"
    );

    Ok(Combination {
        fhmm: CombinedFhmm {
            appliance_order,
            radix,
            prior,
            transition,
            joint_means,
            joint_variance,
        },
        means,
        variances,
    })
}

/// Cartesian-sum of mean lists in Kronecker order:
/// `out[i·k + s] = acc[i] + means[s]` folded left to right.
fn sum_means<'a, I>(mean_lists: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    mean_lists.into_iter().fold(vec![0.0], |acc, means| {
        acc.iter()
            .flat_map(|&a| means.iter().map(move |&m| a + m))
            .collect()
    })
}
