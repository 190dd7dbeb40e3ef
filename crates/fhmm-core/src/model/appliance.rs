//! Trained per-appliance Gaussian HMMs.
//!
//! A model is validated on construction and never mutated afterwards.
//! Canonical form orders states by ascending emission mean, so state 0 is
//! always the lowest-power ("off") state.

use fhmm_common::{ApplianceKey, Error, Result};
use fhmm_math::{Matrix, Permutation};
use serde::{Deserialize, Serialize};

/// Absolute tolerance when checking that a distribution sums to one.
pub const STOCHASTIC_TOLERANCE: f64 = 1e-6;

/// One appliance's trained HMM: prior, transition matrix and per-state
/// Gaussian emissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceModel {
    key: ApplianceKey,
    prior: Vec<f64>,
    transition: Matrix,
    means: Vec<f64>,
    variances: Vec<f64>,
}

/// Parameters of a two-state on/off appliance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnOffParams {
    /// Mean power draw when on.
    pub on_mean: f64,
    /// Probability an "on" appliance stays on for the next step.
    pub p_stay_on: f64,
    /// Probability an "off" appliance stays off for the next step.
    pub p_stay_off: f64,
    /// Prior probability of starting in the "on" state.
    pub p_on_prior: f64,
    pub var_on: f64,
    pub var_off: f64,
}

impl ApplianceModel {
    /// Build and validate a model.
    ///
    /// Errors with `DimensionMismatch` when the pieces disagree on the state
    /// count, `DegenerateModel` when the prior or a transition row carries no
    /// probability mass, and `InvalidModel` when probabilities or variances
    /// are otherwise out of range. States are kept in the given order; call [`normalized`] for
    /// canonical ordering.
    ///
    /// [`normalized`]: ApplianceModel::normalized
    pub fn new(
        key: impl Into<ApplianceKey>,
        prior: Vec<f64>,
        transition: Matrix,
        means: Vec<f64>,
        variances: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            key: key.into(),
            prior,
            transition,
            means,
            variances,
        };
        model.validate()?;
        Ok(model)
    }

    /// Build from row vectors, as found in JSON requests.
    pub fn from_rows(
        key: impl Into<ApplianceKey>,
        prior: Vec<f64>,
        transition: Vec<Vec<f64>>,
        means: Vec<f64>,
        variances: Vec<f64>,
    ) -> Result<Self> {
        let key = key.into();
        let transition = Matrix::from_rows(transition).map_err(|e| Error::DimensionMismatch {
            appliance: key.to_string(),
            detail: format!("transition matrix: {}", e),
        })?;
        Self::new(key, prior, transition, means, variances)
    }

    /// Two-state on/off model: `π = [1-p, p]`, `A = [[off, 1-off], [1-on, on]]`,
    /// `μ = [0, on_mean]`, `σ² = [var_off, var_on]`.
    pub fn on_off(key: impl Into<ApplianceKey>, params: OnOffParams) -> Result<Self> {
        let OnOffParams {
            on_mean,
            p_stay_on,
            p_stay_off,
            p_on_prior,
            var_on,
            var_off,
        } = params;
        Self::from_rows(
            key,
            vec![1.0 - p_on_prior, p_on_prior],
            vec![
                vec![p_stay_off, 1.0 - p_stay_off],
                vec![1.0 - p_stay_on, p_stay_on],
            ],
            vec![0.0, on_mean],
            vec![var_off, var_on],
        )
    }

    pub fn key(&self) -> &ApplianceKey {
        &self.key
    }

    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn variances(&self) -> &[f64] {
        &self.variances
    }

    /// Number of hidden states.
    pub fn n_states(&self) -> usize {
        self.prior.len()
    }

    /// Same model under a different key.
    pub fn with_key(mut self, key: impl Into<ApplianceKey>) -> Self {
        self.key = key.into();
        self
    }

    /// Check shapes, then value ranges.
    pub fn validate(&self) -> Result<()> {
        let k = self.prior.len();
        let dim = |detail: String| Error::DimensionMismatch {
            appliance: self.key.to_string(),
            detail,
        };
        let invalid = |reason: String| Error::InvalidModel {
            appliance: self.key.to_string(),
            reason,
        };

        if k == 0 {
            return Err(dim("model has no states".to_string()));
        }
        if !self.transition.is_square() {
            return Err(dim(format!(
                "transition matrix is {}x{}, not square",
                self.transition.rows(),
                self.transition.cols()
            )));
        }
        if self.transition.rows() != k {
            return Err(dim(format!(
                "prior has {} entries but transition matrix is {}x{}",
                k,
                self.transition.rows(),
                self.transition.cols()
            )));
        }
        if self.means.len() != k {
            return Err(dim(format!("expected {} means, got {}", k, self.means.len())));
        }
        if self.variances.len() != k {
            return Err(dim(format!(
                "expected {} variances, got {}",
                k,
                self.variances.len()
            )));
        }

        let reject = |what: String, fault: DistributionFault| match fault {
            DistributionFault::Zero => Error::DegenerateModel {
                model: self.key.to_string(),
                reason: format!("{} sums to zero", what),
            },
            DistributionFault::Entry(v) => invalid(format!("{} has entry {} outside [0, 1]", what, v)),
            DistributionFault::Sum(s) => invalid(format!("{} sums to {}, expected 1", what, s)),
        };
        check_distribution(&self.prior).map_err(|f| reject("prior".to_string(), f))?;
        for (i, row) in self.transition.iter_rows().enumerate() {
            check_distribution(row).map_err(|f| reject(format!("transition row {}", i), f))?;
        }
        if let Some(i) = self.means.iter().position(|m| !m.is_finite()) {
            return Err(invalid(format!("mean of state {} is not finite", i)));
        }
        if let Some(i) = self
            .variances
            .iter()
            .position(|v| !v.is_finite() || *v <= 0.0)
        {
            return Err(invalid(format!(
                "variance of state {} must be finite and > 0, got {}",
                i, self.variances[i]
            )));
        }
        Ok(())
    }

    /// Permutation that puts states in ascending-mean order.
    pub fn canonical_order(&self) -> Permutation {
        Permutation::sorting(&self.means)
    }

    /// Whether states are already in ascending-mean order.
    pub fn is_canonical(&self) -> bool {
        self.means.windows(2).all(|w| w[0] <= w[1])
    }

    /// Reorder states: new state `i` is old state `perm[i]`. Prior, both
    /// transition axes, means and variances move together.
    pub fn reorder(&self, perm: &Permutation) -> Result<Self> {
        let mismatch = || Error::DimensionMismatch {
            appliance: self.key.to_string(),
            detail: format!(
                "permutation of length {} applied to {} states",
                perm.len(),
                self.n_states()
            ),
        };
        Ok(Self {
            key: self.key.clone(),
            prior: perm.apply(&self.prior).ok_or_else(mismatch)?,
            transition: perm.apply_square(&self.transition).ok_or_else(mismatch)?,
            means: perm.apply(&self.means).ok_or_else(mismatch)?,
            variances: perm.apply(&self.variances).ok_or_else(mismatch)?,
        })
    }

    /// Canonical form plus the permutation that produced it.
    pub fn normalized(&self) -> (Self, Permutation) {
        let perm = self.canonical_order();
        if perm.is_identity() {
            return (self.clone(), perm);
        }
        // Lengths were validated on construction, so reorder cannot fail.
        match self.reorder(&perm) {
            Ok(sorted) => (sorted, perm),
            Err(_) => (self.clone(), Permutation::identity(self.n_states())),
        }
    }
}

/// Why a probability vector was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DistributionFault {
    /// No mass at all: every path through it is impossible.
    Zero,
    Entry(f64),
    Sum(f64),
}

fn check_distribution(values: &[f64]) -> std::result::Result<(), DistributionFault> {
    if let Some(&v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(DistributionFault::Entry(v));
    }
    let sum: f64 = values.iter().sum();
    if sum == 0.0 {
        return Err(DistributionFault::Zero);
    }
    if (sum - 1.0).abs() > STOCHASTIC_TOLERANCE {
        return Err(DistributionFault::Sum(sum));
    }
    Ok(())
}
