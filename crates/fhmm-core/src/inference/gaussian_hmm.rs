//! One-dimensional Gaussian HMM: Viterbi decoding and forward scoring.
//!
//! Parameters are held in the log domain. Zero probabilities become
//! `-inf` and never produce NaN, so impossible transitions simply drop out
//! of the max/log-sum-exp recurrences.
//!
//! # Example
//!
//! ```ignore
//! use fhmm_core::inference::GaussianHmm;
//!
//! let hmm = GaussianHmm::from_model(&model)?;
//! let path = hmm.viterbi(&[0.0, 98.0, 101.0, 2.0])?;
//! let ll = hmm.log_likelihood(&[0.0, 98.0, 101.0, 2.0])?;
//! ```

use crate::model::ApplianceModel;
use fhmm_common::{Error, Result};
use fhmm_math::{argmax, gaussian_log_pdf, log_prob, log_sum_exp, Matrix};
use rayon::prelude::*;

/// Gaussian-emission HMM over a scalar observation.
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    name: String,
    log_prior: Vec<f64>,
    /// Row-major `n × n` log transition probabilities.
    log_transition: Vec<f64>,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl GaussianHmm {
    /// Build from probability-domain parameters.
    ///
    /// `name` identifies the model in errors. Rejects shape disagreements
    /// with `DimensionMismatch`, and a prior or transition row that sums to
    /// zero with `DegenerateModel`.
    pub fn new(
        name: impl Into<String>,
        prior: &[f64],
        transition: &Matrix,
        means: Vec<f64>,
        variances: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let n = prior.len();
        if n == 0 || !transition.is_square() || transition.rows() != n {
            return Err(Error::DimensionMismatch {
                appliance: name,
                detail: format!(
                    "prior has {} entries but transition matrix is {}x{}",
                    n,
                    transition.rows(),
                    transition.cols()
                ),
            });
        }
        if means.len() != n || variances.len() != n {
            return Err(Error::DimensionMismatch {
                appliance: name,
                detail: format!(
                    "{} states but {} means and {} variances",
                    n,
                    means.len(),
                    variances.len()
                ),
            });
        }

        let prior_sum: f64 = prior.iter().sum();
        if prior_sum.is_nan() || prior_sum <= 0.0 {
            return Err(Error::DegenerateModel {
                model: name,
                reason: "prior sums to zero".to_string(),
            });
        }
        if let Some(row) = transition
            .row_sums()
            .iter()
            .position(|s| s.is_nan() || *s <= 0.0)
        {
            return Err(Error::DegenerateModel {
                model: name,
                reason: format!("transition row {} sums to zero", row),
            });
        }

        Ok(Self {
            name,
            log_prior: prior.iter().map(|&p| log_prob(p)).collect(),
            log_transition: transition.as_slice().iter().map(|&p| log_prob(p)).collect(),
            means,
            variances,
        })
    }

    /// HMM for a single appliance model.
    pub fn from_model(model: &ApplianceModel) -> Result<Self> {
        Self::new(
            model.key().as_str(),
            model.prior(),
            model.transition(),
            model.means().to_vec(),
            model.variances().to_vec(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_states(&self) -> usize {
        self.log_prior.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Emission log-likelihoods, row-major `T × n`.
    ///
    /// Rows are independent, so they are filled in parallel.
    pub fn emission_table(&self, observations: &[f64]) -> Vec<f64> {
        let n = self.n_states();
        let mut table = vec![0.0; observations.len() * n];
        table
            .par_chunks_mut(n)
            .zip(observations.par_iter())
            .for_each(|(row, &x)| {
                for (j, cell) in row.iter_mut().enumerate() {
                    *cell = gaussian_log_pdf(x, self.means[j], self.variances[j]);
                }
            });
        table
    }

    fn check_observations(observations: &[f64]) -> Result<()> {
        if observations.is_empty() {
            return Err(Error::EmptyObservation);
        }
        if let Some(step) = observations.iter().position(|x| !x.is_finite()) {
            return Err(Error::NonFiniteObservation { step });
        }
        Ok(())
    }

    /// Emission table for validated observations. A finite reading whose
    /// log-density underflows for every state is an input problem, not a
    /// model one.
    fn scored_emissions(&self, observations: &[f64]) -> Result<Vec<f64>> {
        Self::check_observations(observations)?;
        let n = self.n_states();
        let emissions = self.emission_table(observations);
        let unscorable = emissions
            .chunks(n)
            .position(|row| row.iter().all(|e| *e == f64::NEG_INFINITY));
        if let Some(step) = unscorable {
            return Err(Error::ObservationOutOfRange {
                step,
                value: observations[step],
            });
        }
        Ok(emissions)
    }

    /// Most likely state path (MAP) for the observation sequence.
    ///
    /// Ties resolve to the lowest state index. Errors with
    /// `EmptyObservation` on an empty sequence, `ObservationOutOfRange` when
    /// a reading cannot be scored against any state, and `DegenerateModel`
    /// when no state is reachable at some step.
    pub fn viterbi(&self, observations: &[f64]) -> Result<Vec<usize>> {
        let emissions = self.scored_emissions(observations)?;
        let n = self.n_states();
        let steps = observations.len();

        let mut delta: Vec<f64> = (0..n)
            .map(|j| self.log_prior[j] + emissions[j])
            .collect();
        self.ensure_reachable(&delta, 0)?;

        let mut backpointers = vec![0usize; steps * n];
        let mut next = vec![f64::NEG_INFINITY; n];
        for t in 1..steps {
            let emit = &emissions[t * n..(t + 1) * n];
            let back = &mut backpointers[t * n..(t + 1) * n];
            for j in 0..n {
                let mut best = f64::NEG_INFINITY;
                let mut best_i = 0;
                for (i, &d) in delta.iter().enumerate() {
                    let score = d + self.log_transition[i * n + j];
                    if score > best {
                        best = score;
                        best_i = i;
                    }
                }
                next[j] = best + emit[j];
                back[j] = best_i;
            }
            self.ensure_reachable(&next, t)?;
            std::mem::swap(&mut delta, &mut next);
        }

        let (mut state, _) = argmax(&delta).ok_or_else(|| Error::DegenerateModel {
            model: self.name.clone(),
            reason: format!("no state reachable at step {}", steps - 1),
        })?;
        let mut path = vec![0usize; steps];
        path[steps - 1] = state;
        for t in (1..steps).rev() {
            state = backpointers[t * n + state];
            path[t - 1] = state;
        }
        Ok(path)
    }

    /// Log-likelihood of the observation sequence (forward algorithm).
    ///
    /// Returns `-inf` when the sequence is impossible under the model.
    pub fn log_likelihood(&self, observations: &[f64]) -> Result<f64> {
        let emissions = self.scored_emissions(observations)?;
        let n = self.n_states();

        let mut alpha: Vec<f64> = (0..n)
            .map(|j| self.log_prior[j] + emissions[j])
            .collect();
        let mut next = vec![0.0; n];
        let mut terms = vec![0.0; n];
        for t in 1..observations.len() {
            for j in 0..n {
                for (i, term) in terms.iter_mut().enumerate() {
                    *term = alpha[i] + self.log_transition[i * n + j];
                }
                next[j] = log_sum_exp(&terms) + emissions[t * n + j];
            }
            std::mem::swap(&mut alpha, &mut next);
        }
        Ok(log_sum_exp(&alpha))
    }

    fn ensure_reachable(&self, scores: &[f64], step: usize) -> Result<()> {
        if scores.iter().any(|s| *s > f64::NEG_INFINITY) {
            Ok(())
        } else {
            Err(Error::DegenerateModel {
                model: self.name.clone(),
                reason: format!("no state reachable at step {}", step),
            })
        }
    }
}
