//! Ranking candidate models for one appliance type by held-out likelihood.

use super::appliance::ApplianceModel;
use crate::inference::GaussianHmm;
use fhmm_common::{ApplianceKey, Error, Result};
use serde::{Deserialize, Serialize};

/// Log-likelihood of one candidate over every held-out trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub key: ApplianceKey,
    /// One forward log-likelihood per trace, in trace order.
    pub per_trace: Vec<f64>,
    /// Mean of `per_trace`.
    pub mean: f64,
}

/// Candidates ordered best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub scores: Vec<CandidateScore>,
    pub best: ApplianceKey,
}

/// Score every candidate on every trace and rank by mean log-likelihood.
///
/// Equal means keep candidate order. Errors with `NoModels` when there are
/// no candidates and `EmptyObservation` when there are no traces or a trace
/// is empty.
pub fn rank_candidates(candidates: &[&ApplianceModel], traces: &[Vec<f64>]) -> Result<Ranking> {
    if candidates.is_empty() {
        return Err(Error::NoModels);
    }
    if traces.is_empty() {
        return Err(Error::EmptyObservation);
    }

    let mut scores = Vec::with_capacity(candidates.len());
    for model in candidates {
        let hmm = GaussianHmm::from_model(model)?;
        let per_trace = traces
            .iter()
            .map(|trace| hmm.log_likelihood(trace))
            .collect::<Result<Vec<f64>>>()?;
        let mean = per_trace.iter().sum::<f64>() / per_trace.len() as f64;
        tracing::debug!(appliance = %model.key(), mean, "scored candidate model");
        scores.push(CandidateScore {
            key: model.key().clone(),
            per_trace,
            mean,
        });
    }

    scores.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    let best = scores[0].key.clone();
    Ok(Ranking { scores, best })
}
