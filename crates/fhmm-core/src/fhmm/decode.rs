//! Joint-state decoding and scoring against the combined chain.

use super::combine::CombinedFhmm;
use crate::logging::event_names;
use fhmm_common::Result;

/// Most likely joint-state path, one flat index per observation.
///
/// Deterministic for a given model and sequence. Errors with
/// `EmptyObservation`, `NonFiniteObservation`, `ObservationOutOfRange` or
/// `DegenerateModel`.
pub fn decode(fhmm: &CombinedFhmm, observations: &[f64]) -> Result<Vec<usize>> {
    let hmm = fhmm.to_hmm()?;
    let path = hmm.viterbi(observations)?;
    tracing::debug!(
        event = event_names::DECODE_DONE,
        steps = path.len(),
        joint_states = fhmm.n_states(),
        "decoded joint state path"
    );
    Ok(path)
}

/// Forward log-likelihood of the aggregate under the combined chain.
pub fn score(fhmm: &CombinedFhmm, observations: &[f64]) -> Result<f64> {
    fhmm.to_hmm()?.log_likelihood(observations)
}
