//! Numerically stable primitives for log-domain Markov chain math.

/// `ln Σ exp(v)` without overflow.
///
/// Empty input and all `-inf` inputs give `-inf`; any NaN gives NaN.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let Some(max) = values.iter().copied().reduce(f64::max) else {
        return f64::NEG_INFINITY;
    };
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// `ln(exp(a) + exp(b))` for two terms, the pairwise form of
/// [`log_sum_exp`].
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f64::NEG_INFINITY || hi == f64::INFINITY {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}

/// Natural log of a probability, mapping exact zero to NEG_INFINITY.
///
/// Negative or NaN inputs return NaN.
pub fn log_prob(p: f64) -> f64 {
    if p.is_nan() || p < 0.0 {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    p.ln()
}

/// Index and value of the largest entry, ignoring NaN.
///
/// Ties resolve to the lowest index so path selection is deterministic.
/// Returns None for empty input or when every entry is NaN.
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

/// Scale a nonnegative vector so it sums to 1.
///
/// Returns None when the sum is zero, negative, or not finite.
pub fn normalize(values: &[f64]) -> Option<Vec<f64>> {
    let sum: f64 = values.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    Some(values.iter().map(|v| v / sum).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn log_sum_exp_of_equal_terms() {
        // Three equal log-probabilities of 1/3 sum to probability 1.
        let third = (1.0f64 / 3.0).ln();
        assert!(approx_eq(log_sum_exp(&[third; 3]), 0.0, 1e-12));
    }

    #[test]
    fn log_sum_exp_survives_tiny_likelihoods() {
        // Typical Viterbi magnitudes: naive exp() underflows to 0.
        let out = log_sum_exp(&[-1500.0, -1500.0 + 2.0f64.ln()]);
        assert!(approx_eq(out, -1500.0 + 3.0f64.ln(), 1e-9));
    }

    #[test]
    fn log_sum_exp_impossible_terms() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY; 4]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY, -2.0]), -2.0);
    }

    #[test]
    fn log_sum_exp_nan_propagates() {
        let out = log_sum_exp(&[0.0, f64::NAN]);
        assert!(out.is_nan());
    }

    #[test]
    fn log_add_exp_is_symmetric_pairwise_lse() {
        for (a, b) in [(0.3, -4.0), (-700.0, -701.5), (12.0, 12.0)] {
            let lse = log_sum_exp(&[a, b]);
            assert!(approx_eq(log_add_exp(a, b), lse, 1e-12));
            assert_eq!(log_add_exp(a, b), log_add_exp(b, a));
        }
    }

    #[test]
    fn log_add_exp_with_impossible_term() {
        assert_eq!(log_add_exp(f64::NEG_INFINITY, -3.5), -3.5);
        assert_eq!(log_add_exp(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(log_add_exp(f64::INFINITY, 1.0), f64::INFINITY);
    }

    #[test]
    fn log_prob_zero_is_neg_inf() {
        assert_eq!(log_prob(0.0), f64::NEG_INFINITY);
        assert!(approx_eq(log_prob(1.0), 0.0, 1e-15));
        assert!(log_prob(-0.1).is_nan());
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some((1, 3.0)));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f64::NAN, f64::NAN]), None);
    }

    #[test]
    fn argmax_handles_neg_infinity() {
        let v = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(argmax(&v), Some((0, f64::NEG_INFINITY)));
    }

    #[test]
    fn normalize_rejects_zero_mass() {
        assert!(normalize(&[0.0, 0.0]).is_none());
        let out = normalize(&[1.0, 3.0]).unwrap();
        assert!(approx_eq(out[0], 0.25, 1e-15));
        assert!(approx_eq(out[1], 0.75, 1e-15));
    }
}
