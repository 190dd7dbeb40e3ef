//! Univariate Gaussian emission kernels.

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)

/// Log-density of `N(mean, variance)` at `x`.
///
/// Returns NaN when the variance is not strictly positive.
pub fn gaussian_log_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    if variance.is_nan() || variance <= 0.0 {
        return f64::NAN;
    }
    let z = (x - mean) / variance.sqrt();
    -0.5 * z * z - 0.5 * variance.ln() - LOG_SQRT_2PI
}

/// Density of `N(mean, variance)` at `x`.
pub fn gaussian_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    gaussian_log_pdf(x, mean, variance).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_normal_at_zero() {
        let lp = gaussian_log_pdf(0.0, 0.0, 1.0);
        assert!((lp + LOG_SQRT_2PI).abs() < 1e-12);
    }

    #[test]
    fn symmetric_about_mean() {
        let a = gaussian_log_pdf(97.0, 100.0, 5.0);
        let b = gaussian_log_pdf(103.0, 100.0, 5.0);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn narrower_variance_peaks_higher() {
        assert!(gaussian_pdf(0.0, 0.0, 0.5) > gaussian_pdf(0.0, 0.0, 5.0));
    }

    #[test]
    fn non_positive_variance_is_nan() {
        assert!(gaussian_log_pdf(1.0, 0.0, 0.0).is_nan());
        assert!(gaussian_log_pdf(1.0, 0.0, -2.0).is_nan());
    }

    #[test]
    fn huge_deviation_scales_before_squaring() {
        // (x - mean)^2 alone would overflow here.
        let lp = gaussian_log_pdf(1.0e155, 0.0, 100.0);
        assert!(lp.is_finite());
        assert!(lp < -1.0e300);
    }

    #[test]
    fn far_tail_stays_finite() {
        let lp = gaussian_log_pdf(1.0e4, 0.0, 5.0);
        assert!(lp.is_finite());
        assert!(lp < -1.0e6);
    }
}
