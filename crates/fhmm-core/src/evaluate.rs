//! Accuracy metrics for disaggregated power against ground truth.
//!
//! All functions are pure. Ratios whose denominator is zero return 0.0
//! rather than NaN.

use fhmm_common::{ApplianceKey, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Absolute difference between the total truth and total prediction.
pub fn sum_error(truth: &[f64], prediction: &[f64]) -> f64 {
    (truth.iter().sum::<f64>() - prediction.iter().sum::<f64>()).abs()
}

/// Residual sum of squares.
pub fn rss(truth: &[f64], prediction: &[f64]) -> Result<f64> {
    ensure_aligned("prediction", truth.len(), prediction.len())?;
    Ok(truth
        .iter()
        .zip(prediction)
        .map(|(t, p)| (t - p) * (t - p))
        .sum())
}

/// On/off labels for a power trace without state annotations:
/// on when `power >= threshold`.
pub fn guess_truth_from_power(power: &[f64], threshold: f64) -> Vec<bool> {
    power.iter().map(|&p| p >= threshold).collect()
}

/// Binary confusion counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionCounts {
    /// Count outcomes of `predicted` against `truth`, step by step.
    pub fn from_labels(truth: &[bool], predicted: &[bool]) -> Result<Self> {
        ensure_aligned("predicted labels", truth.len(), predicted.len())?;
        let mut counts = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t, p) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Recall: `tp / (tp + fn)`.
    pub fn sensitivity(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// `tn / (tn + fp)`.
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// `tp / (tp + fp)`.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// `(tp + tn) / total`.
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Harmonic mean of precision and sensitivity.
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.sensitivity();
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    /// Grid-style table of confusion:
    ///
    /// ```text
    /// +----------+----------+----------+
    /// |          | Positive | Negative |
    /// +==========+==========+==========+
    /// | Positive |       tp |       fp |
    /// +----------+----------+----------+
    /// | Negative |       fn |       tn |
    /// +----------+----------+----------+
    /// ```
    pub fn table(&self) -> String {
        let cells = [
            ["", "Positive", "Negative"].map(str::to_string),
            ["Positive".to_string(), self.tp.to_string(), self.fp.to_string()],
            ["Negative".to_string(), self.fn_.to_string(), self.tn.to_string()],
        ];
        let width = cells
            .iter()
            .flat_map(|row| row.iter().map(String::len))
            .max()
            .unwrap_or(0);
        let rule = |c: char| {
            let seg = c.to_string().repeat(width + 2);
            format!("+{seg}+{seg}+{seg}+")
        };

        let mut lines = vec![rule('-')];
        for (i, row) in cells.iter().enumerate() {
            lines.push(format!(
                "| {:<width$} | {:>width$} | {:>width$} |",
                row[0], row[1], row[2]
            ));
            lines.push(rule(if i == 0 { '=' } else { '-' }));
        }
        lines.join("\n")
    }
}

/// Per-appliance metric bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceMetrics {
    pub key: ApplianceKey,
    pub sum_error: f64,
    pub rss: f64,
    pub counts: ConfusionCounts,
    pub sensitivity: f64,
    pub specificity: f64,
    pub precision: f64,
    pub accuracy: f64,
    pub f1: f64,
}

impl ApplianceMetrics {
    /// Compare one appliance's estimate to its ground truth; on/off labels
    /// for both come from `threshold`.
    pub fn compute(
        key: ApplianceKey,
        truth: &[f64],
        estimate: &[f64],
        threshold: f64,
    ) -> Result<Self> {
        let rss = rss(truth, estimate)?;
        let counts = ConfusionCounts::from_labels(
            &guess_truth_from_power(truth, threshold),
            &guess_truth_from_power(estimate, threshold),
        )?;
        Ok(Self {
            key,
            sum_error: sum_error(truth, estimate),
            rss,
            counts,
            sensitivity: counts.sensitivity(),
            specificity: counts.specificity(),
            precision: counts.precision(),
            accuracy: counts.accuracy(),
            f1: counts.f1(),
        })
    }
}

/// Share of ground-truth energy that was assigned to the right appliance:
/// `Σ_a min(predicted_a, truth_a) / Σ_a truth_a`.
///
/// Appliances are matched by key. A predicted appliance without ground
/// truth contributes nothing. Returns 0.0 when there is no true energy.
pub fn fraction_energy_assigned_correctly(
    predicted: &[(ApplianceKey, Vec<f64>)],
    truth: &[(ApplianceKey, Vec<f64>)],
) -> f64 {
    let truth_energy: HashMap<&ApplianceKey, f64> = truth
        .iter()
        .map(|(key, series)| (key, series.iter().sum::<f64>()))
        .collect();
    let total: f64 = truth_energy.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let correct: f64 = predicted
        .iter()
        .filter_map(|(key, series)| {
            let true_energy = truth_energy.get(key)?;
            Some(series.iter().sum::<f64>().min(*true_energy))
        })
        .sum();
    correct / total
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn ensure_aligned(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            what: what.to_string(),
            expected,
            got,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_error_is_absolute() {
        assert_eq!(sum_error(&[1.0, 2.0], &[4.0, 2.0]), 3.0);
        assert_eq!(sum_error(&[4.0, 2.0], &[1.0, 2.0]), 3.0);
    }

    #[test]
    fn rss_sums_squared_residuals() {
        assert_eq!(rss(&[1.0, 2.0, 3.0], &[1.0, 0.0, 6.0]).unwrap(), 13.0);
        assert!(matches!(
            rss(&[1.0], &[1.0, 2.0]),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(
            guess_truth_from_power(&[0.0, 9.9, 10.0, 200.0], 10.0),
            vec![false, false, true, true]
        );
    }

    #[test]
    fn confusion_counts_and_rates() {
        let truth = [true, true, true, false, false, false, false, true];
        let pred = [true, true, false, false, false, true, false, true];
        let c = ConfusionCounts::from_labels(&truth, &pred).unwrap();
        assert_eq!(
            c,
            ConfusionCounts {
                tp: 3,
                fp: 1,
                tn: 3,
                fn_: 1
            }
        );
        assert_eq!(c.total(), 8);
        assert_eq!(c.sensitivity(), 0.75);
        assert_eq!(c.specificity(), 0.75);
        assert_eq!(c.precision(), 0.75);
        assert_eq!(c.accuracy(), 0.75);
        assert!((c.f1() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn zero_denominators_give_zero() {
        let c = ConfusionCounts::default();
        assert_eq!(c.sensitivity(), 0.0);
        assert_eq!(c.specificity(), 0.0);
        assert_eq!(c.precision(), 0.0);
        assert_eq!(c.accuracy(), 0.0);
        assert_eq!(c.f1(), 0.0);
    }

    #[test]
    fn counts_serialize_with_fn_key() {
        let json = serde_json::to_value(ConfusionCounts {
            tp: 1,
            fp: 0,
            tn: 2,
            fn_: 3,
        })
        .unwrap();
        assert_eq!(json["fn"], 3);
    }

    #[test]
    fn table_layout() {
        let c = ConfusionCounts {
            tp: 12,
            fp: 3,
            tn: 40,
            fn_: 5,
        };
        let table = c.table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[2].starts_with("+="));
        assert!(lines[3].contains("Positive") && lines[3].contains("12") && lines[3].contains('3'));
        assert!(lines[5].contains("Negative") && lines[5].contains("40"));
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn energy_fraction_caps_overestimates() {
        let truth = vec![
            (ApplianceKey::from("a"), vec![10.0, 10.0]),
            (ApplianceKey::from("b"), vec![30.0, 50.0]),
        ];
        let predicted = vec![
            (ApplianceKey::from("b"), vec![100.0, 0.0]),
            (ApplianceKey::from("a"), vec![5.0, 0.0]),
            (ApplianceKey::from("ghost"), vec![500.0]),
        ];
        let f = fraction_energy_assigned_correctly(&predicted, &truth);
        assert!((f - (80.0 + 5.0) / 100.0).abs() < 1e-12);
    }

    #[test]
    fn energy_fraction_without_truth_is_zero() {
        let predicted = vec![(ApplianceKey::from("a"), vec![1.0])];
        assert_eq!(fraction_energy_assigned_correctly(&predicted, &[]), 0.0);
    }

    #[test]
    fn appliance_metrics_bundle() {
        let m = ApplianceMetrics::compute(
            "fridge".into(),
            &[0.0, 100.0, 100.0, 0.0],
            &[0.0, 100.0, 0.0, 0.0],
            10.0,
        )
        .unwrap();
        assert_eq!(m.sum_error, 100.0);
        assert_eq!(m.rss, 10_000.0);
        assert_eq!(m.counts.tp, 1);
        assert_eq!(m.counts.fn_, 1);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.sensitivity, 0.5);
    }
}
