//! Per-appliance time series reports.
//!
//! JSON output is one object keyed by appliance, in combination order:
//!
//! ```json
//! {
//!   "fridge": [
//!     {"timestamp": "2014-01-01 00:00", "observed": 130.0, "estimated": 100.0}
//!   ]
//! }
//! ```

use crate::fhmm::Decombined;
use chrono::NaiveDateTime;
use fhmm_common::{ApplianceKey, Error, OutputFormat, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Write as _;

/// One reporting step for one appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: String,
    pub observed: f64,
    pub estimated: f64,
}

/// Records for one appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceSeries {
    pub key: ApplianceKey,
    pub records: Vec<Record>,
}

impl ApplianceSeries {
    /// Sum of estimates, in power-units × steps.
    pub fn energy(&self) -> f64 {
        self.records.iter().map(|r| r.estimated).sum()
    }

    /// Steps with a non-zero estimate.
    pub fn active_steps(&self) -> usize {
        self.records.iter().filter(|r| r.estimated > 0.0).count()
    }

    pub fn peak(&self) -> f64 {
        self.records.iter().map(|r| r.estimated).fold(0.0, f64::max)
    }
}

/// Disaggregation report, ordered by appliance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub appliances: Vec<ApplianceSeries>,
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.appliances.len()))?;
        for series in &self.appliances {
            map.serialize_entry(&series.key, &series.records)?;
        }
        map.end()
    }
}

impl Report {
    pub fn get(&self, key: &ApplianceKey) -> Option<&ApplianceSeries> {
        self.appliances.iter().find(|s| &s.key == key)
    }

    /// Render in the requested output format.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Jsonl => self.render_jsonl(),
            OutputFormat::Summary => Ok(self.render_summary()),
        }
    }

    /// One line per (appliance, step).
    fn render_jsonl(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Line<'a> {
            appliance: &'a ApplianceKey,
            #[serde(flatten)]
            record: &'a Record,
        }

        let mut out = String::new();
        for series in &self.appliances {
            for record in &series.records {
                out.push_str(&serde_json::to_string(&Line {
                    appliance: &series.key,
                    record,
                })?);
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn render_summary(&self) -> String {
        let width = self
            .appliances
            .iter()
            .map(|s| s.key.as_str().len())
            .max()
            .unwrap_or(0)
            .max("appliance".len());
        let mut out = String::new();
        out.push_str(&format!(
            "{:<width$}  {:>12}  {:>8}  {:>10}\n",
            "appliance", "energy", "active", "peak"
        ));
        for series in &self.appliances {
            out.push_str(&format!(
                "{:<width$}  {:>12.1}  {:>8}  {:>10.1}\n",
                series.key.as_str(),
                series.energy(),
                format!("{}/{}", series.active_steps(), series.records.len()),
                series.peak()
            ));
        }
        out
    }
}

/// Build the report from aligned timestamps, observations and the decoded
/// per-appliance power.
///
/// `timestamp_format` is a chrono format string. Errors with
/// `LengthMismatch` when timestamps, observations and decoded steps
/// disagree in length.
pub fn format_report(
    timestamps: &[NaiveDateTime],
    observed: &[f64],
    decoded: &Decombined,
    timestamp_format: &str,
) -> Result<Report> {
    if timestamps.len() != observed.len() {
        return Err(Error::LengthMismatch {
            what: "timestamps".to_string(),
            expected: observed.len(),
            got: timestamps.len(),
        });
    }
    let mut labels = Vec::with_capacity(timestamps.len());
    for ts in timestamps {
        let mut label = String::new();
        write!(label, "{}", ts.format(timestamp_format)).map_err(|_| {
            Error::Config(format!("invalid timestamp_format '{}'", timestamp_format))
        })?;
        labels.push(label);
    }

    let mut appliances = Vec::with_capacity(decoded.appliances.len());
    for trace in &decoded.appliances {
        if trace.power.len() != observed.len() {
            return Err(Error::LengthMismatch {
                what: format!("decoded power for '{}'", trace.key),
                expected: observed.len(),
                got: trace.power.len(),
            });
        }
        let records = labels
            .iter()
            .zip(observed)
            .zip(&trace.power)
            .map(|((timestamp, &observed), &estimated)| Record {
                timestamp: timestamp.clone(),
                observed,
                estimated,
            })
            .collect();
        appliances.push(ApplianceSeries {
            key: trace.key.clone(),
            records,
        });
    }
    Ok(Report { appliances })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhmm::ApplianceTrace;
    use chrono::NaiveDate;

    fn stamps(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2014, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::minutes(15 * i as i64))
            .collect()
    }

    fn decoded() -> Decombined {
        Decombined {
            joint_states: vec![0, 3, 1],
            appliances: vec![
                ApplianceTrace {
                    key: "zeta".into(),
                    states: vec![0, 1, 0],
                    power: vec![0.0, 100.0, 0.0],
                },
                ApplianceTrace {
                    key: "alpha".into(),
                    states: vec![0, 1, 1],
                    power: vec![0.0, 50.0, 50.0],
                },
            ],
            clipped: 0,
        }
    }

    #[test]
    fn records_align_with_inputs() {
        let report = format_report(&stamps(3), &[0.0, 150.0, 50.0], &decoded(), "%Y-%m-%d %H:%M")
            .unwrap();
        let zeta = report.get(&"zeta".into()).unwrap();
        assert_eq!(zeta.records.len(), 3);
        assert_eq!(zeta.records[1].timestamp, "2014-01-01 00:15");
        assert_eq!(zeta.records[1].observed, 150.0);
        assert_eq!(zeta.records[1].estimated, 100.0);
    }

    #[test]
    fn json_keeps_appliance_order() {
        let report = format_report(&stamps(3), &[0.0, 150.0, 50.0], &decoded(), "%H:%M").unwrap();
        let json = report.render(OutputFormat::Json).unwrap();
        let zeta = json.find("\"zeta\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["alpha"][2]["estimated"], serde_json::json!(50.0));
    }

    #[test]
    fn jsonl_has_one_line_per_record() {
        let report = format_report(&stamps(3), &[0.0, 150.0, 50.0], &decoded(), "%H:%M").unwrap();
        let out = report.render(OutputFormat::Jsonl).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["appliance"], "zeta");
        assert_eq!(first["timestamp"], "00:00");
    }

    #[test]
    fn summary_lists_every_appliance() {
        let report = format_report(&stamps(3), &[0.0, 150.0, 50.0], &decoded(), "%H:%M").unwrap();
        let out = report.render(OutputFormat::Summary).unwrap();
        assert!(out.ends_with('\n'));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("appliance"));
        assert!(lines[1].starts_with("zeta"));
        assert!(lines[2].starts_with("alpha"));
        assert!(lines.iter().all(|l| l.len() == lines[0].len()), "{}", out);
        assert!(out.contains("2/3"));
    }

    #[test]
    fn timestamp_length_mismatch_rejected() {
        let err = format_report(&stamps(2), &[0.0, 150.0, 50.0], &decoded(), "%H:%M").unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 3,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn invalid_timestamp_format_is_config_error() {
        let err = format_report(&stamps(3), &[0.0, 150.0, 50.0], &decoded(), "%H:%").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn series_statistics() {
        let report = format_report(&stamps(3), &[0.0, 150.0, 50.0], &decoded(), "%H:%M").unwrap();
        let alpha = report.get(&"alpha".into()).unwrap();
        assert_eq!(alpha.energy(), 100.0);
        assert_eq!(alpha.active_steps(), 2);
        assert_eq!(alpha.peak(), 50.0);
    }
}
