//! JSON request envelope consumed by the CLI.
//!
//! ```json
//! {
//!   "models": [
//!     {"key": "fridge", "prior": [0.9, 0.1],
//!      "transition": [[0.9, 0.1], [0.2, 0.8]],
//!      "means": [0, 100], "variances": [1, 25]},
//!     {"key": "kettle", "on_off": {"on_mean": 2000, "p_stay_on": 0.6,
//!      "p_stay_off": 0.98, "p_on_prior": 0.02, "var_on": 400, "var_off": 1}}
//!   ],
//!   "timestamps": ["2014-01-01 00:00", "2014-01-01 00:15"],
//!   "observations": [0.0, 100.0]
//! }
//! ```
//!
//! Optional fields: `selection` (see [`ModelSelection`]), `ground_truth`
//! for `fhmm evaluate`, and `holdout` traces for `fhmm score`.

use crate::model::{ApplianceModel, ModelRegistry, ModelSelection, OnOffParams};
use chrono::NaiveDateTime;
use fhmm_common::{ApplianceKey, Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// One model in a request: either full parameters or an on/off shorthand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    /// Defaults to `device_<position>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ApplianceKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub means: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variances: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_off: Option<OnOffParams>,
}

impl ModelEntry {
    /// Build the model for the entry at `position`.
    pub fn to_model(&self, position: usize) -> Result<ApplianceModel> {
        let key = self
            .key
            .clone()
            .unwrap_or_else(|| ApplianceKey::positional(position));
        let full = (
            self.prior.as_ref(),
            self.transition.as_ref(),
            self.means.as_ref(),
            self.variances.as_ref(),
        );
        match (self.on_off, full) {
            (Some(params), (None, None, None, None)) => ApplianceModel::on_off(key, params),
            (None, (Some(prior), Some(transition), Some(means), Some(variances))) => {
                ApplianceModel::from_rows(
                    key,
                    prior.clone(),
                    transition.clone(),
                    means.clone(),
                    variances.clone(),
                )
            }
            _ => Err(Error::InvalidModel {
                appliance: key.to_string(),
                reason: "expected either `on_off` or all of `prior`, `transition`, `means`, `variances`"
                    .to_string(),
            }),
        }
    }
}

/// Ground-truth power for one appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroundTruth {
    pub key: ApplianceKey,
    pub power: Vec<f64>,
}

/// A full disaggregation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisaggregationRequest {
    pub models: Vec<ModelEntry>,
    #[serde(with = "timestamp_list")]
    pub timestamps: Vec<NaiveDateTime>,
    pub observations: Vec<f64>,
    #[serde(default)]
    pub selection: ModelSelection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ground_truth: Vec<GroundTruth>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holdout: Vec<Vec<f64>>,
}

impl DisaggregationRequest {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a request file; `-` reads stdin.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(path)?
        };
        Self::from_json_str(&content)
    }

    /// Validate every model entry and register them in order.
    pub fn registry(&self) -> Result<ModelRegistry> {
        let models = self
            .models
            .iter()
            .enumerate()
            .map(|(position, entry)| entry.to_model(position))
            .collect::<Result<Vec<_>>>()?;
        ModelRegistry::from_models(models)
    }

    /// Reject misaligned timestamps before any decoding work.
    pub fn check_alignment(&self) -> Result<()> {
        if self.observations.is_empty() {
            return Err(Error::EmptyObservation);
        }
        if self.timestamps.len() != self.observations.len() {
            return Err(Error::LengthMismatch {
                what: "timestamps".to_string(),
                expected: self.observations.len(),
                got: self.timestamps.len(),
            });
        }
        Ok(())
    }

    /// Ground truth as `(key, series)` pairs.
    pub fn ground_truth_series(&self) -> Vec<(ApplianceKey, Vec<f64>)> {
        self.ground_truth
            .iter()
            .map(|g| (g.key.clone(), g.power.clone()))
            .collect()
    }
}

/// Parse a timestamp in one of the accepted shapes: RFC 3339 (converted to
/// UTC), `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let text = text.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Serde adapter: timestamps as strings or integer Unix seconds.
mod timestamp_list {
    use super::parse_timestamp;
    use chrono::NaiveDateTime;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        values: &[NaiveDateTime],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NaiveDateTime>, D::Error> {
        let raw = Vec::<Raw>::deserialize(deserializer)?;
        raw.into_iter()
            .enumerate()
            .map(|(i, value)| match value {
                Raw::Seconds(secs) => chrono::DateTime::from_timestamp(secs, 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| D::Error::custom(format!("timestamp {} out of range: {}", i, secs))),
                Raw::Text(text) => parse_timestamp(&text)
                    .ok_or_else(|| D::Error::custom(format!("timestamp {} unparseable: {:?}", i, text))),
            })
            .collect()
    }
}
