//! Appliance and run identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key naming one appliance (or appliance class) model.
///
/// The order of keys handed to the combiner fixes the joint-state layout,
/// so keys travel with the combined model rather than being re-derived
/// from map iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplianceKey(pub String);

impl ApplianceKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApplianceKey(key.into())
    }

    /// Key used when a model is registered without a name.
    pub fn positional(index: usize) -> Self {
        ApplianceKey(format!("device_{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplianceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ApplianceKey {
    fn from(s: &str) -> Self {
        ApplianceKey(s.to_string())
    }
}

impl From<String> for ApplianceKey {
    fn from(s: String) -> Self {
        ApplianceKey(s)
    }
}

impl AsRef<str> for ApplianceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier for one disaggregation run, used to correlate log events.
///
/// Format: `fhmm-YYYYMMDD-HHMMSS-xxxxxxxx`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new run ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!(
            "fhmm-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            &uuid[..8]
        ))
    }

    /// Parse an existing run ID string.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix("fhmm-")?;
        let mut parts = rest.split('-');
        let date = parts.next()?;
        let time = parts.next()?;
        let suffix = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if time.len() != 6 || !time.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if suffix.len() != 8 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(RunId(s.to_string()))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appliance_key_serde_is_transparent() {
        let key = ApplianceKey::new("air1");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"air1\"");
        let back: ApplianceKey = serde_json::from_str("\"air1\"").unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn positional_key_format() {
        assert_eq!(ApplianceKey::positional(3).as_str(), "device_3");
    }

    #[test]
    fn generated_run_id_parses() {
        let id = RunId::new();
        assert!(RunId::parse(&id.0).is_some(), "{}", id);
    }

    #[test]
    fn run_id_parse_rejects_garbage() {
        assert!(RunId::parse("pt-20260101-000000-abcd").is_none());
        assert!(RunId::parse("fhmm-2026010-000000-abcdef01").is_none());
        assert!(RunId::parse("fhmm-20260101-000000-xyz").is_none());
        assert!(RunId::parse("fhmm-20260101-000000-abcdef01-extra").is_none());
    }
}
