//! Output formats for CLI payloads.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON document: an object keyed by appliance, each an array of records
    #[default]
    Json,

    /// One JSON record per line, tagged with its appliance
    Jsonl,

    /// One-line-per-appliance summary for quick inspection
    Summary,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for fmt in [OutputFormat::Json, OutputFormat::Jsonl, OutputFormat::Summary] {
            let json = serde_json::to_string(&fmt).unwrap();
            assert_eq!(json, format!("\"{}\"", fmt));
        }
    }

    #[test]
    fn default_is_json() {
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
    }
}
