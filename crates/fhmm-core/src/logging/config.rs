//! Logging configuration.
//!
//! Resolved from, lowest to highest priority:
//! - `RUST_LOG` (most verbose directive wins)
//! - `FHMM_LOG`, `FHMM_LOG_FORMAT`, `FHMM_LOG_TIMESTAMPS`
//! - CLI flags (`--log-level`, `--log-format`, `-v`, `-q`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level override read before `RUST_LOG`.
pub const LEVEL_ENV: &str = "FHMM_LOG";
pub const FORMAT_ENV: &str = "FHMM_LOG_FORMAT";
/// `0`, `false` or `off` drops timestamps from human output.
pub const TIMESTAMPS_ENV: &str = "FHMM_LOG_TIMESTAMPS";

/// Where log records are shaped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Console lines for people.
    #[default]
    Human,
    /// One JSON object per record, for pipelines.
    Jsonl,
}

impl LogFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format '{}' (expected human or jsonl)", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum severity that is emitted. Ordered from most to least verbose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// Default: stdout carries reports, so stderr stays quiet unless asked.
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Most verbose level named by a `RUST_LOG` value such as
    /// `warn,fhmm_core::fhmm=debug`. Unrecognized directives are skipped.
    pub fn from_rust_log(value: &str) -> Option<Self> {
        value
            .split(',')
            .filter_map(|directive| {
                let level = directive.rsplit('=').next()?;
                level.parse::<LogLevel>().ok()
            })
            .min()
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" | "quiet" => Ok(LogLevel::Off),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human records with a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::default(),
            level: LogLevel::default(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment, then apply CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_lookup(|name| std::env::var(name).ok(), cli_level, cli_format)
    }

    /// Same as [`from_env`](Self::from_env) against any variable lookup.
    /// Unparseable values are ignored rather than failing startup.
    pub fn from_lookup<F>(lookup: F, cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_level = match lookup(LEVEL_ENV) {
            Some(value) => value.parse().ok(),
            None => lookup("RUST_LOG").and_then(|value| LogLevel::from_rust_log(&value)),
        };
        let env_format = lookup(FORMAT_ENV).and_then(|value| value.parse().ok());
        let timestamps = lookup(TIMESTAMPS_ENV)
            .map(|value| !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"))
            .unwrap_or(true);

        LogConfig {
            format: cli_format.or(env_format).unwrap_or_default(),
            level: cli_level.or(env_level).unwrap_or_default(),
            timestamps,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn format_aliases() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Jsonl));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert!("xml".parse::<LogFormat>().unwrap_err().contains("xml"));
    }

    #[test]
    fn level_round_trips_through_display() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Off,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    }

    #[test]
    fn rust_log_picks_most_verbose_directive() {
        assert_eq!(
            LogLevel::from_rust_log("warn,fhmm_core::fhmm=debug,rayon=info"),
            Some(LogLevel::Debug)
        );
        assert_eq!(LogLevel::from_rust_log("fhmm_core"), None);
        assert_eq!(LogLevel::from_rust_log("error"), Some(LogLevel::Error));
    }

    #[test]
    fn defaults_without_environment() {
        let config = LogConfig::from_lookup(env(&[]), None, None);
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.level, LogLevel::Warn);
    }

    #[test]
    fn fhmm_log_shadows_rust_log() {
        let config = LogConfig::from_lookup(env(&[("FHMM_LOG", "error"), ("RUST_LOG", "trace")]), None, None);
        assert_eq!(config.level, LogLevel::Error);

        let config = LogConfig::from_lookup(env(&[("RUST_LOG", "fhmm_core=info")]), None, None);
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn cli_flags_win() {
        let config = LogConfig::from_lookup(
            env(&[("FHMM_LOG", "error"), ("FHMM_LOG_FORMAT", "human")]),
            Some(LogLevel::Trace),
            Some(LogFormat::Jsonl),
        );
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Jsonl);
    }

    #[test]
    fn timestamps_can_be_disabled() {
        let config = LogConfig::from_lookup(env(&[("FHMM_LOG_TIMESTAMPS", "0")]), None, None);
        assert!(!config.timestamps);
        let config = LogConfig::from_lookup(env(&[("FHMM_LOG_TIMESTAMPS", "yes")]), None, None);
        assert!(config.timestamps);
    }
}
