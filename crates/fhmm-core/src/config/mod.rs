//! Configuration loading and validation for fhmm-core.
//!
//! This module handles:
//! - Loading the engine config file (TOML or JSON)
//! - Config resolution order (CLI > env > XDG > defaults)
//! - Semantic validation (positive variance, non-empty formats)
//! - Provenance (source path and content hash) for reports

pub mod validation;

pub use validation::{validate_engine, ValidationError};

use crate::fhmm::{ClipPolicy, PowerSourceKind, DEFAULT_JOINT_VARIANCE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "fhmm";

/// Default config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FHMM_CONFIG";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid TOML in config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for fhmm_common::Error {
    fn from(err: ConfigError) -> Self {
        fhmm_common::Error::Config(err.to_string())
    }
}

/// Tunables for one disaggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Emission variance shared by every joint state.
    pub joint_variance: f64,

    /// How a power value is derived for a decoded "on" state.
    pub power_source: PowerSourceKind,

    /// Seed for the normal power source.
    pub seed: u64,

    /// How estimates are clipped against the observed total.
    pub clip_policy: ClipPolicy,

    /// Joint state count above which a warning is logged.
    pub max_joint_states: usize,

    /// chrono format string for report timestamps.
    pub timestamp_format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            joint_variance: DEFAULT_JOINT_VARIANCE,
            power_source: PowerSourceKind::Mean,
            seed: 0,
            clip_policy: ClipPolicy::Budget,
            max_joint_states: 4096,
            timestamp_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The loaded engine configuration.
    pub engine: EngineConfig,
    /// Path to the config file (None if using defaults).
    pub path: Option<PathBuf>,
    /// SHA-256 hash of the config file content (None if using defaults).
    pub hash: Option<String>,
}

impl ResolvedConfig {
    /// Built-in defaults with no file behind them.
    pub fn defaults() -> Self {
        Self {
            engine: EngineConfig::default(),
            path: None,
            hash: None,
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit CLI flag (via ConfigOptions)
/// 2. Environment variable (FHMM_CONFIG)
/// 3. XDG config home (~/.config/fhmm/config.toml), if present
/// 4. Built-in defaults
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let path = resolve_config_path(options, |name| std::env::var(name).ok())?;
    match path {
        Some(path) => load_config_file(&path),
        None => {
            tracing::debug!(
                event = crate::logging::event_names::CONFIG_DEFAULT_USED,
                "no config file found; using defaults"
            );
            Ok(ResolvedConfig::defaults())
        }
    }
}

/// Pick the config file to load, if any.
///
/// Explicit and environment paths must exist; the XDG default is optional.
fn resolve_config_path<F>(options: &ConfigOptions, env: F) -> Result<Option<PathBuf>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = &options.config_path {
        return require_exists(path.clone()).map(Some);
    }

    if let Some(path) = env(CONFIG_ENV_VAR) {
        return require_exists(PathBuf::from(path)).map(Some);
    }

    let xdg_config = env("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")));
    Ok(xdg_config
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.exists()))
}

fn require_exists(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        Ok(path)
    } else {
        Err(ConfigError::NotFound { path })
    }
}

/// Load and validate one config file. `.json` files parse as JSON, anything
/// else as TOML.
pub fn load_config_file(path: &Path) -> Result<ResolvedConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let engine: EngineConfig = if is_json {
        serde_json::from_str(&content).map_err(|e| ConfigError::Json {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?
    };

    validate_engine(&engine)?;

    let hash = compute_hash(&content);
    tracing::info!(
        event = crate::logging::event_names::CONFIG_LOADED,
        path = %path.display(),
        hash = %hash,
        "loaded engine config"
    );

    Ok(ResolvedConfig {
        engine,
        path: Some(path.to_path_buf()),
        hash: Some(hash),
    })
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
