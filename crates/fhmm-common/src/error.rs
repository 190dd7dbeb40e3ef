//! Error types for FHMM disaggregation.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! Every core error aborts the whole disaggregation request. No partial
//! per-appliance output is produced once one of these is raised.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 10,
//!   "category": "model",
//!   "message": "dimension mismatch in model 'fridge': prior has 3 entries but transition matrix is 2x2",
//!   "recoverable": false,
//!   "context": { "appliance": "fridge" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for FHMM operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed appliance models or model sets.
    Model,
    /// Malformed request inputs (observations, timestamps, selections).
    Input,
    /// Failures while decoding or de-combining joint states.
    Decode,
    /// Configuration file errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Decode => write!(f, "decode"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for FHMM disaggregation.
#[derive(Error, Debug)]
pub enum Error {
    // Model errors (10-19)
    #[error("dimension mismatch in model '{appliance}': {detail}")]
    DimensionMismatch { appliance: String, detail: String },

    #[error("invalid model '{appliance}': {reason}")]
    InvalidModel { appliance: String, reason: String },

    #[error("no appliance models supplied")]
    NoModels,

    #[error("appliance '{key}' is registered more than once")]
    DuplicateAppliance { key: String },

    // Input errors (20-29)
    #[error("observation sequence is empty")]
    EmptyObservation,

    #[error("length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("unknown appliance '{key}'")]
    UnknownAppliance { key: String },

    #[error("model position {position} out of range (registry holds {len})")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("observation at step {step} is not a finite number")]
    NonFiniteObservation { step: usize },

    #[error("observation {value} at step {step} is too far from every state mean to score")]
    ObservationOutOfRange { step: usize, value: f64 },

    // Decode errors (30-39)
    #[error("degenerate model '{model}': {reason}")]
    DegenerateModel { model: String, reason: String },

    #[error("joint state index {index} at step {step} is outside [0, {bound})")]
    IndexOutOfRange {
        step: usize,
        index: usize,
        bound: usize,
    },

    // Configuration errors (40-49)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Model errors
    /// - 20-29: Input errors
    /// - 30-39: Decode errors
    /// - 40-49: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::DimensionMismatch { .. } => 10,
            Error::InvalidModel { .. } => 11,
            Error::NoModels => 12,
            Error::DuplicateAppliance { .. } => 13,
            Error::EmptyObservation => 20,
            Error::LengthMismatch { .. } => 21,
            Error::UnknownAppliance { .. } => 22,
            Error::PositionOutOfRange { .. } => 23,
            Error::NonFiniteObservation { .. } => 24,
            Error::ObservationOutOfRange { .. } => 25,
            Error::DegenerateModel { .. } => 30,
            Error::IndexOutOfRange { .. } => 31,
            Error::Config(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DimensionMismatch { .. }
            | Error::InvalidModel { .. }
            | Error::NoModels
            | Error::DuplicateAppliance { .. } => ErrorCategory::Model,

            Error::EmptyObservation
            | Error::LengthMismatch { .. }
            | Error::UnknownAppliance { .. }
            | Error::PositionOutOfRange { .. }
            | Error::NonFiniteObservation { .. }
            | Error::ObservationOutOfRange { .. } => ErrorCategory::Input,

            Error::DegenerateModel { .. } | Error::IndexOutOfRange { .. } => ErrorCategory::Decode,

            Error::Config(_) => ErrorCategory::Config,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether retrying the same request could succeed.
    ///
    /// Model, input and decode errors describe malformed input or a bug, so
    /// the same request fails the same way every time.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::DimensionMismatch { .. } => {
                "Check that the prior, means and variances each have one entry per state and the transition matrix is square."
            }
            Error::InvalidModel { .. } => {
                "Priors and transition rows must be nonnegative, finite and sum to 1; variances must be positive."
            }
            Error::NoModels => "Supply at least one trained appliance model.",
            Error::DuplicateAppliance { .. } => "Give every appliance model a unique key.",
            Error::EmptyObservation => "Supply at least one aggregate power reading.",
            Error::LengthMismatch { .. } => {
                "Timestamps and observations must be aligned index-for-index."
            }
            Error::UnknownAppliance { .. } => {
                "Run 'fhmm inspect' to list registered appliance keys."
            }
            Error::PositionOutOfRange { .. } => {
                "Model positions are zero-based indexes into the registry."
            }
            Error::NonFiniteObservation { .. } => {
                "Drop or interpolate NaN and infinite readings before disaggregating."
            }
            Error::ObservationOutOfRange { .. } => {
                "The reading is outside any plausible power range. Check units and drop corrupt samples."
            }
            Error::DegenerateModel { .. } => {
                "The combined model assigns zero probability to every path. Check priors and transition rows."
            }
            Error::IndexOutOfRange { .. } => {
                "A joint state index exceeded the joint state space. This indicates a bug; please report it."
            }
            Error::Config(_) => "Check the configuration file syntax and values.",
            Error::Io(_) => "Check that the input file exists and is readable. Retry the operation.",
            Error::Json(_) => "Invalid JSON in input. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::DimensionMismatch { .. } => "Dimension Mismatch",
            Error::InvalidModel { .. } => "Invalid Appliance Model",
            Error::NoModels => "No Appliance Models",
            Error::DuplicateAppliance { .. } => "Duplicate Appliance",
            Error::EmptyObservation => "Empty Observation",
            Error::LengthMismatch { .. } => "Length Mismatch",
            Error::UnknownAppliance { .. } => "Unknown Appliance",
            Error::PositionOutOfRange { .. } => "Model Position Out of Range",
            Error::NonFiniteObservation { .. } => "Non-Finite Observation",
            Error::ObservationOutOfRange { .. } => "Observation Out of Range",
            Error::DegenerateModel { .. } => "Degenerate Model",
            Error::IndexOutOfRange { .. } => "Joint State Out of Range",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }

    /// Format for terminal output: headline, reason and fix.
    pub fn human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (appliance, index, step).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::DimensionMismatch { appliance, .. } | Error::InvalidModel { appliance, .. } => {
                context.insert("appliance".to_string(), serde_json::json!(appliance));
            }
            Error::DuplicateAppliance { key } | Error::UnknownAppliance { key } => {
                context.insert("appliance".to_string(), serde_json::json!(key));
            }
            Error::DegenerateModel { model, .. } => {
                context.insert("model".to_string(), serde_json::json!(model));
            }
            Error::IndexOutOfRange { step, index, bound } => {
                context.insert("step".to_string(), serde_json::json!(step));
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("bound".to_string(), serde_json::json!(bound));
            }
            Error::PositionOutOfRange { position, len } => {
                context.insert("position".to_string(), serde_json::json!(position));
                context.insert("len".to_string(), serde_json::json!(len));
            }
            Error::NonFiniteObservation { step } => {
                context.insert("step".to_string(), serde_json::json!(step));
            }
            Error::ObservationOutOfRange { step, value } => {
                context.insert("step".to_string(), serde_json::json!(step));
                context.insert("value".to_string(), serde_json::json!(value));
            }
            Error::LengthMismatch { what, expected, got } => {
                context.insert("what".to_string(), serde_json::json!(what));
                context.insert("expected".to_string(), serde_json::json!(expected));
                context.insert("got".to_string(), serde_json::json!(got));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
