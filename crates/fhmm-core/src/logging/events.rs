//! Stable event names and pipeline stages for structured logging.
//!
//! Event names are used as the `event` field of every log record so JSONL
//! output can be filtered without parsing messages.

use serde::{Deserialize, Serialize};

/// Processing stages in the disaggregation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Request parsing and model normalization.
    Load,
    /// Kronecker composition of appliance models.
    Combine,
    /// Joint-state path decoding.
    Decode,
    /// Mixed-radix split and power reconstruction.
    Decombine,
    /// Report formatting.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Combine => "combine",
            Stage::Decode => "decode",
            Stage::Decombine => "decombine",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "fhmm.run.started";
    pub const RUN_FINISHED: &str = "fhmm.run.finished";
    pub const RUN_FAILED: &str = "fhmm.run.failed";

    // Load stage
    pub const MODEL_REGISTERED: &str = "fhmm.model.registered";
    pub const MODEL_REORDERED: &str = "fhmm.model.reordered";

    // Combine stage
    pub const COMBINE_DONE: &str = "fhmm.combine.done";
    pub const COMBINE_LARGE_STATE_SPACE: &str = "fhmm.combine.large_state_space";

    // Decode stage
    pub const DECODE_DONE: &str = "fhmm.decode.done";

    // Decombine stage
    pub const DECOMBINE_DONE: &str = "fhmm.decombine.done";
    pub const DECOMBINE_CLIPPED: &str = "fhmm.decombine.clipped";

    // Config events
    pub const CONFIG_LOADED: &str = "fhmm.config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "fhmm.config.default_used";
}
