//! FHMM disaggregation common types, IDs, and errors.
//!
//! This crate provides foundational types shared across fhmm-core modules:
//! - Appliance keys and run identifiers
//! - The unified error taxonomy with stable codes
//! - Output formats for CLI payloads

pub mod error;
pub mod id;
pub mod output;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::{ApplianceKey, RunId};
pub use output::OutputFormat;
