//! FHMM Disaggregation Core Library
//!
//! This library provides the engine behind the `fhmm` binary:
//! - Appliance models, normalization and the model registry
//! - Kronecker combination into one joint HMM
//! - Log-domain Viterbi decoding and forward scoring
//! - De-combination of joint states into per-appliance power
//! - Report formatting and accuracy metrics
//! - Configuration loading, exit codes and structured logging
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod evaluate;
pub mod exit_codes;
pub mod fhmm;
pub mod inference;
pub mod logging;
pub mod model;
pub mod output;
pub mod request;
