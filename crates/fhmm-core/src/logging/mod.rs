//! Logging for the `fhmm` binary and library.
//!
//! All records go to stderr so stdout only ever carries command payloads.
//! Human mode writes console lines; JSONL mode writes one flattened object
//! per event. Every event carries a stable `event` name from
//! [`event_names`] and, where it applies, the pipeline [`Stage`].
//!
//! ```ignore
//! use fhmm_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! tracing::info!(event = event_names::RUN_STARTED, stage = %Stage::Init, "starting");
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Crate targets that receive the configured level. Dependencies stay silent.
const TARGETS: [&str; 3] = ["fhmm_core", "fhmm_math", "fhmm"];

fn filter_for(level: LogLevel) -> EnvFilter {
    let directives: Vec<String> = TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    EnvFilter::new(directives.join(","))
}

fn layer_for(config: &LogConfig) -> BoxedLayer {
    match config.format {
        LogFormat::Jsonl => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Human => {
            let human = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                human.boxed()
            } else {
                human.without_time().boxed()
            }
        }
    }
}

/// Install the global subscriber.
///
/// Only the first call takes effect; later calls keep the existing
/// subscriber, so tests sharing a process can call this freely.
pub fn init_logging(config: &LogConfig) {
    let installed = tracing_subscriber::registry()
        .with(layer_for(config))
        .with(filter_for(config.level))
        .try_init();

    if installed.is_err() {
        tracing::debug!("subscriber already installed");
    }
}
