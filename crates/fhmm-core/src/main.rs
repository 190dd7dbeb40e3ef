//! FHMM Disaggregation - command line entry point
//!
//! The `fhmm` binary handles:
//! - Disaggregating an aggregate power trace into per-appliance estimates
//! - Inspecting the models in a request and the joint state space
//! - Scoring candidate models by forward log-likelihood
//! - Evaluating estimates against ground truth

use clap::{Args, Parser, Subcommand};
use fhmm_common::{Error, OutputFormat, Result, RunId, StructuredError};
use fhmm_core::config::{load_config, ConfigOptions, ResolvedConfig};
use fhmm_core::evaluate::{fraction_energy_assigned_correctly, ApplianceMetrics};
use fhmm_core::exit_codes::ExitCode;
use fhmm_core::fhmm::{score as score_combined, Engine};
use fhmm_core::logging::{event_names, init_logging, LogConfig, LogFormat, LogLevel, Stage};
use fhmm_core::model::{rank_candidates, ApplianceModel, ModelSelection, Ranking};
use fhmm_core::output::format_report;
use fhmm_core::request::DisaggregationRequest;
use fhmm_math::MixedRadix;
use serde::Serialize;
use std::path::PathBuf;

/// FHMM Disaggregation - split aggregate power into appliance estimates
#[derive(Parser)]
#[command(name = "fhmm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Engine config file (TOML or JSON); falls back to $FHMM_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

impl GlobalOpts {
    /// `--log-level` beats `-q`, which beats `-v`.
    fn log_level(&self) -> Option<LogLevel> {
        if self.log_level.is_some() {
            return self.log_level;
        }
        if self.quiet {
            return Some(LogLevel::Error);
        }
        match self.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a request and print per-appliance power estimates
    Disaggregate(DisaggregateArgs),

    /// Show the models in a request and the joint state space they form
    Inspect(InputArgs),

    /// Rank models by forward log-likelihood on held-out traces
    Score(InputArgs),

    /// Disaggregate, then compare the estimates with the request's ground truth
    Evaluate(EvaluateArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Disaggregate(_) => "disaggregate",
            Commands::Inspect(_) => "inspect",
            Commands::Score(_) => "score",
            Commands::Evaluate(_) => "evaluate",
        }
    }
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct InputArgs {
    /// Request file (JSON); `-` reads stdin
    input: PathBuf,

    /// Use only these appliance keys, in this order
    #[arg(long, value_delimiter = ',', conflicts_with = "positions")]
    select: Vec<String>,

    /// Use only the models at these registry positions, in this order
    #[arg(long, value_delimiter = ',')]
    positions: Vec<usize>,
}

impl InputArgs {
    /// Selection from flags, if any were given.
    fn selection(&self) -> Option<ModelSelection> {
        if !self.select.is_empty() {
            Some(ModelSelection::ByKey(
                self.select.iter().map(|k| k.as_str().into()).collect(),
            ))
        } else if !self.positions.is_empty() {
            Some(ModelSelection::ByPosition(self.positions.clone()))
        } else {
            None
        }
    }
}

#[derive(Args, Debug)]
struct DisaggregateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Override the configured power source seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Power at or above which an appliance counts as on
    #[arg(long, default_value = "10")]
    threshold: f64,
}

// ============================================================================
// Entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                err.exit();
            }
            let _ = err.print();
            std::process::exit(ExitCode::ArgsError.as_i32());
        }
    };

    let log_config = LogConfig::from_env(cli.global.log_level(), cli.global.log_format);
    init_logging(&log_config);

    let run_id = RunId::new();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _enter = span.enter();
    let command = cli.command.name();
    tracing::info!(
        event = event_names::RUN_STARTED,
        stage = %Stage::Init,
        command,
        "run started"
    );

    let result = load_config(&ConfigOptions {
        config_path: cli.global.config.clone(),
    })
    .map_err(Error::from)
    .and_then(|config| match &cli.command {
        Commands::Disaggregate(args) => run_disaggregate(&cli.global, args, &config),
        Commands::Inspect(args) => run_inspect(&cli.global, args, &config),
        Commands::Score(args) => run_score(&cli.global, args, &config),
        Commands::Evaluate(args) => run_evaluate(&cli.global, args, &config),
    });

    let exit_code = match result {
        Ok(()) => {
            tracing::info!(event = event_names::RUN_FINISHED, command, "run finished");
            ExitCode::Success
        }
        Err(err) => {
            let exit_code = ExitCode::from_error(&err);
            tracing::error!(
                event = event_names::RUN_FAILED,
                command,
                code = err.code(),
                exit = exit_code.code_name(),
                "{}",
                err
            );
            output_error(&cli.global, &err, &run_id);
            exit_code
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Errors go to stderr: structured JSON, or the human form for summaries.
fn output_error(global: &GlobalOpts, err: &Error, run_id: &RunId) {
    match global.format {
        OutputFormat::Summary => eprintln!("{}", err.human()),
        OutputFormat::Json | OutputFormat::Jsonl => {
            let structured = StructuredError::from(err).with_context("run_id", run_id.to_string());
            eprintln!("{}", structured.to_json());
        }
    }
}

fn emit(text: &str) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

/// JSON and JSONL print `value` on one document; summary uses `summary`.
fn emit_value<T: Serialize>(global: &GlobalOpts, value: &T, summary: impl FnOnce() -> String) -> Result<()> {
    match global.format {
        OutputFormat::Json => emit(&serde_json::to_string_pretty(value)?),
        OutputFormat::Jsonl => emit(&serde_json::to_string(value)?),
        OutputFormat::Summary => emit(&summary()),
    }
    Ok(())
}

/// Load a request, apply CLI selection over the request's own, and
/// resolve the selected models.
fn load_request(args: &InputArgs) -> Result<(DisaggregationRequest, Vec<ApplianceModel>)> {
    let request = DisaggregationRequest::from_path(&args.input)?;
    let registry = request.registry()?;
    let selection = args
        .selection()
        .unwrap_or_else(|| request.selection.clone());
    let models = registry
        .select(&selection)?
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    tracing::info!(
        stage = %Stage::Load,
        registered = registry.len(),
        selected = models.len(),
        steps = request.observations.len(),
        "request loaded"
    );
    Ok((request, models))
}

// ============================================================================
// Commands
// ============================================================================

fn run_disaggregate(global: &GlobalOpts, args: &DisaggregateArgs, config: &ResolvedConfig) -> Result<()> {
    let (request, models) = load_request(&args.input)?;
    request.check_alignment()?;

    let mut engine_config = config.engine.clone();
    if let Some(seed) = args.seed {
        engine_config.seed = seed;
    }
    let engine = Engine::new(engine_config);
    let decoded = engine.disaggregate(&models, &request.observations)?;

    let report = format_report(
        &request.timestamps,
        &request.observations,
        &decoded,
        &engine.config().timestamp_format,
    )?;
    tracing::debug!(stage = %Stage::Report, format = %global.format, "rendering report");
    emit(&report.render(global.format)?);
    Ok(())
}

#[derive(Serialize)]
struct ModelSummary {
    key: String,
    n_states: usize,
    prior: Vec<f64>,
    means: Vec<f64>,
    variances: Vec<f64>,
}

#[derive(Serialize)]
struct InspectOutput {
    models: Vec<ModelSummary>,
    joint_states: Option<usize>,
    steps: usize,
    config_path: Option<PathBuf>,
    config_hash: Option<String>,
}

fn run_inspect(global: &GlobalOpts, args: &InputArgs, config: &ResolvedConfig) -> Result<()> {
    let (request, models) = load_request(args)?;
    let joint_states =
        MixedRadix::new(models.iter().map(ApplianceModel::n_states).collect()).map(|r| r.size());
    let output = InspectOutput {
        models: models
            .iter()
            .map(|m| ModelSummary {
                key: m.key().to_string(),
                n_states: m.n_states(),
                prior: m.prior().to_vec(),
                means: m.means().to_vec(),
                variances: m.variances().to_vec(),
            })
            .collect(),
        joint_states,
        steps: request.observations.len(),
        config_path: config.path.clone(),
        config_hash: config.hash.clone(),
    };

    emit_value(global, &output, || {
        let mut out = String::new();
        for m in &output.models {
            out.push_str(&format!("{:<16} {} states  means {:?}\n", m.key, m.n_states, m.means));
        }
        match output.joint_states {
            Some(n) => {
                out.push_str(&format!("joint states: {}\n", n));
            }
            None => {
                out.push_str("joint states: overflow\n");
            }
        }
        out.push_str(&format!("steps: {}\n", output.steps));
        out
    })
}

#[derive(Serialize)]
struct ScoreOutput {
    ranking: Ranking,
    /// Forward log-likelihood of the observations under the combined model.
    combined_log_likelihood: f64,
}

fn run_score(global: &GlobalOpts, args: &InputArgs, config: &ResolvedConfig) -> Result<()> {
    let (request, models) = load_request(args)?;
    let traces = if request.holdout.is_empty() {
        vec![request.observations.clone()]
    } else {
        request.holdout.clone()
    };
    let candidates: Vec<&ApplianceModel> = models.iter().collect();
    let ranking = rank_candidates(&candidates, &traces)?;

    let engine = Engine::new(config.engine.clone());
    let combination = engine.combine(&models)?;
    let combined_log_likelihood = score_combined(&combination.fhmm, &request.observations)?;

    let output = ScoreOutput {
        ranking,
        combined_log_likelihood,
    };
    emit_value(global, &output, || {
        let mut out = String::new();
        for (rank, s) in output.ranking.scores.iter().enumerate() {
            out.push_str(&format!("{:>2}. {:<16} {:>14.3}\n", rank + 1, s.key.as_str(), s.mean));
        }
        out.push_str(&format!("combined: {:.3}\n", output.combined_log_likelihood));
        out
    })
}

#[derive(Serialize)]
struct EvaluateOutput {
    metrics: Vec<ApplianceMetrics>,
    fraction_energy_assigned_correctly: f64,
}

fn run_evaluate(global: &GlobalOpts, args: &EvaluateArgs, config: &ResolvedConfig) -> Result<()> {
    let (request, models) = load_request(&args.input)?;
    request.check_alignment()?;
    let engine = Engine::new(config.engine.clone());
    let decoded = engine.disaggregate(&models, &request.observations)?;

    let predicted: Vec<_> = decoded
        .appliances
        .iter()
        .map(|trace| (trace.key.clone(), trace.power.clone()))
        .collect();
    let truth = request.ground_truth_series();

    let mut metrics = Vec::with_capacity(truth.len());
    for (key, series) in &truth {
        let trace = decoded
            .get(key)
            .ok_or_else(|| Error::UnknownAppliance {
                key: key.to_string(),
            })?;
        metrics.push(ApplianceMetrics::compute(
            key.clone(),
            series,
            &trace.power,
            args.threshold,
        )?);
    }
    let output = EvaluateOutput {
        fraction_energy_assigned_correctly: fraction_energy_assigned_correctly(&predicted, &truth),
        metrics,
    };

    emit_value(global, &output, || {
        let mut out = String::new();
        for m in &output.metrics {
            out.push_str(&format!(
                "{}: rss {:.1}  sum error {:.1}  f1 {:.3}\n",
                m.key, m.rss, m.sum_error, m.f1
            ));
            out.push_str(&m.counts.table());
            out.push('\n');
        }
        out.push_str(&format!(
            "energy assigned correctly: {:.1}%\n",
            output.fraction_energy_assigned_correctly * 100.0
        ));
        out
    })
}
