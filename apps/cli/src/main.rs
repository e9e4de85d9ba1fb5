//! testify - eCQM test case population reconciliation
//!
//! Usage:
//!   testify populations --measure-bundle measure.json
//!   testify compare --measure-bundle measure.json --results results.json [--desired desired.json] [--patient-bundle patient.json]...
//!   testify statements --measure-bundle measure.json --results results.json [--patient <id>]

mod commands;
mod config;
mod logging;
mod table;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CliConfig, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "testify", version)]
#[command(about = "Compare desired and calculated eCQM populations for test patients")]
struct Cli {
    /// Configuration file (defaults to ./testify.{toml,yaml,json} when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for testify crates (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the populations a test patient can be marked as expecting
    Populations {
        /// Bundle containing the Measure
        #[arg(long)]
        measure_bundle: PathBuf,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Compare desired populations against calculation results
    Compare {
        /// Bundle containing the Measure
        #[arg(long)]
        measure_bundle: PathBuf,

        /// Calculation output: a list of patient results or `{ "results": [...] }`
        #[arg(long)]
        results: PathBuf,

        /// Desired populations as `{ "<patientId>": ["<selection value>", ...] }`
        #[arg(long)]
        desired: Option<PathBuf>,

        /// Patient bundle used to label episodes (repeatable)
        #[arg(long = "patient-bundle")]
        patient_bundles: Vec<PathBuf>,

        /// Only compare this patient
        #[arg(long)]
        patient: Option<String>,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print statement results in population order
    Statements {
        /// Bundle containing the Measure
        #[arg(long)]
        measure_bundle: PathBuf,

        /// Calculation output: a list of patient results or `{ "results": [...] }`
        #[arg(long)]
        results: PathBuf,

        /// Only print this patient
        #[arg(long)]
        patient: Option<String>,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

impl Command {
    fn format(&self) -> Option<OutputFormat> {
        match self {
            Command::Populations { format, .. }
            | Command::Compare { format, .. }
            | Command::Statements { format, .. } => *format,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    if cli.no_color {
        config.output.color = false;
    }
    if let Some(format) = cli.command.format() {
        config.output.format = format;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard = logging::init_logging(&config.logging, config.output.color)
        .context("Failed to initialize logging")?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting testify");

    match &cli.command {
        Command::Populations { measure_bundle, .. } => {
            commands::populations(measure_bundle, &config.output)
        }
        Command::Compare {
            measure_bundle,
            results,
            desired,
            patient_bundles,
            patient,
            ..
        } => commands::compare(
            commands::CompareArgs {
                measure_bundle,
                results,
                desired: desired.as_deref(),
                patient_bundles,
                patient: patient.as_deref(),
            },
            &config.output,
        ),
        Command::Statements {
            measure_bundle,
            results,
            patient,
            ..
        } => commands::statements(measure_bundle, results, patient.as_deref(), &config.output),
    }
}
