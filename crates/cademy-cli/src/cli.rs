//! CLI argument definitions for the Cademycode ETL runner.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cademy-etl",
    version,
    about = "Clean the Cademycode student database into an analytics database",
    long_about = "Extract students, courses, and jobs from the Cademycode source database,\n\
                  normalize and validate them, and replace the tables of the analytics\n\
                  database in one transaction.\n\n\
                  Data-quality problems are logged and never fail the run."
)]
pub struct Cli {
    /// Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Pipeline configuration file (TOML).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Also append logs to this file (overrides the configured log file).
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline (the default).
    Run(RunArgs),

    /// Print the tables, column types, and rules the pipeline applies.
    Schema,
}

#[derive(Args, Default)]
pub struct RunArgs {
    /// Source database (default: data/raw/cademycode.db).
    #[arg(long = "source", value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Destination database (default: data/processed/analytics.db).
    #[arg(long = "destination", value_name = "PATH")]
    pub destination: Option<PathBuf>,

    /// Extract, clean, and validate without writing the destination.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
