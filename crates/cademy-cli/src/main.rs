//! Cademycode ETL runner.

use std::io::{self, IsTerminal};

use anyhow::Result;
use cademy_cli::config::PipelineConfig;
use cademy_cli::logging::{LogConfig, LogFormat, init_logging};
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, RunArgs};
use crate::commands::{print_schema, run};
use crate::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let exit_code = match execute(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn execute(cli: &Cli) -> Result<()> {
    let default_args = RunArgs::default();
    let run_args = match &cli.command {
        Some(Command::Run(args)) => Some(args),
        Some(Command::Schema) => None,
        None => Some(&default_args),
    };
    // Overrides apply before logging starts so --log-file takes effect.
    let config = PipelineConfig::load(cli.config.as_deref())?.with_overrides(
        run_args.and_then(|args| args.source.clone()),
        run_args.and_then(|args| args.destination.clone()),
        cli.log_file.clone(),
    );

    let Some(args) = run_args else {
        print_schema(&config.schema);
        return Ok(());
    };

    let log_config = log_config_from_cli(cli, &config);
    init_logging(&log_config)
        .map_err(|error| anyhow::anyhow!("failed to initialize logging: {error}"))?;
    let result = run(&config, args)?;
    print_summary(&result);
    Ok(())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli, config: &PipelineConfig) -> LogConfig {
    let mut log_config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    log_config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        log_config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    log_config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    log_config.log_file = config.log_file.clone();
    log_config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stderr().is_terminal(),
    };
    log_config
}
