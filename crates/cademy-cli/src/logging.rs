//! Logging infrastructure using `tracing` and `tracing-subscriber`.
//!
//! Every run logs to stderr. When a log file is configured the same events
//! are appended to it with timestamps and without colors, so the anomaly log
//! survives the terminal session. The file always keeps `cademy::anomaly`
//! events, whatever level stderr runs at.
//!
//! # Log Levels
//!
//! - `error`: fatal infrastructure failures
//! - `warn`: anomalies, dropped rows, foreign-key violations
//! - `info`: stage progress and row counts
//! - `debug`: per-column and per-table details
//! - `trace`: everything else

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level for the cademy crates.
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` replace the level when set.
    pub use_env_filter: bool,
    /// Whether stderr lines carry timestamps. File lines always do.
    pub with_timestamps: bool,
    /// Whether to include target (module path) in log output.
    pub with_target: bool,
    /// Whether to use ANSI colors on stderr.
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Optional log file; events are appended to it as well as stderr.
    pub log_file: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for machine parsing.
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::INFO,
            use_env_filter: true,
            with_timestamps: false,
            with_target: true,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
        }
    }
}

/// Initialize the global tracing subscriber with the given configuration.
///
/// This should be called once at application startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let mut layers = vec![build_layer(
        config,
        io::stderr,
        config.with_ansi,
        config.with_timestamps,
        build_env_filter(config),
    )];
    if let Some(path) = &config.log_file {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        layers.push(file_layer(config, SharedFileWriter::new(file)));
    }
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(io::Error::other)
}

/// Layer for the log file: no colors, timestamps, anomalies always kept.
fn file_layer<W>(config: &LogConfig, writer: W) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    build_layer(config, writer, false, true, build_file_filter(config))
}

/// Build one formatting layer with its own filter.
pub fn build_layer<W>(
    config: &LogConfig,
    writer: W,
    ansi: bool,
    timestamps: bool,
    filter: EnvFilter,
) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(config.with_target)
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(config.with_target);
            if timestamps {
                layer.with_filter(filter).boxed()
            } else {
                layer.without_time().with_filter(filter).boxed()
            }
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(config.with_target);
            if timestamps {
                layer.with_filter(filter).boxed()
            } else {
                layer.without_time().with_filter(filter).boxed()
            }
        }
    }
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl SharedFileWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<std::fs::File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

/// Default filter: cademy crates and the anomaly target at the configured
/// level, everything else at warn.
fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    format!(
        "warn,cademy={level},cademy_cli={level},cademy_common={level},cademy_ingest={level},\
         cademy_model={level},cademy_normalization={level},cademy_output={level},\
         cademy_validate={level}"
    )
}

/// Appended to the file filter so quiet runs still record anomalies.
const ANOMALY_DIRECTIVE: &str = "cademy::anomaly=warn";

/// `RUST_LOG`, when it applies to this run and is set.
fn env_directives(config: &LogConfig) -> Option<String> {
    if !config.use_env_filter {
        return None;
    }
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn build_file_filter(config: &LogConfig) -> EnvFilter {
    let base = env_directives(config).unwrap_or_else(|| default_directives(config.level_filter));
    EnvFilter::new(format!("{base},{ANOMALY_DIRECTIVE}"))
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    if config.use_env_filter
        && let Ok(filter) = EnvFilter::try_from_default_env()
    {
        return filter;
    }
    EnvFilter::new(default_directives(config.level_filter))
}
