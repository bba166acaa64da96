//! Pipeline configuration.
//!
//! Every field has a default, so the runner needs no file and no flags. A
//! TOML file may override any subset, and command-line flags override the
//! file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use cademy_model::PipelineSchema;

pub const DEFAULT_SOURCE: &str = "data/raw/cademycode.db";
pub const DEFAULT_DESTINATION: &str = "data/processed/analytics.db";
pub const DEFAULT_LOG_FILE: &str = "data/logs/pipeline.log";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// `None` logs to stderr only.
    pub log_file: Option<PathBuf>,
    pub schema: PipelineSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            destination: PathBuf::from(DEFAULT_DESTINATION),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            schema: PipelineSchema::cademycode(),
        }
    }
}

impl PipelineConfig {
    /// Parse and check a configuration document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("parse pipeline config")?;
        config.schema.check().context("invalid schema in pipeline config")?;
        Ok(config)
    }

    /// Load the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("load config {}", path.display()))
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(
        mut self,
        source: Option<PathBuf>,
        destination: Option<PathBuf>,
        log_file: Option<PathBuf>,
    ) -> Self {
        if let Some(source) = source {
            self.source = source;
        }
        if let Some(destination) = destination {
            self.destination = destination;
        }
        if log_file.is_some() {
            self.log_file = log_file;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = PipelineConfig::from_toml("").expect("parse");
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.source, PathBuf::from(DEFAULT_SOURCE));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = PipelineConfig::from_toml(r#"destination = "out/a.db""#).expect("parse");
        assert_eq!(config.destination, PathBuf::from("out/a.db"));
        assert_eq!(config.source, PathBuf::from(DEFAULT_SOURCE));
        assert_eq!(config.schema, PipelineSchema::cademycode());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PipelineConfig::from_toml("sourse = \"x\"").is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let config = PipelineConfig::default().with_overrides(
            Some(PathBuf::from("in.db")),
            None,
            Some(PathBuf::from("run.log")),
        );
        assert_eq!(config.source, PathBuf::from("in.db"));
        assert_eq!(config.destination, PathBuf::from(DEFAULT_DESTINATION));
        assert_eq!(config.log_file, Some(PathBuf::from("run.log")));
    }
}
