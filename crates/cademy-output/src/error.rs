use std::path::PathBuf;

use polars::prelude::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open destination database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to write table {table}: {source}")]
    Write {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read frame for {table}: {source}")]
    Frame {
        table: String,
        #[source]
        source: PolarsError,
    },

    #[error("failed to commit load into {path}: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

impl LoadError {
    pub(crate) fn write(table: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Write {
            table: table.into(),
            source,
        }
    }
}
