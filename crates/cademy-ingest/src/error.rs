use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("source database not found at {path}")]
    SourceMissing { path: PathBuf },

    #[error("failed to open source database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read table {table}: {source}")]
    Read {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl ExtractError {
    pub(crate) fn read(table: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Read {
            table: table.into(),
            source,
        }
    }
}
