use polars::prelude::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("foreign key refers to unknown table {0}")]
    UnknownTable(String),

    #[error("failed to filter rows of {table}: {source}")]
    Frame {
        table: String,
        #[source]
        source: PolarsError,
    },
}
