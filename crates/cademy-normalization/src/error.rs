use polars::prelude::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("failed to build frame for {table}: {source}")]
    Frame {
        table: String,
        #[source]
        source: PolarsError,
    },
}
