use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
    #[error("duplicate table in schema: {0}")]
    DuplicateTable(String),
    #[error("table {table} has no declared column {column} (used as {role})")]
    UndeclaredColumn {
        table: String,
        column: String,
        role: &'static str,
    },
    #[error("table {table} column {column} is a json document and cannot be used as {role}")]
    DocumentColumn {
        table: String,
        column: String,
        role: &'static str,
    },
    #[error("foreign key references unknown table {0}")]
    UnknownTable(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
