//! Tables exactly as they were read from the source store.

use crate::TableName;

static NULL_CELL: RawValue = RawValue::Null;

/// A source cell, tagged with the storage class it was read as.
///
/// SQLite is dynamically typed, so a single column can hold integers in one
/// row and text in the next. Stages branch on this tag instead of guessing
/// from rendered text.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl RawValue {
    /// Storage class name, used in log entries.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Integer(_) => "integer",
            RawValue::Real(_) => "real",
            RawValue::Text(_) => "text",
            RawValue::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Text form of the value as it appeared in the source.
    ///
    /// Blobs render as their byte length since their content is not text.
    pub fn render(&self) -> String {
        match self {
            RawValue::Null => "NULL".to_string(),
            RawValue::Integer(v) => v.to_string(),
            RawValue::Real(v) => v.to_string(),
            RawValue::Text(v) => v.clone(),
            RawValue::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
        }
    }
}

/// A fully loaded source table.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: TableName,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(name: TableName, columns: Vec<String>) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<RawValue>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterate the cells of one column; short rows yield `Null`.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &RawValue> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&NULL_CELL))
    }
}
