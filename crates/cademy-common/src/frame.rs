//! Table snapshots passed between pipeline stages.
//!
//! A [`TableSnapshot`] pairs a table name with a Polars DataFrame. Stages
//! never mutate a snapshot they were handed; they build and return a new one.

use cademy_model::{RowRef, TableName};
use polars::prelude::{AnyValue, DataFrame};

use crate::polars::any_to_string_non_empty;

#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub name: TableName,
    pub data: DataFrame,
    /// Column whose value identifies a row in log entries.
    pub key: Option<String>,
    /// Source row index of each frame row, so dropped rows keep their
    /// original position in later log entries.
    pub origins: Vec<usize>,
}

impl TableSnapshot {
    /// Snapshot whose rows are in source order.
    pub fn new(name: TableName, data: DataFrame, key: Option<String>) -> Self {
        let origins = (0..data.height()).collect();
        Self {
            name,
            data,
            key,
            origins,
        }
    }

    /// Returns the number of records in the frame.
    pub fn record_count(&self) -> usize {
        self.data.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.column(name).is_ok()
    }

    /// Cell value at `idx`, or `Null` when the column or row is absent.
    pub fn value(&self, column: &str, idx: usize) -> AnyValue<'_> {
        self.data
            .column(column)
            .ok()
            .and_then(|series| series.get(idx).ok())
            .unwrap_or(AnyValue::Null)
    }

    /// Log reference for the frame row at `idx`.
    pub fn row_ref(&self, idx: usize) -> RowRef {
        let origin = self.origins.get(idx).copied().unwrap_or(idx);
        let key_value = self
            .key
            .as_deref()
            .and_then(|column| any_to_string_non_empty(self.value(column, idx)).map(|v| (column, v)));
        match key_value {
            Some((column, value)) => RowRef::keyed(origin, column, value),
            None => RowRef::at(origin),
        }
    }
}
