use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::{AnyValue, DataType};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Transaction, params_from_iter};
use tracing::{debug, info};

use cademy_common::{TableSnapshot, any_to_string, quote_identifier};
use cademy_model::TableName;

use crate::error::LoadError;

/// Rows written for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub table: TableName,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub path: PathBuf,
    /// In the order written (table name order).
    pub tables: Vec<TableLoad>,
}

impl LoadSummary {
    pub fn rows_for(&self, table: &TableName) -> Option<usize> {
        self.tables
            .iter()
            .find(|load| &load.table == table)
            .map(|load| load.rows)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|load| load.rows).sum()
    }
}

/// SQLite column type for a frame column.
///
/// Anything without a native storage class is written as its text rendering.
pub fn sql_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Boolean => "INTEGER",
        DataType::Float32 | DataType::Float64 => "REAL",
        _ => "TEXT",
    }
}

fn sql_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Integer(i64::from(v)),
        AnyValue::Int8(v) => Value::Integer(i64::from(v)),
        AnyValue::Int16(v) => Value::Integer(i64::from(v)),
        AnyValue::Int32(v) => Value::Integer(i64::from(v)),
        AnyValue::Int64(v) => Value::Integer(v),
        AnyValue::UInt8(v) => Value::Integer(i64::from(v)),
        AnyValue::UInt16(v) => Value::Integer(i64::from(v)),
        AnyValue::UInt32(v) => Value::Integer(i64::from(v)),
        AnyValue::UInt64(v) => match i64::try_from(v) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Text(v.to_string()),
        },
        AnyValue::Float32(v) => Value::Real(f64::from(v)),
        AnyValue::Float64(v) => Value::Real(v),
        AnyValue::String(v) => Value::Text(v.to_string()),
        AnyValue::StringOwned(v) => Value::Text(v.to_string()),
        other => Value::Text(any_to_string(other)),
    }
}

/// Drop, recreate, and fill one table inside `tx`.
fn replace_table(tx: &Transaction<'_>, snapshot: &TableSnapshot) -> Result<usize, LoadError> {
    let table = snapshot.name.as_str();
    let quoted = quote_identifier(table);
    let columns = snapshot.data.get_columns();

    let definitions: Vec<String> = columns
        .iter()
        .map(|column| {
            format!(
                "{} {}",
                quote_identifier(column.name()),
                sql_type(column.dtype())
            )
        })
        .collect();
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {quoted};\nCREATE TABLE {quoted} ({});",
        definitions.join(", ")
    ))
    .map_err(|error| LoadError::write(table, error))?;

    let names: Vec<String> = columns
        .iter()
        .map(|column| quote_identifier(column.name()))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|idx| format!("?{idx}")).collect();
    let sql = format!(
        "INSERT INTO {quoted} ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = tx
        .prepare(&sql)
        .map_err(|error| LoadError::write(table, error))?;

    let height = snapshot.record_count();
    for idx in 0..height {
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            let value = column.get(idx).map_err(|source| LoadError::Frame {
                table: table.to_string(),
                source,
            })?;
            row.push(sql_value(value));
        }
        stmt.execute(params_from_iter(row))
            .map_err(|error| LoadError::write(table, error))?;
    }
    Ok(height)
}

/// Replace every table of `snapshots` in the database at `path`.
///
/// The parent directory and the database file are created when missing.
/// Nothing is visible to other connections until the final commit; any
/// error rolls the whole load back.
pub fn load_tables(
    path: &Path,
    snapshots: &BTreeMap<TableName, TableSnapshot>,
) -> Result<LoadSummary, LoadError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LoadError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let mut connection =
        Connection::open_with_flags(path, flags).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let tx = connection.transaction().map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tables = Vec::with_capacity(snapshots.len());
    for (name, snapshot) in snapshots {
        let rows = replace_table(&tx, snapshot)?;
        debug!(table = %name, rows, "replaced table");
        tables.push(TableLoad {
            table: name.clone(),
            rows,
        });
    }

    tx.commit().map_err(|source| LoadError::Commit {
        path: path.to_path_buf(),
        source,
    })?;
    let summary = LoadSummary {
        path: path.to_path_buf(),
        tables,
    };
    info!(
        path = %path.display(),
        tables = summary.tables.len(),
        rows = summary.total_rows(),
        "load committed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_value_maps_storage_classes() {
        assert_eq!(sql_value(AnyValue::Null), Value::Null);
        assert_eq!(sql_value(AnyValue::Int64(7)), Value::Integer(7));
        assert_eq!(sql_value(AnyValue::Boolean(true)), Value::Integer(1));
        assert_eq!(sql_value(AnyValue::Float64(2.5)), Value::Real(2.5));
        assert_eq!(sql_value(AnyValue::String("a")), Value::Text("a".into()));
        assert_eq!(
            sql_value(AnyValue::UInt64(u64::MAX)),
            Value::Text(u64::MAX.to_string())
        );
    }

    #[test]
    fn sql_type_covers_frame_types() {
        assert_eq!(sql_type(&DataType::Int64), "INTEGER");
        assert_eq!(sql_type(&DataType::Float64), "REAL");
        assert_eq!(sql_type(&DataType::String), "TEXT");
        assert_eq!(sql_type(&DataType::Boolean), "INTEGER");
    }
}
