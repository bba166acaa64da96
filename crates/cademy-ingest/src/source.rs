//! Read-only access to the source database.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use cademy_common::quote_identifier;
use cademy_model::{PipelineSchema, RawTable, RawValue, TableName};

use crate::error::ExtractError;

/// An open, read-only connection to the source store.
pub struct SourceStore {
    path: PathBuf,
    connection: Connection,
}

impl SourceStore {
    /// Open an existing database file without write access.
    ///
    /// Unlike a plain `Connection::open`, a missing file is an error rather
    /// than an empty new database.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::SourceMissing {
                path: path.to_path_buf(),
            });
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection =
            Connection::open_with_flags(path, flags).map_err(|source| ExtractError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "opened source database");
        Ok(Self {
            path: path.to_path_buf(),
            connection,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every row of `source` into memory under the logical `name`.
    pub fn read_table(&self, source: &str, name: TableName) -> Result<RawTable, ExtractError> {
        let sql = format!("SELECT * FROM {}", quote_identifier(source));
        let mut stmt = self
            .connection
            .prepare(&sql)
            .map_err(|error| ExtractError::read(source, error))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let column_count = columns.len();
        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(column_count);
                for idx in 0..column_count {
                    let value: Value = row.get(idx)?;
                    cells.push(raw_value(value));
                }
                Ok(cells)
            })
            .map_err(|error| ExtractError::read(source, error))?;

        let mut table = RawTable::new(name, columns);
        for row in rows {
            table.push_row(row.map_err(|error| ExtractError::read(source, error))?);
        }
        Ok(table)
    }
}

fn raw_value(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Integer(v) => RawValue::Integer(v),
        Value::Real(v) => RawValue::Real(v),
        Value::Text(v) => RawValue::Text(v),
        Value::Blob(v) => RawValue::Blob(v),
    }
}

/// Extract every table named by `schema` over a single connection.
///
/// The connection is closed when this returns, whether or not it succeeded.
pub fn extract_all(
    path: &Path,
    schema: &PipelineSchema,
) -> Result<BTreeMap<TableName, RawTable>, ExtractError> {
    let store = SourceStore::open(path)?;
    let mut tables = BTreeMap::new();
    for spec in &schema.tables {
        let table = store.read_table(&spec.source, spec.name.clone())?;
        info!(
            table = %spec.name,
            source_table = %spec.source,
            rows = table.row_count(),
            "extracted table"
        );
        tables.insert(spec.name.clone(), table);
    }
    Ok(tables)
}
