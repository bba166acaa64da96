//! Defensive decoding of string-encoded JSON documents.

use polars::prelude::{IntoColumn, NamedFrom, Series};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use cademy_common::TableSnapshot;
use cademy_model::{Anomaly, AnomalyRule, AnomalySink, RawValue, RowRef, TableName};

use crate::coerce::TypedTable;
use crate::error::NormalizeError;

/// A document cell, classified once when the table is extracted.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonField {
    Absent,
    Text(String),
    Structured(Map<String, Value>),
    /// Any other kind of value, named and rendered for the anomaly entry.
    Other { kind: &'static str, raw: String },
}

impl From<&RawValue> for JsonField {
    fn from(value: &RawValue) -> Self {
        match value {
            RawValue::Null => JsonField::Absent,
            RawValue::Text(text) if text.trim().is_empty() => JsonField::Absent,
            RawValue::Text(text) => JsonField::Text(text.clone()),
            other => JsonField::Other {
                kind: other.kind(),
                raw: other.render(),
            },
        }
    }
}

impl From<Value> for JsonField {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => JsonField::Absent,
            Value::String(text) => JsonField::Text(text),
            Value::Object(map) => JsonField::Structured(map),
            other => {
                let kind = match other {
                    Value::Bool(_) => "boolean",
                    Value::Number(_) => "number",
                    _ => "array",
                };
                JsonField::Other {
                    kind,
                    raw: other.to_string(),
                }
            }
        }
    }
}

/// Where a document cell lives, for anomaly entries.
#[derive(Debug, Clone, Copy)]
pub struct DecodeSite<'a> {
    pub table: &'a TableName,
    pub row: &'a RowRef,
    pub column: &'a str,
}

/// A JSON column held back from coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentColumn {
    pub name: String,
    pub cells: Vec<JsonField>,
}

/// Decode one document cell. Never fails: anything unusable is recorded and
/// comes back as `None`.
pub fn decode(
    field: &JsonField,
    site: DecodeSite<'_>,
    sink: &mut dyn AnomalySink,
) -> Option<Map<String, Value>> {
    let (rule, raw_value) = match field {
        JsonField::Absent => return None,
        JsonField::Structured(map) => return Some(map.clone()),
        JsonField::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => return Some(map),
            Ok(_) => (AnomalyRule::NotJsonObject, Some(text.clone())),
            Err(_) => (AnomalyRule::InvalidJson, Some(text.clone())),
        },
        JsonField::Other { kind, raw } => (
            AnomalyRule::UnexpectedJsonType {
                found: (*kind).to_string(),
            },
            Some(raw.clone()),
        ),
    };
    sink.record_anomaly(Anomaly {
        table: site.table.clone(),
        row: site.row.clone(),
        column: site.column.to_string(),
        rule,
        raw_value,
    });
    None
}

/// Flatten an object into `(dotted key, value)` pairs, keys sorted per level.
fn flatten_into(
    prefix: Option<&str>,
    map: &Map<String, Value>,
    out: &mut Vec<(String, Option<String>)>,
) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in entries {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(Some(&path), inner, out),
            Value::Null => out.push((path, None)),
            Value::String(text) => out.push((path, Some(text.clone()))),
            other => out.push((path, Some(other.to_string()))),
        }
    }
}

/// Expanded columns of one document, in first-seen key order.
struct Expansion {
    keys: Vec<String>,
    values: Vec<Vec<Option<String>>>,
}

impl Expansion {
    fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    fn slot(&mut self, key: &str, height: usize) -> usize {
        match self.keys.iter().position(|existing| existing == key) {
            Some(idx) => idx,
            None => {
                self.keys.push(key.to_string());
                self.values.push(vec![None; height]);
                self.keys.len() - 1
            }
        }
    }
}

/// SQLite compares column names without regard to ASCII case.
fn name_taken(snapshot: &TableSnapshot, candidate: &str) -> bool {
    snapshot
        .data
        .get_column_names()
        .iter()
        .any(|existing| existing.as_str().eq_ignore_ascii_case(candidate))
}

/// Column name for an expanded key: the key itself, else `<document>.<key>`,
/// else that name with a numeric suffix.
fn expanded_name(snapshot: &TableSnapshot, document: &str, key: &str) -> String {
    if !name_taken(snapshot, key) {
        return key.to_string();
    }
    let prefixed = format!("{document}.{key}");
    if !name_taken(snapshot, &prefixed) {
        return prefixed;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{prefixed}_{n}");
        if !name_taken(snapshot, &candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Decode every document column of `typed` and append its keys as columns.
pub fn decode_documents(
    typed: TypedTable,
    sink: &mut dyn AnomalySink,
) -> Result<TableSnapshot, NormalizeError> {
    let TypedTable {
        mut snapshot,
        documents,
    } = typed;
    let height = snapshot.record_count();

    for document in documents {
        let mut expansion = Expansion::new();
        let mut failed = 0usize;
        for (idx, field) in document.cells.iter().enumerate().take(height) {
            let row = snapshot.row_ref(idx);
            let site = DecodeSite {
                table: &snapshot.name,
                row: &row,
                column: &document.name,
            };
            let Some(map) = decode(field, site, sink) else {
                if !matches!(field, JsonField::Absent) {
                    failed += 1;
                }
                continue;
            };
            let mut pairs = Vec::new();
            flatten_into(None, &map, &mut pairs);
            for (key, value) in pairs {
                let slot = expansion.slot(&key, height);
                expansion.values[slot][idx] = value;
            }
        }

        let table = snapshot.name.to_string();
        for (key, values) in expansion.keys.iter().zip(expansion.values) {
            let name = expanded_name(&snapshot, &document.name, key);
            if name != *key {
                warn!(
                    table = %table,
                    column = %document.name,
                    key = %key,
                    renamed = %name,
                    "document key collides with an existing column"
                );
            }
            let column = Series::new(name.as_str().into(), values).into_column();
            snapshot
                .data
                .with_column(column)
                .map_err(|source| NormalizeError::Frame {
                    table: table.clone(),
                    source,
                })?;
        }
        debug!(
            table = %table,
            column = %document.name,
            expanded = expansion.keys.len(),
            failed,
            "decoded document column"
        );
    }

    Ok(snapshot)
}
