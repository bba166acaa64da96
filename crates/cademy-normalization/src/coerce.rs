//! Column coercion to declared semantic types.
//!
//! Every cell is converted independently. A cell that cannot be converted
//! becomes null and is reported to the anomaly sink with its raw value; no
//! row is ever dropped here.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};
use tracing::debug;

use cademy_common::{TableSnapshot, format_numeric, integral_f64, parse_f64, parse_i64};
use cademy_model::{
    Anomaly, AnomalyRule, AnomalySink, RawTable, RawValue, RowRef, SemanticType, TableSpec,
};

use crate::decode::{DocumentColumn, JsonField};
use crate::error::NormalizeError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Outcome of converting one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    /// The source had no value (null or blank).
    Missing,
    /// The source had a value that does not fit the type.
    Invalid,
}

impl<T> Coerced<T> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Coerced::Invalid)
    }

    fn into_option(self) -> Option<T> {
        match self {
            Coerced::Value(value) => Some(value),
            Coerced::Missing | Coerced::Invalid => None,
        }
    }
}

fn trimmed_text(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

pub fn coerce_int(value: &RawValue) -> Coerced<i64> {
    match value {
        RawValue::Null => Coerced::Missing,
        RawValue::Integer(v) => Coerced::Value(*v),
        RawValue::Real(v) => integral_f64(*v).map_or(Coerced::Invalid, Coerced::Value),
        RawValue::Text(text) => {
            let Some(text) = trimmed_text(text) else {
                return Coerced::Missing;
            };
            if let Some(v) = parse_i64(text) {
                return Coerced::Value(v);
            }
            // "3.0" is an integer written as a decimal.
            parse_f64(text)
                .and_then(integral_f64)
                .map_or(Coerced::Invalid, Coerced::Value)
        }
        RawValue::Blob(_) => Coerced::Invalid,
    }
}

pub fn coerce_float(value: &RawValue) -> Coerced<f64> {
    let parsed = match value {
        RawValue::Null => return Coerced::Missing,
        RawValue::Integer(v) => *v as f64,
        RawValue::Real(v) => *v,
        RawValue::Text(text) => {
            let Some(text) = trimmed_text(text) else {
                return Coerced::Missing;
            };
            match parse_f64(text) {
                Some(v) => v,
                None => return Coerced::Invalid,
            }
        }
        RawValue::Blob(_) => return Coerced::Invalid,
    };
    if parsed.is_nan() {
        Coerced::Missing
    } else {
        Coerced::Value(parsed)
    }
}

pub fn coerce_text(value: &RawValue) -> Coerced<String> {
    match value {
        RawValue::Null => Coerced::Missing,
        RawValue::Integer(v) => Coerced::Value(v.to_string()),
        RawValue::Real(v) if v.is_nan() => Coerced::Missing,
        RawValue::Real(v) => Coerced::Value(format_numeric(*v)),
        RawValue::Text(text) => {
            trimmed_text(text).map_or(Coerced::Missing, |text| Coerced::Value(text.to_string()))
        }
        RawValue::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => {
                trimmed_text(text).map_or(Coerced::Missing, |text| Coerced::Value(text.to_string()))
            }
            Err(_) => Coerced::Invalid,
        },
    }
}

/// Parse a date or datetime and keep only the calendar date as `YYYY-MM-DD`.
pub fn coerce_date(value: &RawValue) -> Coerced<String> {
    let text = match value {
        RawValue::Null => return Coerced::Missing,
        RawValue::Text(text) => text,
        RawValue::Integer(_) | RawValue::Real(_) | RawValue::Blob(_) => return Coerced::Invalid,
    };
    let Some(text) = trimmed_text(text) else {
        return Coerced::Missing;
    };
    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|datetime| datetime.date())
        });
    match date {
        Some(date) => Coerced::Value(date.format("%Y-%m-%d").to_string()),
        None => Coerced::Invalid,
    }
}

/// A normalized table whose JSON document columns are not decoded yet.
#[derive(Debug, Clone)]
pub struct TypedTable {
    pub snapshot: TableSnapshot,
    pub documents: Vec<DocumentColumn>,
}

/// Reports failed conversions for one column.
struct ColumnCoercion<'a> {
    raw: &'a RawTable,
    key_index: Option<usize>,
    key_name: Option<&'a str>,
    column: &'a str,
    sink: &'a mut dyn AnomalySink,
    failures: usize,
}

impl ColumnCoercion<'_> {
    fn row_ref(&self, idx: usize) -> RowRef {
        let key = self.key_index.and_then(|key_idx| {
            let value = self.raw.rows[idx].get(key_idx)?;
            match value {
                RawValue::Null | RawValue::Blob(_) => None,
                other => trimmed_text(&other.render()).map(str::to_string),
            }
        });
        match (self.key_name, key) {
            (Some(name), Some(value)) => RowRef::keyed(idx, name, value),
            _ => RowRef::at(idx),
        }
    }

    fn run<T>(
        &mut self,
        index: usize,
        expected: SemanticType,
        convert: impl Fn(&RawValue) -> Coerced<T>,
    ) -> Vec<Option<T>> {
        let values: Vec<&RawValue> = self.raw.column_values(index).collect();
        let mut out = Vec::with_capacity(values.len());
        for (idx, value) in values.into_iter().enumerate() {
            let coerced = convert(value);
            if coerced.is_invalid() {
                self.failures += 1;
                let row = self.row_ref(idx);
                self.sink.record_anomaly(Anomaly {
                    table: self.raw.name.clone(),
                    row,
                    column: self.column.to_string(),
                    rule: AnomalyRule::TypeCoercion { expected },
                    raw_value: Some(value.render()),
                });
            }
            out.push(coerced.into_option());
        }
        out
    }
}

/// Coerce every declared column of `raw` to its semantic type.
///
/// Columns the table schema does not declare pass through with an inferred type.
/// JSON columns are carried as [`DocumentColumn`]s for [`crate::decode_documents`].
pub fn normalize_table(
    raw: &RawTable,
    spec: &TableSpec,
    sink: &mut dyn AnomalySink,
) -> Result<TypedTable, NormalizeError> {
    for declared in &spec.columns {
        if raw.column_index(&declared.name).is_none() {
            return Err(NormalizeError::MissingColumn {
                table: raw.name.to_string(),
                column: declared.name.clone(),
            });
        }
    }

    let key_index = spec.key.as_deref().and_then(|key| raw.column_index(key));
    let mut columns: Vec<Column> = Vec::with_capacity(raw.columns.len());
    let mut documents = Vec::new();
    let mut failures = 0usize;

    for (index, name) in raw.columns.iter().enumerate() {
        let name = name.as_str();
        let Some(declared) = spec.column(name) else {
            columns.push(infer_column(raw, index, name));
            continue;
        };
        let mut coercion = ColumnCoercion {
            raw,
            key_index,
            key_name: spec.key.as_deref(),
            column: name,
            sink: &mut *sink,
            failures: 0,
        };
        let expected = declared.semantic_type;
        let column = match expected {
            SemanticType::NullableInt => {
                Series::new(name.into(), coercion.run(index, expected, coerce_int)).into_column()
            }
            SemanticType::Float => {
                Series::new(name.into(), coercion.run(index, expected, coerce_float)).into_column()
            }
            SemanticType::Text => {
                Series::new(name.into(), coercion.run(index, expected, coerce_text)).into_column()
            }
            SemanticType::Date => {
                Series::new(name.into(), coercion.run(index, expected, coerce_date)).into_column()
            }
            SemanticType::Json => {
                documents.push(DocumentColumn {
                    name: name.to_string(),
                    cells: raw.column_values(index).map(JsonField::from).collect(),
                });
                continue;
            }
        };
        failures += coercion.failures;
        columns.push(column);
    }

    let data = DataFrame::new(columns).map_err(|source| NormalizeError::Frame {
        table: raw.name.to_string(),
        source,
    })?;
    debug!(
        table = %raw.name,
        rows = raw.row_count(),
        columns = data.width(),
        documents = documents.len(),
        failures,
        "normalized table"
    );

    let snapshot = TableSnapshot {
        name: raw.name.clone(),
        data,
        key: spec.key.clone(),
        origins: (0..raw.row_count()).collect(),
    };
    Ok(TypedTable {
        snapshot,
        documents,
    })
}

/// Type an undeclared column from the storage classes it actually holds.
fn infer_column(raw: &RawTable, index: usize, name: &str) -> Column {
    let values: Vec<&RawValue> = raw.column_values(index).collect();
    let present = || values.iter().filter(|value| !value.is_null());

    let has_values = present().next().is_some();
    if has_values && present().all(|value| matches!(value, RawValue::Integer(_))) {
        let ints: Vec<Option<i64>> = values
            .iter()
            .map(|value| match value {
                RawValue::Integer(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), ints).into_column();
    }
    if has_values
        && present().all(|value| matches!(value, RawValue::Integer(_) | RawValue::Real(_)))
    {
        let floats: Vec<Option<f64>> = values
            .iter()
            .map(|value| match value {
                RawValue::Integer(v) => Some(*v as f64),
                RawValue::Real(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), floats).into_column();
    }
    let texts: Vec<Option<String>> = values
        .iter()
        .map(|value| match value {
            RawValue::Null => None,
            RawValue::Text(text) => Some(text.clone()),
            RawValue::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            other => Some(other.render()),
        })
        .collect();
    Series::new(name.into(), texts).into_column()
}
