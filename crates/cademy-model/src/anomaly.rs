//! Data-quality records and the sink that collects them.
//!
//! Recoverable problems never abort the pipeline. Each stage reports them to
//! an [`AnomalySink`] and carries on; the sink is the only audit trail.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::{SemanticType, TableName};

/// Position of a row in its table as extracted, plus its key when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRef {
    pub index: usize,
    pub key: Option<(String, String)>,
}

impl RowRef {
    pub fn at(index: usize) -> Self {
        Self { index, key: None }
    }

    pub fn keyed(index: usize, column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            index,
            key: Some((column.into(), value.into())),
        }
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some((column, value)) => write!(f, "row {} ({column}={value})", self.index),
            None => write!(f, "row {}", self.index),
        }
    }
}

/// The rule a cell or row broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AnomalyRule {
    /// The value could not be converted to the declared type.
    TypeCoercion { expected: SemanticType },
    /// A string field was not parseable JSON.
    InvalidJson,
    /// A string field parsed as JSON but not as an object.
    NotJsonObject,
    /// A JSON field held a non-string, non-object value.
    UnexpectedJsonType { found: String },
    /// A required identifier was null; the row was dropped.
    RequiredFieldMissing,
}

impl fmt::Display for AnomalyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyRule::TypeCoercion { expected } => write!(f, "not a valid {expected}"),
            AnomalyRule::InvalidJson => f.write_str("invalid json"),
            AnomalyRule::NotJsonObject => f.write_str("json is not an object"),
            AnomalyRule::UnexpectedJsonType { found } => {
                write!(f, "unexpected type for json field: {found}")
            }
            AnomalyRule::RequiredFieldMissing => f.write_str("required field missing"),
        }
    }
}

/// A cell- or row-level data-quality issue that was recovered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub table: TableName,
    pub row: RowRef,
    pub column: String,
    pub rule: AnomalyRule,
    /// The offending value as it appeared in the source, if any.
    pub raw_value: Option<String>,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} column {}: {}",
            self.table, self.row, self.column, self.rule
        )?;
        if let Some(raw) = &self.raw_value {
            write!(f, " (raw value: {raw:?})")?;
        }
        Ok(())
    }
}

/// A child row whose reference has no matching parent key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyViolation {
    pub child_table: TableName,
    pub child_row: RowRef,
    pub child_column: String,
    pub parent_table: TableName,
    pub parent_column: String,
    pub missing_value: String,
}

impl fmt::Display for ForeignKeyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} column {}: value {:?} not found in {}.{}",
            self.child_table,
            self.child_row,
            self.child_column,
            self.missing_value,
            self.parent_table,
            self.parent_column
        )
    }
}

/// Destination for anomaly and foreign-key violation records.
pub trait AnomalySink {
    fn record_anomaly(&mut self, anomaly: Anomaly);
    fn record_violation(&mut self, violation: ForeignKeyViolation);
}

/// Append-only anomaly log.
///
/// Every entry is kept in arrival order and written to the log stream as a
/// WARN event on the `cademy::anomaly` target the moment it is recorded.
#[derive(Debug, Default)]
pub struct AnomalyLog {
    anomalies: Vec<Anomaly>,
    violations: Vec<ForeignKeyViolation>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn violations(&self) -> &[ForeignKeyViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty() && self.violations.is_empty()
    }

    pub fn anomalies_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Anomaly> + 'a {
        self.anomalies
            .iter()
            .filter(move |anomaly| anomaly.table == table)
    }

    pub fn violations_for<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a ForeignKeyViolation> + 'a {
        self.violations
            .iter()
            .filter(move |violation| violation.child_table == table)
    }
}

impl AnomalySink for AnomalyLog {
    fn record_anomaly(&mut self, anomaly: Anomaly) {
        warn!(
            target: "cademy::anomaly",
            table = %anomaly.table,
            row = %anomaly.row,
            column = %anomaly.column,
            rule = %anomaly.rule,
            raw = anomaly.raw_value.as_deref().unwrap_or(""),
            "data anomaly"
        );
        self.anomalies.push(anomaly);
    }

    fn record_violation(&mut self, violation: ForeignKeyViolation) {
        warn!(
            target: "cademy::anomaly",
            table = %violation.child_table,
            row = %violation.child_row,
            column = %violation.child_column,
            rule = "foreign key violation",
            raw = %violation.missing_value,
            references = %format_args!("{}.{}", violation.parent_table, violation.parent_column),
            "foreign key violation"
        );
        self.violations.push(violation);
    }
}
