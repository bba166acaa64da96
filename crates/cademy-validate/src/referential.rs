//! Foreign-key checks between cleaned tables.
//!
//! Checks only observe: snapshots are borrowed immutably, and every dangling
//! reference goes to the sink as a [`ForeignKeyViolation`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use cademy_common::{TableSnapshot, any_to_string_non_empty};
use cademy_model::{AnomalySink, ForeignKey, ForeignKeyViolation, TableName};

use crate::error::ValidateError;

/// Outcome of one relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyCheck {
    pub relationship: ForeignKey,
    /// Child rows with a non-null reference.
    pub checked: usize,
    pub violations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferentialReport {
    pub checks: Vec<ForeignKeyCheck>,
}

impl ReferentialReport {
    pub fn total_violations(&self) -> usize {
        self.checks.iter().map(|check| check.violations).sum()
    }

    /// Violations whose child rows live in `table`.
    pub fn violations_for(&self, table: &TableName) -> usize {
        self.checks
            .iter()
            .filter(|check| &check.relationship.child_table == table)
            .map(|check| check.violations)
            .sum()
    }
}

fn lookup<'a>(
    snapshots: &'a BTreeMap<TableName, TableSnapshot>,
    table: &TableName,
    column: &str,
) -> Result<&'a TableSnapshot, ValidateError> {
    let snapshot = snapshots
        .get(table)
        .ok_or_else(|| ValidateError::UnknownTable(table.to_string()))?;
    if !snapshot.has_column(column) {
        return Err(ValidateError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    Ok(snapshot)
}

/// Canonical rendering of every non-null key in `column`.
fn key_set(snapshot: &TableSnapshot, column: &str) -> BTreeSet<String> {
    (0..snapshot.record_count())
        .filter_map(|idx| any_to_string_non_empty(snapshot.value(column, idx)))
        .map(|value| value.trim().to_string())
        .collect()
}

/// Check every relationship and report dangling child references.
pub fn validate_foreign_keys(
    snapshots: &BTreeMap<TableName, TableSnapshot>,
    foreign_keys: &[ForeignKey],
    sink: &mut dyn AnomalySink,
) -> Result<ReferentialReport, ValidateError> {
    let mut report = ReferentialReport::default();

    for relationship in foreign_keys {
        let parent = lookup(snapshots, &relationship.parent_table, &relationship.parent_column)?;
        let child = lookup(snapshots, &relationship.child_table, &relationship.child_column)?;
        let parent_keys = key_set(parent, &relationship.parent_column);

        let mut checked = 0usize;
        let mut violations = 0usize;
        for idx in 0..child.record_count() {
            let Some(value) = any_to_string_non_empty(child.value(&relationship.child_column, idx))
            else {
                continue;
            };
            checked += 1;
            let value = value.trim();
            if parent_keys.contains(value) {
                continue;
            }
            violations += 1;
            sink.record_violation(ForeignKeyViolation {
                child_table: relationship.child_table.clone(),
                child_row: child.row_ref(idx),
                child_column: relationship.child_column.clone(),
                parent_table: relationship.parent_table.clone(),
                parent_column: relationship.parent_column.clone(),
                missing_value: value.to_string(),
            });
        }

        if violations > 0 {
            warn!(
                relationship = %relationship,
                checked,
                violations,
                "{violations} dangling references"
            );
        } else {
            debug!(relationship = %relationship, checked, "foreign key satisfied");
        }
        report.checks.push(ForeignKeyCheck {
            relationship: relationship.clone(),
            checked,
            violations,
        });
    }

    Ok(report)
}
