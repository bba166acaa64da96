//! Required-field filtering.

use polars::prelude::{BooleanChunked, NewChunkedArray};
use tracing::{debug, warn};

use cademy_common::{TableSnapshot, any_to_string_non_empty};
use cademy_model::{Anomaly, AnomalyRule, AnomalySink, TableSpec};

use crate::error::ValidateError;

/// Rows that passed, plus how many were dropped.
#[derive(Debug, Clone)]
pub struct RowValidation {
    pub snapshot: TableSnapshot,
    pub dropped: usize,
}

/// Drop every row with a null (or blank) value in a required column.
///
/// One anomaly is recorded per missing field; a row missing several fields
/// is still dropped once. Passing rows keep their relative order.
pub fn validate_rows(
    snapshot: TableSnapshot,
    spec: &TableSpec,
    sink: &mut dyn AnomalySink,
) -> Result<RowValidation, ValidateError> {
    for column in &spec.required {
        if !snapshot.has_column(column) {
            return Err(ValidateError::MissingColumn {
                table: snapshot.name.to_string(),
                column: column.clone(),
            });
        }
    }

    let height = snapshot.record_count();
    let mut keep = vec![true; height];
    for (idx, keep_row) in keep.iter_mut().enumerate() {
        for column in &spec.required {
            if any_to_string_non_empty(snapshot.value(column, idx)).is_some() {
                continue;
            }
            *keep_row = false;
            sink.record_anomaly(Anomaly {
                table: snapshot.name.clone(),
                row: snapshot.row_ref(idx),
                column: column.clone(),
                rule: AnomalyRule::RequiredFieldMissing,
                raw_value: None,
            });
        }
    }

    let dropped = keep.iter().filter(|keep| !**keep).count();
    if dropped == 0 {
        debug!(table = %snapshot.name, rows = height, "all rows passed");
        return Ok(RowValidation {
            snapshot,
            dropped,
        });
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let data = snapshot
        .data
        .filter(&mask)
        .map_err(|source| ValidateError::Frame {
            table: snapshot.name.to_string(),
            source,
        })?;
    let origins = snapshot
        .origins
        .iter()
        .zip(&keep)
        .filter(|(_, keep)| **keep)
        .map(|(origin, _)| *origin)
        .collect();
    warn!(
        table = %snapshot.name,
        dropped,
        remaining = data.height(),
        "dropped {dropped} rows"
    );

    Ok(RowValidation {
        snapshot: TableSnapshot {
            name: snapshot.name,
            data,
            key: snapshot.key,
            origins,
        },
        dropped,
    })
}
