//! Tests for required-field filtering.

use cademy_common::{TableSnapshot, any_to_string};
use cademy_model::{
    AnomalyLog, AnomalyRule, ColumnSpec, RowRef, SemanticType, TableName, TableSpec,
};
use cademy_validate::{ValidateError, validate_rows};
use polars::prelude::{Column, DataFrame};
use proptest::prelude::*;

fn students_spec() -> TableSpec {
    TableSpec {
        name: TableName::new("students").expect("name"),
        source: "cademycode_students".into(),
        key: Some("uuid".into()),
        required: vec!["uuid".into()],
        columns: vec![
            ColumnSpec::new("uuid", SemanticType::Text),
            ColumnSpec::new("job_id", SemanticType::Text),
        ],
    }
}

fn students(uuids: Vec<Option<&str>>, jobs: Vec<Option<&str>>) -> TableSnapshot {
    let data = DataFrame::new(vec![
        Column::new("uuid".into(), uuids),
        Column::new("job_id".into(), jobs),
    ])
    .expect("frame");
    TableSnapshot::new(
        TableName::new("students").expect("name"),
        data,
        Some("uuid".into()),
    )
}

#[test]
fn rows_with_null_identifier_are_dropped() {
    let snapshot = students(vec![Some("u1"), None, Some("u3")], vec![Some("j1"), Some("j1"), None]);
    let mut log = AnomalyLog::new();
    let result = validate_rows(snapshot, &students_spec(), &mut log).expect("validate");

    assert_eq!(result.dropped, 1);
    assert_eq!(result.snapshot.record_count(), 2);
    assert_eq!(any_to_string(result.snapshot.value("uuid", 0)), "u1");
    assert_eq!(any_to_string(result.snapshot.value("uuid", 1)), "u3");
    // Nullable reference columns are allowed through.
    assert!(result.snapshot.value("job_id", 1).is_null());
    assert_eq!(result.snapshot.origins, vec![0, 2]);

    assert_eq!(log.anomalies().len(), 1);
    let anomaly = &log.anomalies()[0];
    assert_eq!(anomaly.rule, AnomalyRule::RequiredFieldMissing);
    assert_eq!(anomaly.column, "uuid");
    assert_eq!(anomaly.row, RowRef::at(1));
}

#[test]
fn blank_identifier_counts_as_missing() {
    let snapshot = students(vec![Some("  "), Some("u2")], vec![None, None]);
    let mut log = AnomalyLog::new();
    let result = validate_rows(snapshot, &students_spec(), &mut log).expect("validate");
    assert_eq!(result.dropped, 1);
    assert_eq!(result.snapshot.origins, vec![1]);
}

#[test]
fn one_anomaly_per_missing_field_but_one_drop_per_row() {
    let mut spec = students_spec();
    spec.required.push("job_id".into());
    let snapshot = students(vec![None, Some("u2")], vec![None, Some("j1")]);
    let mut log = AnomalyLog::new();
    let result = validate_rows(snapshot, &spec, &mut log).expect("validate");

    assert_eq!(result.dropped, 1);
    let columns: Vec<&str> = log
        .anomalies()
        .iter()
        .map(|anomaly| anomaly.column.as_str())
        .collect();
    assert_eq!(columns, vec!["uuid", "job_id"]);
}

#[test]
fn dropped_rows_keep_their_source_position_in_later_entries() {
    let mut snapshot = students(vec![Some("u1"), None], vec![None, None]);
    snapshot.origins = vec![5, 9];
    let mut log = AnomalyLog::new();
    validate_rows(snapshot, &students_spec(), &mut log).expect("validate");
    assert_eq!(log.anomalies()[0].row, RowRef::at(9));
}

#[test]
fn missing_required_column_is_fatal() {
    let data = DataFrame::new(vec![Column::new("name".into(), vec!["a"])]).expect("frame");
    let snapshot = TableSnapshot::new(TableName::new("students").expect("name"), data, None);
    let mut log = AnomalyLog::new();
    let err = validate_rows(snapshot, &students_spec(), &mut log).expect_err("missing");
    assert!(matches!(err, ValidateError::MissingColumn { ref column, .. } if column == "uuid"));
}

proptest! {
    #[test]
    fn surviving_rows_all_have_identifiers_in_order(
        cells in proptest::collection::vec(proptest::option::of(0u32..50), 0..40)
    ) {
        let uuids: Vec<Option<String>> = cells
            .iter()
            .map(|cell| cell.map(|v| format!("u{v}")))
            .collect();
        let expected: Vec<String> = uuids.iter().flatten().cloned().collect();
        let data = DataFrame::new(vec![
            Column::new("uuid".into(), uuids.clone()),
            Column::new("job_id".into(), vec![None::<String>; uuids.len()]),
        ])
        .expect("frame");
        let snapshot = TableSnapshot::new(
            TableName::new("students").expect("name"),
            data,
            Some("uuid".into()),
        );
        let mut log = AnomalyLog::new();
        let result = validate_rows(snapshot, &students_spec(), &mut log).expect("validate");

        let kept: Vec<String> = (0..result.snapshot.record_count())
            .map(|idx| any_to_string(result.snapshot.value("uuid", idx)))
            .collect();
        prop_assert_eq!(kept, expected);
        prop_assert_eq!(result.dropped, log.anomalies().len());
        prop_assert_eq!(result.dropped + result.snapshot.record_count(), cells.len());
    }
}
