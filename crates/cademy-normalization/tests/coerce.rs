//! Tests for table normalization.

use cademy_model::{
    AnomalyLog, AnomalyRule, ColumnSpec, PipelineSchema, RawTable, RawValue, SemanticType,
    TableName, TableSpec,
};
use cademy_normalization::{Coerced, JsonField, NormalizeError, coerce_int, normalize_table};
use polars::prelude::{AnyValue, DataType};
use proptest::prelude::*;

fn text(value: &str) -> RawValue {
    RawValue::Text(value.to_string())
}

fn students_raw(rows: Vec<Vec<RawValue>>) -> RawTable {
    let mut raw = RawTable::new(
        TableName::new("students").expect("name"),
        [
            "uuid",
            "name",
            "dob",
            "sex",
            "contact_info",
            "job_id",
            "num_course_taken",
            "current_career_path_id",
            "time_spent_hrs",
        ]
        .iter()
        .map(|name| name.to_string())
        .collect(),
    );
    for row in rows {
        raw.push_row(row);
    }
    raw
}

fn students_spec() -> TableSpec {
    PipelineSchema::cademycode()
        .table(&TableName::new("students").expect("name"))
        .cloned()
        .expect("students spec")
}

#[test]
fn mixed_integer_column_keeps_int_type_with_nulls() {
    let raw = students_raw(vec![
        vec![
            RawValue::Integer(1),
            text("Ann"),
            text("1990-01-01"),
            text("F"),
            RawValue::Null,
            text("3"),
            RawValue::Integer(2),
            RawValue::Real(4.0),
            RawValue::Real(12.5),
        ],
        vec![
            RawValue::Integer(2),
            text("Bo"),
            text("invalid"),
            text("M"),
            RawValue::Null,
            text(""),
            text("x"),
            RawValue::Null,
            text("bad"),
        ],
    ]);
    let mut log = AnomalyLog::new();
    let typed = normalize_table(&raw, &students_spec(), &mut log).expect("normalize");
    let data = &typed.snapshot.data;

    assert_eq!(data.height(), 2);
    assert_eq!(data.column("job_id").expect("job_id").dtype(), &DataType::Int64);
    assert_eq!(
        data.column("current_career_path_id").expect("path").dtype(),
        &DataType::Int64
    );
    assert_eq!(
        data.column("time_spent_hrs").expect("hours").dtype(),
        &DataType::Float64
    );
    assert_eq!(typed.snapshot.value("job_id", 0), AnyValue::Int64(3));
    assert!(typed.snapshot.value("job_id", 1).is_null());
    assert!(typed.snapshot.value("num_course_taken", 1).is_null());
    assert!(typed.snapshot.value("dob", 1).is_null());
    assert!(typed.snapshot.value("time_spent_hrs", 1).is_null());

    // Blank job_id is missing, not invalid.
    let rules: Vec<(&str, &AnomalyRule, Option<&str>)> = log
        .anomalies()
        .iter()
        .map(|anomaly| {
            (
                anomaly.column.as_str(),
                &anomaly.rule,
                anomaly.raw_value.as_deref(),
            )
        })
        .collect();
    assert_eq!(
        rules,
        vec![
            (
                "dob",
                &AnomalyRule::TypeCoercion {
                    expected: SemanticType::Date
                },
                Some("invalid")
            ),
            (
                "num_course_taken",
                &AnomalyRule::TypeCoercion {
                    expected: SemanticType::NullableInt
                },
                Some("x")
            ),
            (
                "time_spent_hrs",
                &AnomalyRule::TypeCoercion {
                    expected: SemanticType::Float
                },
                Some("bad")
            ),
        ]
    );
    assert_eq!(log.anomalies()[0].row.to_string(), "row 1 (uuid=2)");
}

#[test]
fn json_columns_are_held_back_as_documents() {
    let raw = students_raw(vec![vec![
        RawValue::Integer(1),
        text("Ann"),
        RawValue::Null,
        RawValue::Null,
        text(r#"{"mailing_address": "1 Main St"}"#),
        RawValue::Null,
        RawValue::Null,
        RawValue::Null,
        RawValue::Null,
    ]]);
    let mut log = AnomalyLog::new();
    let typed = normalize_table(&raw, &students_spec(), &mut log).expect("normalize");

    assert!(!typed.snapshot.has_column("contact_info"));
    assert_eq!(typed.documents.len(), 1);
    assert_eq!(typed.documents[0].name, "contact_info");
    assert_eq!(
        typed.documents[0].cells,
        vec![JsonField::Text(r#"{"mailing_address": "1 Main St"}"#.to_string())]
    );
    assert!(log.is_empty());
}

#[test]
fn undeclared_columns_pass_through_with_inferred_types() {
    let mut raw = RawTable::new(
        TableName::new("jobs").expect("name"),
        vec!["job_id".into(), "level".into(), "ratio".into(), "note".into()],
    );
    raw.push_row(vec![
        RawValue::Integer(1),
        RawValue::Integer(3),
        RawValue::Integer(1),
        text("a"),
    ]);
    raw.push_row(vec![
        RawValue::Integer(2),
        RawValue::Null,
        RawValue::Real(0.5),
        RawValue::Integer(9),
    ]);
    let spec = TableSpec {
        name: TableName::new("jobs").expect("name"),
        source: "cademycode_student_jobs".into(),
        key: Some("job_id".into()),
        required: vec!["job_id".into()],
        columns: vec![ColumnSpec::new("job_id", SemanticType::NullableInt)],
    };
    let mut log = AnomalyLog::new();
    let typed = normalize_table(&raw, &spec, &mut log).expect("normalize");
    let data = &typed.snapshot.data;

    assert_eq!(
        typed.snapshot.column_names(),
        vec!["job_id", "level", "ratio", "note"]
    );
    assert_eq!(data.column("level").expect("level").dtype(), &DataType::Int64);
    assert_eq!(data.column("ratio").expect("ratio").dtype(), &DataType::Float64);
    assert_eq!(data.column("note").expect("note").dtype(), &DataType::String);
    assert!(log.is_empty());
}

#[test]
fn missing_declared_column_is_fatal() {
    let raw = RawTable::new(
        TableName::new("courses").expect("name"),
        vec!["career_path_id".into()],
    );
    let spec = PipelineSchema::cademycode()
        .table(&TableName::new("courses").expect("name"))
        .cloned()
        .expect("courses spec");
    let mut log = AnomalyLog::new();
    let err = normalize_table(&raw, &spec, &mut log).expect_err("missing column");
    assert!(matches!(
        err,
        NormalizeError::MissingColumn { ref column, .. } if column == "career_path_name"
    ));
}

#[test]
fn no_rows_are_dropped() {
    let raw = students_raw(vec![vec![RawValue::Null; 9], vec![text("?"); 9]]);
    let mut log = AnomalyLog::new();
    let typed = normalize_table(&raw, &students_spec(), &mut log).expect("normalize");
    assert_eq!(typed.snapshot.record_count(), 2);
    assert_eq!(typed.snapshot.origins, vec![0, 1]);
    assert!(typed.snapshot.value("uuid", 0).is_null());
}

proptest! {
    #[test]
    fn int_coercion_never_invents_values(value in any::<i64>(), pad in "[ \t]{0,3}") {
        let padded = format!("{pad}{value}{pad}");
        prop_assert_eq!(coerce_int(&RawValue::Text(padded)), Coerced::Value(value));
        prop_assert_eq!(coerce_int(&RawValue::Integer(value)), Coerced::Value(value));
    }

    #[test]
    fn non_numeric_text_is_invalid(word in "[a-z]{1,12}") {
        prop_assert!(coerce_int(&RawValue::Text(word)).is_invalid());
    }
}
