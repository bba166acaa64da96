//! Tests for cademy-model types.

use cademy_model::{
    Anomaly, AnomalyLog, AnomalyRule, AnomalySink, ForeignKeyViolation, ModelError,
    PipelineSchema, RawTable, RawValue, RowRef, SemanticType, TableName,
};

fn name(value: &str) -> TableName {
    TableName::new(value).expect("table name")
}

#[test]
fn table_name_trims_and_rejects_blank() {
    assert_eq!(name("  students ").as_str(), "students");
    assert!(matches!(
        TableName::new("   "),
        Err(ModelError::InvalidTableName(_))
    ));
}

#[test]
fn builtin_schema_is_consistent() {
    let schema = PipelineSchema::cademycode();
    schema.check().expect("builtin schema");

    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["students", "courses", "jobs"]);

    let students = schema.table(&name("students")).expect("students");
    assert_eq!(students.required, vec!["uuid".to_string()]);
    assert_eq!(
        students.column("contact_info").map(|c| c.semantic_type),
        Some(SemanticType::Json)
    );
    assert_eq!(
        students.column("job_id").map(|c| c.semantic_type),
        Some(SemanticType::NullableInt)
    );
    assert_eq!(schema.foreign_keys.len(), 2);
    assert_eq!(
        schema.foreign_keys[0].to_string(),
        "students.job_id -> jobs.job_id"
    );
}

#[test]
fn schema_check_rejects_undeclared_required_field() {
    let mut schema = PipelineSchema::cademycode();
    schema.tables[1].required.push("missing".to_string());
    let error = schema.check().expect_err("undeclared column");
    assert!(matches!(error, ModelError::UndeclaredColumn { .. }));
}

#[test]
fn schema_check_rejects_json_key() {
    let mut schema = PipelineSchema::cademycode();
    schema.tables[0].key = Some("contact_info".to_string());
    let error = schema.check().expect_err("json key");
    assert!(matches!(error, ModelError::DocumentColumn { .. }));
}

#[test]
fn schema_check_rejects_unknown_parent_table() {
    let mut schema = PipelineSchema::cademycode();
    schema.foreign_keys[0].parent_table = name("employers");
    let error = schema.check().expect_err("unknown table");
    assert!(matches!(error, ModelError::UnknownTable(table) if table == "employers"));
}

#[test]
fn schema_check_rejects_duplicate_tables() {
    let mut schema = PipelineSchema::cademycode();
    let copy = schema.tables[2].clone();
    schema.tables.push(copy);
    assert!(matches!(
        schema.check(),
        Err(ModelError::DuplicateTable(table)) if table == "jobs"
    ));
}

#[test]
fn schema_deserializes_from_toml() {
    let text = r#"
        [[tables]]
        name = "students"
        source = "raw_students"
        key = "id"
        required = ["id"]
        columns = [
            { name = "id", type = "text" },
            { name = "job_id", type = "nullable_int" },
        ]

        [[tables]]
        name = "jobs"
        source = "raw_jobs"
        required = ["job_id"]
        columns = [{ name = "job_id", type = "nullable_int" }]

        [[foreign_keys]]
        child_table = "students"
        child_column = "job_id"
        parent_table = "jobs"
        parent_column = "job_id"
    "#;
    let schema: PipelineSchema = toml::from_str(text).expect("parse schema");
    schema.check().expect("valid schema");
    assert_eq!(schema.tables.len(), 2);
    assert_eq!(schema.tables[1].key, None);
    assert_eq!(
        schema.tables[0].columns[0].semantic_type,
        SemanticType::Text
    );
}

#[test]
fn schema_rejects_blank_table_name() {
    let text = r#"
        [[tables]]
        name = " "
        source = "raw"
        columns = []
    "#;
    assert!(toml::from_str::<PipelineSchema>(text).is_err());
}

#[test]
fn raw_table_pads_short_rows_with_null() {
    let mut table = RawTable::new(name("jobs"), vec!["job_id".into(), "avg_salary".into()]);
    table.push_row(vec![RawValue::Integer(1), RawValue::Real(1.5)]);
    table.push_row(vec![RawValue::Integer(2)]);

    let salaries: Vec<&RawValue> = table.column_values(1).collect();
    assert_eq!(salaries, vec![&RawValue::Real(1.5), &RawValue::Null]);
    assert_eq!(table.column_index("avg_salary"), Some(1));
    assert_eq!(table.column_index("missing"), None);
    assert_eq!(table.row_count(), 2);
}

#[test]
fn raw_value_renders_source_text() {
    assert_eq!(RawValue::Text("abc".into()).render(), "abc");
    assert_eq!(RawValue::Integer(-4).render(), "-4");
    assert_eq!(RawValue::Blob(vec![1, 2, 3]).render(), "<blob 3 bytes>");
    assert_eq!(RawValue::Null.kind(), "null");
    assert_eq!(RawValue::Real(2.5).kind(), "real");
}

#[test]
fn row_ref_display() {
    assert_eq!(RowRef::at(4).to_string(), "row 4");
    assert_eq!(RowRef::keyed(0, "uuid", "17").to_string(), "row 0 (uuid=17)");
}

#[test]
fn anomaly_display() {
    let anomaly = Anomaly {
        table: name("students"),
        row: RowRef::keyed(1, "uuid", "7"),
        column: "job_id".to_string(),
        rule: AnomalyRule::TypeCoercion {
            expected: SemanticType::NullableInt,
        },
        raw_value: Some("x".to_string()),
    };
    insta::assert_snapshot!(
        anomaly.to_string(),
        @r#"students row 1 (uuid=7) column job_id: not a valid nullable_int (raw value: "x")"#
    );
}

#[test]
fn anomaly_log_keeps_arrival_order_and_filters_by_table() {
    let mut log = AnomalyLog::new();
    assert!(log.is_empty());

    log.record_anomaly(Anomaly {
        table: name("students"),
        row: RowRef::at(1),
        column: "uuid".to_string(),
        rule: AnomalyRule::RequiredFieldMissing,
        raw_value: None,
    });
    log.record_anomaly(Anomaly {
        table: name("jobs"),
        row: RowRef::at(0),
        column: "job_id".to_string(),
        rule: AnomalyRule::RequiredFieldMissing,
        raw_value: None,
    });
    log.record_violation(ForeignKeyViolation {
        child_table: name("students"),
        child_row: RowRef::keyed(0, "uuid", "1"),
        child_column: "job_id".to_string(),
        parent_table: name("jobs"),
        parent_column: "job_id".to_string(),
        missing_value: "99".to_string(),
    });

    assert!(!log.is_empty());
    assert_eq!(log.anomalies().len(), 2);
    assert_eq!(log.anomalies()[0].table.as_str(), "students");
    assert_eq!(log.anomalies_for("jobs").count(), 1);
    assert_eq!(log.violations_for("students").count(), 1);
    assert_eq!(log.violations_for("jobs").count(), 0);
    assert_eq!(
        log.violations()[0].to_string(),
        "students row 0 (uuid=1) column job_id: value \"99\" not found in jobs.job_id"
    );
}

#[test]
fn anomaly_serializes_with_rule_tag() {
    let anomaly = Anomaly {
        table: name("courses"),
        row: RowRef::at(2),
        column: "hours_to_complete".to_string(),
        rule: AnomalyRule::TypeCoercion {
            expected: SemanticType::Float,
        },
        raw_value: Some("oops".to_string()),
    };
    let json = serde_json::to_value(&anomaly).expect("serialize anomaly");
    assert_eq!(json["table"], "courses");
    assert_eq!(json["rule"]["rule"], "type_coercion");
    assert_eq!(json["rule"]["expected"], "float");
    assert_eq!(json["raw_value"], "oops");
}
