//! Declared table layouts, business rules, and relationships.
//!
//! The pipeline processes a fixed set of known tables. [`PipelineSchema::cademycode`]
//! describes them; a configuration file may supply a replacement with the
//! same shape.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ModelError, TableName};

/// Semantic type a column is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Trimmed text; blank values become null.
    Text,
    /// 64-bit integer with an explicit missing marker.
    NullableInt,
    /// 64-bit float.
    Float,
    /// Calendar date stored as `YYYY-MM-DD`.
    Date,
    /// String-encoded JSON object, expanded into columns by the decoder.
    Json,
}

impl SemanticType {
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticType::Text => "text",
            SemanticType::NullableInt => "nullable_int",
            SemanticType::Float => "float",
            SemanticType::Date => "date",
            SemanticType::Json => "json",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
        }
    }
}

/// One logical table: where it comes from, how its columns are typed, and
/// which fields must be present for a row to survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Destination table name.
    pub name: TableName,
    /// Table name in the source store.
    pub source: String,
    /// Column whose value identifies a row in log entries.
    #[serde(default)]
    pub key: Option<String>,
    /// Columns that must be non-null after normalization.
    #[serde(default)]
    pub required: Vec<String>,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// A child column whose non-null values must exist in a parent key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub child_table: TableName,
    pub child_column: String,
    pub parent_table: TableName,
    pub parent_column: String,
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.child_table, self.child_column, self.parent_table, self.parent_column
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSchema {
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Default for PipelineSchema {
    fn default() -> Self {
        Self::cademycode()
    }
}

fn table(name: &str) -> TableName {
    TableName(name.to_string())
}

impl PipelineSchema {
    /// Students, courses, and jobs from the Cademycode source database.
    pub fn cademycode() -> Self {
        use SemanticType::{Date, Float, Json, NullableInt, Text};

        let students = TableSpec {
            name: table("students"),
            source: "cademycode_students".to_string(),
            key: Some("uuid".to_string()),
            required: vec!["uuid".to_string()],
            columns: vec![
                ColumnSpec::new("uuid", NullableInt),
                ColumnSpec::new("name", Text),
                ColumnSpec::new("dob", Date),
                ColumnSpec::new("sex", Text),
                ColumnSpec::new("contact_info", Json),
                ColumnSpec::new("job_id", NullableInt),
                ColumnSpec::new("num_course_taken", NullableInt),
                ColumnSpec::new("current_career_path_id", NullableInt),
                ColumnSpec::new("time_spent_hrs", Float),
            ],
        };
        let courses = TableSpec {
            name: table("courses"),
            source: "cademycode_courses".to_string(),
            key: Some("career_path_id".to_string()),
            required: vec!["career_path_id".to_string()],
            columns: vec![
                ColumnSpec::new("career_path_id", NullableInt),
                ColumnSpec::new("career_path_name", Text),
                ColumnSpec::new("hours_to_complete", Float),
            ],
        };
        let jobs = TableSpec {
            name: table("jobs"),
            source: "cademycode_student_jobs".to_string(),
            key: Some("job_id".to_string()),
            required: vec!["job_id".to_string()],
            columns: vec![
                ColumnSpec::new("job_id", NullableInt),
                ColumnSpec::new("job_category", Text),
                ColumnSpec::new("avg_salary", Float),
            ],
        };
        Self {
            tables: vec![students, courses, jobs],
            foreign_keys: vec![
                ForeignKey {
                    child_table: table("students"),
                    child_column: "job_id".to_string(),
                    parent_table: table("jobs"),
                    parent_column: "job_id".to_string(),
                },
                ForeignKey {
                    child_table: table("students"),
                    child_column: "current_career_path_id".to_string(),
                    parent_table: table("courses"),
                    parent_column: "career_path_id".to_string(),
                },
            ],
        }
    }

    pub fn table(&self, name: &TableName) -> Option<&TableSpec> {
        self.tables.iter().find(|spec| &spec.name == name)
    }

    /// Reject schemas whose rules point at columns or tables that are not declared.
    pub fn check(&self) -> Result<(), ModelError> {
        let mut seen = BTreeSet::new();
        for spec in &self.tables {
            if !seen.insert(spec.name.as_str()) {
                return Err(ModelError::DuplicateTable(spec.name.to_string()));
            }
            if let Some(key) = &spec.key {
                require_declared(spec, key, "key")?;
            }
            for column in &spec.required {
                require_declared(spec, column, "required field")?;
            }
        }
        for fk in &self.foreign_keys {
            let child = self
                .table(&fk.child_table)
                .ok_or_else(|| ModelError::UnknownTable(fk.child_table.to_string()))?;
            let parent = self
                .table(&fk.parent_table)
                .ok_or_else(|| ModelError::UnknownTable(fk.parent_table.to_string()))?;
            require_declared(child, &fk.child_column, "foreign key")?;
            require_declared(parent, &fk.parent_column, "referenced key")?;
        }
        Ok(())
    }
}

fn require_declared(spec: &TableSpec, column: &str, role: &'static str) -> Result<(), ModelError> {
    match spec.column(column) {
        Some(declared) if declared.semantic_type == SemanticType::Json => {
            Err(ModelError::DocumentColumn {
                table: spec.name.to_string(),
                column: column.to_string(),
                role,
            })
        }
        Some(_) => Ok(()),
        None => Err(ModelError::UndeclaredColumn {
            table: spec.name.to_string(),
            column: column.to_string(),
            role,
        }),
    }
}
