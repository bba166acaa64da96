use std::path::PathBuf;

use cademy_model::TableName;
use cademy_validate::ReferentialReport;

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub source: PathBuf,
    /// `None` for a dry run.
    pub destination: Option<PathBuf>,
    pub tables: Vec<TableOutcome>,
    pub referential: ReferentialReport,
}

impl PipelineResult {
    pub fn table(&self, name: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|outcome| outcome.table == name)
    }

    pub fn total_anomalies(&self) -> usize {
        self.tables.iter().map(|outcome| outcome.anomalies).sum()
    }

    pub fn total_violations(&self) -> usize {
        self.referential.total_violations()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    pub table: TableName,
    pub extracted: usize,
    pub dropped: usize,
    /// Rows written to the destination; `None` when nothing was written.
    pub loaded: Option<usize>,
    pub anomalies: usize,
    pub violations: usize,
}
