//! ETL pipeline with explicit stages.
//!
//! The pipeline follows these stages in order:
//! 1. **Extract**: Read every source table over one read-only connection
//! 2. **Normalize**: Coerce columns to their declared types, decode JSON documents
//! 3. **Validate**: Drop rows missing required identifiers, then check foreign keys
//! 4. **Load**: Replace the destination tables in one transaction
//!
//! Each stage takes the output of the previous stage and returns typed results.
//! Data-quality problems go to the anomaly sink; only infrastructure failures
//! come back as errors.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use cademy_common::TableSnapshot;
use cademy_ingest::extract_all;
use cademy_model::{
    Anomaly, AnomalySink, ForeignKeyViolation, PipelineSchema, RawTable, TableName,
};
use cademy_normalization::{decode_documents, normalize_table};
use cademy_output::{LoadSummary, load_tables};
use cademy_validate::{ReferentialReport, validate_foreign_keys, validate_rows};

use crate::config::PipelineConfig;
use crate::types::{PipelineResult, TableOutcome};

// ============================================================================
// Stage 1: Extract
// ============================================================================

pub fn extract(source: &Path, schema: &PipelineSchema) -> Result<BTreeMap<TableName, RawTable>> {
    let span = info_span!("extract", source = %source.display());
    let _guard = span.enter();
    extract_all(source, schema).with_context(|| format!("extract {}", source.display()))
}

// ============================================================================
// Stage 2: Normalize
// ============================================================================

/// Coerce and decode every table of `schema`.
pub fn normalize(
    raw: &BTreeMap<TableName, RawTable>,
    schema: &PipelineSchema,
    sink: &mut dyn AnomalySink,
) -> Result<BTreeMap<TableName, TableSnapshot>> {
    let span = info_span!("normalize");
    let _guard = span.enter();
    let mut snapshots = BTreeMap::new();
    for spec in &schema.tables {
        let table = raw
            .get(&spec.name)
            .with_context(|| format!("table {} was not extracted", spec.name))?;
        let typed = normalize_table(table, spec, sink)
            .with_context(|| format!("normalize {}", spec.name))?;
        let snapshot =
            decode_documents(typed, sink).with_context(|| format!("decode {}", spec.name))?;
        snapshots.insert(spec.name.clone(), snapshot);
    }
    Ok(snapshots)
}

// ============================================================================
// Stage 3: Validate
// ============================================================================

#[derive(Debug)]
pub struct ValidateResult {
    pub snapshots: BTreeMap<TableName, TableSnapshot>,
    pub dropped: BTreeMap<TableName, usize>,
    pub referential: ReferentialReport,
}

pub fn validate(
    mut snapshots: BTreeMap<TableName, TableSnapshot>,
    schema: &PipelineSchema,
    sink: &mut dyn AnomalySink,
) -> Result<ValidateResult> {
    let span = info_span!("validate");
    let _guard = span.enter();
    let mut cleaned = BTreeMap::new();
    let mut dropped = BTreeMap::new();
    for spec in &schema.tables {
        let snapshot = snapshots
            .remove(&spec.name)
            .with_context(|| format!("table {} was not normalized", spec.name))?;
        let result = validate_rows(snapshot, spec, sink)
            .with_context(|| format!("validate rows of {}", spec.name))?;
        dropped.insert(spec.name.clone(), result.dropped);
        cleaned.insert(spec.name.clone(), result.snapshot);
    }
    let referential = validate_foreign_keys(&cleaned, &schema.foreign_keys, sink)
        .context("check foreign keys")?;
    Ok(ValidateResult {
        snapshots: cleaned,
        dropped,
        referential,
    })
}

// ============================================================================
// Stage 4: Load
// ============================================================================

pub fn load(
    destination: &Path,
    snapshots: &BTreeMap<TableName, TableSnapshot>,
) -> Result<LoadSummary> {
    let span = info_span!("load", destination = %destination.display());
    let _guard = span.enter();
    load_tables(destination, snapshots)
        .with_context(|| format!("load tables into {}", destination.display()))
}

/// Forwards every entry to the caller's sink and counts them per table.
struct CountingSink<'a> {
    inner: &'a mut dyn AnomalySink,
    anomalies: BTreeMap<TableName, usize>,
    violations: BTreeMap<TableName, usize>,
}

impl<'a> CountingSink<'a> {
    fn new(inner: &'a mut dyn AnomalySink) -> Self {
        Self {
            inner,
            anomalies: BTreeMap::new(),
            violations: BTreeMap::new(),
        }
    }
}

impl AnomalySink for CountingSink<'_> {
    fn record_anomaly(&mut self, anomaly: Anomaly) {
        *self.anomalies.entry(anomaly.table.clone()).or_default() += 1;
        self.inner.record_anomaly(anomaly);
    }

    fn record_violation(&mut self, violation: ForeignKeyViolation) {
        *self
            .violations
            .entry(violation.child_table.clone())
            .or_default() += 1;
        self.inner.record_violation(violation);
    }
}

/// Run every stage end to end. With `dry_run` the destination is untouched.
pub fn run_pipeline(
    config: &PipelineConfig,
    dry_run: bool,
    sink: &mut dyn AnomalySink,
) -> Result<PipelineResult> {
    let start = Instant::now();
    let schema = &config.schema;
    schema.check().context("invalid pipeline schema")?;
    let mut counting = CountingSink::new(sink);

    let raw = extract(&config.source, schema)?;
    let normalized = normalize(&raw, schema, &mut counting)?;
    let validated = validate(normalized, schema, &mut counting)?;
    let loaded = if dry_run {
        info!("dry run, destination not written");
        None
    } else {
        Some(load(&config.destination, &validated.snapshots)?)
    };

    let tables = schema
        .tables
        .iter()
        .map(|spec| TableOutcome {
            table: spec.name.clone(),
            extracted: raw.get(&spec.name).map_or(0, RawTable::row_count),
            dropped: validated.dropped.get(&spec.name).copied().unwrap_or(0),
            loaded: loaded
                .as_ref()
                .and_then(|summary| summary.rows_for(&spec.name)),
            anomalies: counting.anomalies.get(&spec.name).copied().unwrap_or(0),
            violations: counting.violations.get(&spec.name).copied().unwrap_or(0),
        })
        .collect();

    let result = PipelineResult {
        source: config.source.clone(),
        destination: loaded.map(|summary| summary.path),
        tables,
        referential: validated.referential,
    };
    info!(
        anomalies = result.total_anomalies(),
        violations = result.total_violations(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "pipeline finished"
    );
    Ok(result)
}
