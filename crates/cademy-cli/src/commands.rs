use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Table};
use tracing::info_span;

use cademy_cli::config::PipelineConfig;
use cademy_cli::pipeline::run_pipeline;
use cademy_cli::types::PipelineResult;
use cademy_model::{AnomalyLog, PipelineSchema};

use crate::cli::RunArgs;
use crate::summary::{align_column, apply_table_style, header_cell};

pub fn run(config: &PipelineConfig, args: &RunArgs) -> Result<PipelineResult> {
    let span = info_span!("run", source = %config.source.display());
    let _guard = span.enter();
    let mut log = AnomalyLog::new();
    run_pipeline(config, args.dry_run, &mut log)
}

pub fn print_schema(schema: &PipelineSchema) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Source"),
        header_cell("Column"),
        header_cell("Type"),
        header_cell("Rules"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    for spec in &schema.tables {
        for (idx, column) in spec.columns.iter().enumerate() {
            let (name, source) = if idx == 0 {
                (spec.name.to_string(), spec.source.clone())
            } else {
                (String::new(), String::new())
            };
            let mut rules = Vec::new();
            if spec.key.as_deref() == Some(column.name.as_str()) {
                rules.push("key");
            }
            if spec.required.contains(&column.name) {
                rules.push("required");
            }
            table.add_row(vec![
                Cell::new(name),
                Cell::new(source),
                Cell::new(&column.name),
                Cell::new(column.semantic_type),
                Cell::new(rules.join(", ")),
            ]);
        }
    }
    println!("{table}");

    if schema.foreign_keys.is_empty() {
        return;
    }
    let mut keys = Table::new();
    keys.set_header(vec![header_cell("Foreign key")]);
    apply_table_style(&mut keys);
    for fk in &schema.foreign_keys {
        keys.add_row(vec![fk.to_string()]);
    }
    println!("{keys}");
}
