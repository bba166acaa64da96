use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cademy_cli::types::PipelineResult;

pub fn print_summary(result: &PipelineResult) {
    println!("Source: {}", result.source.display());
    match &result.destination {
        Some(path) => println!("Destination: {}", path.display()),
        None => println!("Destination: not written (dry run)"),
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Extracted"),
        header_cell("Dropped"),
        header_cell("Loaded"),
        header_cell("Anomalies"),
        header_cell("FK violations"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut total_extracted = 0usize;
    let mut total_dropped = 0usize;
    let mut total_loaded: Option<usize> = None;
    for outcome in &result.tables {
        total_extracted += outcome.extracted;
        total_dropped += outcome.dropped;
        if let Some(rows) = outcome.loaded {
            total_loaded = Some(total_loaded.unwrap_or(0) + rows);
        }
        table.add_row(vec![
            Cell::new(outcome.table.as_str())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(outcome.extracted),
            count_cell(Some(outcome.dropped), Color::Yellow),
            loaded_cell(outcome.loaded),
            count_cell(Some(outcome.anomalies), Color::Yellow),
            count_cell(Some(outcome.violations), Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_extracted).add_attribute(Attribute::Bold),
        count_cell(Some(total_dropped), Color::Yellow).add_attribute(Attribute::Bold),
        loaded_cell(total_loaded).add_attribute(Attribute::Bold),
        count_cell(Some(result.total_anomalies()), Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(Some(result.total_violations()), Color::Yellow)
            .add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    print_relationship_table(result);
}

fn print_relationship_table(result: &PipelineResult) {
    if result.referential.checks.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Relationship"),
        header_cell("Checked"),
        header_cell("Violations"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for check in &result.referential.checks {
        table.add_row(vec![
            Cell::new(check.relationship.to_string()),
            Cell::new(check.checked),
            count_cell(Some(check.violations), Color::Red),
        ]);
    }
    println!();
    println!("Foreign keys:");
    println!("{table}");
}

fn loaded_cell(rows: Option<usize>) -> Cell {
    match rows {
        Some(rows) => Cell::new(rows).fg(Color::Green),
        None => dim_cell("-"),
    }
}

fn count_cell(count: Option<usize>, color: Color) -> Cell {
    match count {
        Some(value) if value > 0 => Cell::new(value).fg(color).add_attribute(Attribute::Bold),
        Some(value) => dim_cell(value),
        None => dim_cell("-"),
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
