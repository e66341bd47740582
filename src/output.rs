use crate::error::{ProcessorError, Result};
use crate::render::{RenderView, SafeRender};
use crate::table::Table as DataTable;
use crate::types::ReportRow;
use crate::util::{format_int, format_number};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Label placed in the totals row of a report table.
pub const TOTAL_LABEL: &str = "TOTAL";

/// A summed cell of a totals row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalCell {
    Integer(i64),
    Decimal(f64),
}

/// Totals row of a report table, in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalRow {
    /// `None` for fields that are not summed.
    pub cells: Vec<Option<TotalCell>>,
    /// Field that carries [`TOTAL_LABEL`].
    pub label_at: usize,
}

impl TotalRow {
    fn record(&self, fmt: impl Fn(TotalCell) -> String) -> Vec<String> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == self.label_at {
                    TOTAL_LABEL.to_string()
                } else {
                    cell.map(&fmt).unwrap_or_default()
                }
            })
            .collect()
    }
}

/// Sum the numeric fields of a report table.
///
/// Fields named in [`ReportRow::NOT_SUMMED`] are skipped; integer fields
/// stay integers and the rest are rounded to two decimals. The label goes
/// into the first text field, or the first field when there is none.
/// `None` for an empty table.
pub fn total_row<T: ReportRow>(rows: &[T]) -> Result<Option<TotalRow>> {
    let values = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<serde_json::Result<Vec<Value>>>()?;
    let Some(Value::Object(first)) = values.first() else {
        return Ok(None);
    };
    let cells = first
        .iter()
        .map(|(field, sample)| {
            if !sample.is_number() || T::NOT_SUMMED.contains(&field.as_str()) {
                return None;
            }
            let column: Vec<&Value> = values.iter().filter_map(|v| v.get(field)).collect();
            if column.iter().all(|v| v.is_i64() || v.is_u64()) {
                Some(TotalCell::Integer(column.iter().filter_map(|v| v.as_i64()).sum()))
            } else {
                let sum: f64 = column.iter().filter_map(|v| v.as_f64()).sum();
                Some(TotalCell::Decimal((sum * 100.0).round() / 100.0))
            }
        })
        .collect();
    let label_at = first.values().position(Value::is_string).unwrap_or(0);
    Ok(Some(TotalRow { cells, label_at }))
}

fn csv_cell(cell: TotalCell) -> String {
    match cell {
        TotalCell::Integer(n) => n.to_string(),
        TotalCell::Decimal(x) => x.to_string(),
    }
}

fn display_cell(cell: TotalCell) -> String {
    match cell {
        TotalCell::Integer(n) => format_int(n),
        TotalCell::Decimal(x) => format_number(x, 2),
    }
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|e| write_error(path, e))?;
    Ok(())
}

/// Write a record view with its header; nulls become empty fields.
pub fn write_table_csv(path: &Path, table: &DataTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.column_names())?;
    for row in 0..table.rows() {
        wtr.write_record(table.columns().iter().map(|c| c.data.get(row).to_string()))?;
    }
    wtr.flush().map_err(|e| write_error(path, e))?;
    Ok(())
}

/// Write a report table followed by its totals row.
pub fn write_report<T: ReportRow>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    if let Some(total) = total_row(rows)? {
        wtr.write_record(total.record(csv_cell))?;
    }
    wtr.flush().map_err(|e| write_error(path, e))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|e| write_error(path, e))?;
    Ok(())
}

fn write_error(path: &Path, source: std::io::Error) -> ProcessorError {
    ProcessorError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Markdown preview of the first `max_rows` rows of a report table and its
/// totals row.
pub fn preview_table<T: ReportRow>(
    report_no: usize,
    title: &str,
    note: Option<&str>,
    rows: &[T],
    max_rows: usize,
) {
    println!("\nReport {}: {}", report_no, title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(T::headers());
    for row in rows.iter().take(max_rows) {
        builder.push_record(row.fields());
    }
    if let Ok(Some(total)) = total_row(rows) {
        builder.push_record(total.record(display_cell));
    }
    println!("{}\n", builder.build().with(Style::markdown()));
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Markdown preview of a render-guarded view.
pub fn preview_render(render: &SafeRender, max_rows: usize) {
    let stats = &render.stats;
    if stats.truncated {
        println!(
            "Showing {} of {} rows ({:.1} MB in memory).",
            format_int(stats.shown_rows),
            format_int(stats.total_rows),
            stats.total_mb
        );
    }
    match &render.view {
        RenderView::Rows(table) => preview_records(table, max_rows),
        RenderView::Structure(summary) => {
            println!("Dataset too large to display; column structure:\n");
            preview_table_rows(summary, summary.len());
        }
    }
}

fn preview_records(table: &DataTable, max_rows: usize) {
    if table.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.column_names().map(str::to_string));
    for row in 0..table.rows().min(max_rows) {
        builder.push_record(table.columns().iter().map(|c| c.data.get(row).to_string()));
    }
    println!("{}\n", builder.build().with(Style::markdown()));
}
