//! Type normalization of raw uploads into the canonical table.
//!
//! Per-cell problems never fail: unparsable dates become null, unparsable
//! numbers become 0 and missing text becomes the empty string.

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::schema::{self, is_missing, SemanticType};
use crate::table::{Column, ColumnData, RawColumn, RawTable, Table};
use crate::util::{parse_datetime_safe, parse_f64_safe};
use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Datasets above this many rows are logged as very large.
const LARGE_DATASET_ROWS: usize = 200_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub rows: usize,
    pub columns: usize,
    pub dropped_columns: Vec<String>,
    /// Text columns whose distinct/total ratio is under the configured ratio.
    pub categorical_candidates: Vec<String>,
    pub categorical_applied: bool,
    pub memory_before: usize,
    pub memory_after: usize,
    pub categorical_savings: usize,
    pub warnings: Vec<String>,
}

impl NormalizeReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped_columns.len()
    }
}

/// Coerce a raw upload into the canonical typed table.
///
/// Fails only when the input has no columns.
pub fn normalize(raw: RawTable, config: &ProcessorConfig) -> Result<(Table, NormalizeReport)> {
    if raw.width() == 0 {
        return Err(ProcessorError::NoColumns);
    }
    let rows = raw.rows();
    let mut report = NormalizeReport {
        memory_before: raw.estimated_bytes(),
        ..NormalizeReport::default()
    };

    if raw.width() < config.schema_warning_floor {
        let message = format!(
            "file has {} columns, expected {}; continuing with the available data",
            raw.width(),
            config.expected_columns
        );
        warn!("{message}");
        report.warnings.push(message);
    }
    if rows > LARGE_DATASET_ROWS {
        info!(rows, "very large dataset, normalization may take a while");
    }

    let mut table = Table::default();
    let mut derived_year: Option<Vec<Option<i64>>> = None;
    let mut raw_year: Option<RawColumn> = None;

    for column in raw.columns {
        // `year` is recomputed from the inspection date when that survives.
        if column.name == schema::YEAR {
            raw_year = Some(column);
            continue;
        }
        let RawColumn { name, values } = column;
        match normalize_column(&name, values) {
            Some(data) => {
                if name == schema::INSPECTION_DATE {
                    if let ColumnData::DateTime(dates) = &data {
                        derived_year = Some(year_of(dates));
                    }
                }
                table.push_column(Column::new(name, data));
            }
            None => {
                debug!(column = %name, "dropping empty column");
                report.dropped_columns.push(name);
            }
        }
    }

    match (derived_year, raw_year) {
        (Some(years), _) => table.push_column(Column::new(schema::YEAR, ColumnData::Integer(years))),
        (None, Some(RawColumn { name, values })) => match normalize_column(&name, values) {
            Some(data) => table.push_column(Column::new(name, data)),
            None => report.dropped_columns.push(name),
        },
        (None, None) => {}
    }

    if !report.dropped_columns.is_empty() {
        info!(
            dropped = report.dropped_columns.len(),
            "removed empty columns"
        );
    }

    let table = encode_categoricals(table, config, &mut report);
    report.rows = table.rows();
    report.columns = table.width();
    report.memory_after = table.estimated_bytes();
    info!(
        rows = report.rows,
        columns = report.columns,
        memory_before = report.memory_before,
        memory_after = report.memory_after,
        "normalized dataset"
    );
    Ok((table, report))
}

/// Type one column; `None` when it has no usable value at all.
fn normalize_column(name: &str, values: Vec<Option<String>>) -> Option<ColumnData> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !is_missing(s));
    if !values.iter().any(present) {
        return None;
    }
    match schema::semantic_type(name) {
        SemanticType::DateTime => {
            let dates: Vec<Option<NaiveDateTime>> = values
                .iter()
                .map(|v| parse_datetime_safe(v.as_deref()))
                .collect();
            if dates.iter().all(Option::is_none) {
                return None;
            }
            Some(ColumnData::DateTime(dates))
        }
        SemanticType::Numeric => Some(numeric(&values)),
        SemanticType::Text => Some(text(values)),
        SemanticType::Inferred => {
            let all_numeric = values
                .iter()
                .filter(|v| present(*v))
                .all(|v| parse_f64_safe(v.as_deref()).is_some());
            if all_numeric {
                Some(numeric(&values))
            } else {
                Some(text(values))
            }
        }
    }
}

fn numeric(values: &[Option<String>]) -> ColumnData {
    ColumnData::Number(
        values
            .iter()
            .map(|v| parse_f64_safe(v.as_deref()).unwrap_or(0.0))
            .collect(),
    )
}

fn text(values: Vec<Option<String>>) -> ColumnData {
    ColumnData::Text(
        values
            .into_iter()
            .map(|v| match v {
                Some(s) if !is_missing(&s) => s,
                _ => String::new(),
            })
            .collect(),
    )
}

fn year_of(dates: &[Option<NaiveDateTime>]) -> Vec<Option<i64>> {
    dates
        .iter()
        .map(|d| d.map(|dt| i64::from(dt.year())))
        .collect()
}

/// Dictionary-encode low-cardinality text columns.
fn encode_categoricals(table: Table, config: &ProcessorConfig, report: &mut NormalizeReport) -> Table {
    let rows = table.rows();
    if rows == 0 {
        return table;
    }
    let mut columns = Vec::with_capacity(table.width());
    for Column { name, data } in table.into_columns() {
        let low_cardinality = matches!(data, ColumnData::Text(_))
            && (data.distinct_count() as f64 / rows as f64) < config.categorical_ratio;
        if low_cardinality {
            report.categorical_candidates.push(name.clone());
        }
        match data {
            ColumnData::Text(values) if low_cardinality && config.enable_categorical_compression => {
                let before = values
                    .iter()
                    .map(|s| std::mem::size_of::<String>() + s.len())
                    .sum::<usize>();
                let encoded = ColumnData::categorical(values);
                report.categorical_savings += before.saturating_sub(encoded.estimated_bytes());
                columns.push(Column::new(name, encoded));
            }
            other => columns.push(Column::new(name, other)),
        }
    }
    report.categorical_applied =
        config.enable_categorical_compression && !report.categorical_candidates.is_empty();
    if report.categorical_applied {
        debug!(
            columns = report.categorical_candidates.len(),
            saved = report.categorical_savings,
            "categorical compression"
        );
    }
    Table::new(columns)
}
