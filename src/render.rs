//! Bounded rendering of large tables.
//!
//! Before a table is surfaced for display it is cut down to a slice that
//! fits both a row ceiling and a memory ceiling. When no slice of the
//! minimum size fits, only a per-column structural summary is returned.

use crate::table::Table;
use serde::Serialize;
use tabled::Tabled;
use tracing::{info, warn};

/// Lower bound for the memory-derived row estimate.
pub const MEMORY_FLOOR_ROWS: usize = 1000;
/// Smallest slice the shrink loop will try.
pub const MIN_ROWS: usize = 50;
pub const SHRINK_FACTOR: f64 = 0.75;
/// Share of the memory ceiling a shown slice may use.
pub const SAFETY_MARGIN: f64 = 0.9;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ColumnSummary {
    #[tabled(rename = "Columna")]
    pub column: String,
    #[tabled(rename = "Tipo")]
    pub dtype: String,
    #[tabled(rename = "No Nulos")]
    pub non_null: usize,
    #[tabled(rename = "Únicos")]
    pub distinct: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderStats {
    pub total_rows: usize,
    pub total_columns: usize,
    pub total_mb: f64,
    pub shown_rows: usize,
    pub shown_mb: f64,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderView {
    Rows(Table),
    Structure(Vec<ColumnSummary>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SafeRender {
    pub view: RenderView,
    pub stats: RenderStats,
}

fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Cut `table` down to something safe to display.
pub fn safe_render(table: &Table, max_rows: usize, max_memory_mb: f64) -> SafeRender {
    let total_rows = table.rows();
    let total_mb = megabytes(table.estimated_bytes());
    let over_rows = total_rows > max_rows;
    let over_memory = total_mb > max_memory_mb;

    if !over_rows && !over_memory {
        return SafeRender {
            view: RenderView::Rows(table.clone()),
            stats: RenderStats {
                total_rows,
                total_columns: table.width(),
                total_mb,
                shown_rows: total_rows,
                shown_mb: total_mb,
                truncated: false,
            },
        };
    }

    let mut safe_rows = if over_memory {
        let by_memory = (max_memory_mb * total_rows as f64 / total_mb).max(0.0) as usize;
        by_memory.max(MEMORY_FLOOR_ROWS).min(max_rows)
    } else {
        max_rows
    };

    let limit_mb = max_memory_mb * SAFETY_MARGIN;
    let mut slice_mb = megabytes(table.estimated_bytes_head(safe_rows));
    while slice_mb > limit_mb && safe_rows > MIN_ROWS {
        safe_rows = ((safe_rows as f64 * SHRINK_FACTOR) as usize).max(MIN_ROWS);
        slice_mb = megabytes(table.estimated_bytes_head(safe_rows));
    }

    if slice_mb > limit_mb {
        warn!(
            total_rows,
            total_mb, "dataset too large to display, showing structure only"
        );
        return SafeRender {
            view: RenderView::Structure(structure_summary(table)),
            stats: RenderStats {
                total_rows,
                total_columns: table.width(),
                total_mb,
                shown_rows: 0,
                shown_mb: 0.0,
                truncated: true,
            },
        };
    }

    let shown = table.head(safe_rows);
    info!(
        total_rows,
        shown_rows = shown.rows(),
        shown_mb = slice_mb,
        "display truncated"
    );
    SafeRender {
        stats: RenderStats {
            total_rows,
            total_columns: table.width(),
            total_mb,
            shown_rows: shown.rows(),
            shown_mb: slice_mb,
            truncated: true,
        },
        view: RenderView::Rows(shown),
    }
}

/// Column name, storage type, non-null and distinct counts.
pub fn structure_summary(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .map(|c| ColumnSummary {
            column: c.name.clone(),
            dtype: c.data.type_name().to_string(),
            non_null: c.data.non_null_count(),
            distinct: c.data.distinct_count(),
        })
        .collect()
}
