//! Per-session owner of the canonical dataset.
//!
//! A [`DataProcessor`] is built once per uploaded file. The canonical table
//! is never modified afterwards; every query returns a derived view.

use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::filters::{self, FilterSet};
use crate::loader::{self, LoadReport};
use crate::normalize::{normalize, NormalizeReport};
use crate::registry::FacilityRegistry;
use crate::render::{safe_render, SafeRender};
use crate::schema::{INSPECTION_DATE, PROVINCE, SECTOR};
use crate::sectors::{self, SectorMapping, SectorSimilarity, SimilarGroups};
use crate::table::{RawTable, Table};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DataProcessor {
    data: Table,
    report: NormalizeReport,
    registry: FacilityRegistry,
    config: ProcessorConfig,
}

impl DataProcessor {
    /// Normalize a raw upload and take ownership of the result.
    pub fn new(raw: RawTable, config: ProcessorConfig) -> Result<Self> {
        let (data, report) = normalize(raw, &config)?;
        Ok(Self {
            data,
            report,
            registry: FacilityRegistry::builtin().clone(),
            config,
        })
    }

    /// Read, decode and normalize a delimited file.
    pub fn load(path: &Path, config: ProcessorConfig) -> Result<(Self, LoadReport)> {
        let (raw, load_report) = loader::load_csv(path, config.max_upload_bytes())?;
        let processor = Self::new(raw, config)?;
        info!(
            rows = processor.data.rows(),
            columns = processor.data.width(),
            encoding = load_report.encoding.name(),
            "dataset ready"
        );
        Ok((processor, load_report))
    }

    /// Replace the built-in facility registry.
    pub fn with_registry(mut self, registry: FacilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn data(&self) -> &Table {
        &self.data
    }

    pub fn report(&self) -> &NormalizeReport {
        &self.report
    }

    pub fn registry(&self) -> &FacilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Filtered view without the date range.
    pub fn get_filtered_data(&self, activity: Option<&str>, filters: &FilterSet) -> Table {
        filters::get_filtered_data(&self.data, activity, filters)
    }

    /// Filtered view with the date range applied.
    pub fn view(&self, activity: Option<&str>, filters: &FilterSet) -> Table {
        let view = self.get_filtered_data(activity, filters);
        match &filters.date_range {
            Some(range) => filters::apply_date_filter(&view, range),
            None => view,
        }
    }

    /// Distinct non-null values of `column` rendered as text.
    ///
    /// Sorted values put numeric-looking entries first in numeric order and
    /// the rest after them in string order. If a numeric-looking entry does
    /// not parse, everything is sorted as strings.
    pub fn get_unique_values(&self, column: &str, sorted: bool) -> Vec<String> {
        let Some(column) = self.data.column(column) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut values: Vec<String> = (0..self.data.rows())
            .map(|row| column.data.get(row))
            .filter(|cell| !cell.is_null())
            .map(|cell| cell.to_string())
            .filter(|s| seen.insert(s.clone()))
            .collect();
        if sorted {
            sort_numeric_first(&mut values);
        }
        values
    }

    /// Earliest and latest inspection dates, `None` when there are none.
    pub fn get_date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.data.datetimes(INSPECTION_DATE)?;
        let min = dates.iter().flatten().min()?;
        let max = dates.iter().flatten().max()?;
        Some((min.date(), max.date()))
    }

    /// Similar sector labels per province at the configured threshold.
    pub fn find_similar_sectors(&self) -> SimilarGroups {
        SectorSimilarity::new(self.config.similarity_threshold).find_similar_by_province(
            &self.data,
            SECTOR,
            PROVINCE,
        )
    }

    /// Sector choices for a filter, after an optional unification.
    pub fn sector_filter_options(&self, mapping: Option<&SectorMapping>) -> Vec<String> {
        let sectors = self.get_unique_values(SECTOR, false);
        sectors::sector_filter_options(&sectors, mapping)
    }

    /// Bound `table` by the configured display ceilings.
    pub fn safe_render(&self, table: &Table) -> SafeRender {
        safe_render(table, self.config.max_rows, self.config.max_memory_mb)
    }
}

fn numeric_looking(s: &str) -> bool {
    let digits = s.replace('.', "");
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn sort_numeric_first(values: &mut [String]) {
    let keys: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|s| {
            if numeric_looking(s) {
                s.parse::<f64>().ok().map(Some)
            } else {
                Some(None)
            }
        })
        .collect();
    let Some(keys) = keys else {
        values.sort();
        return;
    };
    let mut keyed: Vec<(Option<f64>, String)> = keys.into_iter().zip(values.iter().cloned()).collect();
    keyed.sort_by(|(ka, a), (kb, b)| match (ka, kb) {
        (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    for (slot, (_, value)) in values.iter_mut().zip(keyed) {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawColumn;

    fn processor() -> DataProcessor {
        let raw = RawTable {
            columns: vec![
                RawColumn {
                    name: "usuario".into(),
                    values: vec![Some("10".into()), Some("9".into()), Some("b".into()), Some("a".into()), Some("9".into())],
                },
                RawColumn {
                    name: "fecha_inspeccion".into(),
                    values: vec![
                        Some("2024-03-05".into()),
                        Some("2024-01-20 10:00:00".into()),
                        None,
                        Some("x".into()),
                        Some("2024-02-01".into()),
                    ],
                },
            ],
        };
        DataProcessor::new(raw, ProcessorConfig::default().with_categorical_compression(false)).unwrap()
    }

    #[test]
    fn unique_values_sort_numbers_first() {
        let p = processor();
        assert_eq!(p.get_unique_values("usuario", true), vec!["9", "10", "a", "b"]);
        assert_eq!(p.get_unique_values("usuario", false), vec!["10", "9", "b", "a"]);
        assert!(p.get_unique_values("missing", true).is_empty());
    }

    #[test]
    fn unique_values_exclude_nulls() {
        let p = processor();
        assert_eq!(p.get_unique_values("fecha_inspeccion", false).len(), 3);
    }

    #[test]
    fn malformed_numbers_fall_back_to_string_sort() {
        let mut values = vec!["1.2.3".to_string(), "2".to_string(), "10".to_string()];
        sort_numeric_first(&mut values);
        assert_eq!(values, vec!["1.2.3", "10", "2"]);
    }

    #[test]
    fn date_range_spans_inspections() {
        let (min, max) = processor().get_date_range().unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }
}
