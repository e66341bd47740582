//! Derived views over the canonical table.
//!
//! Every function here returns a new [`Table`]; the input is never modified.

use crate::schema::{ACTIVITY_TYPE, INSPECTION_DATE, PROVINCE, SECTOR};
use crate::sectors::{self, ProvinceMapping, SectorMapping};
use crate::table::{Cell, ColumnData, Table};
use crate::util::{parse_datetime_safe, parse_f64_safe};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Inspection activity recorded in `tipoActividadInspeccion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityType {
    Vigilancia,
    ControlLarvario,
    Cerco,
}

impl ActivityType {
    pub const ALL: [ActivityType; 3] = [Self::Vigilancia, Self::ControlLarvario, Self::Cerco];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vigilancia => "Vigilancia",
            Self::ControlLarvario => "Control Larvario",
            Self::Cerco => "Cerco",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().to_lowercase() == key)
            .ok_or_else(|| format!("unknown activity type: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterScalar {
    Text(String),
    Number(f64),
}

impl FilterScalar {
    /// Empty text and zero are treated as "not set".
    fn is_unset(&self) -> bool {
        match self {
            FilterScalar::Text(s) => s.is_empty(),
            FilterScalar::Number(n) => *n == 0.0,
        }
    }

    fn matches(&self, cell: Cell<'_>) -> bool {
        match (cell, self) {
            (Cell::Text(s), FilterScalar::Text(t)) => s == t,
            (Cell::Text(s), FilterScalar::Number(n)) => parse_f64_safe(Some(s)) == Some(*n),
            (Cell::Number(v), FilterScalar::Number(n)) => v == *n,
            (Cell::Number(v), FilterScalar::Text(t)) => parse_f64_safe(Some(t)) == Some(v),
            (Cell::Integer(v), FilterScalar::Number(n)) => v as f64 == *n,
            (Cell::Integer(v), FilterScalar::Text(t)) => t.trim().parse::<i64>().ok() == Some(v),
            (Cell::DateTime(dt), FilterScalar::Text(t)) => parse_datetime_safe(Some(t)) == Some(dt),
            _ => false,
        }
    }
}

impl From<&str> for FilterScalar {
    fn from(s: &str) -> Self {
        FilterScalar::Text(s.to_string())
    }
}

impl From<String> for FilterScalar {
    fn from(s: String) -> Self {
        FilterScalar::Text(s)
    }
}

impl From<f64> for FilterScalar {
    fn from(n: f64) -> Self {
        FilterScalar::Number(n)
    }
}

impl From<i64> for FilterScalar {
    fn from(n: i64) -> Self {
        FilterScalar::Number(n as f64)
    }
}

/// A scalar means equality, a list means membership.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(FilterScalar),
    List(Vec<FilterScalar>),
}

impl FilterValue {
    fn is_unset(&self) -> bool {
        match self {
            FilterValue::Scalar(s) => s.is_unset(),
            FilterValue::List(items) => items.is_empty(),
        }
    }

    fn matches(&self, cell: Cell<'_>) -> bool {
        match self {
            FilterValue::Scalar(s) => s.matches(cell),
            FilterValue::List(items) => items.iter().any(|s| s.matches(cell)),
        }
    }
}

impl From<FilterScalar> for FilterValue {
    fn from(value: FilterScalar) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Scalar(value.into())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Scalar(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Scalar(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Scalar(value.into())
    }
}

impl From<Vec<FilterScalar>> for FilterValue {
    fn from(values: Vec<FilterScalar>) -> Self {
        FilterValue::List(values)
    }
}

impl<T: Into<FilterScalar>> FromIterator<T> for FilterValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        FilterValue::List(iter.into_iter().map(Into::into).collect())
    }
}

/// Inclusive date range compared at day granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Column filters plus the optional date range and sector unification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    criteria: Vec<(String, FilterValue)>,
    pub date_range: Option<DateRange>,
    pub sector_mapping_by_province: Option<ProvinceMapping>,
    pub sector_mapping: Option<SectorMapping>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the filter on `column`.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) {
        let column = column.into();
        let value = value.into();
        match self.criteria.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = value,
            None => self.criteria.push((column, value)),
        }
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_sector_mapping_by_province(mut self, mapping: ProvinceMapping) -> Self {
        self.sector_mapping_by_province = Some(mapping);
        self
    }

    pub fn with_sector_mapping(mut self, mapping: SectorMapping) -> Self {
        self.sector_mapping = Some(mapping);
        self
    }

    pub fn criteria(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.criteria.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
            && self.date_range.is_none()
            && self.sector_mapping_by_province.is_none()
            && self.sector_mapping.is_none()
    }
}

/// Sector unification chosen for one request.
#[derive(Clone, Copy)]
enum Unification<'a> {
    None,
    Flat(&'a SectorMapping),
    ByProvince(&'a ProvinceMapping),
}

impl<'a> Unification<'a> {
    fn select(table: &Table, filters: &'a FilterSet) -> Self {
        let has_sector = table.has_column(SECTOR);
        match (&filters.sector_mapping_by_province, &filters.sector_mapping) {
            // A present by-province mapping wins even when empty.
            (Some(by_province), _) if has_sector && table.has_column(PROVINCE) => {
                Unification::ByProvince(by_province)
            }
            (_, Some(flat)) if has_sector => Unification::Flat(flat),
            _ => Unification::None,
        }
    }

    /// Sector label of `row` as it reads after unification.
    fn sector<'t>(&self, table: &'t Table, row: usize) -> Cell<'t>
    where
        'a: 't,
    {
        let cell = table.cell(SECTOR, row);
        let Cell::Text(raw) = cell else {
            return cell;
        };
        let mapped = match *self {
            Unification::None => None,
            Unification::Flat(mapping) => mapping.get(raw),
            Unification::ByProvince(mapping) => match table.cell(PROVINCE, row) {
                Cell::Text(province) => mapping.get(province).and_then(|m| m.get(raw)),
                _ => None,
            },
        };
        mapped.map_or(cell, |s| Cell::Text(s.as_str()))
    }

    fn is_active(&self) -> bool {
        !matches!(self, Unification::None)
    }

    fn apply(&self, view: &mut Table) {
        match *self {
            Unification::None => {}
            Unification::Flat(mapping) => sectors::unify_in_place(view, SECTOR, mapping),
            Unification::ByProvince(mapping) => {
                sectors::unify_by_province_in_place(view, SECTOR, PROVINCE, mapping)
            }
        }
    }
}

/// Build a filtered view of `table`.
///
/// Steps, in order: sector unification (the by-province mapping when both
/// `sector` and `nombre_prov` exist, else the flat mapping), the activity
/// type (case-insensitive exact match), then each filter whose column
/// exists, list values meaning membership. Empty values and unknown
/// columns are skipped. The date range is not applied here; see
/// [`apply_date_filter`].
pub fn get_filtered_data(table: &Table, activity: Option<&str>, filters: &FilterSet) -> Table {
    let unification = Unification::select(table, filters);
    let mut mask = vec![true; table.rows()];

    if let Some(activity) = activity.filter(|a| !a.is_empty()) {
        match table.column(ACTIVITY_TYPE) {
            Some(column) => {
                let wanted = activity.to_lowercase();
                let hits = activity_mask(&column.data, &wanted);
                and_mask(&mut mask, &hits);
            }
            None => {
                warn!(activity, "activity column missing, view is empty");
                mask.fill(false);
            }
        }
    }

    for (column, value) in filters.criteria() {
        if value.is_unset() {
            continue;
        }
        let Some(data) = table.column(column).map(|c| &c.data) else {
            debug!(column, "ignoring filter on unknown column");
            continue;
        };
        if column == SECTOR && unification.is_active() {
            for (row, keep) in mask.iter_mut().enumerate() {
                if *keep {
                    *keep = value.matches(unification.sector(table, row));
                }
            }
        } else {
            for (row, keep) in mask.iter_mut().enumerate() {
                if *keep {
                    *keep = value.matches(data.get(row));
                }
            }
        }
    }

    let mut view = table.filter(&mask);
    unification.apply(&mut view);
    debug!(rows_in = table.rows(), rows_out = view.rows(), "filtered view");
    view
}

fn activity_mask(data: &ColumnData, wanted: &str) -> Vec<bool> {
    if data.is_text() {
        data.mask_text(|s| s.to_lowercase() == wanted)
    } else {
        (0..data.len())
            .map(|row| data.get(row).to_string().to_lowercase() == wanted)
            .collect()
    }
}

fn and_mask(mask: &mut [bool], other: &[bool]) {
    for (keep, hit) in mask.iter_mut().zip(other) {
        *keep &= *hit;
    }
}

/// Keep rows whose inspection date falls inside `range`, inclusive, at day
/// granularity. Rows without a date are dropped. A view with no inspection
/// date column is returned unchanged.
pub fn apply_date_filter(view: &Table, range: &DateRange) -> Table {
    let Some(dates) = view.datetimes(INSPECTION_DATE) else {
        return view.clone();
    };
    let mask: Vec<bool> = dates
        .iter()
        .map(|d| d.is_some_and(|dt| range.contains(dt.date())))
        .collect();
    view.filter(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table() -> Table {
        Table::new(vec![
            Column::new(
                ACTIVITY_TYPE,
                ColumnData::categorical(vec![
                    "Cerco".into(),
                    "cerco".into(),
                    "Vigilancia".into(),
                    "CERCO".into(),
                ]),
            ),
            Column::new(
                "departamento_x",
                ColumnData::Text(vec!["PIURA".into(), "TUMBES".into(), "PIURA".into(), "PIURA".into()]),
            ),
            Column::new("cod_renipress", ColumnData::Number(vec![5060.0, 5044.0, 5060.0, 7276.0])),
        ])
    }

    #[test]
    fn activity_is_case_insensitive() {
        let view = get_filtered_data(&table(), Some("CERCO"), &FilterSet::new());
        assert_eq!(view.rows(), 3);
    }

    #[test]
    fn missing_activity_column_yields_empty_view() {
        let table = Table::new(vec![Column::new("sector", ColumnData::Text(vec!["A".into()]))]);
        assert!(get_filtered_data(&table, Some("Cerco"), &FilterSet::new()).is_empty());
    }

    #[test]
    fn scalar_and_list_filters() {
        let filters = FilterSet::new()
            .with("departamento_x", "PIURA")
            .with("cod_renipress", [5060.0, 7276.0].into_iter().collect::<FilterValue>());
        let view = get_filtered_data(&table(), Some("cerco"), &filters);
        assert_eq!(view.rows(), 2);
        assert_eq!(view.numbers("cod_renipress"), Some(&[5060.0, 7276.0][..]));
    }

    #[test]
    fn unset_and_unknown_filters_are_skipped() {
        let filters = FilterSet::new()
            .with("departamento_x", "")
            .with("cod_renipress", 0.0)
            .with("no_such_column", "x");
        assert_eq!(get_filtered_data(&table(), None, &filters).rows(), 4);
    }

    #[test]
    fn text_filter_matches_numeric_column() {
        let filters = FilterSet::new().with("cod_renipress", "5060");
        assert_eq!(get_filtered_data(&table(), None, &filters).rows(), 2);
    }

    #[test]
    fn set_replaces_existing_filter() {
        let filters = FilterSet::new()
            .with("departamento_x", "TUMBES")
            .with("departamento_x", "PIURA");
        assert_eq!(filters.criteria().count(), 1);
        assert_eq!(get_filtered_data(&table(), None, &filters).rows(), 3);
    }

    #[test]
    fn parses_activity_names() {
        assert_eq!("control_larvario".parse(), Ok(ActivityType::ControlLarvario));
        assert_eq!(" CERCO ".parse(), Ok(ActivityType::Cerco));
        assert!("fumigacion".parse::<ActivityType>().is_err());
    }
}
