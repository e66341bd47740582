//! Columnar in-memory tables.
//!
//! [`RawTable`] holds cells exactly as read from the upload. [`Table`] is the
//! canonical, typed form produced by the normalizer; views derived from it
//! (filters, unification, render slices) are new `Table` values.

use chrono::{NaiveDateTime, Timelike};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::mem::size_of;

/// One column of untyped cells, `None` where the row had no field.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// Cells as read from a delimited file, column-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Rough resident size of the string cells.
    pub fn estimated_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|c| {
                c.values
                    .iter()
                    .map(|v| size_of::<Option<String>>() + v.as_ref().map_or(0, String::len))
                    .sum::<usize>()
            })
            .sum()
    }
}

/// Typed storage of a canonical column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<String>),
    /// Dictionary-encoded text: `codes[i]` indexes into `dictionary`.
    Categorical {
        dictionary: Vec<String>,
        codes: Vec<u32>,
    },
    Number(Vec<f64>),
    Integer(Vec<Option<i64>>),
    DateTime(Vec<Option<NaiveDateTime>>),
}

/// A borrowed cell value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Null,
    Text(&'a str),
    Number(f64),
    Integer(i64),
    DateTime(NaiveDateTime),
}

impl Cell<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::DateTime(dt) => {
                if dt.nanosecond() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f"))
                }
            }
        }
    }
}

impl ColumnData {
    /// Dictionary-encode text values, keeping first-appearance order.
    pub fn categorical(values: Vec<String>) -> Self {
        let mut lookup: HashMap<String, u32> = HashMap::new();
        let mut dictionary = Vec::new();
        let mut codes = Vec::with_capacity(values.len());
        for value in values {
            let code = match lookup.get(&value) {
                Some(code) => *code,
                None => {
                    let code = dictionary.len() as u32;
                    dictionary.push(value.clone());
                    lookup.insert(value, code);
                    code
                }
            };
            codes.push(code);
        }
        ColumnData::Categorical { dictionary, codes }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
            ColumnData::Number(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ColumnData::Text(_) | ColumnData::Categorical { .. })
    }

    /// Storage type name used in structural summaries.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnData::Text(_) => "text",
            ColumnData::Categorical { .. } => "category",
            ColumnData::Number(_) => "float64",
            ColumnData::Integer(_) => "int64",
            ColumnData::DateTime(_) => "datetime",
        }
    }

    pub fn get(&self, row: usize) -> Cell<'_> {
        match self {
            ColumnData::Text(v) => Cell::Text(&v[row]),
            ColumnData::Categorical { dictionary, codes } => {
                Cell::Text(&dictionary[codes[row] as usize])
            }
            ColumnData::Number(v) => Cell::Number(v[row]),
            ColumnData::Integer(v) => v[row].map_or(Cell::Null, Cell::Integer),
            ColumnData::DateTime(v) => v[row].map_or(Cell::Null, Cell::DateTime),
        }
    }

    /// Text value at `row`, `None` for non-text columns.
    pub fn text_at(&self, row: usize) -> Option<&str> {
        match self {
            ColumnData::Text(v) => Some(&v[row]),
            ColumnData::Categorical { dictionary, codes } => {
                Some(&dictionary[codes[row] as usize])
            }
            _ => None,
        }
    }

    /// Row mask of text cells satisfying `pred`. Dictionary-encoded columns
    /// evaluate `pred` once per distinct value. Non-text columns match nothing.
    pub fn mask_text(&self, pred: impl Fn(&str) -> bool) -> Vec<bool> {
        match self {
            ColumnData::Text(v) => v.iter().map(|s| pred(s)).collect(),
            ColumnData::Categorical { dictionary, codes } => {
                let hits: Vec<bool> = dictionary.iter().map(|s| pred(s)).collect();
                codes.iter().map(|code| hits[*code as usize]).collect()
            }
            other => vec![false; other.len()],
        }
    }

    /// Text values decoded into owned strings.
    pub fn text_values(&self) -> Option<Vec<String>> {
        match self {
            ColumnData::Text(v) => Some(v.clone()),
            ColumnData::Categorical { dictionary, codes } => Some(
                codes
                    .iter()
                    .map(|code| dictionary[*code as usize].clone())
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|r| v[*r].clone()).collect()),
            ColumnData::Categorical { dictionary, codes } => ColumnData::Categorical {
                dictionary: dictionary.clone(),
                codes: rows.iter().map(|r| codes[*r]).collect(),
            },
            ColumnData::Number(v) => ColumnData::Number(rows.iter().map(|r| v[*r]).collect()),
            ColumnData::Integer(v) => ColumnData::Integer(rows.iter().map(|r| v[*r]).collect()),
            ColumnData::DateTime(v) => ColumnData::DateTime(rows.iter().map(|r| v[*r]).collect()),
        }
    }

    pub fn non_null_count(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.iter().filter(|x| x.is_some()).count(),
            ColumnData::DateTime(v) => v.iter().filter(|x| x.is_some()).count(),
            other => other.len(),
        }
    }

    pub fn distinct_count(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.iter().map(String::as_str).collect::<HashSet<_>>().len(),
            ColumnData::Categorical { codes, .. } => codes.iter().collect::<HashSet<_>>().len(),
            ColumnData::Number(v) => v.iter().map(|x| x.to_bits()).collect::<HashSet<_>>().len(),
            ColumnData::Integer(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::DateTime(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
        }
    }

    /// Estimated resident bytes of the first `rows` values.
    pub fn estimated_bytes_head(&self, rows: usize) -> usize {
        let rows = rows.min(self.len());
        match self {
            ColumnData::Text(v) => v[..rows]
                .iter()
                .map(|s| size_of::<String>() + s.len())
                .sum(),
            ColumnData::Categorical { dictionary, .. } => {
                rows * size_of::<u32>()
                    + dictionary
                        .iter()
                        .map(|s| size_of::<String>() + s.len())
                        .sum::<usize>()
            }
            ColumnData::Number(_) => rows * size_of::<f64>(),
            ColumnData::Integer(_) => rows * size_of::<Option<i64>>(),
            ColumnData::DateTime(_) => rows * size_of::<Option<NaiveDateTime>>(),
        }
    }

    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes_head(self.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Canonical typed table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table; every column must have the same length.
    pub fn new(columns: Vec<Column>) -> Self {
        let rows = columns.first().map_or(0, |c| c.data.len());
        debug_assert!(columns.iter().all(|c| c.data.len() == rows));
        Self { columns, rows }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn cell(&self, name: &str, row: usize) -> Cell<'_> {
        self.column(name).map_or(Cell::Null, |c| c.data.get(row))
    }

    /// Numeric column values, `None` if absent or not numeric.
    pub fn numbers(&self, name: &str) -> Option<&[f64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Number(v)) => Some(v),
            _ => None,
        }
    }

    /// Date-time column values, `None` if absent or not a date column.
    pub fn datetimes(&self, name: &str) -> Option<&[Option<NaiveDateTime>]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::DateTime(v)) => Some(v),
            _ => None,
        }
    }

    /// Text column, `None` if absent or not text.
    pub fn text(&self, name: &str) -> Option<&ColumnData> {
        self.column(name).map(|c| &c.data).filter(|d| d.is_text())
    }

    pub fn push_column(&mut self, column: Column) {
        if self.columns.is_empty() {
            self.rows = column.data.len();
        }
        debug_assert_eq!(column.data.len(), self.rows);
        self.columns.push(column);
    }

    /// New table with the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
                .collect(),
            rows: rows.len(),
        }
    }

    /// New table with the rows whose mask entry is true.
    pub fn filter(&self, mask: &[bool]) -> Table {
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        self.take(&rows)
    }

    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..n.min(self.rows)).collect();
        self.take(&rows)
    }

    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes_head(self.rows)
    }

    /// Estimated bytes of `self.head(rows)` without materialising it.
    pub fn estimated_bytes_head(&self, rows: usize) -> usize {
        self.columns
            .iter()
            .map(|c| c.data.estimated_bytes_head(rows))
            .sum()
    }

    /// Rename text values through `mapping`, only on rows where `scope` is
    /// true (all rows when `scope` is `None`). Non-text or absent columns
    /// are left alone.
    pub fn replace_text(
        &mut self,
        name: &str,
        mapping: &HashMap<String, String>,
        scope: Option<&[bool]>,
    ) {
        let Some(column) = self.columns.iter_mut().find(|c| c.name == name) else {
            return;
        };
        let in_scope = |row: usize| scope.map_or(true, |mask| mask[row]);
        if let ColumnData::Text(values) = &mut column.data {
            for (row, value) in values.iter_mut().enumerate() {
                if in_scope(row) {
                    if let Some(target) = mapping.get(value.as_str()) {
                        value.clone_from(target);
                    }
                }
            }
            return;
        }
        if let Some(mut values) = column.data.text_values() {
            for (row, value) in values.iter_mut().enumerate() {
                if in_scope(row) {
                    if let Some(target) = mapping.get(value.as_str()) {
                        value.clone_from(target);
                    }
                }
            }
            column.data = ColumnData::categorical(values);
        }
    }

    /// Render back to untyped cells. Nulls become missing cells.
    pub fn to_raw(&self) -> RawTable {
        RawTable {
            columns: self
                .columns
                .iter()
                .map(|c| RawColumn {
                    name: c.name.clone(),
                    values: (0..self.rows)
                        .map(|row| {
                            let cell = c.data.get(row);
                            (!cell.is_null()).then(|| cell.to_string())
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Table {
        Table::new(vec![
            Column::new(
                "sector",
                ColumnData::categorical(vec!["A".into(), "B".into(), "A".into()]),
            ),
            Column::new("viv_positiva", ColumnData::Number(vec![1.0, 0.0, 1.0])),
        ])
    }

    #[test]
    fn categorical_keeps_first_appearance_order() {
        let data = ColumnData::categorical(vec!["x".into(), "y".into(), "x".into()]);
        assert_eq!(
            data,
            ColumnData::Categorical {
                dictionary: vec!["x".into(), "y".into()],
                codes: vec![0, 1, 0],
            }
        );
    }

    #[test]
    fn filter_and_head() {
        let table = sample();
        let filtered = table.filter(&[true, false, true]);
        assert_eq!(filtered.rows(), 2);
        assert_eq!(filtered.numbers("viv_positiva"), Some(&[1.0, 1.0][..]));
        assert_eq!(table.head(10).rows(), 3);
        assert_eq!(table.head(1).cell("sector", 0), Cell::Text("A"));
    }

    #[test]
    fn replace_text_respects_scope() {
        let mut table = sample();
        let mapping = HashMap::from([("A".to_string(), "Z".to_string())]);
        table.replace_text("sector", &mapping, Some(&[true, false, false]));
        let sector = table.text("sector").unwrap();
        assert_eq!(sector.text_at(0), Some("Z"));
        assert_eq!(sector.text_at(2), Some("A"));
    }

    #[test]
    fn cell_display() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(Cell::DateTime(dt).to_string(), "2024-03-05 08:30:00");
        assert_eq!(Cell::Number(5060.0).to_string(), "5060");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::Null.to_string(), "");
    }

    #[test]
    fn head_estimate_matches_materialised_slice() {
        let table = sample();
        assert_eq!(table.estimated_bytes_head(2), table.head(2).estimated_bytes());
    }
}
