//! Detection and unification of near-duplicate sector names.
//!
//! Sector labels are typed by hand in the field and drift in spelling. This
//! module groups similar labels inside each province and applies a rename
//! mapping the user has accepted. Nothing is unified automatically.

use crate::table::{ColumnData, Table};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Raw sector label to unified label.
pub type SectorMapping = HashMap<String, String>;

/// Province to the sector mapping that applies inside it.
pub type ProvinceMapping = BTreeMap<String, SectorMapping>;

/// Province to the groups of similar labels found inside it.
pub type SimilarGroups = BTreeMap<String, Vec<SectorGroup>>;

/// Labels judged to be spellings of the same sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorGroup {
    /// Shortest member, first one on ties.
    pub key: String,
    /// All members in input order.
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorSimilarity {
    threshold: f64,
}

impl Default for SectorSimilarity {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SectorSimilarity {
    /// Lower thresholds merge more aggressively and raise the false-merge risk.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Uppercase, drop punctuation, collapse whitespace and trim.
    pub fn normalize_name(name: &str) -> String {
        let upper = name.to_uppercase();
        let kept: String = upper
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
            .collect();
        kept.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Similarity in `[0, 1]` of two raw labels; 0 when either is empty.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let (a, b) = (Self::normalize_name(a), Self::normalize_name(b));
        if a == b {
            return 1.0;
        }
        sequence_ratio(&a, &b)
    }

    /// Group similar labels.
    ///
    /// Labels are visited in input order; each joins the first group whose
    /// first member (its seed) is similar enough, otherwise it seeds a new
    /// group. Similarity is not transitive, so the result depends on input
    /// order. Only groups with at least two members are returned.
    pub fn find_similar(&self, labels: &[String]) -> Vec<SectorGroup> {
        let valid: Vec<&str> = labels
            .iter()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
            .collect();
        if valid.len() < 2 {
            return Vec::new();
        }

        let mut groups: Vec<Vec<&str>> = Vec::new();
        for label in valid {
            match groups
                .iter_mut()
                .find(|group| self.similarity(group[0], label) >= self.threshold)
            {
                Some(group) => group.push(label),
                None => groups.push(vec![label]),
            }
        }

        groups
            .into_iter()
            .filter(|group| group.len() > 1)
            .map(|group| {
                let key = group
                    .iter()
                    .min_by_key(|s| s.chars().count())
                    .map(|s| (*s).to_string())
                    .unwrap_or_default();
                SectorGroup {
                    key,
                    variants: group.into_iter().map(str::to_string).collect(),
                }
            })
            .collect()
    }

    /// Group similar sector labels separately inside each province.
    ///
    /// Labels are never compared across provinces. Returns an empty map when
    /// either column is missing or not text.
    pub fn find_similar_by_province(
        &self,
        table: &Table,
        sector_column: &str,
        province_column: &str,
    ) -> SimilarGroups {
        let (Some(sectors), Some(provinces)) =
            (table.text(sector_column), table.text(province_column))
        else {
            return SimilarGroups::new();
        };

        let mut by_province: BTreeMap<&str, (Vec<String>, HashSet<&str>)> = BTreeMap::new();
        for row in 0..table.rows() {
            let (Some(province), Some(sector)) = (provinces.text_at(row), sectors.text_at(row))
            else {
                continue;
            };
            let (labels, seen) = by_province.entry(province).or_default();
            if seen.insert(sector) {
                labels.push(sector.to_string());
            }
        }

        let mut result = SimilarGroups::new();
        for (province, (labels, _)) in by_province {
            if labels.len() < 2 {
                continue;
            }
            let groups = self.find_similar(&labels);
            if !groups.is_empty() {
                debug!(province, groups = groups.len(), "similar sectors");
                result.insert(province.to_string(), groups);
            }
        }
        result
    }
}

/// Sequence-matching similarity: `2 * M / (|a| + |b|)` where `M` is the
/// number of characters in matching blocks found by repeatedly taking the
/// longest common substring and recursing on both sides of it.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`; earliest in `a`,
/// then earliest in `b`, on ties.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo + 1;
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];
    for i in alo..ahi {
        for j in blo..bhi {
            let k = if a[i] == b[j] { prev[j - blo] + 1 } else { 0 };
            cur[j - blo + 1] = k;
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

/// Rename values of `column` through `mapping`, returning a new table.
pub fn apply_unification(table: &Table, column: &str, mapping: &SectorMapping) -> Table {
    let mut unified = table.clone();
    unify_in_place(&mut unified, column, mapping);
    unified
}

/// Rename sector values province by province, returning a new table.
/// Rows outside a mapping's province are never touched.
pub fn apply_unification_by_province(
    table: &Table,
    column: &str,
    province_column: &str,
    mapping: &ProvinceMapping,
) -> Table {
    let mut unified = table.clone();
    unify_by_province_in_place(&mut unified, column, province_column, mapping);
    unified
}

pub(crate) fn unify_in_place(table: &mut Table, column: &str, mapping: &SectorMapping) {
    if mapping.is_empty() || !table.has_column(column) {
        return;
    }
    table.replace_text(column, mapping, None);
}

pub(crate) fn unify_by_province_in_place(
    table: &mut Table,
    column: &str,
    province_column: &str,
    mapping: &ProvinceMapping,
) {
    if !table.has_column(column) {
        return;
    }
    for (province, sector_mapping) in mapping {
        if sector_mapping.is_empty() {
            continue;
        }
        let Some(mask) = province_mask(table, province_column, province) else {
            return;
        };
        if mask.iter().any(|m| *m) {
            table.replace_text(column, sector_mapping, Some(&mask));
        }
    }
}

fn province_mask(table: &Table, province_column: &str, province: &str) -> Option<Vec<bool>> {
    let provinces: &ColumnData = table.text(province_column)?;
    Some(provinces.mask_text(|p| p == province))
}

/// Build a province mapping from detected groups.
///
/// `unified_name` is asked once per group; returning `None` (or a blank
/// name) leaves that group as is.
pub fn mapping_from_groups<F>(groups: &SimilarGroups, mut unified_name: F) -> ProvinceMapping
where
    F: FnMut(&str, &SectorGroup) -> Option<String>,
{
    let mut mapping = ProvinceMapping::new();
    for (province, province_groups) in groups {
        let mut province_mapping = SectorMapping::new();
        for group in province_groups {
            let Some(name) = unified_name(province, group) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            for variant in &group.variants {
                province_mapping.insert(variant.clone(), name.to_string());
            }
        }
        if !province_mapping.is_empty() {
            mapping.insert(province.clone(), province_mapping);
        }
    }
    mapping
}

/// Sorted unique non-blank sector labels after applying `mapping`.
pub fn sector_filter_options(sectors: &[String], mapping: Option<&SectorMapping>) -> Vec<String> {
    let mut options: Vec<String> = sectors
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            mapping
                .and_then(|m| m.get(s))
                .unwrap_or(s)
                .clone()
        })
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    options.sort();
    options
}
