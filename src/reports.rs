//! Calculation engine over filtered views.
//!
//! Every entry point takes a view and returns plain rows. Missing columns
//! yield empty or zero results and every ratio is guarded against a zero
//! denominator.

use crate::registry::FacilityRegistry;
use crate::schema::{
    self, Attention, ContainerStatus, ADDRESS, ATTENTION, BLOCK_CODE, COD_RENIPRESS, CREATED_AT,
    DEPARTMENT, FACILITY_NAME, FEBRILE, INSPECTION_DATE, LARVICIDE, POSITIVE, RECOVERED,
    RECOVERY_DATE, SECTOR,
};
use crate::table::{ColumnData, Table};
use crate::types::{
    AttentionCount, CercoIndicators, CercoMonthlyRow, CercoOverview, ContainerRow, CoverageRow,
    DepartmentCoverageRow, EffectivenessRow, FacilityTotals, FebrileRow, InterventionDensityRow,
    LarvicideRow, MonthlyAedicRow, MonthlyTrendRow, RecoveryMetrics, SectorSummaryRow,
    SummaryStats, YearMonth,
};
use crate::util::{average, days_diff, percentage};
use chrono::{Datelike, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Typed access to the columns the calculations read.
struct Inspections<'a> {
    rows: usize,
    renipress: Option<&'a [f64]>,
    facility_names: Option<&'a ColumnData>,
    attention: Option<&'a [f64]>,
    positive: Option<&'a [f64]>,
    larvicide: Option<&'a [f64]>,
    febrile: Option<&'a [f64]>,
    inspected_at: Option<&'a [Option<NaiveDateTime>]>,
}

impl<'a> Inspections<'a> {
    fn new(view: &'a Table) -> Self {
        Self {
            rows: view.rows(),
            renipress: view.numbers(COD_RENIPRESS),
            facility_names: view.text(FACILITY_NAME),
            attention: view.numbers(ATTENTION),
            positive: view.numbers(POSITIVE),
            larvicide: view.numbers(LARVICIDE),
            febrile: view.numbers(FEBRILE),
            inspected_at: view.datetimes(INSPECTION_DATE),
        }
    }

    /// Facility code; rows without a usable code belong to no facility.
    fn facility(&self, row: usize) -> Option<i64> {
        let code = self.renipress?[row];
        (code > 0.0 && code.fract() == 0.0).then_some(code as i64)
    }

    fn facility_name(&self, row: usize) -> Option<&'a str> {
        self.facility_names?.text_at(row).filter(|s| !s.trim().is_empty())
    }

    fn attention(&self, row: usize) -> Option<Attention> {
        Attention::from_code(self.attention?[row])
    }

    /// Attention recorded as one of the four known outcomes.
    fn attended(&self, row: usize) -> bool {
        self.attention(row).is_some()
    }

    fn inspected(&self, row: usize) -> bool {
        self.attention(row) == Some(Attention::Inspected)
    }

    fn positive(&self, row: usize) -> bool {
        self.positive.is_some_and(|v| v[row] == 1.0)
    }

    /// Positivity only counts on inspected houses.
    fn inspected_positive(&self, row: usize) -> bool {
        self.inspected(row) && self.positive(row)
    }

    fn month(&self, row: usize) -> Option<YearMonth> {
        self.inspected_at?[row].map(|dt| YearMonth {
            year: dt.year(),
            month: dt.month(),
        })
    }

    /// Per-facility accumulation; the first non-blank facility name seen is
    /// kept as a naming hint.
    fn by_facility<T: Default>(
        &self,
        mut visit: impl FnMut(&mut T, usize),
    ) -> BTreeMap<i64, (Option<&'a str>, T)> {
        let mut groups: BTreeMap<i64, (Option<&'a str>, T)> = BTreeMap::new();
        for row in 0..self.rows {
            let Some(code) = self.facility(row) else {
                continue;
            };
            let (hint, acc) = groups.entry(code).or_default();
            if hint.is_none() {
                *hint = self.facility_name(row);
            }
            visit(acc, row);
        }
        groups
    }
}

fn amount(values: Option<&[f64]>, row: usize) -> f64 {
    values.map_or(0.0, |v| v[row])
}

fn column_sum(values: Option<&[f64]>) -> f64 {
    values.map_or(0.0, |v| v.iter().sum())
}

/// Registry name, then the name recorded in the data, then a generic label.
fn facility_label(registry: &FacilityRegistry, code: i64, hint: Option<&str>) -> String {
    registry
        .get(code)
        .map(|f| f.name.clone())
        .or_else(|| hint.map(str::to_string))
        .unwrap_or_else(|| format!("Establecimiento {code}"))
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Attention outcome counts per facility as a share of the facility's
/// registered housing total.
pub fn coverage_percentages(view: &Table, registry: &FacilityRegistry) -> Vec<CoverageRow> {
    let ins = Inspections::new(view);
    let groups = ins.by_facility(|counts: &mut [usize; 4], row| {
        if let Some(a) = ins.attention(row) {
            counts[a as usize - 1] += 1;
        }
    });

    groups
        .into_iter()
        .map(|(code, (hint, counts))| {
            let total = registry.total_houses(code);
            let whole = f64::from(total);
            let attended: usize = counts.iter().sum();
            let not_intervened = u64::from(total).saturating_sub(attended as u64);
            let porc = counts.map(|c| percentage(c as f64, whole));
            CoverageRow {
                cod_renipress: code,
                localidad_eess: facility_label(registry, code, hint),
                total_viviendas: total,
                viv_inspeccionadas: counts[0],
                viv_cerradas: counts[1],
                viv_renuentes: counts[2],
                viv_deshabitadas: counts[3],
                viv_no_intervenidas: not_intervened,
                porc_inspeccionadas: porc[0],
                porc_cerradas: porc[1],
                porc_renuentes: porc[2],
                porc_deshabitadas: porc[3],
                porc_no_intervenidas: percentage(not_intervened as f64, whole),
                cobertura_total: porc.iter().sum(),
            }
        })
        .collect()
}

/// Sums per container class and status, for the classes the view carries.
pub fn container_statistics(view: &Table) -> Vec<ContainerRow> {
    if view.is_empty() {
        return Vec::new();
    }
    schema::CONTAINER_TYPES
        .iter()
        .filter(|container| {
            ContainerStatus::ALL
                .iter()
                .filter_map(|s| container.column(*s))
                .any(|c| view.has_column(&c))
        })
        .map(|container| {
            let sum = |status: ContainerStatus| {
                container
                    .column(status)
                    .map_or(0.0, |c| column_sum(view.numbers(&c)))
            };
            let inspected = sum(ContainerStatus::Inspected);
            let positive = sum(ContainerStatus::Positive);
            let chemical = sum(ContainerStatus::ChemicalTreatment);
            let physical = sum(ContainerStatus::PhysicalTreatment);
            ContainerRow {
                tipo_recipiente: container.label.to_string(),
                inspeccionados: inspected,
                positivos: positive,
                tratamiento_quimico: chemical,
                tratamiento_fisico: physical,
                desuso: sum(ContainerStatus::Disused),
                porc_positivos: percentage(positive, inspected),
                porc_tratados: percentage(chemical + physical, inspected),
            }
        })
        .collect()
}

/// Facility sums of a measure, largest first, plus the view-wide total.
fn facility_amounts<R>(
    ins: &Inspections<'_>,
    values: Option<&[f64]>,
    registry: &FacilityRegistry,
    row: impl Fn(i64, String, f64) -> R,
) -> FacilityTotals<R> {
    if values.is_none() || ins.renipress.is_none() {
        return FacilityTotals::default();
    }
    let groups = ins.by_facility(|sum: &mut f64, r| *sum += amount(values, r));
    let mut sums: Vec<(i64, Option<&str>, f64)> = groups
        .into_iter()
        .map(|(code, (hint, sum))| (code, hint, sum))
        .collect();
    sums.sort_by(|a, b| descending(a.2, b.2));
    FacilityTotals {
        rows: sums
            .into_iter()
            .map(|(code, hint, sum)| row(code, facility_label(registry, code, hint), sum))
            .collect(),
        total: column_sum(values),
    }
}

/// Larvicide grams per facility. Facilities present in the view with no
/// consumption are listed with 0.
pub fn larvicide_consumption(
    view: &Table,
    registry: &FacilityRegistry,
) -> FacilityTotals<LarvicideRow> {
    let ins = Inspections::new(view);
    facility_amounts(&ins, ins.larvicide, registry, |code, name, sum| LarvicideRow {
        cod_renipress: code,
        localidad_eess: name,
        consumo_larvicida: sum,
    })
}

pub fn febrile_cases(view: &Table, registry: &FacilityRegistry) -> FacilityTotals<FebrileRow> {
    let ins = Inspections::new(view);
    facility_amounts(&ins, ins.febrile, registry, |code, name, sum| FebrileRow {
        cod_renipress: code,
        localidad_eess: name,
        febriles: sum,
    })
}

#[derive(Default)]
struct MonthAcc {
    inspected: usize,
    positive: usize,
    larvicide: f64,
}

impl MonthAcc {
    fn visit(&mut self, ins: &Inspections<'_>, row: usize) {
        if ins.inspected(row) {
            self.inspected += 1;
        }
        if ins.inspected_positive(row) {
            self.positive += 1;
        }
        self.larvicide += amount(ins.larvicide, row);
    }

    fn aedic_index(&self) -> f64 {
        percentage(self.positive as f64, self.inspected as f64)
    }
}

/// Inspected and positive houses per month with the aedic index. Rows with
/// no inspection date are left out.
pub fn monthly_trends(view: &Table) -> Vec<MonthlyTrendRow> {
    let ins = Inspections::new(view);
    let mut months: BTreeMap<YearMonth, MonthAcc> = BTreeMap::new();
    for row in 0..ins.rows {
        if let Some(month) = ins.month(row) {
            months.entry(month).or_default().visit(&ins, row);
        }
    }
    months
        .into_iter()
        .map(|(mes, acc)| MonthlyTrendRow {
            mes,
            viv_inspeccionadas: acc.inspected,
            viv_positivas: acc.positive,
            indice_aedico: acc.aedic_index(),
            consumo_larvicida: acc.larvicide,
        })
        .collect()
}

/// Aedic index per facility and month.
pub fn monthly_aedic_by_establishment(
    view: &Table,
    registry: &FacilityRegistry,
) -> Vec<MonthlyAedicRow> {
    let ins = Inspections::new(view);
    let mut groups: BTreeMap<(i64, YearMonth), (Option<&str>, MonthAcc)> = BTreeMap::new();
    for row in 0..ins.rows {
        let (Some(code), Some(month)) = (ins.facility(row), ins.month(row)) else {
            continue;
        };
        let (hint, acc) = groups.entry((code, month)).or_default();
        if hint.is_none() {
            *hint = ins.facility_name(row);
        }
        acc.visit(&ins, row);
    }
    groups
        .into_iter()
        .map(|((code, mes), (hint, acc))| MonthlyAedicRow {
            cod_renipress: code,
            localidad_eess: facility_label(registry, code, hint),
            mes,
            viv_inspeccionadas: acc.inspected,
            viv_positivas: acc.positive,
            indice_aedico: acc.aedic_index(),
        })
        .collect()
}

#[derive(Default)]
struct CercoAcc {
    houses: usize,
    positive: usize,
}

impl CercoAcc {
    fn visit(&mut self, ins: &Inspections<'_>, row: usize) {
        if ins.attended(row) {
            self.houses += 1;
        }
        if ins.inspected_positive(row) {
            self.positive += 1;
        }
    }

    /// Share of attended houses without a positive finding.
    fn effectiveness(&self) -> f64 {
        percentage(self.houses.saturating_sub(self.positive) as f64, self.houses as f64)
    }
}

/// Per-facility cerco effectiveness and intervention score (capped at 10).
pub fn cerco_effectiveness(view: &Table, registry: &FacilityRegistry) -> Vec<EffectivenessRow> {
    let ins = Inspections::new(view);
    ins.by_facility(|acc: &mut CercoAcc, row| acc.visit(&ins, row))
        .into_iter()
        .map(|(code, (hint, acc))| EffectivenessRow {
            cod_renipress: code,
            localidad_eess: facility_label(registry, code, hint),
            total_houses: acc.houses,
            positive_houses: acc.positive,
            effectiveness_percentage: acc.effectiveness(),
            intervention_score: (acc.houses as f64 / acc.positive.max(1) as f64 * 2.0).min(10.0),
        })
        .collect()
}

pub fn cerco_overview(view: &Table) -> CercoOverview {
    let ins = Inspections::new(view);
    let mut acc = CercoAcc::default();
    for row in 0..ins.rows {
        acc.visit(&ins, row);
    }
    CercoOverview {
        total_records: ins.rows,
        houses_in_cerco: acc.houses,
        positive_detections: acc.positive,
        effectiveness: acc.effectiveness(),
    }
}

/// Activity per sector, busiest first. Blank sectors are skipped.
pub fn sector_summary(view: &Table) -> Vec<SectorSummaryRow> {
    let Some(sectors) = view.text(SECTOR) else {
        return Vec::new();
    };
    let ins = Inspections::new(view);

    #[derive(Default)]
    struct Acc {
        records: usize,
        positive: f64,
        larvicide: f64,
    }
    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for row in 0..ins.rows {
        let Some(sector) = sectors.text_at(row).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let acc = groups.entry(sector).or_default();
        acc.records += 1;
        acc.positive += amount(ins.positive, row);
        acc.larvicide += amount(ins.larvicide, row);
    }

    let mut rows: Vec<SectorSummaryRow> = groups
        .into_iter()
        .map(|(sector, acc)| {
            let positivity = percentage(acc.positive, acc.records as f64);
            SectorSummaryRow {
                sector: sector.to_string(),
                registros: acc.records,
                viv_positivas: acc.positive,
                consumo_larvicida: acc.larvicide,
                positividad: positivity,
                efectividad: (100.0 - positivity).clamp(0.0, 100.0),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.registros.cmp(&a.registros));
    rows
}

/// Facilities, attended houses and effectiveness per department.
pub fn geographic_coverage(view: &Table) -> Vec<DepartmentCoverageRow> {
    let Some(departments) = view.text(DEPARTMENT) else {
        return Vec::new();
    };
    let ins = Inspections::new(view);
    let mut groups: BTreeMap<&str, (HashSet<i64>, CercoAcc)> = BTreeMap::new();
    for row in 0..ins.rows {
        let Some(department) = departments.text_at(row).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let (facilities, acc) = groups.entry(department).or_default();
        if let Some(code) = ins.facility(row) {
            facilities.insert(code);
        }
        acc.visit(&ins, row);
    }
    groups
        .into_iter()
        .map(|(department, (facilities, acc))| DepartmentCoverageRow {
            departamento: department.to_string(),
            establecimientos: facilities.len(),
            viviendas: acc.houses,
            efectividad: acc.effectiveness(),
        })
        .collect()
}

/// Attended houses per distinct block, per facility.
pub fn intervention_density(
    view: &Table,
    registry: &FacilityRegistry,
) -> Vec<InterventionDensityRow> {
    let ins = Inspections::new(view);
    let blocks = view.column(BLOCK_CODE).map(|c| &c.data);

    #[derive(Default)]
    struct Acc {
        cerco: CercoAcc,
        blocks: HashSet<String>,
    }
    ins.by_facility(|acc: &mut Acc, row| {
        acc.cerco.visit(&ins, row);
        if let Some(blocks) = blocks {
            acc.blocks.insert(blocks.get(row).to_string());
        }
    })
    .into_iter()
    .map(|(code, (hint, acc))| InterventionDensityRow {
        cod_renipress: code,
        localidad_eess: facility_label(registry, code, hint),
        intervention_density: acc.cerco.houses as f64 / acc.blocks.len().max(1) as f64,
        effectiveness: acc.cerco.effectiveness(),
        total_houses: acc.cerco.houses,
    })
    .collect()
}

/// Detection, coverage, response time and reintervention indicators.
pub fn cerco_indicators(view: &Table) -> CercoIndicators {
    if view.is_empty() {
        return CercoIndicators::default();
    }
    let ins = Inspections::new(view);
    let (mut inspected, mut positive, mut attended) = (0usize, 0usize, 0usize);
    for row in 0..ins.rows {
        inspected += usize::from(ins.inspected(row));
        positive += usize::from(ins.inspected_positive(row));
        attended += usize::from(ins.attended(row));
    }

    let response_times: Vec<f64> = match (ins.inspected_at, view.datetimes(CREATED_AT)) {
        (Some(inspected_at), Some(created_at)) => inspected_at
            .iter()
            .zip(created_at)
            .filter_map(|(i, c)| Some(days_diff((*c)?, (*i)?)))
            .collect(),
        _ => Vec::new(),
    };

    let unique_addresses = view
        .column(ADDRESS)
        .map_or(1, |c| c.data.distinct_count());
    let reintervention = percentage(
        ins.rows.saturating_sub(unique_addresses) as f64,
        unique_addresses as f64,
    );

    CercoIndicators {
        detection_rate: percentage(positive as f64, inspected as f64),
        coverage_rate: percentage(attended as f64, ins.rows as f64),
        avg_response_time: average(&response_times),
        reintervention_rate: reintervention,
    }
}

/// Cerco indicators per inspection month, oldest first. Rows without an
/// inspection date are left out.
pub fn cerco_monthly_trends(view: &Table) -> Vec<CercoMonthlyRow> {
    let ins = Inspections::new(view);
    let created_at = view.datetimes(CREATED_AT);

    #[derive(Default)]
    struct Acc {
        records: usize,
        cerco: CercoAcc,
        response_times: Vec<f64>,
    }
    let mut months: BTreeMap<YearMonth, Acc> = BTreeMap::new();
    for row in 0..ins.rows {
        let Some(month) = ins.month(row) else {
            continue;
        };
        let acc = months.entry(month).or_default();
        acc.records += 1;
        acc.cerco.visit(&ins, row);
        let inspected = ins.inspected_at.and_then(|d| d[row]);
        if let (Some(inspected), Some(created)) = (inspected, created_at.and_then(|d| d[row])) {
            acc.response_times.push(days_diff(created, inspected));
        }
    }
    months
        .into_iter()
        .map(|(mes, acc)| CercoMonthlyRow {
            mes,
            registros: acc.records,
            detecciones: acc.cerco.positive,
            efectividad: acc.cerco.effectiveness(),
            cobertura: percentage(acc.cerco.houses as f64, acc.records as f64),
            tiempo_respuesta: average(&acc.response_times),
        })
        .collect()
}

/// Recovery of positive houses; `None` when the view has no recovery flag.
pub fn recovery_metrics(view: &Table) -> Option<RecoveryMetrics> {
    let recovered = view.numbers(RECOVERED)?;
    let ins = Inspections::new(view);
    let recovered_houses: f64 = recovered.iter().sum();
    let total_positive = (0..ins.rows).filter(|r| ins.positive(*r)).count();

    let recovery_times: Vec<f64> = match (ins.inspected_at, view.datetimes(RECOVERY_DATE)) {
        (Some(inspected_at), Some(recovered_at)) => (0..ins.rows)
            .filter(|r| recovered[*r] == 1.0)
            .filter_map(|r| Some(days_diff(inspected_at[r]?, recovered_at[r]?)))
            .collect(),
        _ => Vec::new(),
    };

    Some(RecoveryMetrics {
        recovered_houses,
        recovery_rate: percentage(recovered_houses, total_positive as f64),
        avg_recovery_time: average(&recovery_times),
    })
}

/// Rows flagged as recovered.
pub fn recovered_records(view: &Table) -> Table {
    match view.numbers(RECOVERED) {
        Some(recovered) => {
            let mask: Vec<bool> = recovered.iter().map(|v| *v == 1.0).collect();
            view.filter(&mask)
        }
        None => view.head(0),
    }
}

/// Rows per attention code, most frequent first. Codes that are not whole
/// numbers are not counted.
pub fn attention_distribution(view: &Table) -> Vec<AttentionCount> {
    let Some(codes) = view.numbers(ATTENTION) else {
        return Vec::new();
    };
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for code in codes.iter().filter(|c| c.fract() == 0.0) {
        *counts.entry(*code as i64).or_default() += 1;
    }
    let mut rows: Vec<AttentionCount> = counts
        .into_iter()
        .map(|(code, n)| AttentionCount {
            codigo: code,
            estado: Attention::from_code(code as f64)
                .map_or_else(|| format!("Código {code}"), |a| a.label().to_string()),
            viviendas: n,
        })
        .collect();
    rows.sort_by(|a, b| b.viviendas.cmp(&a.viviendas).then(a.codigo.cmp(&b.codigo)));
    rows
}

/// Headline figures for `summary.json`.
pub fn generate_summary(view: &Table, activity: Option<&str>) -> SummaryStats {
    let ins = Inspections::new(view);
    let facilities: HashSet<i64> = (0..ins.rows).filter_map(|r| ins.facility(r)).collect();
    let sectors = view.text(SECTOR).map_or(0, |c| {
        (0..ins.rows)
            .filter_map(|r| c.text_at(r))
            .filter(|s| !s.trim().is_empty())
            .collect::<HashSet<_>>()
            .len()
    });
    let dates = ins
        .inspected_at
        .map(|d| d.iter().flatten().copied().collect::<Vec<_>>())
        .unwrap_or_default();
    SummaryStats {
        activity: activity.map(str::to_string),
        total_records: ins.rows,
        total_facilities: facilities.len(),
        total_sectors: sectors,
        date_from: dates.iter().min().map(|d| d.date().to_string()),
        date_to: dates.iter().max().map(|d| d.date().to_string()),
        total_larvicide: column_sum(ins.larvicide),
        total_febrile: column_sum(ins.febrile),
        overview: cerco_overview(view),
        indicators: cerco_indicators(view),
        recovery: recovery_metrics(view),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use chrono::NaiveDate;

    fn registry() -> FacilityRegistry {
        FacilityRegistry::from_entries([
            (100, "CENTRO NORTE".to_string(), 100),
            (200, "SIN VIVIENDAS".to_string(), 0),
        ])
    }

    fn day(d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 3, d).and_then(|d| d.and_hms_opt(9, 0, 0))
    }

    /// One facility with `counts[i]` rows of attention `i + 1`.
    fn attention_rows(code: f64, counts: [usize; 4]) -> Table {
        let attention: Vec<f64> = counts
            .iter()
            .enumerate()
            .flat_map(|(i, n)| std::iter::repeat((i + 1) as f64).take(*n))
            .collect();
        let n = attention.len();
        Table::new(vec![
            Column::new(COD_RENIPRESS, ColumnData::Number(vec![code; n])),
            Column::new(ATTENTION, ColumnData::Number(attention)),
            Column::new(POSITIVE, ColumnData::Number(vec![0.0; n])),
        ])
    }

    #[test]
    fn coverage_against_registry_total() {
        let rows = coverage_percentages(&attention_rows(100.0, [40, 10, 5, 0]), &registry());
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.localidad_eess, "CENTRO NORTE");
        assert_eq!(row.porc_inspeccionadas, 40.0);
        assert_eq!(row.porc_cerradas, 10.0);
        assert_eq!(row.porc_renuentes, 5.0);
        assert_eq!(row.porc_deshabitadas, 0.0);
        assert_eq!(row.viv_no_intervenidas, 45);
        assert_eq!(row.cobertura_total, 55.0);
    }

    #[test]
    fn coverage_without_houses_is_zero() {
        for code in [200.0, 999.0] {
            let rows = coverage_percentages(&attention_rows(code, [3, 1, 0, 2]), &registry());
            let row = &rows[0];
            assert_eq!(row.total_viviendas, 0);
            assert_eq!(row.viv_no_intervenidas, 0);
            for pct in [
                row.porc_inspeccionadas,
                row.porc_cerradas,
                row.porc_renuentes,
                row.porc_deshabitadas,
                row.porc_no_intervenidas,
                row.cobertura_total,
            ] {
                assert_eq!(pct, 0.0);
            }
        }
        let unknown = coverage_percentages(&attention_rows(999.0, [1, 0, 0, 0]), &registry());
        assert_eq!(unknown[0].localidad_eess, "Establecimiento 999");
    }

    #[test]
    fn coverage_is_not_clamped() {
        let rows = coverage_percentages(&attention_rows(100.0, [90, 30, 0, 0]), &registry());
        assert_eq!(rows[0].cobertura_total, 120.0);
        assert_eq!(rows[0].viv_no_intervenidas, 0);
    }

    #[test]
    fn monthly_aedic_index() {
        let n = 200;
        let positive: Vec<f64> = (0..n).map(|i| if i < 8 { 1.0 } else { 0.0 }).collect();
        let view = Table::new(vec![
            Column::new(ATTENTION, ColumnData::Number(vec![1.0; n])),
            Column::new(POSITIVE, ColumnData::Number(positive)),
            Column::new(INSPECTION_DATE, ColumnData::DateTime(vec![day(4); n])),
            Column::new(LARVICIDE, ColumnData::Number(vec![0.5; n])),
        ]);
        let trends = monthly_trends(&view);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].mes.to_string(), "2024-03");
        assert_eq!(trends[0].viv_inspeccionadas, 200);
        assert_eq!(trends[0].viv_positivas, 8);
        assert_eq!(trends[0].indice_aedico, 4.0);
        assert_eq!(trends[0].consumo_larvicida, 100.0);
    }

    #[test]
    fn positives_only_count_on_inspected_houses() {
        let view = Table::new(vec![
            Column::new(COD_RENIPRESS, ColumnData::Number(vec![100.0; 4])),
            Column::new(ATTENTION, ColumnData::Number(vec![1.0, 1.0, 2.0, 3.0])),
            Column::new(POSITIVE, ColumnData::Number(vec![1.0, 0.0, 1.0, 0.0])),
        ]);
        let rows = cerco_effectiveness(&view, &registry());
        assert_eq!(rows[0].total_houses, 4);
        assert_eq!(rows[0].positive_houses, 1);
        assert_eq!(rows[0].effectiveness_percentage, 75.0);
        assert_eq!(rows[0].intervention_score, 8.0);
    }

    #[test]
    fn intervention_score_is_capped() {
        let rows = cerco_effectiveness(&attention_rows(100.0, [10, 0, 0, 0]), &registry());
        assert_eq!(rows[0].intervention_score, 10.0);
        assert_eq!(rows[0].effectiveness_percentage, 100.0);
    }

    #[test]
    fn container_positivity_is_guarded() {
        let view = Table::new(vec![
            Column::new("llantas_I", ColumnData::Number(vec![0.0, 0.0])),
            Column::new("llantas_P", ColumnData::Number(vec![0.0, 0.0])),
            Column::new("otros_I", ColumnData::Number(vec![6.0, 4.0])),
            Column::new("otros_P", ColumnData::Number(vec![1.0, 1.0])),
            Column::new("otros_TQ", ColumnData::Number(vec![2.0, 0.0])),
            Column::new("otros_D", ColumnData::Number(vec![3.0, 0.0])),
        ]);
        let rows = container_statistics(&view);
        assert_eq!(rows.len(), 2);
        let llantas = rows.iter().find(|r| r.tipo_recipiente == "Llantas").unwrap();
        assert_eq!(llantas.porc_positivos, 0.0);
        let otros = rows.iter().find(|r| r.tipo_recipiente == "Otros").unwrap();
        assert_eq!(otros.porc_positivos, 20.0);
        assert_eq!(otros.porc_tratados, 20.0);
        assert_eq!(otros.desuso, 3.0);
    }

    #[test]
    fn larvicide_lists_zero_consumers_and_totals() {
        let view = Table::new(vec![
            Column::new(COD_RENIPRESS, ColumnData::Number(vec![100.0, 200.0, 100.0, 0.0])),
            Column::new(LARVICIDE, ColumnData::Number(vec![5.0, 0.0, 2.5, 1.0])),
        ]);
        let summary = larvicide_consumption(&view, &registry());
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[0].cod_renipress, 100);
        assert_eq!(summary.rows[0].consumo_larvicida, 7.5);
        assert_eq!(summary.rows[1].consumo_larvicida, 0.0);
        assert_eq!(summary.total, 8.5);
    }

    #[test]
    fn empty_view_gives_empty_results() {
        let view = Table::default();
        let registry = registry();
        assert!(coverage_percentages(&view, &registry).is_empty());
        assert!(container_statistics(&view).is_empty());
        assert!(larvicide_consumption(&view, &registry).rows.is_empty());
        assert_eq!(febrile_cases(&view, &registry).total, 0.0);
        assert!(monthly_trends(&view).is_empty());
        assert!(cerco_effectiveness(&view, &registry).is_empty());
        assert!(monthly_aedic_by_establishment(&view, &registry).is_empty());
        assert!(sector_summary(&view).is_empty());
        assert_eq!(cerco_indicators(&view), CercoIndicators::default());
        assert_eq!(cerco_overview(&view).effectiveness, 0.0);
        assert!(recovery_metrics(&view).is_none());
    }

    #[test]
    fn indicators_and_recovery() {
        let view = Table::new(vec![
            Column::new(ATTENTION, ColumnData::Number(vec![1.0, 1.0, 2.0, 0.0])),
            Column::new(POSITIVE, ColumnData::Number(vec![1.0, 1.0, 0.0, 0.0])),
            Column::new(RECOVERED, ColumnData::Number(vec![1.0, 0.0, 0.0, 0.0])),
            Column::new(INSPECTION_DATE, ColumnData::DateTime(vec![day(10), day(12), None, day(1)])),
            Column::new(CREATED_AT, ColumnData::DateTime(vec![day(8), day(11), day(1), None])),
            Column::new(RECOVERY_DATE, ColumnData::DateTime(vec![day(17), None, None, None])),
            Column::new(
                ADDRESS,
                ColumnData::Text(vec!["A".into(), "A".into(), "B".into(), "B".into()]),
            ),
        ]);
        let indicators = cerco_indicators(&view);
        assert_eq!(indicators.detection_rate, 100.0);
        assert_eq!(indicators.coverage_rate, 75.0);
        assert_eq!(indicators.avg_response_time, 1.5);
        assert_eq!(indicators.reintervention_rate, 100.0);

        let recovery = recovery_metrics(&view).unwrap();
        assert_eq!(recovery.recovered_houses, 1.0);
        assert_eq!(recovery.recovery_rate, 50.0);
        assert_eq!(recovery.avg_recovery_time, 7.0);
        assert_eq!(recovered_records(&view).rows(), 1);
    }

    #[test]
    fn cerco_trends_per_month() {
        let at = |m: u32, d: u32, h: u32| {
            NaiveDate::from_ymd_opt(2024, m, d).and_then(|date| date.and_hms_opt(h, 0, 0))
        };
        let view = Table::new(vec![
            Column::new(ATTENTION, ColumnData::Number(vec![1.0, 1.0, 2.0, 0.0, 1.0, 1.0, 9.0])),
            Column::new(POSITIVE, ColumnData::Number(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0])),
            Column::new(
                INSPECTION_DATE,
                ColumnData::DateTime(vec![
                    at(4, 2, 9),
                    at(3, 10, 9),
                    at(3, 11, 9),
                    at(3, 12, 9),
                    at(4, 1, 9),
                    None,
                    at(4, 3, 9),
                ]),
            ),
            Column::new(
                CREATED_AT,
                ColumnData::DateTime(vec![
                    at(3, 30, 9),
                    at(3, 8, 9),
                    at(3, 10, 9),
                    None,
                    at(4, 1, 12),
                    at(4, 1, 9),
                    None,
                ]),
            ),
        ]);
        let rows = cerco_monthly_trends(&view);
        assert_eq!(rows.len(), 2);

        let march = &rows[0];
        assert_eq!(march.mes.to_string(), "2024-03");
        assert_eq!(march.registros, 3);
        assert_eq!(march.detecciones, 0);
        assert_eq!(march.efectividad, 100.0);
        assert!((march.cobertura - 200.0 / 3.0).abs() < 1e-9);
        // 2 days and 1 day.
        assert_eq!(march.tiempo_respuesta, 1.5);

        let april = &rows[1];
        assert_eq!(april.mes.to_string(), "2024-04");
        assert_eq!(april.registros, 3);
        assert_eq!(april.detecciones, 1);
        assert_eq!(april.efectividad, 50.0);
        assert!((april.cobertura - 200.0 / 3.0).abs() < 1e-9);
        // 3 days, and -1 for an inspection logged before its record.
        assert_eq!(april.tiempo_respuesta, 1.0);

        assert!(cerco_monthly_trends(&Table::default()).is_empty());
    }

    #[test]
    fn sectors_sorted_by_activity() {
        let view = Table::new(vec![
            Column::new(
                SECTOR,
                ColumnData::Text(vec!["B".into(), "A".into(), "B".into(), "".into()]),
            ),
            Column::new(POSITIVE, ColumnData::Number(vec![1.0, 0.0, 0.0, 1.0])),
        ]);
        let rows = sector_summary(&view);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sector, "B");
        assert_eq!(rows[0].positividad, 50.0);
        assert_eq!(rows[0].efectividad, 50.0);
    }

    #[test]
    fn sector_effectiveness_stays_in_range() {
        let view = Table::new(vec![
            Column::new(SECTOR, ColumnData::Text(vec!["A".into(), "A".into()])),
            Column::new(POSITIVE, ColumnData::Number(vec![3.0, 1.0])),
        ]);
        let rows = sector_summary(&view);
        assert_eq!(rows[0].positividad, 200.0);
        assert_eq!(rows[0].efectividad, 0.0);
    }

    #[test]
    fn attention_labels() {
        let view = attention_rows(100.0, [2, 1, 0, 0]);
        let rows = attention_distribution(&view);
        assert_eq!(rows[0].estado, "Inspección Completa");
        assert_eq!(rows[0].viviendas, 2);
        let odd = Table::new(vec![Column::new(ATTENTION, ColumnData::Number(vec![7.0]))]);
        assert_eq!(attention_distribution(&odd)[0].estado, "Código 7");

        let fractional = Table::new(vec![Column::new(
            ATTENTION,
            ColumnData::Number(vec![1.5, 1.0, 2.25]),
        )]);
        let rows = attention_distribution(&fractional);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].codigo, 1);
        assert_eq!(rows[0].viviendas, 1);
    }
}
