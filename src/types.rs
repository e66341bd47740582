use crate::util::display_2;
use serde::{Serialize, Serializer};
use std::fmt;
use tabled::Tabled;

/// Calendar month used to bucket inspections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A row of a report table.
///
/// Report tables end with a totals row summing their numeric fields;
/// codes, ratios and indices listed in `NOT_SUMMED` are left blank there.
pub trait ReportRow: Serialize + Tabled {
    const NOT_SUMMED: &'static [&'static str];
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CoverageRow {
    #[tabled(rename = "RENIPRESS")]
    pub cod_renipress: i64,
    #[tabled(rename = "Establecimiento")]
    pub localidad_eess: String,
    #[tabled(rename = "Total Viviendas")]
    pub total_viviendas: u32,
    #[tabled(rename = "Inspeccionadas")]
    pub viv_inspeccionadas: usize,
    #[tabled(rename = "Cerradas")]
    pub viv_cerradas: usize,
    #[tabled(rename = "Renuentes")]
    pub viv_renuentes: usize,
    #[tabled(rename = "Deshabitadas")]
    pub viv_deshabitadas: usize,
    #[tabled(rename = "No Intervenidas")]
    pub viv_no_intervenidas: u64,
    #[tabled(rename = "% Inspeccionadas", display_with = "display_2")]
    pub porc_inspeccionadas: f64,
    #[tabled(rename = "% Cerradas", display_with = "display_2")]
    pub porc_cerradas: f64,
    #[tabled(rename = "% Renuentes", display_with = "display_2")]
    pub porc_renuentes: f64,
    #[tabled(rename = "% Deshabitadas", display_with = "display_2")]
    pub porc_deshabitadas: f64,
    #[tabled(rename = "% No Intervenidas", display_with = "display_2")]
    pub porc_no_intervenidas: f64,
    /// Sum of the four attention percentages; may exceed 100.
    #[tabled(rename = "Cobertura Total", display_with = "display_2")]
    pub cobertura_total: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ContainerRow {
    #[tabled(rename = "Tipo de Recipiente")]
    pub tipo_recipiente: String,
    #[tabled(rename = "Inspeccionados", display_with = "display_2")]
    pub inspeccionados: f64,
    #[tabled(rename = "Positivos", display_with = "display_2")]
    pub positivos: f64,
    #[tabled(rename = "Tratamiento Químico", display_with = "display_2")]
    pub tratamiento_quimico: f64,
    #[tabled(rename = "Tratamiento Físico", display_with = "display_2")]
    pub tratamiento_fisico: f64,
    #[tabled(rename = "Desuso", display_with = "display_2")]
    pub desuso: f64,
    #[tabled(rename = "% Positividad", display_with = "display_2")]
    pub porc_positivos: f64,
    #[tabled(rename = "% Tratados", display_with = "display_2")]
    pub porc_tratados: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct LarvicideRow {
    #[tabled(rename = "RENIPRESS")]
    pub cod_renipress: i64,
    #[tabled(rename = "Establecimiento")]
    pub localidad_eess: String,
    #[tabled(rename = "Consumo (g)", display_with = "display_2")]
    pub consumo_larvicida: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct FebrileRow {
    #[tabled(rename = "RENIPRESS")]
    pub cod_renipress: i64,
    #[tabled(rename = "Establecimiento")]
    pub localidad_eess: String,
    #[tabled(rename = "Febriles", display_with = "display_2")]
    pub febriles: f64,
}

/// Per-facility rows plus their grand total.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FacilityTotals<R> {
    pub rows: Vec<R>,
    pub total: f64,
}

impl<R> Default for FacilityTotals<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total: 0.0,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyTrendRow {
    #[tabled(rename = "Mes")]
    pub mes: YearMonth,
    #[tabled(rename = "Inspeccionadas")]
    pub viv_inspeccionadas: usize,
    #[tabled(rename = "Positivas")]
    pub viv_positivas: usize,
    #[tabled(rename = "Índice Aédico", display_with = "display_2")]
    pub indice_aedico: f64,
    #[tabled(rename = "Larvicida (g)", display_with = "display_2")]
    pub consumo_larvicida: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct EffectivenessRow {
    #[tabled(rename = "RENIPRESS")]
    pub cod_renipress: i64,
    #[tabled(rename = "Establecimiento")]
    pub localidad_eess: String,
    #[tabled(rename = "Viviendas")]
    pub total_houses: usize,
    #[tabled(rename = "Positivas")]
    pub positive_houses: usize,
    #[tabled(rename = "% Efectividad", display_with = "display_2")]
    pub effectiveness_percentage: f64,
    #[tabled(rename = "Puntaje", display_with = "display_2")]
    pub intervention_score: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyAedicRow {
    #[tabled(rename = "RENIPRESS")]
    pub cod_renipress: i64,
    #[tabled(rename = "Establecimiento")]
    pub localidad_eess: String,
    #[tabled(rename = "Mes")]
    pub mes: YearMonth,
    #[tabled(rename = "Inspeccionadas")]
    pub viv_inspeccionadas: usize,
    #[tabled(rename = "Positivas")]
    pub viv_positivas: usize,
    #[tabled(rename = "Índice Aédico", display_with = "display_2")]
    pub indice_aedico: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SectorSummaryRow {
    #[tabled(rename = "Sector")]
    pub sector: String,
    #[tabled(rename = "Registros")]
    pub registros: usize,
    #[tabled(rename = "Positivas", display_with = "display_2")]
    pub viv_positivas: f64,
    #[tabled(rename = "Larvicida (g)", display_with = "display_2")]
    pub consumo_larvicida: f64,
    #[tabled(rename = "% Positividad", display_with = "display_2")]
    pub positividad: f64,
    #[tabled(rename = "% Efectividad", display_with = "display_2")]
    pub efectividad: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DepartmentCoverageRow {
    #[tabled(rename = "Departamento")]
    pub departamento: String,
    #[tabled(rename = "Establecimientos")]
    pub establecimientos: usize,
    #[tabled(rename = "Viviendas")]
    pub viviendas: usize,
    #[tabled(rename = "% Efectividad", display_with = "display_2")]
    pub efectividad: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct InterventionDensityRow {
    #[tabled(rename = "RENIPRESS")]
    pub cod_renipress: i64,
    #[tabled(rename = "Establecimiento")]
    pub localidad_eess: String,
    #[tabled(rename = "Densidad", display_with = "display_2")]
    pub intervention_density: f64,
    #[tabled(rename = "% Efectividad", display_with = "display_2")]
    pub effectiveness: f64,
    #[tabled(rename = "Viviendas")]
    pub total_houses: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct AttentionCount {
    #[tabled(rename = "Código")]
    pub codigo: i64,
    #[tabled(rename = "Estado")]
    pub estado: String,
    #[tabled(rename = "Viviendas")]
    pub viviendas: usize,
}

/// Cerco indicators for one inspection month.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CercoMonthlyRow {
    #[tabled(rename = "Mes")]
    pub mes: YearMonth,
    #[tabled(rename = "Registros")]
    pub registros: usize,
    #[tabled(rename = "Detecciones")]
    pub detecciones: usize,
    #[tabled(rename = "% Efectividad", display_with = "display_2")]
    pub efectividad: f64,
    #[tabled(rename = "% Cobertura", display_with = "display_2")]
    pub cobertura: f64,
    /// Mean days from record creation to inspection.
    #[tabled(rename = "Respuesta (días)", display_with = "display_2")]
    pub tiempo_respuesta: f64,
}

impl ReportRow for CoverageRow {
    const NOT_SUMMED: &'static [&'static str] = &[
        "cod_renipress",
        "porc_inspeccionadas",
        "porc_cerradas",
        "porc_renuentes",
        "porc_deshabitadas",
        "porc_no_intervenidas",
        "cobertura_total",
    ];
}

impl ReportRow for ContainerRow {
    const NOT_SUMMED: &'static [&'static str] = &["porc_positivos", "porc_tratados"];
}

impl ReportRow for LarvicideRow {
    const NOT_SUMMED: &'static [&'static str] = &["cod_renipress"];
}

impl ReportRow for FebrileRow {
    const NOT_SUMMED: &'static [&'static str] = &["cod_renipress"];
}

impl ReportRow for MonthlyTrendRow {
    const NOT_SUMMED: &'static [&'static str] = &["indice_aedico"];
}

impl ReportRow for EffectivenessRow {
    const NOT_SUMMED: &'static [&'static str] =
        &["cod_renipress", "effectiveness_percentage", "intervention_score"];
}

impl ReportRow for MonthlyAedicRow {
    const NOT_SUMMED: &'static [&'static str] = &["cod_renipress", "indice_aedico"];
}

impl ReportRow for SectorSummaryRow {
    const NOT_SUMMED: &'static [&'static str] = &["positividad", "efectividad"];
}

impl ReportRow for DepartmentCoverageRow {
    const NOT_SUMMED: &'static [&'static str] = &["efectividad"];
}

impl ReportRow for InterventionDensityRow {
    const NOT_SUMMED: &'static [&'static str] =
        &["cod_renipress", "intervention_density", "effectiveness"];
}

impl ReportRow for AttentionCount {
    const NOT_SUMMED: &'static [&'static str] = &["codigo"];
}

impl ReportRow for CercoMonthlyRow {
    const NOT_SUMMED: &'static [&'static str] = &["efectividad", "cobertura", "tiempo_respuesta"];
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct CercoOverview {
    pub total_records: usize,
    pub houses_in_cerco: usize,
    pub positive_detections: usize,
    pub effectiveness: f64,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct CercoIndicators {
    pub detection_rate: f64,
    pub coverage_rate: f64,
    pub avg_response_time: f64,
    pub reintervention_rate: f64,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct RecoveryMetrics {
    pub recovered_houses: f64,
    pub recovery_rate: f64,
    pub avg_recovery_time: f64,
}

/// Written to `summary.json` next to the report tables.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub activity: Option<String>,
    pub total_records: usize,
    pub total_facilities: usize,
    pub total_sectors: usize,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub total_larvicide: f64,
    pub total_febrile: f64,
    pub overview: CercoOverview,
    pub indicators: CercoIndicators,
    pub recovery: Option<RecoveryMetrics>,
}
