//! Column names and declared semantic types of the inspection export.
//!
//! The normalizer consults this table once; everything downstream reads
//! columns through typed accessors on [`crate::table::Table`].

pub const COD_RENIPRESS: &str = "cod_renipress";
pub const FACILITY_NAME: &str = "localidad_eess";
pub const DEPARTMENT: &str = "departamento_x";
pub const PROVINCE: &str = "nombre_prov";
pub const DISTRICT: &str = "distrito";
pub const SECTOR: &str = "sector";
pub const BLOCK_CODE: &str = "codigo_manzana";
pub const ADDRESS: &str = "dirección";
pub const ACTIVITY_TYPE: &str = "tipoActividadInspeccion";
pub const ATTENTION: &str = "atencion_vivienda_indicador";
pub const POSITIVE: &str = "viv_positiva";
pub const LARVICIDE: &str = "consumo_larvicida";
pub const FEBRILE: &str = "febriles";
pub const RECOVERED: &str = "recuperada";
pub const INSPECTION_DATE: &str = "fecha_inspeccion";
pub const CREATED_AT: &str = "_createdAt_x";
pub const RECOVERY_DATE: &str = "recuperacion_fecha";
pub const YEAR: &str = "year";

/// Columns parsed as date-times.
pub const DATE_COLUMNS: &[&str] = &[
    INSPECTION_DATE,
    CREATED_AT,
    "_createdAt_y",
    "hora_ingreso",
    "hora_salida",
    "fecha_creacion",
    RECOVERY_DATE,
    "recuperacion_fecha_asignacion",
];

/// Indicator columns coerced to numbers, unparsable cells becoming 0.
pub const NUMERIC_COLUMNS: &[&str] = &[
    COD_RENIPRESS,
    "aedic_index",
    "container_index",
    "breteau_index",
    "intensity",
    "indice_aedico",
    ATTENTION,
    POSITIVE,
    LARVICIDE,
    FEBRILE,
    RECOVERED,
];

/// Free-text columns kept as text even when every value looks numeric.
pub const TEXT_COLUMNS: &[&str] = &[
    FACILITY_NAME,
    DEPARTMENT,
    PROVINCE,
    DISTRICT,
    SECTOR,
    BLOCK_CODE,
    ADDRESS,
    ACTIVITY_TYPE,
];

/// Cell spellings treated as missing before type coercion.
pub const MISSING_MARKERS: &[&str] = &[
    "", "nan", "NaN", "None", "NA", "N/A", "n/a", "null", "NULL", "<NA>",
];

/// Declared semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    DateTime,
    Numeric,
    Text,
    /// Not declared; numeric when every present value parses, else text.
    Inferred,
}

/// Look up the declared type of a column.
pub fn semantic_type(column: &str) -> SemanticType {
    if DATE_COLUMNS.contains(&column) {
        SemanticType::DateTime
    } else if NUMERIC_COLUMNS.contains(&column) || is_container_column(column) {
        SemanticType::Numeric
    } else if TEXT_COLUMNS.contains(&column) {
        SemanticType::Text
    } else {
        SemanticType::Inferred
    }
}

/// Returns true for raw cells that stand for "no value".
pub fn is_missing(value: &str) -> bool {
    value.trim().is_empty() || MISSING_MARKERS.contains(&value)
}

/// House-attention indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attention {
    Inspected = 1,
    Closed = 2,
    Reluctant = 3,
    Uninhabited = 4,
}

impl Attention {
    pub fn from_code(code: f64) -> Option<Self> {
        if code.fract() != 0.0 {
            return None;
        }
        match code as i64 {
            1 => Some(Self::Inspected),
            2 => Some(Self::Closed),
            3 => Some(Self::Reluctant),
            4 => Some(Self::Uninhabited),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Inspected => "Inspección Completa",
            Self::Closed => "Vivienda Cerrada",
            Self::Reluctant => "Vivienda Renuente",
            Self::Uninhabited => "Vivienda Deshabitada",
        }
    }
}

/// Container status encoded as a column-name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Inspected,
    Positive,
    ChemicalTreatment,
    PhysicalTreatment,
    Disused,
}

impl ContainerStatus {
    pub const ALL: [ContainerStatus; 5] = [
        Self::Inspected,
        Self::Positive,
        Self::ChemicalTreatment,
        Self::PhysicalTreatment,
        Self::Disused,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Inspected => "_I",
            Self::Positive => "_P",
            Self::ChemicalTreatment => "_TQ",
            Self::PhysicalTreatment => "_TF",
            Self::Disused => "_D",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Inspected => "Inspeccionado(s)",
            Self::Positive => "Positivo(s)",
            Self::ChemicalTreatment => "Tratamiento Químico",
            Self::PhysicalTreatment => "Tratamiento Físico",
            Self::Disused => "Desuso(s)",
        }
    }
}

/// A container class and the column prefix its status columns share.
#[derive(Debug, Clone, Copy)]
pub struct ContainerType {
    pub label: &'static str,
    pub prefix: &'static str,
    pub tracks_disused: bool,
}

impl ContainerType {
    /// Column name for a status of this container, if the export carries it.
    pub fn column(&self, status: ContainerStatus) -> Option<String> {
        if status == ContainerStatus::Disused && !self.tracks_disused {
            return None;
        }
        Some(format!("{}{}", self.prefix, status.suffix()))
    }
}

pub const CONTAINER_TYPES: &[ContainerType] = &[
    ContainerType { label: "Tanque Alto", prefix: "tanque_alto", tracks_disused: false },
    ContainerType { label: "Tanque Bajo", prefix: "tanque_bajo", tracks_disused: false },
    ContainerType { label: "Barril/Cilindro", prefix: "barril_cilindro", tracks_disused: false },
    ContainerType { label: "Sansón/Bidón", prefix: "sanson_bidon", tracks_disused: false },
    ContainerType {
        label: "Baldes/Bateas/Tinajas",
        prefix: "baldes_bateas_tinajas",
        tracks_disused: false,
    },
    ContainerType { label: "Llantas", prefix: "llantas", tracks_disused: false },
    ContainerType {
        label: "Floreros/Maceteros",
        prefix: "floreros_maceteros",
        tracks_disused: false,
    },
    ContainerType { label: "Latas/Botellas", prefix: "latas_botellas", tracks_disused: true },
    ContainerType { label: "Otros", prefix: "otros", tracks_disused: true },
    ContainerType { label: "Inservibles", prefix: "inservibles", tracks_disused: false },
];

fn is_container_column(column: &str) -> bool {
    CONTAINER_TYPES.iter().any(|container| {
        ContainerStatus::ALL
            .iter()
            .filter_map(|status| container.column(*status))
            .any(|name| name == column)
    })
}
