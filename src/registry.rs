//! Static reference data for health facilities.
//!
//! Coverage percentages are computed against the housing counts recorded
//! here, never against the number of inspected rows.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facility {
    pub name: String,
    pub total_houses: u32,
}

/// Facility code (`cod_renipress`) to facility record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacilityRegistry {
    facilities: HashMap<i64, Facility>,
}

const BUILTIN: &[(i64, &str, u32)] = &[
    (5060, "LA LIBERTAD", 136),
    (5044, "GUSTAVO LANATTA LUJAN", 4282),
    (7276, "LA PRIMAVERA", 1822),
    (7435, "MESONES MURO", 426),
    (7006, "SAN FRANCISCO", 188),
    (5126, "MIRAFLORES", 206),
    (5135, "VISTA ALEGRE", 41),
    (5136, "LA VICTORIA", 486),
    (5137, "PUEBLO LIBRE", 50),
    (7225, "MORROPON", 90),
    (7285, "SAN LUIS", 1874),
    (5095, "SAN JUAN DE LA LIBERTAD", 456),
    (5096, "JOSE OLAYA", 280),
    (7258, "SANTA ISABEL", 138),
    (7259, "LA UNION", 100),
    (5066, "EL MILAGRO", 505),
    (1720, "SAN RAFAEL", 804),
    (1744, "LA VICTORIA", 7191),
    (1659, "PROGRESO", 9674),
    (1660, "LA UNION", 4576),
    (1661, "SAN PEDRO", 11249),
    (1662, "VICTOR RAUL", 2309),
    (1663, "TUPAC AMARU", 1799),
    (1664, "LA ESPERANZA", 2004),
    (1715, "SAN JACINTO", 10725),
    (1706, "VILLA MARIA", 5568),
    (1681, "ALTO PERU", 374),
    (2664, "BELLAVISTA", 3738),
    (8828, "SAN MARTIN", 2213),
    (2570, "SANTA ROSA", 350),
    (1345, "SAN JOSE", 90),
    (1368, "SANTA ROSA", 153),
    (23961, "MIRAFLORES", 365),
    (3760, "LECHEMAYO", 716),
    (3749, "PALMAPAMPA", 1924),
];

static BUILTIN_REGISTRY: Lazy<FacilityRegistry> = Lazy::new(|| {
    FacilityRegistry::from_entries(
        BUILTIN
            .iter()
            .map(|(code, name, houses)| (*code, (*name).to_string(), *houses)),
    )
});

impl FacilityRegistry {
    /// The baked-in registry shipped with the tool.
    pub fn builtin() -> &'static FacilityRegistry {
        &BUILTIN_REGISTRY
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (i64, String, u32)>) -> Self {
        Self {
            facilities: entries
                .into_iter()
                .map(|(code, name, total_houses)| (code, Facility { name, total_houses }))
                .collect(),
        }
    }

    pub fn get(&self, code: i64) -> Option<&Facility> {
        self.facilities.get(&code)
    }

    /// Registry housing total, 0 for unknown facilities.
    pub fn total_houses(&self, code: i64) -> u32 {
        self.get(code).map_or(0, |f| f.total_houses)
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup() {
        let registry = FacilityRegistry::builtin();
        assert_eq!(registry.len(), 35);
        assert_eq!(registry.total_houses(1661), 11249);
        assert_eq!(registry.get(5060).map(|f| f.name.as_str()), Some("LA LIBERTAD"));
    }

    #[test]
    fn unknown_facility_has_no_houses() {
        assert_eq!(FacilityRegistry::builtin().total_houses(99999), 0);
    }
}
