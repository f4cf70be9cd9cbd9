//! Canonical concept catalogue
//!
//! Immutable tables: the dealership income-statement concepts with their
//! search patterns, the synonym table used by the third resolver tier, and the
//! section-header labels the concept index skips.

//==============================================================================
// Keys of computed totals and reconciled profits
//==============================================================================

pub const INGRESOS_TOTALES: &str = "ingresos_totales";
pub const COSTOS_TOTALES: &str = "costos_totales";
pub const GASTOS_OPERACION_TOTALES: &str = "gastos_operacion_totales";
pub const UTILIDAD_BRUTA: &str = "utilidad_bruta";
pub const UTILIDAD_OPERACION: &str = "utilidad_operacion";
pub const UTILIDAD_NETA: &str = "utilidad_neta";

/// Concepts compared by the cross-validator to detect a duplicated prior column
pub const CRITICAL_CONCEPTS: &[&str] = &["ventas_autos_nuevos", UTILIDAD_NETA, UTILIDAD_BRUTA];

//==============================================================================
// Concept definitions
//==============================================================================

/// Role a concept plays in aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptGroup {
    /// Summed into `ingresos_totales`
    Revenue,
    /// Summed into `costos_totales`
    Cost,
    /// Component of operating expense, summed when no direct total exists
    OperatingExpense,
    /// Directly reported operating-expense total
    OperatingExpenseTotal,
    Profit,
}

/// A canonical financial line item and the labels it is searched under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptDefinition {
    pub key: &'static str,
    /// Ordered search patterns; the first one is the primary label
    pub patterns: &'static [&'static str],
    /// Required concepts keep searching past zero values
    pub required: bool,
    pub group: ConceptGroup,
}

const fn concept(
    key: &'static str,
    patterns: &'static [&'static str],
    group: ConceptGroup,
) -> ConceptDefinition {
    ConceptDefinition {
        key,
        patterns,
        required: false,
        group,
    }
}

const fn required(
    key: &'static str,
    patterns: &'static [&'static str],
    group: ConceptGroup,
) -> ConceptDefinition {
    ConceptDefinition {
        key,
        patterns,
        required: true,
        group,
    }
}

use ConceptGroup::{Cost, OperatingExpense, OperatingExpenseTotal, Profit, Revenue};

pub const CONCEPTS: &[ConceptDefinition] = &[
    // Revenue
    required("ventas_autos_nuevos", &["ventas de autos nuevos", "autos nuevos"], Revenue),
    concept(
        "ventas_unidades_flotillas",
        &["ventas de unidades a flotillas", "unidades flotillas", "flotillas"],
        Revenue,
    ),
    concept(
        "ventas_unidades_otros_distribuidores",
        &["ventas de unidades a otros distribuidores", "otros distribuidores"],
        Revenue,
    ),
    concept(
        "ventas_financiamiento",
        &["ventas de f&i", "financiamiento", "f&i", "f y i"],
        Revenue,
    ),
    concept(
        "ventas_refacciones",
        &["refacciones y accesorios (mostrador)", "refacciones mostrador", "refacciones"],
        Revenue,
    ),
    concept(
        "ventas_refacciones_ventanilla",
        &["refacciones y accesorios (ventanilla)", "refacciones ventanilla"],
        Revenue,
    ),
    concept(
        "ventas_refacciones_mayoreo",
        &["refacciones y accesorios (mayoreo)", "refacciones mayoreo"],
        Revenue,
    ),
    concept("ventas_servicio", &["servicio"], Revenue),
    concept(
        "ventas_servicio_arlux",
        &["servicio arlux", "servicio arltux", "arlux"],
        Revenue,
    ),
    concept(
        "ventas_polizas_garantia",
        &["polizas de garantia extendida", "garantia extendida"],
        Revenue,
    ),
    concept(
        "ventas_hojalateria_refacciones",
        &["hojalateria y pintura refacciones", "hojalateria refacciones"],
        Revenue,
    ),
    concept(
        "ventas_hojalateria_mano_obra",
        &["hojalateria y pintura mano de obra", "hojalateria mano obra"],
        Revenue,
    ),
    concept(
        "ventas_autos_usados",
        &["ventas de autos usados", "autos usados"],
        Revenue,
    ),
    // Cost
    concept(
        "costos_autos_nuevos",
        &["costos de autos nuevos", "costo autos nuevos"],
        Cost,
    ),
    concept(
        "costo_unidades_flotillas",
        &["costo vta. unids. flotilla", "costo flotillas"],
        Cost,
    ),
    concept(
        "costo_unidades_otros_distribuidores",
        &["costo unids. de otros dist/filiales", "costo otros distribuidores"],
        Cost,
    ),
    concept(
        "costo_refacciones_mostrador",
        &["costo de refac. y acc. (mostrador)", "costo refacciones mostrador"],
        Cost,
    ),
    concept(
        "costo_refacciones_ventanilla",
        &["costo de refac. y acc. (ventanilla)", "costo refacciones ventanilla"],
        Cost,
    ),
    concept(
        "costo_refacciones_mayoreo",
        &["costo de refac. y acc. (mayoreo)", "costo refacciones mayoreo"],
        Cost,
    ),
    concept("costo_servicio", &["costo de servicio"], Cost),
    concept(
        "costo_servicio_arlux",
        &["costo de servicio arlux", "costo servicio arltux"],
        Cost,
    ),
    concept(
        "costo_polizas_garantia",
        &["costo de polizas de garantía extendida", "costo garantia extendida"],
        Cost,
    ),
    concept(
        "costo_hojalateria_refacciones",
        &["costo de hojalateria y pintura refacciones", "costo hojalateria refacciones"],
        Cost,
    ),
    concept(
        "costo_hojalateria_mano_obra",
        &["costo de hojalateria y pintura m.o", "costo hojalateria mano obra"],
        Cost,
    ),
    concept(
        "costo_autos_usados",
        &["costo de autos usados", "costo autos usados"],
        Cost,
    ),
    // Operating expense
    concept("gastos_generales", &["gastos generales"], OperatingExpense),
    concept("gastos_personal", &["gastos de personal"], OperatingExpense),
    concept("comisiones_ventas", &["comisiones sobre ventas"], OperatingExpense),
    concept("rentas", &["rentas"], OperatingExpense),
    required(
        GASTOS_OPERACION_TOTALES,
        &[
            "total de gastos de operación",
            "gastos de operación totales",
            "total gastos operación",
        ],
        OperatingExpenseTotal,
    ),
    // Profit
    required(UTILIDAD_BRUTA, &["utilidad/perdida bruta", "utilidad bruta"], Profit),
    required(
        UTILIDAD_OPERACION,
        &["utilidad/perdida operación", "utilidad operación"],
        Profit,
    ),
    required(
        UTILIDAD_NETA,
        &["utilidad/perdida neta", "utilidad/perdida del negocio", "utilidad neta"],
        Profit,
    ),
];

//==============================================================================
// Synonyms and section headers
//==============================================================================

/// Alternate phrasings keyed by a normalized canonical pattern
pub const SYNONYMS: &[(&str, &[&str])] = &[
    (
        "ventas de autos nuevos",
        &[
            "venta de autos nuevos",
            "autos nuevos",
            "ventas autos nuevos",
            "vehiculos nuevos",
            "ventas autos",
        ],
    ),
    (
        "ventas de f&i",
        &["f&i", "financiamiento", "ventas financiamiento", "financiamientos", "f y i"],
    ),
    (
        "utilidad/perdida bruta",
        &[
            "utilidad bruta",
            "margin bruta",
            "resultado bruto",
            "bruto",
            "utilidad bruta total",
        ],
    ),
    (
        "utilidad/perdida operación",
        &[
            "utilidad operación",
            "resultado operativo",
            "utilidad operativa",
            "operación",
            "resultado operación",
        ],
    ),
    (
        "utilidad/perdida neta",
        &[
            "utilidad neta",
            "resultado neto",
            "utilidad del ejercicio",
            "neta",
            "utilidad final",
        ],
    ),
    (
        "refacciones y accesorios (mostrador)",
        &["refacciones mostrador", "mostrador", "refacciones (mostrador)"],
    ),
    (
        "refacciones y accesorios (ventanilla)",
        &["refacciones ventanilla", "ventanilla", "refacciones (ventanilla)"],
    ),
    (
        "refacciones y accesorios (mayoreo)",
        &["refacciones mayoreo", "mayoreo", "refacciones (mayoreo)"],
    ),
    (
        "total de gastos de operación",
        &[
            "gastos de operación totales",
            "total gastos operación",
            "gastos operación",
            "gastos operativos totales",
        ],
    ),
    (
        "ventas de autos usados",
        &["autos usados", "ventas usados", "vehiculos usados", "venta autos usados"],
    ),
    ("servicio arlux", &["servicio arltux", "artlux", "arlux servicio"]),
];

/// Uppercase section labels; any row whose first cell contains one is skipped
pub const SECTION_HEADERS: &[&str] = &[
    "RESULTADOS",
    "INGRESOS NETOS",
    "TOTAL DE COSTOS",
    "UTILIDAD/PERDIDA BRUTA",
    "TOTAL DE GASTOS DE OPERACIÓN",
    "COSTO INTEGRAL DEL FINANCIAMIENTO",
    "OTROS GASTOS Y PRODUCTOS",
    "GASTOS EXTRAORDINARIOS",
    "FLUJO OPERATIVO",
    "CONCEPTO",
];

//==============================================================================
// Lookups
//==============================================================================

pub fn find_concept(key: &str) -> Option<&'static ConceptDefinition> {
    CONCEPTS.iter().find(|c| c.key == key)
}

/// Keys of every concept in `group`, in catalogue order
pub fn keys_in(group: ConceptGroup) -> impl Iterator<Item = &'static str> {
    CONCEPTS
        .iter()
        .filter(move |c| c.group == group)
        .map(|c| c.key)
}

/// Synonyms listed for a normalized pattern
pub fn synonyms_for(pattern: &str) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(canonical, _)| *canonical == pattern)
        .map(|(_, synonyms)| *synonyms)
        .unwrap_or(&[])
}

/// Whether a raw first-cell label is a section header
pub fn is_section_header(label: &str) -> bool {
    let upper = label.to_uppercase();
    SECTION_HEADERS.iter().any(|header| upper.contains(header))
}
