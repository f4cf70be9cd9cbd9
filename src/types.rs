use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix appended to a concept key for its prior-period value
pub const PRIOR_SUFFIX: &str = "_prior";

/// Key under which the prior-period value of `key` is stored
pub fn prior_key(key: &str) -> String {
    format!("{key}{PRIOR_SUFFIX}")
}

//==============================================================================
// Workbook Model
//==============================================================================

/// A raw cell value as read from the workbook
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Trimmed display text (numbers render the way a spreadsheet export would)
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// A single named tab: row-major grid, rows may differ in length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row length
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Row by index; out-of-range rows read as empty
    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell by position; out-of-range cells read as empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.row(row).get(col).unwrap_or(&EMPTY_CELL)
    }
}

/// Ordered collection of worksheets, immutable once read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Worksheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

//==============================================================================
// Column Analysis
//==============================================================================

/// Numeric statistics for one column over the sampling window below the header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub index: usize,
    /// Lowercased, trimmed header text
    pub header: String,
    /// Nonzero numeric cells
    pub numeric_count: usize,
    pub zero_count: usize,
    pub sampled_rows: usize,
    /// Nonzero numeric cells over sampled rows (0-1)
    pub density: f64,
    pub average_magnitude: f64,
    pub max_magnitude: f64,
    pub samples: Vec<f64>,
}

impl ColumnProfile {
    pub fn empty(index: usize, header: impl Into<String>) -> Self {
        Self {
            index,
            header: header.into(),
            numeric_count: 0,
            zero_count: 0,
            sampled_rows: 0,
            density: 0.0,
            average_magnitude: 0.0,
            max_magnitude: 0.0,
            samples: Vec::new(),
        }
    }
}

/// Current / prior period column assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRoleAssignment {
    pub current_column: usize,
    pub prior_column: usize,
    pub current_score: f64,
    pub prior_score: f64,
    /// False only in the degraded case where no distinct prior column exists
    pub columns_different: bool,
}

impl ColumnRoleAssignment {
    /// A copy of this assignment pointing the prior role at another column
    pub fn with_prior(&self, column: usize, score: f64) -> Self {
        Self {
            prior_column: column,
            prior_score: score,
            columns_different: column != self.current_column,
            ..self.clone()
        }
    }
}

//==============================================================================
// Extraction Result
//==============================================================================

/// How the header row was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStrategy {
    /// Highest keyword/structure score
    Scored,
    /// Row after a "resultado"/"ingreso" section label
    AfterSectionLabel,
    /// Nothing matched; fixed default row
    DefaultRow,
}

/// Which resolver tier produced a concept value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    TokenOverlap,
    Synonym,
    Keyword,
    FirstWord,
}

/// Per-column entry of the metadata analysis table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub index: usize,
    pub header: String,
    pub data_points: usize,
    pub density: f64,
    pub current_score: f64,
    pub prior_score: f64,
    pub prior_marked: bool,
}

/// Where a current-period concept value came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptProvenance {
    pub key: String,
    pub value: f64,
    pub tier: Option<MatchTier>,
    pub label: Option<String>,
}

/// Record of the cross-validator moving the prior role to another column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorColumnCorrection {
    pub from_column: usize,
    pub to_column: usize,
    pub identical_concepts: usize,
}

/// Confidence record attached to every extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRecord {
    pub total_kpis: usize,
    pub zero_values: usize,
    pub negative_values: usize,
    pub identical_current_prior: usize,
    /// 0, 50, 75 or 100
    pub data_consistency: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFlags {
    pub has_ingresos: bool,
    pub has_utilidad_neta: bool,
    pub has_comparativa: bool,
    pub all_calculations_valid: bool,
    pub columns_different: bool,
    pub has_eficiencia_operativa: bool,
    pub ingresos_accuracy: bool,
    pub header_detected: bool,
    pub prior_column_reassigned: bool,
}

/// Ratios, growth and composition percentages, rounded to two decimals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub margen_bruto: f64,
    pub margen_operativo: f64,
    pub margen_neto: f64,
    pub ratio_eficiencia_operativa: f64,
    pub roi_personal: f64,
    pub ratio_comisiones: f64,
    pub crecimiento_utilidad_neta: f64,
    pub crecimiento_ingresos: f64,
    pub porcentaje_nuevos: f64,
    pub porcentaje_usados: f64,
    pub porcentaje_servicio: f64,
    pub porcentaje_refacciones: f64,
    pub porcentaje_financiamiento: f64,
    pub margen_bruto_prior: f64,
    pub margen_operativo_prior: f64,
    pub margen_neto_prior: f64,
}

/// Provenance and quality of one extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub engine_version: String,
    pub file_name: String,
    pub available_sheets: Vec<String>,
    pub sheet_detected: String,
    pub sheet_score: f64,
    pub header_row_index: usize,
    pub header_confidence: f64,
    pub header_strategy: HeaderStrategy,
    pub current_column: usize,
    pub prior_column: usize,
    pub current_score: f64,
    pub prior_score: f64,
    pub fiscal_year: Option<i32>,
    pub reference_month: Option<u32>,
    pub rows_processed: usize,
    pub concepts_found: usize,
    pub column_analysis: Vec<ColumnSummary>,
    pub concept_matches: Vec<ConceptProvenance>,
    pub correction: Option<PriorColumnCorrection>,
    pub data_quality: QualityRecord,
    pub validation: ValidationFlags,
}

/// Output of one `extract` call, owned by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Concept and total values, plus `<key>_prior` variants
    pub kpis: BTreeMap<String, f64>,
    pub metrics: DerivedMetrics,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Current-period value, 0 when absent
    pub fn kpi(&self, key: &str) -> f64 {
        self.kpis.get(key).copied().unwrap_or(0.0)
    }

    /// Prior-period value, 0 when absent
    pub fn prior(&self, key: &str) -> f64 {
        self.kpis.get(&prior_key(key)).copied().unwrap_or(0.0)
    }
}
