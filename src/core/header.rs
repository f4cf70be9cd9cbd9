//! Header locator: finds the row acting as the column header

use crate::config::ExtractorConfig;
use crate::core::rules::{count_keywords, score_contains, KeywordRule};
use crate::types::{Cell, HeaderStrategy, Worksheet};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

/// First-cell labels that typically head the concept column
pub const HEADER_KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule::new("concepto", 100.0),
    KeywordRule::new("descripción", 90.0),
    KeywordRule::new("cuenta", 85.0),
    KeywordRule::new("partida", 80.0),
    KeywordRule::new("rubro", 75.0),
];

pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "ventas",
    "costos",
    "gastos",
    "utilidad",
    "ingresos",
    "resultado",
];

pub const STRUCTURE_BONUS: f64 = 30.0;
pub const STRUCTURE_MIN_TEXT_CELLS: usize = 3;
pub const FINANCIAL_KEYWORD_WEIGHT: f64 = 5.0;

/// Section labels whose next row is taken as the header when scoring finds nothing
const SECTION_LABELS: &[&str] = &["resultado", "ingreso"];

static NUMBER_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[,.]?\d*$").expect("valid regex"));

/// Chosen header row and how confidently it was found
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLocation {
    pub row: usize,
    /// Winning row score; 0 for fallback strategies
    pub confidence: f64,
    pub strategy: HeaderStrategy,
}

/// Score a single candidate row
pub fn score_header_row(row: &[Cell], config: &ExtractorConfig) -> f64 {
    let first = row.first().map(Cell::text).unwrap_or_default().to_lowercase();
    let mut score = score_contains(&first, HEADER_KEYWORD_RULES);

    let text_cells = row
        .iter()
        .take(config.header_text_columns)
        .filter(|cell| is_header_text(cell))
        .count();
    if text_cells >= STRUCTURE_MIN_TEXT_CELLS {
        score += STRUCTURE_BONUS;
    }

    let keyword_hits: usize = row
        .iter()
        .map(|cell| count_keywords(&cell.text().to_lowercase(), FINANCIAL_KEYWORDS))
        .sum();
    score += keyword_hits as f64 * FINANCIAL_KEYWORD_WEIGHT;

    score
}

/// Non-numeric text longer than two characters
fn is_header_text(cell: &Cell) -> bool {
    match cell {
        Cell::Text(s) => {
            let trimmed = s.trim();
            trimmed.chars().count() > 2 && !NUMBER_LIKE.is_match(trimmed)
        }
        _ => false,
    }
}

/// Locate the header row. Always returns a row index.
pub fn locate_header(sheet: &Worksheet, config: &ExtractorConfig) -> HeaderLocation {
    let mut best_row = None;
    let mut best_score = 0.0;

    for (index, row) in sheet.rows.iter().take(config.header_scan_rows).enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let score = score_header_row(row, config);
        debug!(row = index, score, "scored header candidate");
        if score > best_score {
            best_score = score;
            best_row = Some(index);
        }
    }

    if let Some(row) = best_row {
        info!(row, confidence = best_score, "header row located");
        return HeaderLocation {
            row,
            confidence: best_score,
            strategy: HeaderStrategy::Scored,
        };
    }

    for (index, row) in sheet
        .rows
        .iter()
        .take(config.header_fallback_scan_rows)
        .enumerate()
    {
        let first = row.first().map(Cell::text).unwrap_or_default().to_lowercase();
        if SECTION_LABELS.iter().any(|label| first.contains(label)) {
            warn!(
                label_row = index,
                "no scored header row, using the row after a section label"
            );
            return HeaderLocation {
                row: index + 1,
                confidence: 0.0,
                strategy: HeaderStrategy::AfterSectionLabel,
            };
        }
    }

    warn!(
        row = config.default_header_row,
        "no header row detected, using default row"
    );
    HeaderLocation {
        row: config.default_header_row,
        confidence: 0.0,
        strategy: HeaderStrategy::DefaultRow,
    }
}
