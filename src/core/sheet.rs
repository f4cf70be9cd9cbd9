//! Sheet selector: picks the worksheet most likely to hold the income statement

use crate::core::rules::{score_contains, KeywordRule};
use tracing::{debug, info};

/// Name patterns, summed for every substring hit
pub const SHEET_RULES: &[KeywordRule] = &[
    KeywordRule::new("edo de resultado", 100.0),
    KeywordRule::new("estado de resultado", 95.0),
    KeywordRule::new("resultado", 90.0),
    KeywordRule::new("edo. de resultado", 85.0),
    KeywordRule::new("resumen", 80.0),
    KeywordRule::new("consolidado", 75.0),
    KeywordRule::new("detalle", 70.0),
    KeywordRule::new("hoja1", 60.0),
    KeywordRule::new("sheet1", 50.0),
];

/// Names that earn an extra bonus on an exact (case-insensitive) match
pub const CANONICAL_SHEET_NAMES: &[&str] = &["edo de resultados", "estado de resultados"];

pub const CANONICAL_BONUS: f64 = 50.0;

/// The chosen worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSelection {
    pub index: usize,
    pub name: String,
    pub score: f64,
}

/// Score of a single worksheet name
pub fn score_sheet_name(name: &str) -> f64 {
    let lower = name.to_lowercase();
    let mut score = score_contains(&lower, SHEET_RULES);
    if CANONICAL_SHEET_NAMES.contains(&lower.trim()) {
        score += CANONICAL_BONUS;
    }
    score
}

/// Highest-scoring name; ties go to the earlier sheet, all-zero falls back to the first.
///
/// Returns `None` only for an empty name list.
pub fn select_sheet(names: &[String]) -> Option<SheetSelection> {
    let first = names.first()?;
    let mut best = SheetSelection {
        index: 0,
        name: first.clone(),
        score: 0.0,
    };

    for (index, name) in names.iter().enumerate() {
        let score = score_sheet_name(name);
        debug!(sheet = %name, score, "scored worksheet name");
        if score > best.score {
            best = SheetSelection {
                index,
                name: name.clone(),
                score,
            };
        }
    }

    info!(sheet = %best.name, score = best.score, "selected worksheet");
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_name_wins() {
        let selection = select_sheet(&names(&["Hoja1", "Balance", "Estado de Resultados"])).unwrap();
        assert_eq!(selection.index, 2);
        assert_eq!(selection.name, "Estado de Resultados");
        // 95 (estado de resultado) + 90 (resultado) + 50 exact bonus
        assert_eq!(selection.score, 235.0);
    }

    #[test]
    fn test_abbreviated_name_scores_highest() {
        let selection = select_sheet(&names(&["Estado de Resultado", "EDO DE RESULTADOS"])).unwrap();
        assert_eq!(selection.name, "EDO DE RESULTADOS");
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let selection = select_sheet(&names(&["Resumen Norte", "Resumen Sur"])).unwrap();
        assert_eq!(selection.index, 0);
    }

    #[test]
    fn test_all_zero_falls_back_to_first() {
        let selection = select_sheet(&names(&["Datos", "Graficas"])).unwrap();
        assert_eq!(selection.index, 0);
        assert_eq!(selection.score, 0.0);
    }

    #[test]
    fn test_generic_sheet_names_score_low() {
        assert_eq!(score_sheet_name("Sheet1"), 50.0);
        assert_eq!(score_sheet_name("Hoja1"), 60.0);
    }

    #[test]
    fn test_empty_list() {
        assert!(select_sheet(&[]).is_none());
    }
}
