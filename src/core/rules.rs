//! Weighted keyword rules shared by the scoring heuristics

/// A substring pattern and the score it contributes when present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordRule {
    pub pattern: &'static str,
    pub weight: f64,
}

impl KeywordRule {
    pub const fn new(pattern: &'static str, weight: f64) -> Self {
        Self { pattern, weight }
    }
}

/// Sum of the weights of every rule whose pattern occurs in `text`
pub fn score_contains(text: &str, rules: &[KeywordRule]) -> f64 {
    rules
        .iter()
        .filter(|rule| text.contains(rule.pattern))
        .map(|rule| rule.weight)
        .sum()
}

/// Number of occurrences of any keyword, counting each keyword once per text
pub fn count_keywords(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &[KeywordRule] = &[
        KeywordRule::new("resultado", 90.0),
        KeywordRule::new("estado de resultado", 95.0),
        KeywordRule::new("hoja1", 60.0),
    ];

    #[test]
    fn test_overlapping_rules_accumulate() {
        assert_eq!(score_contains("estado de resultados", RULES), 185.0);
    }

    #[test]
    fn test_no_match_scores_zero() {
        assert_eq!(score_contains("balance", RULES), 0.0);
    }

    #[test]
    fn test_count_keywords() {
        assert_eq!(count_keywords("ventas y costos", &["ventas", "costos", "gastos"]), 2);
        assert_eq!(count_keywords("", &["ventas"]), 0);
    }
}
