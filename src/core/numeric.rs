//! Numeric token parser
//!
//! Turns raw cell values into numbers, tolerating accounting negatives,
//! mixed thousands/decimal separators and trivial formulas. Never fails:
//! anything unparseable reads as 0.

use crate::types::Cell;
use once_cell::sync::Lazy;
use regex::Regex;

const EMPTY_TOKENS: &[&str] = &["", "-", "—", "NULL", "N/A", "#N/A"];

static ACCOUNTING_NEGATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([^)]+\)$").expect("valid regex"));

static FORMULA_BINARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?[\d,.]+)\s*([+-])\s*([\d,.]+)\s*$").expect("valid regex")
});

static FORMULA_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-?[\d,.]+)\s*$").expect("valid regex"));

/// Parse a cell, reading anything unparseable as 0
pub fn parse_cell(cell: &Cell) -> f64 {
    parse_numeric(cell).unwrap_or(0.0)
}

/// Parse a cell, distinguishing "no number here" from an actual 0
pub fn parse_numeric(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => parse_text(s),
    }
}

/// Parse a string token
pub fn parse_text(raw: &str) -> Option<f64> {
    let token = raw.trim();
    if EMPTY_TOKENS.contains(&token) {
        return None;
    }

    if let Some(body) = token.strip_prefix('=') {
        return parse_formula(body);
    }

    let negative = ACCOUNTING_NEGATIVE.is_match(token) || token.starts_with('-');

    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.'))
        .collect();
    let normalized = normalize_separators(&cleaned);

    if normalized.is_empty() || normalized == "." {
        return None;
    }

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    Some(if negative { -value.abs() } else { value })
}

/// `=<literal>` or `=<a> + <b>` / `=<a> - <b>`; anything else is not evaluated
fn parse_formula(body: &str) -> Option<f64> {
    if let Some(caps) = FORMULA_BINARY.captures(body) {
        let lhs = parse_text(&caps[1]).unwrap_or(0.0);
        let rhs = parse_text(&caps[3]).unwrap_or(0.0);
        return Some(if &caps[2] == "-" { lhs - rhs } else { lhs + rhs });
    }

    FORMULA_LITERAL
        .captures(body)
        .and_then(|caps| parse_text(&caps[1]))
}

/// Rewrite a digits/comma/period token into `f64::from_str` form.
///
/// Both separators present: the one appearing last is the decimal mark.
/// Comma only: decimal when a single comma has at most two trailing digits.
/// Period only: decimal under the same rule, otherwise a thousands mark.
fn normalize_separators(token: &str) -> String {
    let last_comma = token.rfind(',');
    let last_dot = token.rfind('.');

    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                token.replace('.', "").replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (Some(_), None) => {
            let parts: Vec<&str> = token.split(',').collect();
            if parts.len() == 2 && parts[1].len() <= 2 {
                token.replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (None, Some(_)) => {
            let parts: Vec<&str> = token.split('.').collect();
            if parts.len() == 2 && parts[1].len() <= 2 {
                token.to_string()
            } else {
                token.replace('.', "")
            }
        }
        (None, None) => token.to_string(),
    }
}
