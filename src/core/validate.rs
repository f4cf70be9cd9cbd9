//! Cross-validation, quality assessment and result invariants

use crate::config::ExtractorConfig;
use crate::core::aggregate::{percentage, PeriodValues};
use crate::core::concepts::{
    keys_in, ConceptGroup, COSTOS_TOTALES, CRITICAL_CONCEPTS, GASTOS_OPERACION_TOTALES,
    INGRESOS_TOTALES, UTILIDAD_BRUTA, UTILIDAD_NETA, UTILIDAD_OPERACION,
};
use crate::types::{
    ColumnProfile, ColumnRoleAssignment, ExtractionResult, HeaderStrategy, QualityRecord,
    ValidationFlags, PRIOR_SUFFIX,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

fn value(values: &PeriodValues, key: &str) -> f64 {
    values.get(key).copied().unwrap_or(0.0)
}

//==============================================================================
// Cross-validator
//==============================================================================

/// Whether two figures are close enough to come from the same column
pub fn nearly_identical(current: f64, prior: f64, config: &ExtractorConfig) -> bool {
    let tolerance = config.identical_floor.max(current.abs() * config.identical_ratio);
    (current - prior).abs() <= tolerance
}

/// Critical concepts whose current and prior values are nearly identical
pub fn identical_critical_concepts(
    current: &PeriodValues,
    prior: &PeriodValues,
    config: &ExtractorConfig,
) -> usize {
    CRITICAL_CONCEPTS
        .iter()
        .filter(|key| nearly_identical(value(current, key), value(prior, key), config))
        .count()
}

/// A replacement prior column when every critical concept looks duplicated
/// across two distinct columns.
///
/// Candidates exclude both assigned columns and need at least the alternative
/// minimum of data points; the most populated one wins.
pub fn find_prior_reassignment(
    current: &PeriodValues,
    prior: &PeriodValues,
    assignment: &ColumnRoleAssignment,
    profiles: &[ColumnProfile],
    config: &ExtractorConfig,
) -> Option<usize> {
    if !assignment.columns_different {
        return None;
    }
    let identical = identical_critical_concepts(current, prior, config);
    if identical < CRITICAL_CONCEPTS.len() {
        return None;
    }

    warn!(
        current = assignment.current_column,
        prior = assignment.prior_column,
        "current and prior columns carry near-identical critical values"
    );

    let mut candidates: Vec<&ColumnProfile> = profiles
        .iter()
        .filter(|p| {
            p.index != assignment.current_column
                && p.index != assignment.prior_column
                && p.numeric_count >= config.alternative_min_data_points
        })
        .collect();
    candidates.sort_by(|a, b| b.numeric_count.cmp(&a.numeric_count));

    match candidates.first() {
        Some(profile) => {
            info!(col = profile.index, "prior role reassigned for re-extraction");
            Some(profile.index)
        }
        None => {
            warn!("no alternative prior column available, keeping assignment");
            None
        }
    }
}

//==============================================================================
// Quality
//==============================================================================

/// Inputs the quality record is computed from
pub struct QualityInputs<'a> {
    pub kpis: &'a BTreeMap<String, f64>,
    pub current: &'a PeriodValues,
    pub prior: &'a PeriodValues,
    pub ratio_eficiencia_operativa: f64,
    pub assignment: &'a ColumnRoleAssignment,
    pub header_strategy: HeaderStrategy,
    pub prior_column_reassigned: bool,
}

/// Consistency tier: 100 when both profit checks pass, 75 for one, 50 for none, 0 without revenue
pub fn consistency_score(values: &PeriodValues, config: &ExtractorConfig) -> u8 {
    let ingresos = value(values, INGRESOS_TOTALES);
    if ingresos == 0.0 {
        return 0;
    }
    let gross = value(values, UTILIDAD_BRUTA);
    let operating = value(values, UTILIDAD_OPERACION);

    let gross_ok = (gross - (ingresos - value(values, COSTOS_TOTALES))).abs()
        < config.gross_profit_floor.max(gross.abs() * config.consistency_ratio);
    let operating_ok = (operating - (gross - value(values, GASTOS_OPERACION_TOTALES))).abs()
        < config.operating_profit_floor.max(operating.abs() * config.consistency_ratio);

    match (gross_ok, operating_ok) {
        (true, true) => 100,
        (true, false) | (false, true) => 75,
        (false, false) => 50,
    }
}

pub fn assess_quality(
    inputs: &QualityInputs<'_>,
    config: &ExtractorConfig,
) -> (QualityRecord, ValidationFlags) {
    let current = inputs.current;
    let ingresos = value(current, INGRESOS_TOTALES);
    let neta = value(current, UTILIDAD_NETA);
    let columns_different = inputs.assignment.columns_different
        && inputs.assignment.current_column != inputs.assignment.prior_column;

    let record = QualityRecord {
        total_kpis: inputs.kpis.len(),
        zero_values: inputs.kpis.values().filter(|v| **v == 0.0).count(),
        negative_values: inputs.kpis.values().filter(|v| **v < 0.0).count(),
        identical_current_prior: identical_critical_concepts(current, inputs.prior, config),
        data_consistency: consistency_score(current, config),
    };

    let flags = ValidationFlags {
        has_ingresos: ingresos > 0.0,
        has_utilidad_neta: neta != 0.0,
        has_comparativa: value(inputs.prior, UTILIDAD_NETA) != 0.0 && columns_different,
        all_calculations_valid: ingresos > 0.0 && neta != 0.0,
        columns_different,
        has_eficiencia_operativa: inputs.ratio_eficiencia_operativa > 0.0,
        ingresos_accuracy: (ingresos - (value(current, UTILIDAD_BRUTA) + value(current, COSTOS_TOTALES)))
            .abs()
            < config.revenue_accuracy_tolerance,
        header_detected: inputs.header_strategy == HeaderStrategy::Scored,
        prior_column_reassigned: inputs.prior_column_reassigned,
    };

    (record, flags)
}

//==============================================================================
// Invariants
//==============================================================================

const SUM_TOLERANCE: f64 = 1e-6;

fn sums_match(total: f64, parts: f64) -> bool {
    (total - parts).abs() <= SUM_TOLERANCE * total.abs().max(1.0)
}

fn check_period(
    get: impl Fn(&str) -> f64,
    suffix: &str,
    config: &ExtractorConfig,
    violations: &mut Vec<String>,
) {
    let ingresos = get(INGRESOS_TOTALES);
    let revenue_parts: f64 = keys_in(ConceptGroup::Revenue).map(|key| get(key)).sum();
    if !sums_match(ingresos, revenue_parts) {
        violations.push(format!(
            "{INGRESOS_TOTALES}{suffix} = {ingresos} but its components sum to {revenue_parts}"
        ));
    }

    let costos = get(COSTOS_TOTALES);
    let cost_parts: f64 = keys_in(ConceptGroup::Cost).map(|key| get(key)).sum();
    if !sums_match(costos, cost_parts) {
        violations.push(format!(
            "{COSTOS_TOTALES}{suffix} = {costos} but its components sum to {cost_parts}"
        ));
    }

    let gross = get(UTILIDAD_BRUTA);
    let computed = ingresos - costos;
    let tolerance = config
        .gross_profit_floor
        .max(config.reconcile_ratio * gross.abs());
    if (gross - computed).abs() > tolerance {
        violations.push(format!(
            "{UTILIDAD_BRUTA}{suffix} = {gross} deviates from revenue minus cost ({computed}) beyond {tolerance}"
        ));
    }
}

/// Every invariant a result must satisfy, fresh or re-imported.
///
/// Returns the violated ones as readable messages; empty means valid.
pub fn check_invariants(result: &ExtractionResult, config: &ExtractorConfig) -> Vec<String> {
    let mut violations = Vec::new();
    check_period(|key| result.kpi(key), "", config, &mut violations);
    check_period(|key| result.prior(key), PRIOR_SUFFIX, config, &mut violations);

    let kpi = |key: &str| result.kpi(key);
    let expected_margin = percentage(kpi(UTILIDAD_NETA), kpi(INGRESOS_TOTALES));
    if (result.metrics.margen_neto - expected_margin).abs() > 0.005 {
        violations.push(format!(
            "margen_neto = {} but net profit over revenue gives {expected_margin}",
            result.metrics.margen_neto
        ));
    }

    let metadata = &result.metadata;
    if metadata.validation.columns_different && metadata.current_column == metadata.prior_column {
        violations.push(format!(
            "current and prior both use column {} while columnsDifferent is set",
            metadata.current_column
        ));
    }

    violations
}
