//! Aggregator: totals, profit reconciliation and derived metrics

use crate::config::ExtractorConfig;
use crate::core::concepts::{
    keys_in, ConceptGroup, COSTOS_TOTALES, GASTOS_OPERACION_TOTALES, INGRESOS_TOTALES,
    UTILIDAD_BRUTA, UTILIDAD_NETA, UTILIDAD_OPERACION,
};
use crate::types::DerivedMetrics;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Concept values of a single period, keyed by plain concept key
pub type PeriodValues = BTreeMap<String, f64>;

fn value(values: &PeriodValues, key: &str) -> f64 {
    values.get(key).copied().unwrap_or(0.0)
}

fn sum_group(values: &PeriodValues, group: ConceptGroup) -> f64 {
    keys_in(group).map(|key| value(values, key)).sum()
}

/// Extracted profit when it agrees with the computed one, computed otherwise.
///
/// Agreement means a nonzero extracted figure within max(floor, ratio * |extracted|).
pub fn reconcile(extracted: f64, computed: f64, floor: f64, ratio: f64) -> f64 {
    let tolerance = floor.max(ratio * extracted.abs());
    if extracted == 0.0 || (extracted - computed).abs() > tolerance {
        computed
    } else {
        extracted
    }
}

/// A period's concept values plus its totals, with profits reconciled.
///
/// Returns a new map; `values` is left untouched.
pub fn aggregate_period(values: &PeriodValues, config: &ExtractorConfig, period: &str) -> PeriodValues {
    let mut out = values.clone();

    let ingresos = sum_group(values, ConceptGroup::Revenue);
    let costos = sum_group(values, ConceptGroup::Cost);
    out.insert(INGRESOS_TOTALES.to_string(), ingresos);
    out.insert(COSTOS_TOTALES.to_string(), costos);

    let direct_opex = value(values, GASTOS_OPERACION_TOTALES);
    let opex = if direct_opex != 0.0 {
        direct_opex
    } else {
        let summed = sum_group(values, ConceptGroup::OperatingExpense);
        debug!(period, opex = summed, "operating expense summed from components");
        summed
    };
    out.insert(GASTOS_OPERACION_TOTALES.to_string(), opex);

    let extracted_gross = value(values, UTILIDAD_BRUTA);
    let gross = reconcile(
        extracted_gross,
        ingresos - costos,
        config.gross_profit_floor,
        config.reconcile_ratio,
    );
    if gross != extracted_gross {
        warn!(period, extracted = extracted_gross, computed = gross, "gross profit replaced by computed value");
    }
    out.insert(UTILIDAD_BRUTA.to_string(), gross);

    let extracted_operating = value(values, UTILIDAD_OPERACION);
    let operating = reconcile(
        extracted_operating,
        gross - opex,
        config.operating_profit_floor,
        config.reconcile_ratio,
    );
    if operating != extracted_operating {
        warn!(
            period,
            extracted = extracted_operating,
            computed = operating,
            "operating profit replaced by computed value"
        );
    }
    out.insert(UTILIDAD_OPERACION.to_string(), operating);

    out
}

//==============================================================================
// Derived metrics
//==============================================================================

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole` as a rounded percentage; 0 unless `whole` is positive
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round2(part / whole * 100.0)
    } else {
        0.0
    }
}

/// Relative change against |prior|; ±100 (or 0) when there is no prior figure
pub fn growth(current: f64, prior: f64) -> f64 {
    if prior != 0.0 {
        round2((current - prior) / prior.abs() * 100.0)
    } else if current > 0.0 {
        100.0
    } else if current < 0.0 {
        -100.0
    } else {
        0.0
    }
}

/// Metrics over aggregated current and prior values
pub fn derive_metrics(current: &PeriodValues, prior: &PeriodValues) -> DerivedMetrics {
    let c = |key: &str| value(current, key);
    let p = |key: &str| value(prior, key);
    let ingresos = c(INGRESOS_TOTALES);
    let ingresos_prior = p(INGRESOS_TOTALES);

    DerivedMetrics {
        margen_bruto: percentage(c(UTILIDAD_BRUTA), ingresos),
        margen_operativo: percentage(c(UTILIDAD_OPERACION), ingresos),
        margen_neto: percentage(c(UTILIDAD_NETA), ingresos),
        ratio_eficiencia_operativa: percentage(c(GASTOS_OPERACION_TOTALES), ingresos),
        roi_personal: percentage(c(UTILIDAD_OPERACION), c("gastos_personal")),
        ratio_comisiones: percentage(c("comisiones_ventas"), ingresos),
        crecimiento_utilidad_neta: growth(c(UTILIDAD_NETA), p(UTILIDAD_NETA)),
        crecimiento_ingresos: growth(ingresos, ingresos_prior),
        porcentaje_nuevos: percentage(c("ventas_autos_nuevos"), ingresos),
        porcentaje_usados: percentage(c("ventas_autos_usados"), ingresos),
        porcentaje_servicio: percentage(
            c("ventas_servicio") + c("ventas_servicio_arlux"),
            ingresos,
        ),
        porcentaje_refacciones: percentage(
            c("ventas_refacciones") + c("ventas_refacciones_ventanilla") + c("ventas_refacciones_mayoreo"),
            ingresos,
        ),
        porcentaje_financiamiento: percentage(c("ventas_financiamiento"), ingresos),
        margen_bruto_prior: percentage(p(UTILIDAD_BRUTA), ingresos_prior),
        margen_operativo_prior: percentage(p(UTILIDAD_OPERACION), ingresos_prior),
        margen_neto_prior: percentage(p(UTILIDAD_NETA), ingresos_prior),
    }
}
