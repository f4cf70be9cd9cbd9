//! End-to-end extraction over in-memory workbooks

mod common;

use common::{
    blank_workbook, duplicated_prior_statement, line, standard_statement, text_only_statement,
    workbook_bytes, Fx,
};
use dealer_kpi::config::ExtractorConfig;
use dealer_kpi::core::aggregate::percentage;
use dealer_kpi::core::check_invariants;
use dealer_kpi::types::{HeaderStrategy, MatchTier};
use dealer_kpi::{extract, Extractor, KpiError};
use pretty_assertions::assert_eq;

// ═══════════════════════════════════════════════════════════════════════════
// STANDARD LAYOUT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_standard_statement_layout_detection() {
    let result = extract(&standard_statement(), "octubre_2025.xlsx").unwrap();
    let metadata = &result.metadata;

    assert_eq!(
        metadata.available_sheets,
        vec!["Portada".to_string(), "Edo de Resultados".to_string()]
    );
    assert_eq!(metadata.sheet_detected, "Edo de Resultados");
    assert_eq!(metadata.header_row_index, 4);
    assert_eq!(metadata.header_strategy, HeaderStrategy::Scored);
    assert_eq!(metadata.current_column, 5);
    assert_eq!(metadata.prior_column, 3);
    assert_eq!(metadata.fiscal_year, Some(2025));
    assert!(metadata.validation.columns_different);
    assert!(metadata.validation.header_detected);
    assert!(metadata.correction.is_none());
    assert_eq!(metadata.column_analysis.len(), 6);
}

#[test]
fn test_standard_statement_values() {
    let result = extract(&standard_statement(), "octubre_2025.xlsx").unwrap();

    assert_eq!(result.kpi("ventas_autos_nuevos"), 9_500_000.0);
    assert_eq!(result.prior("ventas_autos_nuevos"), 8_000_000.0);
    assert_eq!(result.kpi("utilidad_neta"), 425_000.0);
    assert_eq!(result.prior("utilidad_neta"), 330_000.0);

    // No direct total line: general + personnel + rent
    assert_eq!(result.kpi("gastos_operacion_totales"), 1_475_000.0);
    assert_eq!(result.prior("gastos_operacion_totales"), 1_340_000.0);

    assert!(result.metadata.validation.has_ingresos);
    assert!(result.metadata.validation.has_comparativa);
}

#[test]
fn test_section_header_rows_not_indexed() {
    let result = extract(&standard_statement(), "octubre_2025.xlsx").unwrap();
    // 11 statement lines; "RESULTADOS" is skipped
    assert_eq!(result.metadata.concepts_found, 11);
    assert!(result
        .metadata
        .concept_matches
        .iter()
        .all(|m| m.label.as_deref() != Some("resultados")));
}

// ═══════════════════════════════════════════════════════════════════════════
// RESULT PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_extraction_is_deterministic() {
    let bytes = standard_statement();
    let first = extract(&bytes, "a.xlsx").unwrap();
    let second = extract(&bytes, "a.xlsx").unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_result_satisfies_invariants() {
    let config = ExtractorConfig::default();
    for bytes in [standard_statement(), duplicated_prior_statement()] {
        let result = extract(&bytes, "r.xlsx").unwrap();
        assert_eq!(check_invariants(&result, &config), Vec::<String>::new());
    }
}

#[test]
fn test_net_margin_follows_revenue_total() {
    let result = extract(&standard_statement(), "r.xlsx").unwrap();
    let ingresos = result.kpi("ingresos_totales");
    assert!(ingresos > 0.0);
    assert_eq!(
        result.metrics.margen_neto,
        percentage(result.kpi("utilidad_neta"), ingresos)
    );
}

#[test]
fn test_gross_profit_reconciled_within_tolerance() {
    let result = extract(&standard_statement(), "r.xlsx").unwrap();
    let gross = result.kpi("utilidad_bruta");
    let computed = result.kpi("ingresos_totales") - result.kpi("costos_totales");
    assert!((gross - computed).abs() <= 1000.0_f64.max(0.02 * gross.abs()));
}

// ═══════════════════════════════════════════════════════════════════════════
// CONCEPT MATCHING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_token_overlap_resolves_inflected_label() {
    let bytes = workbook_bytes(&[(
        "Estado de Resultados",
        vec![
            vec![Fx::T("Concepto"), Fx::T("Año anterior 2024"), Fx::T("Actual 2025")],
            line("Venta autos nuevos", &[800_000.0, 1_000_000.0]),
            line("Utilidad neta", &[70_000.0, 90_000.0]),
        ],
    )]);
    let result = extract(&bytes, "venta.xlsx").unwrap();

    assert_eq!(result.kpi("ventas_autos_nuevos"), 1_000_000.0);
    let provenance = result
        .metadata
        .concept_matches
        .iter()
        .find(|m| m.key == "ventas_autos_nuevos")
        .unwrap();
    assert_eq!(provenance.tier, Some(MatchTier::TokenOverlap));
    assert_eq!(provenance.label.as_deref(), Some("venta autos nuevos"));
}

#[test]
fn test_locale_formatted_text_cells() {
    let bytes = workbook_bytes(&[(
        "Edo de Resultados",
        vec![
            vec![Fx::T("Concepto"), Fx::T("Año anterior 2024"), Fx::T("Actual 2025")],
            vec![Fx::T("Ventas de autos nuevos"), Fx::T("800.000,00"), Fx::T("1.234.567,89")],
            vec![Fx::T("Rentas"), Fx::N(10_000.0), Fx::T("(12,500.50)")],
            vec![Fx::T("Utilidad neta"), Fx::N(70_000.0), Fx::N(90_000.0)],
        ],
    )]);
    let result = extract(&bytes, "texto.xlsx").unwrap();

    assert_eq!(result.kpi("ventas_autos_nuevos"), 1_234_567.89);
    assert_eq!(result.prior("ventas_autos_nuevos"), 800_000.0);
    assert_eq!(result.kpi("rentas"), -12_500.5);
}

// ═══════════════════════════════════════════════════════════════════════════
// CROSS-VALIDATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicated_prior_column_is_reassigned() {
    let result = extract(&duplicated_prior_statement(), "duplicado.xlsx").unwrap();
    let metadata = &result.metadata;

    assert_eq!(metadata.current_column, 5);
    assert_eq!(metadata.prior_column, 4);
    let correction = metadata.correction.as_ref().unwrap();
    assert_eq!(correction.from_column, 3);
    assert_eq!(correction.to_column, 4);
    assert_eq!(correction.identical_concepts, 3);
    assert!(metadata.validation.prior_column_reassigned);
    assert!(metadata.validation.columns_different);

    // Every prior value now comes from column 4
    assert_eq!(result.kpi("ventas_autos_nuevos"), 9_500_000.0);
    assert_eq!(result.prior("ventas_autos_nuevos"), 8_000_000.0);
    assert_eq!(result.prior("utilidad_neta"), 330_000.0);
    assert_eq!(result.prior("gastos_generales"), 550_000.0);
}

#[test]
fn test_undated_current_month_with_dated_prior_month() {
    let bytes = workbook_bytes(&[(
        "Edo de Resultados",
        vec![
            vec![Fx::T("Concepto"), Fx::T("Octubre 2024"), Fx::T("Octubre")],
            line("Ventas de autos nuevos", &[800_000.0, 1_000_000.0]),
            line("Utilidad neta", &[70_000.0, 90_000.0]),
        ],
    )]);
    let result = extract(&bytes, "octubre.xlsx").unwrap();

    assert_eq!(result.metadata.fiscal_year, Some(2025));
    assert_eq!(result.metadata.current_column, 2);
    assert_eq!(result.metadata.prior_column, 1);
    assert_eq!(result.kpi("ventas_autos_nuevos"), 1_000_000.0);
    assert_eq!(result.prior("ventas_autos_nuevos"), 800_000.0);
}

#[test]
fn test_config_can_pin_fiscal_year() {
    let extractor = Extractor::new(ExtractorConfig::default().with_fiscal_year(2025));
    let result = extractor
        .extract(&standard_statement(), "octubre_2025.xlsx")
        .unwrap();
    assert_eq!(result.metadata.fiscal_year, Some(2025));
    assert_eq!(result.metadata.current_column, 5);
}

// ═══════════════════════════════════════════════════════════════════════════
// REJECTIONS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_zero_bytes_is_empty_workbook() {
    let err = extract(&[], "vacio.xlsx").unwrap_err();
    assert!(matches!(err, KpiError::EmptyWorkbook(_)));
    assert!(err.is_rejection());
}

#[test]
fn test_sheet_without_cells_is_empty_workbook() {
    let err = extract(&blank_workbook(), "hoja1.xlsx").unwrap_err();
    assert!(matches!(err, KpiError::EmptyWorkbook(_)));
}

#[test]
fn test_text_only_sheet_is_no_usable_data() {
    let err = extract(&text_only_statement(), "pendiente.xlsx").unwrap_err();
    assert!(matches!(err, KpiError::NoUsableData(_)));
    assert!(err.is_rejection());
}

#[test]
fn test_unreadable_bytes_rejected() {
    let err = extract(b"PK\x03\x04 truncated", "roto.xlsx").unwrap_err();
    assert!(matches!(err, KpiError::Workbook(_)));
}
