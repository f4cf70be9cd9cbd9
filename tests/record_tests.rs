//! Stored records, bundle export/import and the xlsx report

mod common;

use chrono::{TimeZone, Utc};
use common::{duplicated_prior_statement, standard_statement};
use dealer_kpi::config::ExtractorConfig;
use dealer_kpi::core::check_invariants;
use dealer_kpi::excel::{read_workbook, ReportExporter, SUMMARY_SHEET};
use dealer_kpi::record::{import_records, ExportBundle, FileInfo, StoredExtraction};
use dealer_kpi::{extract, KpiError};
use tempfile::TempDir;

fn stored(bytes: &[u8], name: &str) -> StoredExtraction {
    let now = Utc.with_ymd_and_hms(2025, 11, 3, 9, 30, 0).unwrap();
    let result = extract(bytes, name).unwrap();
    StoredExtraction::new(result, FileInfo::from_bytes(name, bytes, now), now)
}

fn sample_bundle() -> ExportBundle {
    let records = vec![
        stored(&standard_statement(), "octubre_2025.xlsx"),
        stored(&duplicated_prior_statement(), "noviembre_2025.XLS"),
    ];
    ExportBundle::new(records, Utc.with_ymd_and_hms(2025, 11, 3, 10, 0, 0).unwrap())
}

#[test]
fn test_stored_record_display_name_and_hash() {
    let bytes = standard_statement();
    let record = stored(&bytes, "octubre_2025.xlsx");
    assert_eq!(record.display_name, "octubre_2025");
    assert_eq!(record.file_info.size, bytes.len() as u64);
    assert_eq!(record.file_info.hash.len(), 64);
}

#[test]
fn test_bundle_round_trip_keeps_invariants() {
    let bundle = sample_bundle();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(bundle.default_file_name());
    bundle.save(&path).unwrap();
    assert!(path.ends_with("reporte_automotriz_2025-11-03.json"));

    let json = std::fs::read_to_string(&path).unwrap();
    let config = ExtractorConfig::default();
    let imported = import_records(&json, &config, Utc::now()).unwrap();

    assert_eq!(imported.len(), 2);
    for (original, restored) in bundle.data.iter().zip(&imported) {
        assert!(check_invariants(&restored.result, &config).is_empty());
        assert_eq!(restored.display_name, original.display_name);
        assert_eq!(restored.file_info.hash, original.file_info.hash);
        assert_ne!(restored.id, original.id);
        let (before, after) = (&original.result.metadata, &restored.result.metadata);
        assert_eq!(after.sheet_detected, before.sheet_detected);
        assert_eq!(after.current_column, before.current_column);
        assert_eq!(after.prior_column, before.prior_column);
        assert_eq!(after.correction, before.correction);
        assert_eq!(restored.result.kpis.len(), original.result.kpis.len());
        for (key, value) in &original.result.kpis {
            let back = restored.result.kpis[key];
            assert!((back - value).abs() <= 1e-9 * value.abs().max(1.0), "{key}");
        }
    }
}

#[test]
fn test_single_record_import() {
    let record = stored(&standard_statement(), "octubre_2025.xlsx");
    let json = serde_json::to_string(&record).unwrap();
    let imported = import_records(&json, &ExtractorConfig::default(), Utc::now()).unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].file_info.name, "octubre_2025.xlsx");
}

#[test]
fn test_record_without_file_info_gets_synthesized_one() {
    let result = extract(&standard_statement(), "octubre_2025.xlsx").unwrap();
    let json = serde_json::to_string(&result).unwrap();
    let imported = import_records(&json, &ExtractorConfig::default(), Utc::now()).unwrap();
    assert!(imported[0].file_info.name.starts_with("imported_"));
    assert!(imported[0].file_info.hash.is_empty());
}

#[test]
fn test_tampered_totals_rejected_on_import() {
    let record = stored(&standard_statement(), "octubre_2025.xlsx");
    let mut value = serde_json::to_value(&record).unwrap();
    let ingresos = value["kpis"]["ingresos_totales"].as_f64().unwrap();
    value["kpis"]["ingresos_totales"] = serde_json::json!(ingresos + 250_000.0);

    let err = import_records(&value.to_string(), &ExtractorConfig::default(), Utc::now())
        .unwrap_err();
    assert!(matches!(err, KpiError::Import(_)));
    assert!(err.to_string().contains("ingresos_totales"));
}

#[test]
fn test_one_bad_record_rejects_the_bundle() {
    let bundle = sample_bundle();
    let mut value = serde_json::to_value(&bundle).unwrap();
    value["data"][1]
        .as_object_mut()
        .unwrap()
        .remove("metadata");

    let err = import_records(&value.to_string(), &ExtractorConfig::default(), Utc::now())
        .unwrap_err();
    assert!(err.to_string().contains("record 1"));
}

#[test]
fn test_xlsx_report_has_summary_and_record_sheets() {
    let bundle = sample_bundle();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resumen.xlsx");
    ReportExporter::new(&bundle.data).save(&path).unwrap();

    let workbook = read_workbook(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(
        workbook.sheet_names(),
        vec![
            SUMMARY_SHEET.to_string(),
            "octubre_2025".to_string(),
            "noviembre_2025".to_string()
        ]
    );

    let summary = &workbook.sheets[0];
    assert_eq!(summary.row_count(), 3);
    assert_eq!(summary.cell(1, 0).text(), "octubre_2025");
    assert_eq!(summary.cell(1, 1).text(), "Edo de Resultados");
}
