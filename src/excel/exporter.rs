//! Report exporter: stored extractions → xlsx summary workbook

use crate::core::concepts::{COSTOS_TOTALES, CONCEPTS, INGRESOS_TOTALES, UTILIDAD_NETA};
use crate::error::{KpiError, KpiResult};
use crate::record::StoredExtraction;
use crate::types::DerivedMetrics;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::path::Path;

pub const SUMMARY_SHEET: &str = "Resumen";

/// Excel's limit on worksheet name length
const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

const SUMMARY_HEADERS: &[&str] = &[
    "Archivo",
    "Hoja",
    "Ingresos totales",
    "Utilidad neta",
    "Margen neto %",
    "Crecimiento utilidad neta %",
    "Consistencia",
    "Columnas distintas",
];

fn export_error(context: &'static str) -> impl Fn(XlsxError) -> KpiError {
    move |e| KpiError::Export(format!("{context}: {e}"))
}

/// Writes one summary sheet plus one detail sheet per record
pub struct ReportExporter<'a> {
    records: &'a [StoredExtraction],
}

impl<'a> ReportExporter<'a> {
    pub fn new(records: &'a [StoredExtraction]) -> Self {
        Self { records }
    }

    pub fn save(&self, path: &Path) -> KpiResult<()> {
        let mut workbook = self.build()?;
        workbook
            .save(path)
            .map_err(export_error("Failed to save report"))
    }

    pub fn save_to_buffer(&self) -> KpiResult<Vec<u8>> {
        let mut workbook = self.build()?;
        workbook
            .save_to_buffer()
            .map_err(export_error("Failed to serialize report"))
    }

    fn build(&self) -> KpiResult<Workbook> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let money = Format::new().set_num_format("#,##0.00");

        let summary = workbook.add_worksheet();
        summary
            .set_name(SUMMARY_SHEET)
            .map_err(export_error("Failed to set summary sheet name"))?;
        self.write_summary(summary, &bold, &money)?;

        let mut used: HashSet<String> = HashSet::from([SUMMARY_SHEET.to_lowercase()]);
        for record in self.records {
            let name = unique_sheet_name(&record.display_name, &mut used);
            let sheet = workbook.add_worksheet();
            sheet
                .set_name(&name)
                .map_err(export_error("Failed to set record sheet name"))?;
            write_record(sheet, record, &bold, &money)?;
        }

        Ok(workbook)
    }

    fn write_summary(&self, sheet: &mut Worksheet, bold: &Format, money: &Format) -> KpiResult<()> {
        let err = export_error("Failed to write summary");
        for (col, header) in SUMMARY_HEADERS.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *header, bold)
                .map_err(&err)?;
        }

        for (idx, record) in self.records.iter().enumerate() {
            let row = idx as u32 + 1;
            let result = &record.result;
            let metadata = &result.metadata;
            sheet.write_string(row, 0, &record.display_name).map_err(&err)?;
            sheet.write_string(row, 1, &metadata.sheet_detected).map_err(&err)?;
            sheet
                .write_number_with_format(row, 2, result.kpi(INGRESOS_TOTALES), money)
                .map_err(&err)?;
            sheet
                .write_number_with_format(row, 3, result.kpi(UTILIDAD_NETA), money)
                .map_err(&err)?;
            sheet.write_number(row, 4, result.metrics.margen_neto).map_err(&err)?;
            sheet
                .write_number(row, 5, result.metrics.crecimiento_utilidad_neta)
                .map_err(&err)?;
            sheet
                .write_number(row, 6, f64::from(metadata.data_quality.data_consistency))
                .map_err(&err)?;
            sheet
                .write_boolean(row, 7, metadata.validation.columns_different)
                .map_err(&err)?;
        }

        sheet.set_column_width(0, 32).map_err(&err)?;
        sheet.set_column_width(2, 18).map_err(&err)?;
        sheet.set_column_width(3, 18).map_err(&err)?;
        Ok(())
    }
}

fn write_record(
    sheet: &mut Worksheet,
    record: &StoredExtraction,
    bold: &Format,
    money: &Format,
) -> KpiResult<()> {
    let err = export_error("Failed to write record sheet");
    let result = &record.result;

    for (col, header) in ["Concepto", "Actual", "Año anterior"].iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, bold)
            .map_err(&err)?;
    }

    let keys = CONCEPTS
        .iter()
        .map(|c| c.key)
        .chain([INGRESOS_TOTALES, COSTOS_TOTALES]);
    let mut row = 1u32;
    for key in keys {
        sheet.write_string(row, 0, key).map_err(&err)?;
        sheet
            .write_number_with_format(row, 1, result.kpi(key), money)
            .map_err(&err)?;
        sheet
            .write_number_with_format(row, 2, result.prior(key), money)
            .map_err(&err)?;
        row += 1;
    }

    row += 1;
    sheet
        .write_string_with_format(row, 0, "Métrica", bold)
        .map_err(&err)?;
    sheet
        .write_string_with_format(row, 1, "Valor", bold)
        .map_err(&err)?;
    for (name, value) in metric_rows(&result.metrics) {
        row += 1;
        sheet.write_string(row, 0, name).map_err(&err)?;
        sheet.write_number(row, 1, value).map_err(&err)?;
    }

    sheet.set_column_width(0, 40).map_err(&err)?;
    sheet.set_column_width(1, 18).map_err(&err)?;
    sheet.set_column_width(2, 18).map_err(&err)?;
    Ok(())
}

fn metric_rows(metrics: &DerivedMetrics) -> [(&'static str, f64); 16] {
    [
        ("margen_bruto", metrics.margen_bruto),
        ("margen_operativo", metrics.margen_operativo),
        ("margen_neto", metrics.margen_neto),
        ("ratio_eficiencia_operativa", metrics.ratio_eficiencia_operativa),
        ("roi_personal", metrics.roi_personal),
        ("ratio_comisiones", metrics.ratio_comisiones),
        ("crecimiento_utilidad_neta", metrics.crecimiento_utilidad_neta),
        ("crecimiento_ingresos", metrics.crecimiento_ingresos),
        ("porcentaje_nuevos", metrics.porcentaje_nuevos),
        ("porcentaje_usados", metrics.porcentaje_usados),
        ("porcentaje_servicio", metrics.porcentaje_servicio),
        ("porcentaje_refacciones", metrics.porcentaje_refacciones),
        ("porcentaje_financiamiento", metrics.porcentaje_financiamiento),
        ("margen_bruto_prior", metrics.margen_bruto_prior),
        ("margen_operativo_prior", metrics.margen_operativo_prior),
        ("margen_neto_prior", metrics.margen_neto_prior),
    ]
}

/// Valid, case-insensitively unique worksheet name derived from `base`
fn unique_sheet_name(base: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = base
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let cleaned = if cleaned.is_empty() { "Reporte" } else { cleaned };

    let mut candidate: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let room = MAX_SHEET_NAME - suffix.chars().count();
        candidate = cleaned.chars().take(room).collect::<String>() + &suffix;
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}
