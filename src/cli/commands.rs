use crate::batch::{run_batch, BatchInput, BatchOptions, BatchReport, FileOutcome};
use crate::config::ExtractorConfig;
use crate::core::concepts::{
    COSTOS_TOTALES, GASTOS_OPERACION_TOTALES, INGRESOS_TOTALES, UTILIDAD_BRUTA, UTILIDAD_NETA,
    UTILIDAD_OPERACION,
};
use crate::core::header::locate_header;
use crate::core::profile::profile_columns;
use crate::core::roles::resolve_roles;
use crate::core::sheet::{score_sheet_name, select_sheet};
use crate::core::Extractor;
use crate::error::{KpiError, KpiResult};
use crate::excel::{read_workbook, ReportExporter};
use crate::record::{import_records, is_workbook_file, ExportBundle, FileInfo, StoredExtraction};
use crate::types::ExtractionResult;
use chrono::Utc;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SUMMARY_KEYS: &[(&str, &str)] = &[
    (INGRESOS_TOTALES, "Ingresos totales"),
    (COSTOS_TOTALES, "Costos totales"),
    (UTILIDAD_BRUTA, "Utilidad bruta"),
    (GASTOS_OPERACION_TOTALES, "Gastos de operación"),
    (UTILIDAD_OPERACION, "Utilidad de operación"),
    (UTILIDAD_NETA, "Utilidad neta"),
];

/// Install the tracing subscriber; `RUST_LOG` wins over the verbosity flag
pub fn init_logging(verbose: bool) {
    let default = if verbose { "dealer_kpi=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());
    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Defaults, then the YAML file, then explicit flags
pub fn load_config(
    path: Option<&Path>,
    fiscal_year: Option<i32>,
    month: Option<u32>,
) -> KpiResult<ExtractorConfig> {
    let mut config = match path {
        Some(path) => ExtractorConfig::from_yaml_file(path)?,
        None => ExtractorConfig::default(),
    };
    if let Some(year) = fiscal_year {
        config = config.with_fiscal_year(year);
    }
    if let Some(month) = month {
        config = config.with_reference_month(month);
    }
    Ok(config)
}

/// Amount with thousands separators and two decimals
fn format_amount(n: f64) -> String {
    let formatted = format!("{:.2}", n.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if n < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_result(result: &ExtractionResult) {
    let metadata = &result.metadata;
    println!(
        "   Sheet:   {} (score {})",
        metadata.sheet_detected.bright_blue().bold(),
        metadata.sheet_score
    );
    println!(
        "   Header:  row {} ({:?})",
        metadata.header_row_index, metadata.header_strategy
    );
    println!(
        "   Columns: current {} / prior {}",
        metadata.current_column.to_string().bold(),
        metadata.prior_column.to_string().bold()
    );
    if let Some(correction) = &metadata.correction {
        println!(
            "{}",
            format!(
                "   ⚠️  Prior column moved {} → {} ({} identical critical concepts)",
                correction.from_column, correction.to_column, correction.identical_concepts
            )
            .yellow()
        );
    }
    println!();

    println!(
        "   {:<24} {:>18} {:>18}",
        "Concepto".bold(),
        "Actual".bold(),
        "Año anterior".bold()
    );
    for (key, label) in SUMMARY_KEYS {
        println!(
            "   {:<24} {:>18} {:>18}",
            label,
            format_amount(result.kpi(key)),
            format_amount(result.prior(key))
        );
    }
    println!();

    let metrics = &result.metrics;
    println!("{}", "📊 Métricas:".bold().cyan());
    println!("   Margen bruto:          {:>8.2}%", metrics.margen_bruto);
    println!("   Margen operativo:      {:>8.2}%", metrics.margen_operativo);
    println!("   Margen neto:           {:>8.2}%", metrics.margen_neto);
    println!("   Crecimiento ingresos:  {:>8.2}%", metrics.crecimiento_ingresos);
    println!("   Crecimiento utilidad:  {:>8.2}%", metrics.crecimiento_utilidad_neta);
    println!();

    let consistency = metadata.data_quality.data_consistency;
    let line = format!("   Consistencia: {consistency}/100");
    let line = match consistency {
        100 => line.green(),
        75 => line.yellow(),
        _ => line.red(),
    };
    println!("{line}");
}

/// Execute the extract command
pub fn extract(
    file: PathBuf,
    config: ExtractorConfig,
    json: bool,
    output: Option<PathBuf>,
) -> KpiResult<()> {
    let bytes = fs::read(&file)?;
    let name = file_label(&file);
    let result = Extractor::new(config).extract(&bytes, &name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", "🚗 dealer-kpi - Extraction".bold().green());
        println!("   File: {}\n", file.display());
        print_result(&result);
    }

    if let Some(output) = output {
        let now = Utc::now();
        let record = StoredExtraction::new(result, FileInfo::from_bytes(name, &bytes, now), now);
        fs::write(&output, serde_json::to_string_pretty(&record)?)?;
        if !json {
            println!("\n{}", "✅ Record saved".bold().green());
            println!("   JSON file: {}", output.display());
        }
    }

    Ok(())
}

/// Execute the batch command
pub fn batch(
    files: Vec<PathBuf>,
    config: ExtractorConfig,
    workers: usize,
    timeout_secs: u64,
    output: Option<PathBuf>,
) -> KpiResult<()> {
    println!("{}", "🚗 dealer-kpi - Batch extraction".bold().green());
    println!("   Files: {}  Workers: {}\n", files.len(), workers);

    let mut inputs = Vec::with_capacity(files.len());
    for file in &files {
        let name = file_label(file);
        // Unsupported files are reported by the batch without being read
        let bytes = if is_workbook_file(&name) {
            match fs::read(file) {
                Ok(bytes) => bytes,
                Err(e) => {
                    println!("   ❌ {}: {}", name.bright_blue(), e.to_string().red());
                    continue;
                }
            }
        } else {
            Vec::new()
        };
        inputs.push(BatchInput::new(name, bytes));
    }

    let options = BatchOptions {
        workers,
        timeout: Duration::from_secs(timeout_secs),
        config,
        ..BatchOptions::default()
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_batch(inputs, options));

    print_batch_report(&report);

    if let Some(output) = output {
        let bundle = ExportBundle::new(report.into_records(Utc::now()), Utc::now());
        bundle.save(&output)?;
        println!("\n{}", "✅ Bundle saved".bold().green());
        println!("   {} records → {}", bundle.data.len(), output.display());
    }

    Ok(())
}

fn print_batch_report(report: &BatchReport) {
    for entry in &report.entries {
        let name = entry.file_name.bright_blue();
        match &entry.outcome {
            FileOutcome::Extracted(result) => println!(
                "   ✅ {name}: ingresos {} | utilidad neta {} | consistencia {}",
                format_amount(result.kpi(INGRESOS_TOTALES)),
                format_amount(result.kpi(UTILIDAD_NETA)),
                result.metadata.data_quality.data_consistency
            ),
            FileOutcome::Skipped => {
                println!("   {} {name}: not an Excel workbook, skipped", "⏭️".yellow())
            }
            FileOutcome::Duplicate => {
                println!("   {} {name}: duplicate content, skipped", "⏭️".yellow())
            }
            FileOutcome::Failed { reason, .. } => {
                println!("   ❌ {name}: {}", reason.red())
            }
            FileOutcome::TimedOut => println!("   ⏱️  {name}: {}", "timed out".red()),
        }
    }
    println!();
    let summary = format!(
        "{} extracted, {} failed, {} total",
        report.extracted_count(),
        report.failed_count(),
        report.entries.len()
    );
    if report.failed_count() == 0 {
        println!("{}", summary.bold().green());
    } else {
        println!("{}", summary.bold().yellow());
    }
}

/// Execute the inspect command: show how the engine reads a workbook
pub fn inspect(file: PathBuf, config: ExtractorConfig) -> KpiResult<()> {
    println!("{}", "🔍 dealer-kpi - Workbook inspection".bold().green());
    println!("   File: {}\n", file.display());

    let workbook = read_workbook(&fs::read(&file)?)?;
    let names = workbook.sheet_names();

    println!("{}", "📋 Sheets:".bold().cyan());
    for name in &names {
        println!("   {:<32} {:>6}", name, score_sheet_name(name));
    }
    let selection = select_sheet(&names)
        .ok_or_else(|| KpiError::EmptyWorkbook(format!("{} has no worksheets", file.display())))?;
    let sheet = &workbook.sheets[selection.index];
    println!("   → {}\n", selection.name.bright_blue().bold());

    let header = locate_header(sheet, &config);
    println!(
        "{} row {} ({:?}, confidence {})\n",
        "📍 Header:".bold().cyan(),
        header.row,
        header.strategy,
        header.confidence
    );

    let profiles = profile_columns(sheet, header.row, &config);
    let roles = resolve_roles(&profiles, &config)?;

    println!("{}", "📊 Columns:".bold().cyan());
    println!(
        "   {:>3}  {:<28} {:>6} {:>8} {:>9} {:>9}",
        "#", "Header", "Data", "Density", "Current", "Prior"
    );
    for (profile, score) in profiles.iter().zip(&roles.scores) {
        let marker = if profile.index == roles.assignment.current_column {
            "◀ current".green().to_string()
        } else if profile.index == roles.assignment.prior_column {
            "◀ prior".cyan().to_string()
        } else {
            String::new()
        };
        let header: String = profile.header.chars().take(28).collect();
        println!(
            "   {:>3}  {:<28} {:>6} {:>8.2} {:>9.1} {:>9.1} {}",
            profile.index,
            header,
            profile.numeric_count,
            profile.density,
            score.current,
            score.prior,
            marker
        );
    }

    let context = roles.context;
    println!();
    println!(
        "   Fiscal year: {}  Reference month: {}",
        context
            .fiscal_year
            .map_or_else(|| "-".to_string(), |y| y.to_string()),
        context
            .reference_month
            .map_or_else(|| "-".to_string(), |m| m.to_string())
    );
    if !roles.assignment.columns_different {
        println!(
            "{}",
            "   ⚠️  No distinct prior column; comparisons will be empty".yellow()
        );
    }

    Ok(())
}

fn load_bundle(bundle: &Path, config: &ExtractorConfig) -> KpiResult<Vec<StoredExtraction>> {
    let json = fs::read_to_string(bundle)?;
    import_records(&json, config, Utc::now())
}

/// Execute the report command: bundle JSON → xlsx summary
pub fn report(bundle: PathBuf, output: PathBuf, config: ExtractorConfig) -> KpiResult<()> {
    println!("{}", "🚗 dealer-kpi - Excel report".bold().green());
    println!("   Input:  {}", bundle.display());
    println!("   Output: {}\n", output.display());

    let records = load_bundle(&bundle, &config)?;
    ReportExporter::new(&records).save(&output)?;

    println!("{}", "✅ Report Complete!".bold().green());
    println!("   {} records → {}", records.len(), output.display());
    Ok(())
}

/// Execute the verify command: import a bundle and re-check every record
pub fn verify(bundle: PathBuf, config: ExtractorConfig) -> KpiResult<()> {
    println!("{}", "✅ Verifying bundle".bold().green());
    println!("   File: {}\n", bundle.display());

    match load_bundle(&bundle, &config) {
        Ok(records) => {
            for record in &records {
                println!(
                    "   ✅ {} ({})",
                    record.display_name.bright_blue(),
                    record.result.metadata.sheet_detected
                );
            }
            println!(
                "\n{}",
                format!("✅ All {} records are consistent!", records.len())
                    .bold()
                    .green()
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", format!("❌ Verification failed: {e}").bold().red());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1_234_567.891), "1,234,567.89");
        assert_eq!(format_amount(-45_000.0), "-45,000.00");
    }

    #[test]
    fn test_load_config_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "fiscal_year: 2023\nheader_scan_rows: 30\n").unwrap();

        let config = load_config(Some(&path), Some(2025), Some(10)).unwrap();
        assert_eq!(config.fiscal_year, Some(2025));
        assert_eq!(config.reference_month, Some(10));
        assert_eq!(config.header_scan_rows, 30);
    }

    #[test]
    fn test_load_config_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "header_rows: 30\n").unwrap();
        assert!(matches!(
            load_config(Some(&path), None, None),
            Err(KpiError::Yaml(_))
        ));
    }

    #[test]
    fn test_file_label_uses_file_name() {
        assert_eq!(file_label(Path::new("/tmp/reportes/octubre.xlsx")), "octubre.xlsx");
    }
}
