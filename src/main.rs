use clap::{Args, Parser, Subcommand};
use dealer_kpi::cli;
use dealer_kpi::error::KpiResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dealer-kpi")]
#[command(about = "Extract financial KPIs from dealership monthly-report workbooks")]
#[command(long_about = "dealer-kpi - KPI extraction for dealership income statements

Finds the income-statement sheet, the header row and the current / prior
period columns of workbooks whose layout changes from file to file, then maps
free-form row labels onto a fixed catalogue of financial concepts.

COMMANDS:
  extract  - Extract one workbook
  batch    - Extract many workbooks concurrently into a JSON bundle
  inspect  - Show sheet, header and column-role detection
  report   - Write an Excel summary from a JSON bundle
  verify   - Re-check every record of a JSON bundle

EXAMPLES:
  dealer-kpi extract octubre.xlsx
  dealer-kpi extract octubre.xlsx --json > octubre.json
  dealer-kpi batch reportes/*.xlsx --workers 8 -o bundle.json
  dealer-kpi report bundle.json resumen.xlsx
  dealer-kpi inspect octubre.xlsx --fiscal-year 2025")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// YAML file with extractor tunables
    #[arg(long, global = true, env = "DEALER_KPI_CONFIG")]
    config: Option<PathBuf>,

    /// Current fiscal year (inferred from the header row when omitted)
    #[arg(long, global = true)]
    fiscal_year: Option<i32>,

    /// Current month, 1-12 (inferred from the header row when omitted)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract KPIs from one workbook
    Extract {
        /// Path to the workbook (.xlsx / .xls)
        file: PathBuf,

        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Save the stored record as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(long_about = "Extract many workbooks concurrently.

Files other than .xlsx / .xls are skipped, as are files whose content was
already seen in the same batch. A file that fails or exceeds the timeout is
reported on its own line; the rest of the batch continues.

EXAMPLE:
  dealer-kpi batch enero.xlsx febrero.xlsx marzo.xls -o primer_trimestre.json")]
    /// Extract many workbooks concurrently
    Batch {
        /// Workbooks to extract
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Concurrent extractions
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Per-file timeout in seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,

        /// Save successful extractions as a JSON bundle
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show sheet scores, header row and column-role scores
    Inspect {
        /// Path to the workbook
        file: PathBuf,
    },

    /// Write an Excel summary report from a JSON bundle
    Report {
        /// Bundle produced by `batch -o` (or a single stored record)
        bundle: PathBuf,

        /// Output Excel file path (.xlsx)
        output: PathBuf,
    },

    /// Import a JSON bundle and re-check every record's invariants
    Verify {
        /// Bundle or single stored record
        bundle: PathBuf,
    },
}

fn main() -> KpiResult<()> {
    let cli = Cli::parse();
    let global = cli.global;

    cli::init_logging(global.verbose);
    let config = cli::load_config(global.config.as_deref(), global.fiscal_year, global.month)?;

    match cli.command {
        Commands::Extract { file, json, output } => cli::extract(file, config, json, output),

        Commands::Batch {
            files,
            workers,
            timeout_secs,
            output,
        } => cli::batch(files, config, workers, timeout_secs, output),

        Commands::Inspect { file } => cli::inspect(file, config),

        Commands::Report { bundle, output } => cli::report(bundle, output, config),

        Commands::Verify { bundle } => cli::verify(bundle, config),
    }
}
