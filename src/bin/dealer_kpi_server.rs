//! dealer-kpi API server binary

use clap::Parser;
use dealer_kpi::api::{run_api_server, ApiConfig};
use dealer_kpi::config::ExtractorConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dealer-kpi-server")]
#[command(version)]
#[command(about = "dealer-kpi API Server - HTTP extraction of dealership KPIs")]
#[command(long_about = r#"
dealer-kpi API Server

Endpoints:
  - POST /api/v1/extract?file_name=<name>  - Extract KPIs (raw workbook bytes as body)
  - POST /api/v1/verify                    - Re-check a JSON bundle
  - GET  /health                           - Health check
  - GET  /version                          - Server version info
  - GET  /                                 - API documentation

Fatal extraction errors (empty workbook, no usable data, unreadable bytes)
answer 422 with an error envelope.

Example usage:
  dealer-kpi-server                           # Start on localhost:8080
  dealer-kpi-server --host 0.0.0.0 --port 3000

  curl -X POST "http://localhost:8080/api/v1/extract?file_name=octubre.xlsx" \
    --data-binary @octubre.xlsx
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "DEALER_KPI_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "DEALER_KPI_PORT")]
    port: u16,

    /// YAML file with extractor tunables
    #[arg(long, env = "DEALER_KPI_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum upload size in megabytes
    #[arg(long, default_value = "25")]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let extractor = match &args.config {
        Some(path) => ExtractorConfig::from_yaml_file(path)?,
        None => ExtractorConfig::default(),
    };

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        extractor,
        max_body_bytes: args.max_upload_mb * 1024 * 1024,
    };

    run_api_server(config).await
}
