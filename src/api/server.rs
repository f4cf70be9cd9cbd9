//! API server implementation
//!
//! Axum router with CORS and request tracing, graceful shutdown on
//! SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::config::ExtractorConfig;
use crate::core::Extractor;

/// Default upload limit (workbooks of a few hundred sheets stay well below it)
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub extractor: ExtractorConfig,
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            extractor: ExtractorConfig::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub extractor: Arc<Extractor>,
}

impl AppState {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            extractor: Arc::new(Extractor::new(config)),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route("/api/v1/extract", post(handlers::extract))
        .route("/api/v1/verify", post(handlers::verify))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dealer_kpi=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new(config.extractor));
    let app = router(state, config.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("dealer-kpi API server starting on http://{}", addr);
    info!("   Endpoints: POST /api/v1/extract?file_name=<name>, POST /api/v1/verify");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dealer-kpi API server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }

    #[test]
    fn test_config_address_format() {
        let config = ApiConfig {
            host: "192.168.1.100".to_string(),
            port: 9090,
            ..ApiConfig::default()
        };
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().unwrap();
        assert_eq!(addr.port(), 9090);
    }

    #[test]
    fn test_app_state_shares_extractor() {
        let state = Arc::new(AppState::new(ExtractorConfig::default().with_fiscal_year(2025)));
        let clone = state.as_ref().clone();
        assert!(Arc::ptr_eq(&state.extractor, &clone.extractor));
        assert_eq!(clone.extractor.config().fiscal_year, Some(2025));
        assert_eq!(state.version, env!("CARGO_PKG_VERSION"));
    }
}
