//! HTTP API module
//!
//! Exposes extraction over HTTP for hosts that upload workbooks instead of
//! reading them from disk. Run with `dealer-kpi-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
