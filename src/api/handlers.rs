//! API request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::server::AppState;
use crate::error::KpiError;
use crate::record::{import_records, is_workbook_file, FileInfo, StoredExtraction};

/// Name used when the client does not send one
pub const DEFAULT_UPLOAD_NAME: &str = "upload.xlsx";

/// Standard API response wrapper
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Status code for an engine or persistence error
fn error_status(error: &KpiError) -> StatusCode {
    match error {
        e if e.is_rejection() => StatusCode::UNPROCESSABLE_ENTITY,
        KpiError::Import(_) | KpiError::Json(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(method: &str, path: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "dealer-kpi API Server".to_string(),
        version: state.version.clone(),
        description: "KPI extraction for dealership monthly-report workbooks".to_string(),
        endpoints: vec![
            endpoint("GET", "/health", "Health check endpoint"),
            endpoint("GET", "/version", "Get server version"),
            endpoint(
                "POST",
                "/api/v1/extract?file_name=<name>",
                "Extract KPIs from raw workbook bytes in the request body",
            ),
            endpoint(
                "POST",
                "/api/v1/verify",
                "Import a JSON bundle and re-check every record",
            ),
        ],
    }))
}

/// Health check response
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    }))
}

/// Version response
#[derive(Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub engine_version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        engine_version: crate::core::ENGINE_VERSION.to_string(),
        features: vec!["extract".to_string(), "verify".to_string()],
    }))
}

/// Query string of the extract endpoint
#[derive(Deserialize)]
pub struct ExtractQuery {
    pub file_name: Option<String>,
}

/// POST /api/v1/extract - Extract one uploaded workbook
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExtractQuery>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse<StoredExtraction>>) {
    let file_name = query
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());

    if !is_workbook_file(&file_name) {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(ApiResponse::err(format!(
                "{file_name}: only .xlsx and .xls workbooks are accepted"
            ))),
        );
    }

    let extractor = Arc::clone(&state.extractor);
    let name = file_name.clone();
    let bytes = body.clone();
    let outcome = tokio::task::spawn_blocking(move || extractor.extract(&bytes, &name)).await;

    match outcome {
        Ok(Ok(result)) => {
            let now = Utc::now();
            let file_info = FileInfo::from_bytes(file_name, &body, now);
            (
                StatusCode::OK,
                Json(ApiResponse::ok(StoredExtraction::new(result, file_info, now))),
            )
        }
        Ok(Err(e)) => {
            warn!(file = %file_name, error = %e, "extraction rejected");
            (error_status(&e), Json(ApiResponse::err(e.to_string())))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::err(format!("extraction task failed: {e}"))),
        ),
    }
}

/// Verify response
#[derive(Serialize, Deserialize)]
pub struct VerifyResponse {
    pub records: usize,
    pub display_names: Vec<String>,
}

/// POST /api/v1/verify - Import a bundle and re-check its invariants
pub async fn verify(
    State(state): State<Arc<AppState>>,
    body: String,
) -> (StatusCode, Json<ApiResponse<VerifyResponse>>) {
    match import_records(&body, state.extractor.config(), Utc::now()) {
        Ok(records) => (
            StatusCode::OK,
            Json(ApiResponse::ok(VerifyResponse {
                records: records.len(),
                display_names: records.into_iter().map(|r| r.display_name).collect(),
            })),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::err(e.to_string()))),
    }
}
