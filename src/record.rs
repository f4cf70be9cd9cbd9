//! Stored extractions and the JSON bundle used to move them between hosts
//!
//! A stored extraction wraps an [`ExtractionResult`] with file provenance. A
//! bundle is the exported collection of them. Import accepts either shape and
//! re-checks the result invariants on every record, so a hand-edited or
//! truncated file is rejected instead of loaded.

use crate::config::ExtractorConfig;
use crate::core::validate::check_invariants;
use crate::error::{KpiError, KpiResult};
use crate::types::ExtractionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const BUNDLE_VERSION: &str = "1.0";

/// Extensions hosts accept, compared case-insensitively
pub const WORKBOOK_EXTENSIONS: &[&str] = &[".xlsx", ".xls"];

/// SHA-256 of the input bytes as lowercase hex
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn strip_workbook_extension(file_name: &str) -> Option<&str> {
    WORKBOOK_EXTENSIONS.iter().find_map(|ext| {
        let split = file_name.len().checked_sub(ext.len())?;
        let suffix = file_name.get(split..)?;
        suffix
            .eq_ignore_ascii_case(ext)
            .then(|| &file_name[..split])
    })
}

pub fn is_workbook_file(file_name: &str) -> bool {
    strip_workbook_extension(file_name).is_some()
}

/// File name without its workbook extension
pub fn display_name(file_name: &str) -> String {
    strip_workbook_extension(file_name)
        .unwrap_or(file_name)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    /// Content hash, see [`content_hash`]
    pub hash: String,
    pub upload_date: DateTime<Utc>,
}

impl FileInfo {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8], upload_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            hash: content_hash(bytes),
            upload_date,
        }
    }
}

/// An extraction as kept by a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredExtraction {
    pub id: Uuid,
    pub file_info: FileInfo,
    pub timestamp: DateTime<Utc>,
    pub display_name: String,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

impl StoredExtraction {
    pub fn new(result: ExtractionResult, file_info: FileInfo, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name(&file_info.name),
            file_info,
            timestamp,
            result,
        }
    }
}

/// Exported collection of stored extractions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub data: Vec<StoredExtraction>,
}

impl ExportBundle {
    pub fn new(data: Vec<StoredExtraction>, export_date: DateTime<Utc>) -> Self {
        Self {
            version: BUNDLE_VERSION.to_string(),
            export_date,
            data,
        }
    }

    /// `reporte_automotriz_<YYYY-MM-DD>.json`
    pub fn default_file_name(&self) -> String {
        format!("reporte_automotriz_{}.json", self.export_date.format("%Y-%m-%d"))
    }

    pub fn to_json(&self) -> KpiResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> KpiResult<()> {
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), records = self.data.len(), "bundle exported");
        Ok(())
    }
}

//==============================================================================
// Import
//==============================================================================

/// Parse a bundle or a single stored record.
///
/// Each record needs `kpis` and `metadata`; `fileInfo` is kept when present
/// and synthesized otherwise. Imported records get a fresh id and timestamp.
pub fn import_records(
    json: &str,
    config: &ExtractorConfig,
    now: DateTime<Utc>,
) -> KpiResult<Vec<StoredExtraction>> {
    let value: Value = serde_json::from_str(json)?;

    let items: Vec<&Value> = match value.get("data").and_then(Value::as_array) {
        Some(data) => data.iter().collect(),
        None => vec![&value],
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(position, item)| import_one(item, position, json.len(), config, now))
        .collect::<KpiResult<Vec<_>>>()?;

    info!(records = records.len(), "records imported");
    Ok(records)
}

fn import_one(
    item: &Value,
    position: usize,
    source_len: usize,
    config: &ExtractorConfig,
    now: DateTime<Utc>,
) -> KpiResult<StoredExtraction> {
    if item.get("kpis").is_none() || item.get("metadata").is_none() {
        return Err(KpiError::Import(format!(
            "record {position}: invalid format, kpis and metadata are required"
        )));
    }

    let result: ExtractionResult = serde_json::from_value(item.clone())
        .map_err(|e| KpiError::Import(format!("record {position}: {e}")))?;

    let violations = check_invariants(&result, config);
    if !violations.is_empty() {
        return Err(KpiError::Import(format!(
            "record {position} ({}): {}",
            result.metadata.file_name,
            violations.join("; ")
        )));
    }

    let file_info = match item.get("fileInfo") {
        Some(info) => serde_json::from_value(info.clone())
            .map_err(|e| KpiError::Import(format!("record {position}: fileInfo: {e}")))?,
        None => FileInfo {
            name: format!("imported_{}", now.to_rfc3339()),
            size: source_len as u64,
            hash: String::new(),
            upload_date: now,
        },
    };

    let mut record = StoredExtraction::new(result, file_info, now);
    if let Some(name) = item.get("displayName").and_then(Value::as_str) {
        record.display_name = name.to_string();
    }
    Ok(record)
}
