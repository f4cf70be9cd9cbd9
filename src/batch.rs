//! Concurrent batch extraction
//!
//! Files are filtered by extension, hashed and de-duplicated up front, then
//! extracted on the blocking pool with at most `workers` jobs in flight. Each
//! job runs under its own timeout; a rejection, panic or timeout is reported
//! for that file only. Entries come back in input order.

use crate::config::ExtractorConfig;
use crate::core::Extractor;
use crate::error::{KpiError, KpiResult};
use crate::record::{content_hash, is_workbook_file, FileInfo, StoredExtraction};
use crate::types::ExtractionResult;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One workbook handed to the batch
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Upper bound on concurrent extractions
    pub workers: usize,
    /// Per-file limit
    pub timeout: Duration,
    pub config: ExtractorConfig,
    /// Hashes of files the host already holds; matching inputs are skipped
    pub known_hashes: HashSet<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            config: ExtractorConfig::default(),
            known_hashes: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Extracted(Box<ExtractionResult>),
    /// Not an `.xlsx` / `.xls` file
    Skipped,
    /// Same content as an earlier input or a known hash
    Duplicate,
    Failed {
        reason: String,
        /// Hard per-file rejection (empty workbook, no usable data, unreadable bytes)
        rejection: bool,
    },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub file_name: String,
    pub size: u64,
    /// Content hash; `None` for skipped files
    pub hash: Option<String>,
    pub outcome: FileOutcome,
}

/// Per-file outcomes in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn extracted(&self) -> impl Iterator<Item = (&BatchEntry, &ExtractionResult)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            FileOutcome::Extracted(result) => Some((entry, result.as_ref())),
            _ => None,
        })
    }

    pub fn extracted_count(&self) -> usize {
        self.extracted().count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, FileOutcome::Failed { .. } | FileOutcome::TimedOut))
            .count()
    }

    /// Wrap every successful extraction as a stored record
    pub fn into_records(self, now: DateTime<Utc>) -> Vec<StoredExtraction> {
        self.entries
            .into_iter()
            .filter_map(|entry| match entry.outcome {
                FileOutcome::Extracted(result) => {
                    let file_info = FileInfo {
                        name: entry.file_name,
                        size: entry.size,
                        hash: entry.hash.unwrap_or_default(),
                        upload_date: now,
                    };
                    Some(StoredExtraction::new(*result, file_info, now))
                }
                _ => None,
            })
            .collect()
    }
}

enum Slot {
    Done(BatchEntry),
    Running {
        file_name: String,
        size: u64,
        hash: String,
        handle: JoinHandle<FileOutcome>,
    },
}

/// Extract every input, bounded by `options.workers`
pub async fn run_batch(inputs: Vec<BatchInput>, options: BatchOptions) -> BatchReport {
    let extractor = Arc::new(Extractor::new(options.config));
    let permits = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut seen = options.known_hashes;
    let timeout = options.timeout;

    let mut slots = Vec::with_capacity(inputs.len());
    for input in inputs {
        let size = input.bytes.len() as u64;
        if !is_workbook_file(&input.file_name) {
            warn!(file = %input.file_name, "not an Excel workbook, skipped");
            slots.push(Slot::Done(BatchEntry {
                file_name: input.file_name,
                size,
                hash: None,
                outcome: FileOutcome::Skipped,
            }));
            continue;
        }

        let hash = content_hash(&input.bytes);
        if !seen.insert(hash.clone()) {
            info!(file = %input.file_name, "duplicate content, skipped");
            slots.push(Slot::Done(BatchEntry {
                file_name: input.file_name,
                size,
                hash: Some(hash),
                outcome: FileOutcome::Duplicate,
            }));
            continue;
        }

        let handle = tokio::spawn(extract_one(
            Arc::clone(&extractor),
            Arc::clone(&permits),
            input.file_name.clone(),
            input.bytes,
            timeout,
        ));
        slots.push(Slot::Running {
            file_name: input.file_name,
            size,
            hash,
            handle,
        });
    }

    let mut entries = Vec::with_capacity(slots.len());
    for slot in slots {
        let entry = match slot {
            Slot::Done(entry) => entry,
            Slot::Running {
                file_name,
                size,
                hash,
                handle,
            } => {
                let outcome = handle.await.unwrap_or_else(|e| FileOutcome::Failed {
                    reason: format!("extraction task aborted: {e}"),
                    rejection: false,
                });
                BatchEntry {
                    file_name,
                    size,
                    hash: Some(hash),
                    outcome,
                }
            }
        };
        entries.push(entry);
    }

    let report = BatchReport { entries };
    info!(
        files = report.entries.len(),
        extracted = report.extracted_count(),
        failed = report.failed_count(),
        "batch complete"
    );
    report
}

async fn extract_one(
    extractor: Arc<Extractor>,
    permits: Arc<Semaphore>,
    file_name: String,
    bytes: Vec<u8>,
    timeout: Duration,
) -> FileOutcome {
    let name = file_name.clone();
    run_isolated(permits, file_name, timeout, move || extractor.extract(&bytes, &name)).await
}

/// Run one blocking job under a pool permit and a timeout, turning a panic
/// into a failure for that file alone
async fn run_isolated<F>(
    permits: Arc<Semaphore>,
    file_name: String,
    timeout: Duration,
    job: F,
) -> FileOutcome
where
    F: FnOnce() -> KpiResult<ExtractionResult> + Send + 'static,
{
    let permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return FileOutcome::Failed {
                reason: format!("worker pool closed: {e}"),
                rejection: false,
            }
        }
    };

    let job = tokio::task::spawn_blocking(move || {
        // Held until the blocking work ends, even if the caller stopped waiting
        let _permit = permit;
        job()
    });

    match tokio::time::timeout(timeout, job).await {
        Ok(Ok(Ok(result))) => FileOutcome::Extracted(Box::new(result)),
        Ok(Ok(Err(e))) => failure(&file_name, e),
        Ok(Err(e)) => {
            warn!(file = %file_name, error = %e, "extraction panicked");
            FileOutcome::Failed {
                reason: format!("extraction panicked: {e}"),
                rejection: false,
            }
        }
        Err(_) => {
            warn!(file = %file_name, timeout_secs = timeout.as_secs_f64(), "extraction timed out");
            FileOutcome::TimedOut
        }
    }
}

fn failure(file_name: &str, error: KpiError) -> FileOutcome {
    warn!(file = %file_name, error = %error, "extraction failed");
    FileOutcome::Failed {
        rejection: error.is_rejection(),
        reason: error.to_string(),
    }
}
