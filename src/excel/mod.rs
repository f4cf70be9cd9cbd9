//! Excel I/O
//!
//! - Read: workbook bytes (xlsx / xls / ods) → [`crate::types::Workbook`]
//! - Export: stored extractions → xlsx summary report

mod exporter;
mod reader;

pub use exporter::{ReportExporter, SUMMARY_SHEET};
pub use reader::{read_workbook, WorkbookReader};
