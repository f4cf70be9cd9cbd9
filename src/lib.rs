//! dealer-kpi - financial KPI extraction from dealership monthly reports
//!
//! Dealership statements arrive as Excel workbooks with no fixed layout: the
//! income-statement sheet, the header row and the current / prior period
//! columns all move between files. This library locates them heuristically,
//! maps free-form row labels onto a fixed catalogue of financial concepts, and
//! returns totals, reconciled profits and derived ratios together with the
//! provenance and quality signals behind them.
//!
//! # Features
//!
//! - Sheet, header and column-role detection for inconsistent layouts
//! - Tiered label matching (exact, token overlap, synonyms, keywords)
//! - Profit reconciliation and cross-validation of the prior-period column
//! - Concurrent batch extraction with content-hash de-duplication
//! - JSON bundle export/import and xlsx summary reports
//!
//! # Example
//!
//! ```no_run
//! use dealer_kpi::core::extract;
//!
//! let bytes = std::fs::read("octubre_2025.xlsx")?;
//! let result = extract(&bytes, "octubre_2025.xlsx")?;
//!
//! println!("Ingresos: {}", result.kpi("ingresos_totales"));
//! println!("Margen neto: {}%", result.metrics.margen_neto);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod api;
pub mod batch;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod record;
pub mod types;

// Re-export commonly used types
pub use crate::core::{extract, Extractor};
pub use config::ExtractorConfig;
pub use error::{KpiError, KpiResult};
pub use types::{ExtractionResult, Workbook};
