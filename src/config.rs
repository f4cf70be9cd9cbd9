//! Heuristic tunables for the extraction engine
//!
//! Every threshold and weight cap the pipeline uses lives here so it can be
//! recalibrated against a labelled corpus without touching the algorithms.
//! Overrides are loaded from YAML; absent keys keep their defaults.

use crate::error::KpiResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Current fiscal year token; inferred from the header row when unset
    pub fiscal_year: Option<i32>,
    /// Current calendar month (1-12); inferred from the header row when unset
    pub reference_month: Option<u32>,

    // Header locator
    pub header_scan_rows: usize,
    pub header_fallback_scan_rows: usize,
    pub default_header_row: usize,
    pub header_text_columns: usize,

    // Column profiler
    pub profile_sample_rows: usize,
    pub profile_sample_values: usize,

    // Column role resolver
    pub current_score_threshold: f64,
    pub prior_score_threshold: f64,
    pub collision_score_threshold: f64,
    pub emergency_min_data_points: usize,
    pub alternative_min_data_points: usize,

    // Concept resolver
    pub token_overlap_ratio: f64,
    pub keyword_overlap_ratio: f64,

    // Aggregation and validation
    pub reconcile_ratio: f64,
    pub gross_profit_floor: f64,
    pub operating_profit_floor: f64,
    pub consistency_ratio: f64,
    pub identical_floor: f64,
    pub identical_ratio: f64,
    pub revenue_accuracy_tolerance: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fiscal_year: None,
            reference_month: None,
            header_scan_rows: 20,
            header_fallback_scan_rows: 15,
            default_header_row: 4,
            header_text_columns: 10,
            profile_sample_rows: 50,
            profile_sample_values: 10,
            current_score_threshold: 25.0,
            prior_score_threshold: 25.0,
            collision_score_threshold: 15.0,
            emergency_min_data_points: 3,
            alternative_min_data_points: 2,
            token_overlap_ratio: 0.80,
            keyword_overlap_ratio: 0.60,
            reconcile_ratio: 0.02,
            gross_profit_floor: 1000.0,
            operating_profit_floor: 500.0,
            consistency_ratio: 0.01,
            identical_floor: 500.0,
            identical_ratio: 0.005,
            revenue_accuracy_tolerance: 100.0,
        }
    }
}

impl ExtractorConfig {
    /// Parse overrides from YAML text
    pub fn from_yaml_str(yaml: &str) -> KpiResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load overrides from a YAML file
    pub fn from_yaml_file(path: &Path) -> KpiResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn with_fiscal_year(mut self, year: i32) -> Self {
        self.fiscal_year = Some(year);
        self
    }

    pub fn with_reference_month(mut self, month: u32) -> Self {
        self.reference_month = Some(month);
        self
    }
}
