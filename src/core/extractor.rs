//! Extraction pipeline
//!
//! Sequential phases, each feeding the next:
//!
//! 1. sheet selection
//! 2. header location
//! 3. column profiling
//! 4. column role resolution
//! 5. concept indexing and resolution for both periods
//! 6. cross-validation (may re-resolve the prior period against another column)
//! 7. aggregation, derived metrics and quality assessment
//!
//! Every call builds its state from scratch; nothing is shared between calls.

use crate::config::ExtractorConfig;
use crate::core::aggregate::{aggregate_period, derive_metrics, PeriodValues};
use crate::core::header::{locate_header, HeaderLocation};
use crate::core::index::ConceptIndex;
use crate::core::profile::profile_columns;
use crate::core::resolver::{ConceptResolver, Period};
use crate::core::roles::{resolve_roles, RoleResolution};
use crate::core::sheet::{select_sheet, SheetSelection};
use crate::core::validate::{
    assess_quality, find_prior_reassignment, identical_critical_concepts, QualityInputs,
};
use crate::error::{KpiError, KpiResult};
use crate::excel::read_workbook;
use crate::types::{
    prior_key, ColumnProfile, ColumnRoleAssignment, ColumnSummary, ConceptProvenance,
    ExtractionMetadata, ExtractionResult, PriorColumnCorrection, Workbook,
};
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stateless extraction engine; one instance can serve any number of calls
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

/// Prior-period values after cross-validation
struct PriorPass {
    assignment: ColumnRoleAssignment,
    values: PeriodValues,
    correction: Option<PriorColumnCorrection>,
}

fn to_values(matches: &[ConceptProvenance]) -> PeriodValues {
    matches.iter().map(|m| (m.key.clone(), m.value)).collect()
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Decode workbook bytes and extract
    pub fn extract(&self, bytes: &[u8], file_name: &str) -> KpiResult<ExtractionResult> {
        let workbook = read_workbook(bytes)?;
        self.extract_workbook(&workbook, file_name)
    }

    /// Extract from an already decoded workbook
    pub fn extract_workbook(
        &self,
        workbook: &Workbook,
        file_name: &str,
    ) -> KpiResult<ExtractionResult> {
        let _span = info_span!("extract", file = file_name).entered();
        let config = &self.config;

        let names = workbook.sheet_names();
        let selection = select_sheet(&names)
            .ok_or_else(|| KpiError::EmptyWorkbook(format!("{file_name} has no worksheets")))?;
        let sheet = &workbook.sheets[selection.index];
        if sheet.is_empty() {
            return Err(KpiError::EmptyWorkbook(format!(
                "worksheet '{}' of {file_name} has no rows",
                sheet.name
            )));
        }

        let header = locate_header(sheet, config);
        let profiles = profile_columns(sheet, header.row, config);
        let roles = resolve_roles(&profiles, config)?;

        let index = ConceptIndex::build(sheet, header.row);
        let resolver = ConceptResolver::new(sheet, &index, config);

        let current_matches = resolver.resolve_all(roles.assignment.current_column, Period::Current);
        let current_raw = to_values(&current_matches);
        let prior_raw = to_values(&resolver.resolve_all(roles.assignment.prior_column, Period::Prior));

        let prior = self.cross_validate(&resolver, &current_raw, prior_raw, &roles, &profiles);

        let current = aggregate_period(&current_raw, config, "current");
        let prior_values = aggregate_period(&prior.values, config, "prior");
        let metrics = derive_metrics(&current, &prior_values);

        let mut kpis: BTreeMap<String, f64> = current.clone();
        kpis.extend(prior_values.iter().map(|(k, v)| (prior_key(k), *v)));

        let (data_quality, validation) = assess_quality(
            &QualityInputs {
                kpis: &kpis,
                current: &current,
                prior: &prior_values,
                ratio_eficiencia_operativa: metrics.ratio_eficiencia_operativa,
                assignment: &prior.assignment,
                header_strategy: header.strategy,
                prior_column_reassigned: prior.correction.is_some(),
            },
            config,
        );

        let metadata = build_metadata(MetadataParts {
            file_name,
            names,
            selection,
            header,
            rows_processed: sheet.row_count(),
            concepts_found: index.len(),
            profiles: &profiles,
            roles: &roles,
            assignment: &prior.assignment,
            concept_matches: current_matches,
            correction: prior.correction,
            data_quality,
            validation,
        });

        info!(
            sheet = %metadata.sheet_detected,
            current = metadata.current_column,
            prior = metadata.prior_column,
            consistency = metadata.data_quality.data_consistency,
            "extraction complete"
        );

        Ok(ExtractionResult {
            kpis,
            metrics,
            metadata,
        })
    }

    /// Re-resolve the prior period when it duplicates the current one.
    ///
    /// Produces a new assignment and value set; the first pass is left intact.
    fn cross_validate(
        &self,
        resolver: &ConceptResolver<'_>,
        current: &PeriodValues,
        prior: PeriodValues,
        roles: &RoleResolution,
        profiles: &[ColumnProfile],
    ) -> PriorPass {
        let assignment = &roles.assignment;
        let Some(column) =
            find_prior_reassignment(current, &prior, assignment, profiles, &self.config)
        else {
            return PriorPass {
                assignment: assignment.clone(),
                values: prior,
                correction: None,
            };
        };

        let identical_concepts = identical_critical_concepts(current, &prior, &self.config);
        let values = to_values(&resolver.resolve_all(column, Period::Prior));
        warn!(
            from = assignment.prior_column,
            to = column,
            "prior period re-extracted from alternative column"
        );

        PriorPass {
            assignment: assignment.with_prior(column, roles.scores[column].prior),
            values,
            correction: Some(PriorColumnCorrection {
                from_column: assignment.prior_column,
                to_column: column,
                identical_concepts,
            }),
        }
    }
}

struct MetadataParts<'a> {
    file_name: &'a str,
    names: Vec<String>,
    selection: SheetSelection,
    header: HeaderLocation,
    rows_processed: usize,
    concepts_found: usize,
    profiles: &'a [ColumnProfile],
    roles: &'a RoleResolution,
    assignment: &'a ColumnRoleAssignment,
    concept_matches: Vec<ConceptProvenance>,
    correction: Option<PriorColumnCorrection>,
    data_quality: crate::types::QualityRecord,
    validation: crate::types::ValidationFlags,
}

fn build_metadata(parts: MetadataParts<'_>) -> ExtractionMetadata {
    let column_analysis = parts
        .profiles
        .iter()
        .zip(&parts.roles.scores)
        .map(|(profile, score)| ColumnSummary {
            index: profile.index,
            header: profile.header.clone(),
            data_points: profile.numeric_count,
            density: profile.density,
            current_score: score.current,
            prior_score: score.prior,
            prior_marked: score.prior_marked,
        })
        .collect();

    ExtractionMetadata {
        engine_version: ENGINE_VERSION.to_string(),
        file_name: parts.file_name.to_string(),
        available_sheets: parts.names,
        sheet_detected: parts.selection.name,
        sheet_score: parts.selection.score,
        header_row_index: parts.header.row,
        header_confidence: parts.header.confidence,
        header_strategy: parts.header.strategy,
        current_column: parts.assignment.current_column,
        prior_column: parts.assignment.prior_column,
        current_score: parts.assignment.current_score,
        prior_score: parts.assignment.prior_score,
        fiscal_year: parts.roles.context.fiscal_year,
        reference_month: parts.roles.context.reference_month,
        rows_processed: parts.rows_processed,
        concepts_found: parts.concepts_found,
        column_analysis,
        concept_matches: parts.concept_matches,
        correction: parts.correction,
        data_quality: parts.data_quality,
        validation: parts.validation,
    }
}

/// Extract with the default configuration
pub fn extract(bytes: &[u8], file_name: &str) -> KpiResult<ExtractionResult> {
    Extractor::default().extract(bytes, file_name)
}
