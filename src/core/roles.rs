//! Column role resolver
//!
//! Assigns the "current period" and "prior period" roles to worksheet columns.
//! Each column gets two scores built from header-text cues, numeric profile
//! statistics, position and magnitude. Selection then applies a chain of
//! fallbacks, and a collision between the two roles is repaired whenever a
//! distinct alternative column exists.

use crate::config::ExtractorConfig;
use crate::error::{KpiError, KpiResult};
use crate::types::{ColumnProfile, ColumnRoleAssignment};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

//==============================================================================
// Scoring rules
//==============================================================================

/// A textual signal looked for in a lowercased header
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderCue {
    Text(&'static str),
    AnyText(&'static [&'static str]),
    CurrentYear,
    PriorYear,
    /// Two years before the current fiscal year
    OlderYear,
    All(&'static [HeaderCue]),
}

/// Weights a cue contributes to the current and prior scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueRule {
    pub cue: HeaderCue,
    pub current: f64,
    pub prior: f64,
}

pub const PRIOR_LABELS: &[&str] = &["año anterior", "anio anterior"];

pub const CUE_RULES: &[CueRule] = &[
    CueRule { cue: HeaderCue::CurrentYear, current: 100.0, prior: -80.0 },
    CueRule { cue: HeaderCue::PriorYear, current: -50.0, prior: 100.0 },
    CueRule { cue: HeaderCue::OlderYear, current: 0.0, prior: 80.0 },
    CueRule { cue: HeaderCue::Text("actual"), current: 80.0, prior: -60.0 },
    CueRule { cue: HeaderCue::Text("presupuesto"), current: -40.0, prior: 0.0 },
    CueRule { cue: HeaderCue::AnyText(&["variacion", "variación"]), current: -30.0, prior: 0.0 },
    CueRule { cue: HeaderCue::AnyText(PRIOR_LABELS), current: -60.0, prior: 90.0 },
    CueRule { cue: HeaderCue::Text("anterior"), current: 0.0, prior: 70.0 },
    CueRule { cue: HeaderCue::Text("compar"), current: 0.0, prior: 30.0 },
    CueRule {
        cue: HeaderCue::All(&[HeaderCue::PriorYear, HeaderCue::Text("año anterior")]),
        current: 0.0,
        prior: 50.0,
    },
];

pub const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub const MONTH_WEIGHT: f64 = 70.0;
pub const RECENT_MONTH_BONUS: f64 = 20.0;

/// How profile statistics and position feed a role score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatWeights {
    pub count_factor: f64,
    pub count_cap: f64,
    pub density_factor: f64,
    pub density_cap: f64,
    pub position_weight: f64,
}

pub const CURRENT_STATS: StatWeights = StatWeights {
    count_factor: 2.0,
    count_cap: 50.0,
    density_factor: 80.0,
    density_cap: 30.0,
    position_weight: 40.0,
};

pub const PRIOR_STATS: StatWeights = StatWeights {
    count_factor: 2.0,
    count_cap: 40.0,
    density_factor: 70.0,
    density_cap: 25.0,
    position_weight: 35.0,
};

/// (max magnitude threshold, current-score bonus); every exceeded threshold counts
pub const MAGNITUDE_BONUSES: &[(f64, f64)] = &[(1.0e6, 15.0), (1.0e7, 25.0)];

static YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid regex"));

//==============================================================================
// Scoring
//==============================================================================

/// Fiscal year and month the header cues are judged against
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoringContext {
    pub fiscal_year: Option<i32>,
    /// 1-12
    pub reference_month: Option<u32>,
}

impl ScoringContext {
    /// Explicit configuration wins; otherwise infer the year from the headers
    /// and take the latest month named by any header
    pub fn infer(profiles: &[ColumnProfile], config: &ExtractorConfig) -> Self {
        let fiscal_year = config.fiscal_year.or_else(|| infer_fiscal_year(profiles));

        let reference_month = config
            .reference_month
            .filter(|m| (1..=12).contains(m))
            .or_else(|| profiles.iter().filter_map(|p| month_of(&p.header)).max());

        Self {
            fiscal_year,
            reference_month,
        }
    }

    fn year_token(&self, offset: i32) -> Option<String> {
        self.fiscal_year.map(|year| (year - offset).to_string())
    }
}

fn years_in(header: &str) -> impl Iterator<Item = i32> + '_ {
    YEAR_TOKEN
        .captures_iter(header)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
}

/// Current fiscal year implied by the header row.
///
/// The latest year named is current when one of its headers says "actual".
/// It is the prior year instead when its headers carry a prior label, or when
/// an undated column with data carries a current cue ("actual" or a month).
fn infer_fiscal_year(profiles: &[ColumnProfile]) -> Option<i32> {
    let latest = profiles.iter().flat_map(|p| years_in(&p.header)).max()?;
    let dated: Vec<&ColumnProfile> = profiles
        .iter()
        .filter(|p| years_in(&p.header).any(|year| year == latest))
        .collect();

    if dated.iter().any(|p| p.header.contains("actual")) {
        return Some(latest);
    }

    let dated_as_prior = dated.iter().any(|p| p.header.contains("anterior"));
    let undated_current = profiles.iter().any(|p| {
        p.numeric_count > 0
            && years_in(&p.header).next().is_none()
            && (p.header.contains("actual") || month_of(&p.header).is_some())
    });

    if dated_as_prior || undated_current {
        debug!(year = latest, "latest header year read as the prior period");
        Some(latest + 1)
    } else {
        Some(latest)
    }
}

/// 1-based month named in `header`, if any
fn month_of(header: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| header.contains(m))
        .map(|idx| idx as u32 + 1)
}

impl HeaderCue {
    pub fn matches(&self, header: &str, ctx: &ScoringContext) -> bool {
        match self {
            HeaderCue::Text(text) => header.contains(text),
            HeaderCue::AnyText(texts) => texts.iter().any(|t| header.contains(t)),
            HeaderCue::CurrentYear => year_in(header, ctx.year_token(0)),
            HeaderCue::PriorYear => year_in(header, ctx.year_token(1)),
            HeaderCue::OlderYear => year_in(header, ctx.year_token(2)),
            HeaderCue::All(cues) => cues.iter().all(|cue| cue.matches(header, ctx)),
        }
    }
}

fn year_in(header: &str, token: Option<String>) -> bool {
    token.is_some_and(|t| header.contains(&t))
}

/// Header explicitly marks the column as prior-year data
pub fn is_prior_marked(header: &str, ctx: &ScoringContext) -> bool {
    HeaderCue::PriorYear.matches(header, ctx) || HeaderCue::AnyText(PRIOR_LABELS).matches(header, ctx)
}

/// Both role scores for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnScore {
    pub index: usize,
    pub current: f64,
    pub prior: f64,
    pub prior_marked: bool,
}

fn stat_score(profile: &ColumnProfile, weights: &StatWeights) -> f64 {
    (profile.numeric_count as f64 * weights.count_factor).min(weights.count_cap)
        + (profile.density * weights.density_factor).min(weights.density_cap)
}

fn month_score(header: &str, ctx: &ScoringContext) -> f64 {
    let mut score = 0.0;
    for (idx, month) in MONTHS.iter().enumerate() {
        if !header.contains(month) {
            continue;
        }
        score += MONTH_WEIGHT;
        let number = idx as u32 + 1;
        if let Some(reference) = ctx.reference_month {
            let previous = if reference == 1 { 12 } else { reference - 1 };
            if number == reference || number == previous {
                score += RECENT_MONTH_BONUS;
            }
        }
    }
    score
}

/// Score one column for both roles; negative totals clamp to 0
pub fn score_column(profile: &ColumnProfile, width: usize, ctx: &ScoringContext) -> ColumnScore {
    let header = profile.header.as_str();
    let width = width.max(1) as f64;
    let index = profile.index as f64;

    let mut current = 0.0;
    let mut prior = 0.0;
    for rule in CUE_RULES {
        if rule.cue.matches(header, ctx) {
            current += rule.current;
            prior += rule.prior;
        }
    }

    current += month_score(header, ctx);
    current += stat_score(profile, &CURRENT_STATS);
    current += index / width * CURRENT_STATS.position_weight;
    for (threshold, bonus) in MAGNITUDE_BONUSES {
        if profile.max_magnitude > *threshold {
            current += bonus;
        }
    }

    prior += stat_score(profile, &PRIOR_STATS);
    prior += (width - index) / width * PRIOR_STATS.position_weight;

    ColumnScore {
        index: profile.index,
        current: current.max(0.0),
        prior: prior.max(0.0),
        prior_marked: is_prior_marked(header, ctx),
    }
}

//==============================================================================
// Selection
//==============================================================================

/// Resolved roles plus the per-column scores behind them
#[derive(Debug, Clone, PartialEq)]
pub struct RoleResolution {
    pub assignment: ColumnRoleAssignment,
    pub scores: Vec<ColumnScore>,
    pub context: ScoringContext,
}

/// Assign the current and prior roles.
///
/// Fails with `NoUsableData` only when no column carries any numeric data.
pub fn resolve_roles(
    profiles: &[ColumnProfile],
    config: &ExtractorConfig,
) -> KpiResult<RoleResolution> {
    let context = ScoringContext::infer(profiles, config);
    let width = profiles.len();
    let scores: Vec<ColumnScore> = profiles
        .iter()
        .map(|p| score_column(p, width, &context))
        .collect();

    for score in &scores {
        debug!(
            col = score.index,
            current = score.current,
            prior = score.prior,
            prior_marked = score.prior_marked,
            "scored column roles"
        );
    }

    let current = select_current(profiles, &scores, config).ok_or_else(|| {
        KpiError::NoUsableData(format!(
            "none of the {width} columns below the header carries numeric data"
        ))
    })?;

    let candidates = prior_candidates(profiles, &scores, current);
    let mut columns_different = true;
    let prior = match select_prior(&candidates, &scores, config) {
        Some(prior) if prior == current => {
            warn!(col = current, "current and prior roles collide, searching alternative");
            match collision_alternative(profiles, &candidates, current, config) {
                Some(alternative) => alternative,
                None => {
                    warn!(col = current, "no distinct prior column available");
                    columns_different = false;
                    current
                }
            }
        }
        Some(prior) => prior,
        None => {
            warn!("no prior-period column detected, looking for any other column with data");
            match first_other_with_data(profiles, current, config) {
                Some(alternative) => alternative,
                None => {
                    columns_different = false;
                    current
                }
            }
        }
    };

    let assignment = ColumnRoleAssignment {
        current_column: current,
        prior_column: prior,
        current_score: scores[current].current,
        prior_score: scores[prior].prior,
        columns_different,
    };
    info!(
        current = assignment.current_column,
        prior = assignment.prior_column,
        columns_different,
        "column roles assigned"
    );

    Ok(RoleResolution {
        assignment,
        scores,
        context,
    })
}

fn sorted_desc<'a>(mut scores: Vec<&'a ColumnScore>, key: fn(&ColumnScore) -> f64) -> Vec<&'a ColumnScore> {
    scores.sort_by(|a, b| key(b).total_cmp(&key(a)));
    scores
}

fn select_current(
    profiles: &[ColumnProfile],
    scores: &[ColumnScore],
    config: &ExtractorConfig,
) -> Option<usize> {
    let candidates = sorted_desc(
        scores
            .iter()
            .filter(|s| !s.prior_marked && profiles[s.index].numeric_count > 0)
            .collect(),
        |s| s.current,
    );

    if let Some(top) = candidates
        .first()
        .filter(|top| top.current > config.current_score_threshold)
    {
        return Some(top.index);
    }

    let emergency = profiles
        .iter()
        .rev()
        .find(|p| p.numeric_count >= config.emergency_min_data_points)
        .or_else(|| profiles.iter().find(|p| p.numeric_count > 0))
        .map(|p| p.index);
    if let Some(col) = emergency {
        warn!(col, "no confident current column, using emergency fallback");
    }
    emergency
}

/// Textually prior-marked columns, or else every other column carrying data; best prior score first
fn prior_candidates<'a>(
    profiles: &[ColumnProfile],
    scores: &'a [ColumnScore],
    current: usize,
) -> Vec<&'a ColumnScore> {
    let marked: Vec<&ColumnScore> = scores.iter().filter(|s| s.prior_marked).collect();
    let pool: Vec<&ColumnScore> = if marked.is_empty() {
        scores
            .iter()
            .filter(|s| s.index != current && profiles[s.index].numeric_count > 0)
            .collect()
    } else {
        marked
    };
    sorted_desc(pool, |s| s.prior)
}

fn select_prior(
    candidates: &[&ColumnScore],
    scores: &[ColumnScore],
    config: &ExtractorConfig,
) -> Option<usize> {
    if let Some(top) = candidates
        .first()
        .filter(|top| top.prior > config.prior_score_threshold)
    {
        return Some(top.index);
    }
    scores.iter().find(|s| s.prior_marked).map(|s| s.index)
}

/// A distinct prior column: next candidate above the collision threshold, else the densest other column
fn collision_alternative(
    profiles: &[ColumnProfile],
    candidates: &[&ColumnScore],
    current: usize,
    config: &ExtractorConfig,
) -> Option<usize> {
    if let Some(candidate) = candidates
        .iter()
        .find(|s| s.index != current && s.prior > config.collision_score_threshold)
    {
        return Some(candidate.index);
    }

    let mut others: Vec<&ColumnProfile> = profiles
        .iter()
        .filter(|p| p.index != current && p.numeric_count >= config.alternative_min_data_points)
        .collect();
    others.sort_by(|a, b| b.density.total_cmp(&a.density));
    others.first().map(|p| p.index)
}

fn first_other_with_data(
    profiles: &[ColumnProfile],
    current: usize,
    config: &ExtractorConfig,
) -> Option<usize> {
    profiles
        .iter()
        .find(|p| p.index != current && p.numeric_count >= config.alternative_min_data_points)
        .map(|p| p.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(index: usize, header: &str, count: usize, sampled: usize, max: f64) -> ColumnProfile {
        let mut p = ColumnProfile::empty(index, header);
        p.numeric_count = count;
        p.sampled_rows = sampled;
        p.density = if sampled > 0 { count as f64 / sampled as f64 } else { 0.0 };
        p.max_magnitude = max;
        p.average_magnitude = max / 2.0;
        p
    }

    #[test]
    fn test_actual_and_prior_year_headers() {
        let profiles = vec![
            profile(0, "concepto", 0, 25, 0.0),
            profile(1, "presupuesto 2025", 20, 25, 5.0e6),
            profile(2, "variación", 20, 25, 1.0e5),
            profile(3, "año anterior 2024", 20, 25, 4.0e6),
            profile(4, "% var", 20, 25, 50.0),
            profile(5, "actual 2025", 20, 25, 5.0e6),
        ];
        let resolution = resolve_roles(&profiles, &ExtractorConfig::default()).unwrap();
        assert_eq!(resolution.context.fiscal_year, Some(2025));
        assert_eq!(resolution.assignment.current_column, 5);
        assert_eq!(resolution.assignment.prior_column, 3);
        assert!(resolution.assignment.columns_different);
        assert!(resolution.scores[3].prior_marked);
        assert!(!resolution.scores[5].prior_marked);
    }

    #[test]
    fn test_collision_repaired_with_distinct_column() {
        // Only the prior-marked column has enough data to serve as current,
        // so both roles initially land on column 5.
        let profiles = vec![
            profile(0, "concepto", 0, 50, 0.0),
            profile(1, "importe", 2, 50, 900.0),
            profile(2, "", 0, 50, 0.0),
            profile(3, "", 0, 50, 0.0),
            profile(4, "", 0, 50, 0.0),
            profile(5, "año anterior 2024", 40, 50, 2.0e6),
        ];
        let resolution = resolve_roles(&profiles, &ExtractorConfig::default()).unwrap();
        assert_eq!(resolution.assignment.current_column, 5);
        assert_eq!(resolution.assignment.prior_column, 1);
        assert!(resolution.assignment.columns_different);
    }

    #[test]
    fn test_single_data_column_degrades() {
        let profiles = vec![
            profile(0, "concepto", 0, 10, 0.0),
            profile(1, "importe", 10, 10, 1.0e5),
        ];
        let resolution = resolve_roles(&profiles, &ExtractorConfig::default()).unwrap();
        assert_eq!(resolution.assignment.current_column, 1);
        assert_eq!(resolution.assignment.prior_column, 1);
        assert!(!resolution.assignment.columns_different);
    }

    #[test]
    fn test_no_numeric_data_is_fatal() {
        let profiles = vec![
            profile(0, "concepto", 0, 10, 0.0),
            profile(1, "actual 2025", 0, 10, 0.0),
        ];
        let err = resolve_roles(&profiles, &ExtractorConfig::default()).unwrap_err();
        assert!(matches!(err, KpiError::NoUsableData(_)));
    }

    #[test]
    fn test_unmarked_prior_prefers_left_column_with_data() {
        let profiles = vec![
            profile(0, "concepto", 0, 20, 0.0),
            profile(1, "mes", 18, 20, 3.0e5),
            profile(2, "real", 18, 20, 3.5e5),
        ];
        let resolution = resolve_roles(&profiles, &ExtractorConfig::default()).unwrap();
        assert_eq!(resolution.assignment.current_column, 2);
        assert_eq!(resolution.assignment.prior_column, 1);
    }

    #[test]
    fn test_month_bonus_uses_reference_month() {
        let ctx = ScoringContext {
            fiscal_year: None,
            reference_month: Some(10),
        };
        let octubre = score_column(&profile(0, "octubre", 0, 0, 0.0), 1, &ctx);
        let agosto = score_column(&profile(0, "agosto", 0, 0, 0.0), 1, &ctx);
        assert_eq!(octubre.current, 90.0);
        assert_eq!(agosto.current, 70.0);
    }

    #[test]
    fn test_january_counts_december_as_recent() {
        let ctx = ScoringContext {
            fiscal_year: None,
            reference_month: Some(1),
        };
        let diciembre = score_column(&profile(0, "diciembre", 0, 0, 0.0), 1, &ctx);
        assert_eq!(diciembre.current, 90.0);
    }

    #[test]
    fn test_context_inference_from_headers() {
        let profiles = vec![
            profile(0, "concepto", 0, 0, 0.0),
            profile(1, "septiembre 2024", 0, 0, 0.0),
            profile(2, "octubre 2025", 0, 0, 0.0),
        ];
        let ctx = ScoringContext::infer(&profiles, &ExtractorConfig::default());
        assert_eq!(ctx.fiscal_year, Some(2025));
        assert_eq!(ctx.reference_month, Some(10));

        let pinned = ScoringContext::infer(&profiles, &ExtractorConfig::default().with_fiscal_year(2030));
        assert_eq!(pinned.fiscal_year, Some(2030));
    }

    #[test]
    fn test_undated_actual_column_stays_current() {
        let profiles = vec![
            profile(0, "concepto", 0, 20, 0.0),
            profile(1, "actual", 18, 20, 3.5e5),
            profile(2, "2024", 18, 20, 3.0e5),
        ];
        let resolution = resolve_roles(&profiles, &ExtractorConfig::default()).unwrap();
        assert_eq!(resolution.context.fiscal_year, Some(2025));
        assert_eq!(resolution.assignment.current_column, 1);
        assert_eq!(resolution.assignment.prior_column, 2);
        assert!(resolution.scores[2].prior_marked);
    }

    #[test]
    fn test_undated_month_column_stays_current() {
        let profiles = vec![
            profile(0, "concepto", 0, 20, 0.0),
            profile(1, "octubre", 18, 20, 3.5e5),
            profile(2, "octubre 2024", 18, 20, 3.0e5),
        ];
        let resolution = resolve_roles(&profiles, &ExtractorConfig::default()).unwrap();
        assert_eq!(resolution.context.fiscal_year, Some(2025));
        assert_eq!(resolution.assignment.current_column, 1);
        assert_eq!(resolution.assignment.prior_column, 2);
    }

    #[test]
    fn test_single_dated_prior_label_implies_next_year() {
        let profiles = vec![
            profile(0, "concepto", 0, 20, 0.0),
            profile(1, "año anterior 2024", 18, 20, 3.0e5),
            profile(2, "real", 18, 20, 3.5e5),
        ];
        assert_eq!(infer_fiscal_year(&profiles), Some(2025));
    }

    #[test]
    fn test_single_dated_column_without_competition_is_current() {
        let profiles = vec![
            profile(0, "concepto", 0, 20, 0.0),
            profile(1, "presupuesto", 18, 20, 3.0e5),
            profile(2, "cierre 2025", 18, 20, 3.5e5),
        ];
        assert_eq!(infer_fiscal_year(&profiles), Some(2025));
        assert_eq!(infer_fiscal_year(&profiles[..1]), None);
    }

    #[test]
    fn test_prior_cue_rules() {
        let ctx = ScoringContext {
            fiscal_year: Some(2025),
            reference_month: None,
        };
        assert!(is_prior_marked("año anterior", &ctx));
        assert!(is_prior_marked("real 2024", &ctx));
        assert!(!is_prior_marked("real 2025", &ctx));
        assert!(HeaderCue::OlderYear.matches("cierre 2023", &ctx));
    }
}
