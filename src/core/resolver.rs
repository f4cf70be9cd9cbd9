//! Concept resolver
//!
//! Finds the value of a canonical concept in a target column through a chain
//! of matching tiers, tried in order:
//!
//! 1. exact label match
//! 2. token overlap
//! 3. synonym table
//! 4. best keyword overlap
//!
//! A tier's hit is accepted when the parsed value is nonzero or the concept is
//! optional. Required concepts get one more pass on the first word of their
//! primary pattern. Nothing found resolves to 0; resolution never fails.

use crate::config::ExtractorConfig;
use crate::core::concepts::{synonyms_for, ConceptDefinition, CONCEPTS};
use crate::core::index::{normalize_label, ConceptIndex, IndexedLabel};
use crate::core::numeric::parse_cell;
use crate::types::{ConceptProvenance, MatchTier, Worksheet};
use tracing::{debug, warn};

/// Shortest label token allowed to stand in for a pattern word by prefix
const MIN_STEM_LEN: usize = 4;
/// Longest inflection suffix the prefix rule tolerates
const MAX_STEM_SUFFIX: usize = 2;

/// Which period a resolution pass targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Honors each concept's `required` flag
    Current,
    /// Every concept treated as optional
    Prior,
}

/// Resolves concepts against one worksheet's concept index
pub struct ConceptResolver<'a> {
    sheet: &'a Worksheet,
    index: &'a ConceptIndex,
    config: &'a ExtractorConfig,
}

/// One tier's search state for a single concept and column
struct Lookup<'a> {
    resolver: &'a ConceptResolver<'a>,
    column: usize,
    required: bool,
}

type Tier = fn(&Lookup<'_>, &str) -> Option<ConceptProvenance>;

const TIERS: &[(MatchTier, Tier)] = &[
    (MatchTier::Exact, exact_match),
    (MatchTier::TokenOverlap, token_overlap_match),
    (MatchTier::Synonym, synonym_match),
    (MatchTier::Keyword, keyword_match),
];

impl<'a> ConceptResolver<'a> {
    pub fn new(sheet: &'a Worksheet, index: &'a ConceptIndex, config: &'a ExtractorConfig) -> Self {
        Self {
            sheet,
            index,
            config,
        }
    }

    /// Resolve one concept in `column`
    pub fn resolve(
        &self,
        concept: &ConceptDefinition,
        column: usize,
        required: bool,
    ) -> ConceptProvenance {
        let lookup = Lookup {
            resolver: self,
            column,
            required,
        };
        let patterns: Vec<String> = concept.patterns.iter().map(|p| normalize_label(p)).collect();

        for (tier, search) in TIERS {
            for pattern in &patterns {
                if let Some(mut found) = search(&lookup, pattern) {
                    found.key = concept.key.to_string();
                    debug!(
                        concept = concept.key,
                        column,
                        tier = ?tier,
                        label = found.label.as_deref().unwrap_or_default(),
                        value = found.value,
                        "concept resolved"
                    );
                    return found;
                }
            }
        }

        if required {
            if let Some(mut found) = patterns.first().and_then(|p| first_word_match(&lookup, p)) {
                found.key = concept.key.to_string();
                warn!(
                    concept = concept.key,
                    column,
                    label = found.label.as_deref().unwrap_or_default(),
                    "required concept resolved by first-word fallback"
                );
                return found;
            }
            warn!(concept = concept.key, column, "required concept not found");
        } else {
            debug!(concept = concept.key, column, "optional concept not found");
        }

        ConceptProvenance {
            key: concept.key.to_string(),
            value: 0.0,
            tier: None,
            label: None,
        }
    }

    /// Resolve the whole catalogue in `column`, in catalogue order
    pub fn resolve_all(&self, column: usize, period: Period) -> Vec<ConceptProvenance> {
        CONCEPTS
            .iter()
            .map(|concept| {
                let required = period == Period::Current && concept.required;
                self.resolve(concept, column, required)
            })
            .collect()
    }
}

impl Lookup<'_> {
    fn value_at(&self, row: usize) -> f64 {
        parse_cell(self.resolver.sheet.cell(row, self.column))
    }

    /// Accept `entry` when its value is nonzero or the concept is optional
    fn accept(&self, entry: &IndexedLabel, tier: MatchTier) -> Option<ConceptProvenance> {
        let value = self.value_at(entry.row);
        (value != 0.0 || !self.required).then(|| ConceptProvenance {
            key: String::new(),
            value,
            tier: Some(tier),
            label: Some(entry.label.clone()),
        })
    }

    fn labels(&self) -> impl Iterator<Item = &IndexedLabel> {
        self.resolver.index.iter()
    }
}

//==============================================================================
// Tiers
//==============================================================================

fn exact_match(lookup: &Lookup<'_>, pattern: &str) -> Option<ConceptProvenance> {
    let row = lookup.resolver.index.get(pattern)?;
    lookup.accept(
        &IndexedLabel {
            label: pattern.to_string(),
            row,
        },
        MatchTier::Exact,
    )
}

/// Pattern word matches when the label contains it, or a label token of at
/// least four characters is the word minus a short suffix ("venta" for "ventas").
fn word_in_label(word: &str, label: &str) -> bool {
    if label.contains(word) {
        return true;
    }
    let word_len = word.chars().count();
    label.split(' ').any(|token| {
        let token_len = token.chars().count();
        token_len >= MIN_STEM_LEN
            && word_len.saturating_sub(token_len) <= MAX_STEM_SUFFIX
            && word.starts_with(token)
    })
}

fn token_overlap_match(lookup: &Lookup<'_>, pattern: &str) -> Option<ConceptProvenance> {
    let words: Vec<&str> = pattern.split(' ').filter(|w| w.chars().count() > 2).collect();
    if words.is_empty() {
        return None;
    }
    let threshold = lookup.resolver.config.token_overlap_ratio;

    lookup.labels().find_map(|entry| {
        let matched = words.iter().filter(|w| word_in_label(w, &entry.label)).count();
        let ratio = matched as f64 / words.len() as f64;
        if ratio >= threshold {
            lookup.accept(entry, MatchTier::TokenOverlap)
        } else {
            None
        }
    })
}

fn synonym_match(lookup: &Lookup<'_>, pattern: &str) -> Option<ConceptProvenance> {
    synonyms_for(pattern).iter().find_map(|synonym| {
        lookup
            .labels()
            .filter(|entry| entry.label.contains(synonym))
            .find_map(|entry| lookup.accept(entry, MatchTier::Synonym))
    })
}

/// Single best label by keyword count; ties keep the earlier label
fn keyword_match(lookup: &Lookup<'_>, pattern: &str) -> Option<ConceptProvenance> {
    let keywords: Vec<&str> = pattern.split(' ').filter(|w| w.chars().count() > 3).collect();
    let minimum = keywords.len() as f64 * lookup.resolver.config.keyword_overlap_ratio;

    let mut best: Option<(&IndexedLabel, usize)> = None;
    for entry in lookup.labels() {
        let score = keywords.iter().filter(|k| entry.label.contains(*k)).count();
        let leading = best.map_or(0, |(_, s)| s);
        if score > leading && score as f64 >= minimum {
            best = Some((entry, score));
        }
    }

    best.and_then(|(entry, _)| lookup.accept(entry, MatchTier::Keyword))
}

/// Last resort for required concepts: any label containing the first pattern word, first nonzero value
fn first_word_match(lookup: &Lookup<'_>, pattern: &str) -> Option<ConceptProvenance> {
    let first = pattern.split(' ').next().filter(|w| !w.is_empty())?;
    lookup
        .labels()
        .filter(|entry| entry.label.contains(first))
        .find_map(|entry| {
            let value = lookup.value_at(entry.row);
            (value != 0.0).then(|| ConceptProvenance {
                key: String::new(),
                value,
                tier: Some(MatchTier::FirstWord),
                label: Some(entry.label.clone()),
            })
        })
}
