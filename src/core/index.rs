//! Concept index: normalized row labels below the header row

use crate::core::concepts::is_section_header;
use crate::types::Worksheet;
use std::collections::HashMap;
use tracing::debug;

/// An indexed first-cell label and the row it was last seen on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedLabel {
    pub label: String,
    pub row: usize,
}

/// Label -> row map that iterates in first-insertion order.
///
/// Re-inserting a label moves its row, not its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptIndex {
    entries: Vec<IndexedLabel>,
    positions: HashMap<String, usize>,
}

/// Lowercase, collapse whitespace runs, trim
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl ConceptIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every data row below `header_row`
    pub fn build(sheet: &Worksheet, header_row: usize) -> Self {
        let mut index = Self::new();
        let mut skipped = 0usize;

        for row in (header_row + 1)..sheet.row_count() {
            let raw = sheet.cell(row, 0).text();
            if raw.chars().count() < 2 {
                continue;
            }
            if is_section_header(&raw) {
                skipped += 1;
                continue;
            }
            index.insert(normalize_label(&raw), row);
        }

        debug!(
            labels = index.len(),
            section_headers = skipped,
            "concept index built"
        );
        index
    }

    pub fn insert(&mut self, label: String, row: usize) {
        match self.positions.get(&label) {
            Some(&pos) => self.entries[pos].row = row,
            None => {
                self.positions.insert(label.clone(), self.entries.len());
                self.entries.push(IndexedLabel { label, row });
            }
        }
    }

    /// Row of an exact label
    pub fn get(&self, label: &str) -> Option<usize> {
        self.positions.get(label).map(|&pos| self.entries[pos].row)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedLabel> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
