//! Extraction engine
//!
//! Each stage is a small module with pure functions over the in-memory
//! [`crate::types::Workbook`]; [`extractor`] wires them into one pipeline.

pub mod aggregate;
pub mod concepts;
pub mod extractor;
pub mod header;
pub mod index;
pub mod numeric;
pub mod profile;
pub mod resolver;
pub mod roles;
pub mod rules;
pub mod sheet;
pub mod validate;

pub use extractor::{extract, Extractor, ENGINE_VERSION};
pub use validate::check_invariants;
