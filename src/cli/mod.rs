//! CLI command handlers

pub mod commands;

pub use commands::{batch, extract, init_logging, inspect, load_config, report, verify};
