//! CLI command handlers

pub mod commands;

pub use commands::{audit, calc, eval, functions, parse_assignment};
