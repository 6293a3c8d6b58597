//! Core formula engine: references, formulas, dependency graph, recalculation

pub mod engine;
pub mod formula;
pub mod graph;
pub mod reference;

pub use engine::{Engine, RecalcReport};
pub use formula::Formula;
pub use graph::{DependencyGraph, Step};
