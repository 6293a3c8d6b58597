//! Formula compilation and evaluation
//!
//! A [`Formula`] is the compiled form of one cell's formula text: the parsed
//! expression tree (or the syntax error that prevented parsing) plus the set
//! of cells it reads, which become its edges in the dependency graph.

pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod resolver;
pub mod tokenizer;

use std::collections::BTreeSet;

use crate::config::EngineConfig;
use crate::core::reference::{CellCoord, Reference};
use crate::error::FormulaError;
use crate::types::CellResult;

pub use evaluator::{evaluate, evaluate_formula, EvalContext};
pub use parser::{parse_formula, BinaryOperator, Expr, UnaryOperator};
pub use tokenizer::{tokenize, Token};

/// A compiled formula
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    program: Result<Expr, FormulaError>,
    precedents: BTreeSet<CellCoord>,
}

impl Formula {
    /// Parse formula text and collect the cells it reads.
    ///
    /// Never fails: a formula that can't be parsed, or that references a
    /// range larger than `config.max_range_cells`, compiles to its error and
    /// reads no cells.
    pub fn compile(source: &str, config: &EngineConfig) -> Self {
        let program = parse_formula(source).and_then(|expr| {
            for reference in expr.references() {
                if let Reference::Range(range) = reference {
                    resolver::check_range_size(range, config.max_range_cells)?;
                }
            }
            Ok(expr)
        });

        let mut precedents = BTreeSet::new();
        if let Ok(expr) = &program {
            for reference in expr.references() {
                match reference {
                    Reference::Cell(coord) => {
                        precedents.insert(coord);
                    }
                    Reference::Range(range) => precedents.extend(range.cells()),
                }
            }
        }

        Self {
            source: source.to_string(),
            program,
            precedents,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed expression, or the compile error
    pub fn program(&self) -> Result<&Expr, &FormulaError> {
        self.program.as_ref()
    }

    /// Cells this formula reads
    pub fn precedents(&self) -> &BTreeSet<CellCoord> {
        &self.precedents
    }

    /// Evaluate against the store; a formula that failed to compile
    /// evaluates to its compile error.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> CellResult {
        match &self.program {
            Ok(expr) => evaluate_formula(expr, ctx),
            Err(err) => Err(err.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(formula: &Formula) -> Vec<String> {
        formula.precedents().iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_compile_collects_precedents() {
        let formula = Formula::compile("=IF(A1 > 0, SUM(B1:B2), C3) + A1", &EngineConfig::default());
        assert!(formula.program().is_ok());
        assert_eq!(coords(&formula), vec!["A1", "B1", "B2", "C3"]);
        assert_eq!(formula.source(), "=IF(A1 > 0, SUM(B1:B2), C3) + A1");
    }

    #[test]
    fn test_syntax_error_has_no_precedents() {
        let formula = Formula::compile("=A1 +", &EngineConfig::default());
        assert!(matches!(formula.program(), Err(FormulaError::Syntax(_))));
        assert!(formula.precedents().is_empty());
    }

    #[test]
    fn test_oversized_range_rejected_at_compile() {
        let config = EngineConfig {
            max_range_cells: 100,
            ..EngineConfig::default()
        };
        let formula = Formula::compile("=SUM(A1:A1000)", &config);
        assert!(matches!(formula.program(), Err(FormulaError::Argument(_))));
        assert!(formula.precedents().is_empty());
    }
}
