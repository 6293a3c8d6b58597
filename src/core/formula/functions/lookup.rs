//! Lookup functions: VLOOKUP, INDEX, MATCH

use std::cmp::Ordering;

use super::{optional_number_arg, position_arg, range_arg};
use crate::core::formula::evaluator::{compare_values, evaluate, EvalContext};
use crate::core::formula::parser::Expr;
use crate::error::FormulaError;
use crate::types::Value;

/// Exact match: index of the first non-empty value equal to `key`
fn find_exact<'v>(
    values: impl Iterator<Item = &'v Value>,
    key: &Value,
    tolerance: f64,
) -> Option<usize> {
    values
        .enumerate()
        .find(|(_, v)| !v.is_empty() && compare_values(v, key, tolerance) == Ordering::Equal)
        .map(|(i, _)| i)
}

/// Sorted match: index of the last value before the first one that
/// compares `past` to `key`.
fn find_sorted<'v>(
    values: impl Iterator<Item = &'v Value>,
    key: &Value,
    tolerance: f64,
    past: Ordering,
) -> Option<usize> {
    let mut found = None;
    for (i, v) in values.enumerate() {
        if v.is_empty() {
            continue;
        }
        if compare_values(v, key, tolerance) == past {
            break;
        }
        found = Some(i);
    }
    found
}

/// VLOOKUP(key, range, column, [approximate])
///
/// Searches the first column top to bottom. With `approximate` FALSE or
/// omitted the match must be exact; with TRUE the column is assumed sorted
/// ascending and the last row not greater than `key` wins.
pub(super) fn vlookup(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let key = evaluate(&args[0], ctx)?;
    let table = range_arg("VLOOKUP", &args[1], ctx)?;
    let column = position_arg("VLOOKUP", "column", &args[2], ctx)?;
    let approximate = match args.get(3) {
        Some(arg) => evaluate(arg, ctx)?.is_truthy(),
        None => false,
    };

    if column > table.cols() {
        return Err(FormulaError::Argument(format!(
            "VLOOKUP column {} is outside a {}-column range",
            column,
            table.cols()
        )));
    }

    let tolerance = ctx.config.float_tolerance;
    let row = if approximate {
        find_sorted(table.column(0), &key, tolerance, Ordering::Greater)
    } else {
        find_exact(table.column(0), &key, tolerance)
    }
    .ok_or(FormulaError::LookupNotFound)?;

    Ok(table.get(row, column - 1).cloned().unwrap_or(Value::Empty))
}

/// INDEX(range, row, [column]). A one-row range takes the column as its only index.
pub(super) fn index(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let table = range_arg("INDEX", &args[0], ctx)?;
    let first = position_arg("INDEX", "position", &args[1], ctx)?;

    let (row, col) = match args.get(2) {
        Some(arg) => (first, position_arg("INDEX", "column", arg, ctx)?),
        None if table.rows() == 1 => (1, first),
        None if table.cols() == 1 => (first, 1),
        None => {
            return Err(FormulaError::Argument(
                "INDEX on a two-dimensional range needs a column".to_string(),
            ))
        }
    };

    table.get(row - 1, col - 1).cloned().ok_or_else(|| {
        FormulaError::Argument(format!(
            "INDEX position ({}, {}) is outside a {}x{} range",
            row,
            col,
            table.rows(),
            table.cols()
        ))
    })
}

/// MATCH(key, range, [type]). Returns the 1-based position.
///
/// Type 1 (default): largest value <= key, range sorted ascending.
/// Type 0: first exact match.
/// Type -1: smallest value >= key, range sorted descending.
pub(super) fn match_(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let key = evaluate(&args[0], ctx)?;
    let range = range_arg("MATCH", &args[1], ctx)?;
    let match_type = optional_number_arg("MATCH", args.get(2), 1.0, ctx)?;

    if !range.is_vector() {
        return Err(FormulaError::Argument(
            "MATCH requires a single row or column".to_string(),
        ));
    }

    let tolerance = ctx.config.float_tolerance;
    let values = range.values().iter();
    let position = if match_type == 0.0 {
        find_exact(values, &key, tolerance)
    } else if match_type > 0.0 {
        find_sorted(values, &key, tolerance, Ordering::Greater)
    } else {
        find_sorted(values, &key, tolerance, Ordering::Less)
    }
    .ok_or(FormulaError::LookupNotFound)?;

    Ok(Value::Number((position + 1) as f64))
}
