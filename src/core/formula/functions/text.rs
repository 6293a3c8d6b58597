//! Text functions
//! CONCATENATE, LEFT, RIGHT, MID, LEN, UPPER, LOWER, TRIM
//!
//! Lengths and positions count characters, not bytes.

use super::{flatten_values, number_arg, optional_number_arg, text_arg};
use crate::core::formula::evaluator::EvalContext;
use crate::core::formula::parser::Expr;
use crate::error::FormulaError;
use crate::types::Value;

fn count_arg(
    func: &str,
    arg: Option<&Expr>,
    default: f64,
    ctx: &EvalContext<'_>,
) -> Result<usize, FormulaError> {
    let n = optional_number_arg(func, arg, default, ctx)?.trunc();
    if n < 0.0 {
        return Err(FormulaError::Argument(format!(
            "{} character count cannot be negative",
            func
        )));
    }
    Ok(n as usize)
}

/// CONCATENATE(text1, text2, ...). Ranges contribute every cell, row-major.
pub(super) fn concatenate(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let text: String = flatten_values(args, ctx)?
        .iter()
        .map(|arg| arg.value.as_text())
        .collect();
    Ok(Value::Text(text))
}

/// LEFT(text, [count])
pub(super) fn left(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let text = text_arg(&args[0], ctx)?;
    let count = count_arg("LEFT", args.get(1), 1.0, ctx)?;
    Ok(Value::Text(text.chars().take(count).collect()))
}

/// RIGHT(text, [count])
pub(super) fn right(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let text = text_arg(&args[0], ctx)?;
    let count = count_arg("RIGHT", args.get(1), 1.0, ctx)?;
    let skip = text.chars().count().saturating_sub(count);
    Ok(Value::Text(text.chars().skip(skip).collect()))
}

/// MID(text, start, count) with a 1-based start
pub(super) fn mid(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let text = text_arg(&args[0], ctx)?;
    let start = number_arg("MID", &args[1], ctx)?.trunc();
    if start < 1.0 {
        return Err(FormulaError::Argument(
            "MID start must be at least 1".to_string(),
        ));
    }
    let count = count_arg("MID", args.get(2), 0.0, ctx)?;
    Ok(Value::Text(
        text.chars().skip(start as usize - 1).take(count).collect(),
    ))
}

pub(super) fn len(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let text = text_arg(&args[0], ctx)?;
    Ok(Value::Number(text.chars().count() as f64))
}

pub(super) fn upper(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Text(text_arg(&args[0], ctx)?.to_uppercase()))
}

pub(super) fn lower(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Text(text_arg(&args[0], ctx)?.to_lowercase()))
}

/// TRIM(text): strips both ends and collapses inner runs of whitespace
pub(super) fn trim(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let text = text_arg(&args[0], ctx)?;
    Ok(Value::Text(
        text.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}
