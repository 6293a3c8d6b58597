//! Logical functions: IF, AND, OR, NOT, IFERROR

use super::flatten_values;
use crate::core::formula::evaluator::{evaluate, EvalContext};
use crate::core::formula::parser::Expr;
use crate::error::FormulaError;
use crate::types::Value;

/// IF(condition, then, [else]). Only the chosen branch is evaluated.
pub(super) fn if_(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let condition = evaluate(&args[0], ctx)?;

    if condition.is_truthy() {
        evaluate(&args[1], ctx)
    } else if let Some(otherwise) = args.get(2) {
        evaluate(otherwise, ctx)
    } else {
        Ok(Value::Boolean(false))
    }
}

/// Truth values of the arguments. Text and empty cells in ranges are ignored.
fn logical_values(
    func: &str,
    args: &[Expr],
    ctx: &EvalContext<'_>,
) -> Result<Vec<bool>, FormulaError> {
    let values: Vec<bool> = flatten_values(args, ctx)?
        .into_iter()
        .filter(|arg| {
            !arg.from_reference || matches!(arg.value, Value::Number(_) | Value::Boolean(_))
        })
        .map(|arg| arg.value.is_truthy())
        .collect();

    if values.is_empty() {
        return Err(FormulaError::TypeMismatch(format!(
            "{} found no logical values",
            func
        )));
    }
    Ok(values)
}

pub(super) fn and(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let values = logical_values("AND", args, ctx)?;
    Ok(Value::Boolean(values.into_iter().all(|b| b)))
}

pub(super) fn or(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let values = logical_values("OR", args, ctx)?;
    Ok(Value::Boolean(values.into_iter().any(|b| b)))
}

pub(super) fn not(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Boolean(!evaluate(&args[0], ctx)?.is_truthy()))
}

/// IFERROR(value, fallback). Catches every error kind, including propagated ones.
pub(super) fn iferror(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    match evaluate(&args[0], ctx) {
        Ok(value) => Ok(value),
        Err(_) => evaluate(&args[1], ctx),
    }
}
