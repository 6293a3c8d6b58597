//! Formula evaluator
//!
//! Walks an AST and produces a typed [`Value`] or a [`FormulaError`].
//! Evaluation only reads from the [`CellStore`]; it never writes results
//! and never triggers recalculation.

use chrono::{Local, NaiveDateTime};
use std::cmp::Ordering;

use super::functions;
use super::parser::{BinaryOperator, Expr, UnaryOperator};
use super::resolver::resolve_cell;
use crate::config::EngineConfig;
use crate::error::FormulaError;
use crate::store::CellStore;
use crate::types::{CellResult, SheetId, Value};

/// Everything an evaluation may read
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub store: &'a dyn CellStore,
    pub sheet: SheetId,
    pub config: &'a EngineConfig,
    /// Clock reading used by TODAY and NOW
    pub now: NaiveDateTime,
}

impl<'a> EvalContext<'a> {
    /// Create a context reading the local clock
    pub fn new(store: &'a dyn CellStore, sheet: SheetId, config: &'a EngineConfig) -> Self {
        Self::with_now(store, sheet, config, Local::now().naive_local())
    }

    /// Create a context with a fixed clock reading
    pub fn with_now(
        store: &'a dyn CellStore,
        sheet: SheetId,
        config: &'a EngineConfig,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            store,
            sheet,
            config,
            now,
        }
    }
}

/// Evaluate a complete formula.
///
/// A top-level empty result (e.g. `=A1` with A1 unset) is stored as 0.
pub fn evaluate_formula(expr: &Expr, ctx: &EvalContext<'_>) -> CellResult {
    match evaluate(expr, ctx)? {
        Value::Empty => Ok(Value::Number(0.0)),
        value => Ok(value),
    }
}

/// Evaluate an expression to a single value
pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> CellResult {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),

        Expr::Text(s) => Ok(Value::Text(s.clone())),

        Expr::Boolean(b) => Ok(Value::Boolean(*b)),

        Expr::CellRef(coord) => resolve_cell(ctx, *coord),

        Expr::RangeRef(range) => {
            if range.len() == 1 {
                resolve_cell(ctx, range.start)
            } else {
                Err(FormulaError::TypeMismatch(format!(
                    "range {} used where a single value is expected",
                    range
                )))
            }
        }

        Expr::FunctionCall { name, args } => functions::call(name, args, ctx),

        Expr::BinaryOp { op, left, right } => {
            let left_val = evaluate(left, ctx)?;
            let right_val = evaluate(right, ctx)?;
            evaluate_binary_op(*op, &left_val, &right_val, ctx.config)
        }

        Expr::UnaryOp { op, operand } => {
            let val = evaluate(operand, ctx)?;
            let n = require_number(&val, "Operand")?;
            match op {
                UnaryOperator::Neg => Ok(Value::Number(-n)),
                UnaryOperator::Plus => Ok(Value::Number(n)),
            }
        }
    }
}

fn require_number(value: &Value, side: &str) -> Result<f64, FormulaError> {
    value.as_number().ok_or_else(|| {
        FormulaError::TypeMismatch(format!(
            "{} must be a number, got \"{}\"",
            side,
            value.as_text()
        ))
    })
}

/// Arithmetic results must be finite numbers
pub(crate) fn finite(n: f64) -> CellResult {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(FormulaError::TypeMismatch(
            "result is not a finite number".to_string(),
        ))
    }
}

/// `base ^ exponent`, shared with POWER
pub(crate) fn power(base: f64, exponent: f64) -> CellResult {
    if base == 0.0 && exponent < 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    finite(base.powf(exponent))
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &Value,
    right: &Value,
    config: &EngineConfig,
) -> CellResult {
    if op.is_comparison() {
        let ordering = compare_values(left, right, config.float_tolerance);
        let result = match op {
            BinaryOperator::Eq => ordering == Ordering::Equal,
            BinaryOperator::Ne => ordering != Ordering::Equal,
            BinaryOperator::Lt => ordering == Ordering::Less,
            BinaryOperator::Le => ordering != Ordering::Greater,
            BinaryOperator::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        };
        return Ok(Value::Boolean(result));
    }

    if op == BinaryOperator::Concat {
        return Ok(Value::Text(format!(
            "{}{}",
            left.as_text(),
            right.as_text()
        )));
    }

    if op == BinaryOperator::Add
        && config.plus_concatenates_text
        && (is_non_numeric_text(left) || is_non_numeric_text(right))
    {
        return Ok(Value::Text(format!(
            "{}{}",
            left.as_text(),
            right.as_text()
        )));
    }

    let l = require_number(left, "Left operand")?;
    let r = require_number(right, "Right operand")?;

    match op {
        BinaryOperator::Add => finite(l + r),
        BinaryOperator::Sub => finite(l - r),
        BinaryOperator::Mul => finite(l * r),
        BinaryOperator::Div => {
            if r == 0.0 {
                Err(FormulaError::DivisionByZero)
            } else {
                finite(l / r)
            }
        }
        BinaryOperator::Pow => power(l, r),
        other => Err(FormulaError::TypeMismatch(format!(
            "operator {} is not arithmetic",
            other
        ))),
    }
}

fn is_non_numeric_text(value: &Value) -> bool {
    matches!(value, Value::Text(_)) && value.as_number().is_none()
}

/// Order two values the way comparison operators and lookups see them.
///
/// Numeric when either side is a number or boolean and both coerce;
/// otherwise a case-insensitive text comparison. Numbers within
/// `tolerance` of each other are equal.
pub(crate) fn compare_values(left: &Value, right: &Value, tolerance: f64) -> Ordering {
    let numeric_side = |v: &Value| matches!(v, Value::Number(_) | Value::Boolean(_));

    if numeric_side(left) || numeric_side(right) {
        if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
            if (l - r).abs() <= tolerance {
                return Ordering::Equal;
            }
            return l.partial_cmp(&r).unwrap_or(Ordering::Equal);
        }
    }

    left.as_text()
        .to_lowercase()
        .cmp(&right.as_text().to_lowercase())
}
