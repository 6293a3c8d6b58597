//! Math & precision functions
//! ROUND, ROUNDUP, ROUNDDOWN, ABS, SQRT, MOD, POWER, INT

use super::{number_arg, optional_number_arg};
use crate::core::formula::evaluator::{self, finite, EvalContext};
use crate::core::formula::parser::Expr;
use crate::error::FormulaError;
use crate::types::Value;

/// Scale `value` by 10^digits and trim it to 15 significant digits, so
/// binary noise such as 2.675 * 100 = 267.49999999999997 reads as 267.5.
fn scaled(value: f64, digits: f64) -> (f64, f64) {
    let multiplier = 10_f64.powi(digits.trunc() as i32);
    let x = value * multiplier;
    let trimmed = format!("{:.14e}", x).parse::<f64>().unwrap_or(x);
    (trimmed, multiplier)
}

fn round_with(
    func: &str,
    args: &[Expr],
    ctx: &EvalContext<'_>,
    op: fn(f64) -> f64,
) -> Result<Value, FormulaError> {
    let value = number_arg(func, &args[0], ctx)?;
    let digits = optional_number_arg(func, args.get(1), 0.0, ctx)?;
    let (scaled, multiplier) = scaled(value, digits);
    if multiplier == 0.0 {
        return Ok(Value::Number(0.0));
    }
    // No fractional part left to round at this scale
    if !scaled.is_finite() || scaled.abs() >= 1e15 {
        return finite(value);
    }
    let rounded = op(scaled.abs()).copysign(scaled) / multiplier;
    finite(if rounded == 0.0 { 0.0 } else { rounded })
}

/// ROUND(number, [digits]), halves away from zero
pub(super) fn round(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    round_with("ROUND", args, ctx, f64::round)
}

/// ROUNDUP(number, [digits]), away from zero
pub(super) fn roundup(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    round_with("ROUNDUP", args, ctx, f64::ceil)
}

/// ROUNDDOWN(number, [digits]), toward zero
pub(super) fn rounddown(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    round_with("ROUNDDOWN", args, ctx, f64::floor)
}

pub(super) fn abs(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Number(number_arg("ABS", &args[0], ctx)?.abs()))
}

pub(super) fn sqrt(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let value = number_arg("SQRT", &args[0], ctx)?;
    if value < 0.0 {
        return Err(FormulaError::Argument(
            "SQRT of a negative number".to_string(),
        ));
    }
    Ok(Value::Number(value.sqrt()))
}

/// MOD(number, divisor). The result takes the sign of the divisor.
pub(super) fn modulo(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let value = number_arg("MOD", &args[0], ctx)?;
    let divisor = number_arg("MOD", &args[1], ctx)?;
    if divisor == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    finite(value - divisor * (value / divisor).floor())
}

pub(super) fn power(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let base = number_arg("POWER", &args[0], ctx)?;
    let exponent = number_arg("POWER", &args[1], ctx)?;
    evaluator::power(base, exponent)
}

/// INT(number), rounding down toward negative infinity
pub(super) fn int(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Number(number_arg("INT", &args[0], ctx)?.floor()))
}
