//! Built-in function library
//!
//! Every function is registered in [`BUILTINS`] with its arity. Arity is
//! checked before the function body runs; arguments are evaluated by the
//! function itself, so IF and IFERROR can skip the branch they don't take.

mod aggregate;
mod dates;
mod logical;
mod lookup;
mod math;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use super::evaluator::{evaluate, EvalContext};
use super::parser::Expr;
use super::resolver::{resolve_cell, resolve_range, RangeValues};
use crate::error::FormulaError;
use crate::types::Value;

/// Signature shared by every built-in
pub type FunctionImpl = fn(&[Expr], &EvalContext<'_>) -> Result<Value, FormulaError>;

/// Accepted argument count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Between(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Between(min, max) => write!(f, "{}-{}", min, max),
            Arity::AtLeast(min) => write!(f, "{}+", min),
        }
    }
}

/// A registered built-in function
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub eval: FunctionImpl,
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

macro_rules! builtin {
    ($name:literal, $arity:expr, $eval:path) => {
        FunctionSpec {
            name: $name,
            arity: $arity,
            eval: $eval,
        }
    };
}

/// All built-in functions, grouped by category
pub static BUILTINS: &[FunctionSpec] = &[
    // Aggregates
    builtin!("SUM", Arity::AtLeast(1), aggregate::sum),
    builtin!("AVERAGE", Arity::AtLeast(1), aggregate::average),
    builtin!("AVG", Arity::AtLeast(1), aggregate::average),
    builtin!("COUNT", Arity::AtLeast(1), aggregate::count),
    builtin!("COUNTA", Arity::AtLeast(1), aggregate::counta),
    builtin!("MIN", Arity::AtLeast(1), aggregate::min),
    builtin!("MAX", Arity::AtLeast(1), aggregate::max),
    builtin!("MEDIAN", Arity::AtLeast(1), aggregate::median),
    // Logical
    builtin!("IF", Arity::Between(2, 3), logical::if_),
    builtin!("AND", Arity::AtLeast(1), logical::and),
    builtin!("OR", Arity::AtLeast(1), logical::or),
    builtin!("NOT", Arity::Exact(1), logical::not),
    builtin!("IFERROR", Arity::Exact(2), logical::iferror),
    // Lookup
    builtin!("VLOOKUP", Arity::Between(3, 4), lookup::vlookup),
    builtin!("INDEX", Arity::Between(2, 3), lookup::index),
    builtin!("MATCH", Arity::Between(2, 3), lookup::match_),
    // Math
    builtin!("ROUND", Arity::Between(1, 2), math::round),
    builtin!("ROUNDUP", Arity::Between(1, 2), math::roundup),
    builtin!("ROUNDDOWN", Arity::Between(1, 2), math::rounddown),
    builtin!("ABS", Arity::Exact(1), math::abs),
    builtin!("SQRT", Arity::Exact(1), math::sqrt),
    builtin!("MOD", Arity::Exact(2), math::modulo),
    builtin!("POWER", Arity::Exact(2), math::power),
    builtin!("INT", Arity::Exact(1), math::int),
    // Text
    builtin!("CONCATENATE", Arity::AtLeast(1), text::concatenate),
    builtin!("CONCAT", Arity::AtLeast(1), text::concatenate),
    builtin!("LEFT", Arity::Between(1, 2), text::left),
    builtin!("RIGHT", Arity::Between(1, 2), text::right),
    builtin!("MID", Arity::Exact(3), text::mid),
    builtin!("LEN", Arity::Exact(1), text::len),
    builtin!("UPPER", Arity::Exact(1), text::upper),
    builtin!("LOWER", Arity::Exact(1), text::lower),
    builtin!("TRIM", Arity::Exact(1), text::trim),
    // Dates
    builtin!("TODAY", Arity::Exact(0), dates::today),
    builtin!("NOW", Arity::Exact(0), dates::now),
    builtin!("DATE", Arity::Exact(3), dates::date),
    builtin!("YEAR", Arity::Exact(1), dates::year),
    builtin!("MONTH", Arity::Exact(1), dates::month),
    builtin!("DAY", Arity::Exact(1), dates::day),
];

fn registry() -> &'static HashMap<&'static str, &'static FunctionSpec> {
    static REGISTRY: OnceLock<HashMap<&'static str, &'static FunctionSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| BUILTINS.iter().map(|spec| (spec.name, spec)).collect())
}

/// Find a built-in by name (case-insensitive)
pub fn lookup(name: &str) -> Option<&'static FunctionSpec> {
    registry().get(name.to_ascii_uppercase().as_str()).copied()
}

/// Check arity and run a built-in
pub fn call(name: &str, args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let spec = lookup(name).ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    if !spec.arity.accepts(args.len()) {
        return Err(FormulaError::Argument(format!(
            "{} requires {} argument(s), got {}",
            spec.name,
            spec.arity,
            args.len()
        )));
    }

    (spec.eval)(args, ctx)
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument helpers
// ─────────────────────────────────────────────────────────────────────────────

/// A value collected from an argument list
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArgValue {
    pub value: Value,
    /// Read from a cell or range rather than computed from an expression
    pub from_reference: bool,
}

/// Flatten arguments into values: ranges row-major, then scalars in order.
pub(crate) fn flatten_values(
    args: &[Expr],
    ctx: &EvalContext<'_>,
) -> Result<Vec<ArgValue>, FormulaError> {
    let mut values = Vec::new();

    for arg in args {
        match arg {
            Expr::RangeRef(range) => {
                let cells = resolve_range(ctx, *range)?;
                values.extend(cells.into_values().into_iter().map(|value| ArgValue {
                    value,
                    from_reference: true,
                }));
            }
            Expr::CellRef(coord) => values.push(ArgValue {
                value: resolve_cell(ctx, *coord)?,
                from_reference: true,
            }),
            _ => values.push(ArgValue {
                value: evaluate(arg, ctx)?,
                from_reference: false,
            }),
        }
    }

    Ok(values)
}

/// Numbers from an argument list.
///
/// Referenced cells only contribute when they hold numbers. Direct scalar
/// arguments must coerce to a number.
pub(crate) fn collect_numbers(
    func: &str,
    args: &[Expr],
    ctx: &EvalContext<'_>,
) -> Result<Vec<f64>, FormulaError> {
    let mut numbers = Vec::new();

    for arg in flatten_values(args, ctx)? {
        match (arg.from_reference, &arg.value) {
            (true, Value::Number(n)) => numbers.push(*n),
            (true, _) => {}
            (false, value) => numbers.push(number_value(func, value)?),
        }
    }

    Ok(numbers)
}

fn number_value(func: &str, value: &Value) -> Result<f64, FormulaError> {
    value.as_number().ok_or_else(|| {
        FormulaError::TypeMismatch(format!(
            "{} expects a number, got \"{}\"",
            func,
            value.as_text()
        ))
    })
}

/// Evaluate one argument and coerce it to a number
pub(crate) fn number_arg(
    func: &str,
    arg: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<f64, FormulaError> {
    number_value(func, &evaluate(arg, ctx)?)
}

/// Evaluate an optional argument, falling back to `default` when absent
pub(crate) fn optional_number_arg(
    func: &str,
    arg: Option<&Expr>,
    default: f64,
    ctx: &EvalContext<'_>,
) -> Result<f64, FormulaError> {
    match arg {
        Some(arg) => number_arg(func, arg, ctx),
        None => Ok(default),
    }
}

/// Evaluate one argument as text
pub(crate) fn text_arg(arg: &Expr, ctx: &EvalContext<'_>) -> Result<String, FormulaError> {
    Ok(evaluate(arg, ctx)?.as_text())
}

/// Evaluate an argument that must be a cell or range reference
pub(crate) fn range_arg(
    func: &str,
    arg: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<RangeValues, FormulaError> {
    match arg {
        Expr::RangeRef(range) => resolve_range(ctx, *range),
        Expr::CellRef(coord) => Ok(RangeValues::single(resolve_cell(ctx, *coord)?)),
        _ => Err(FormulaError::TypeMismatch(format!(
            "{} expects a range argument",
            func
        ))),
    }
}

/// A 1-based position argument (column index, row number, ...)
pub(crate) fn position_arg(
    func: &str,
    what: &str,
    arg: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<usize, FormulaError> {
    let n = number_arg(func, arg, ctx)?.trunc();
    if n < 1.0 {
        return Err(FormulaError::Argument(format!(
            "{} {} must be at least 1, got {}",
            func, what, n
        )));
    }
    Ok(n as usize)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_lookup_case_insensitive() {
        assert_eq!(lookup("sum").map(|s| s.name), Some("SUM"));
        assert_eq!(lookup("VLookup").map(|s| s.name), Some("VLOOKUP"));
        assert!(lookup("NOPE").is_none());
    }

    #[test]
    fn test_builtin_names_unique() {
        assert_eq!(registry().len(), BUILTINS.len());
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            eval("=FOO(1)"),
            Err(FormulaError::UnknownFunction("FOO".into()))
        );
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(eval("=ABS()"), Err(FormulaError::Argument(_))));
        assert!(matches!(eval("=ABS(1, 2)"), Err(FormulaError::Argument(_))));
        assert!(matches!(eval("=SUM()"), Err(FormulaError::Argument(_))));
        assert!(matches!(eval("=MID(\"a\", 1)"), Err(FormulaError::Argument(_))));
        assert!(matches!(eval("=TODAY(1)"), Err(FormulaError::Argument(_))));
    }

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::Exact(2).to_string(), "2");
        assert_eq!(Arity::Between(1, 2).to_string(), "1-2");
        assert_eq!(Arity::AtLeast(1).to_string(), "1+");
    }
}
