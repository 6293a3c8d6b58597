//! Aggregate functions: SUM, AVERAGE, COUNT, COUNTA, MIN, MAX, MEDIAN

use super::{collect_numbers, flatten_values};
use crate::core::formula::evaluator::{finite, EvalContext};
use crate::core::formula::parser::Expr;
use crate::error::FormulaError;
use crate::types::Value;

pub(super) fn sum(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let values = collect_numbers("SUM", args, ctx)?;
    finite(values.iter().sum())
}

pub(super) fn average(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let values = collect_numbers("AVERAGE", args, ctx)?;
    if values.is_empty() {
        return Err(FormulaError::DivisionByZero);
    }
    finite(values.iter().sum::<f64>() / values.len() as f64)
}

/// Counts numeric cells; direct arguments count when they coerce to a number
pub(super) fn count(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let n = flatten_values(args, ctx)?
        .into_iter()
        .filter(|arg| match &arg.value {
            Value::Number(_) => true,
            Value::Empty => false,
            other => !arg.from_reference && other.as_number().is_some(),
        })
        .count();
    Ok(Value::Number(n as f64))
}

/// Counts non-empty values
pub(super) fn counta(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let n = flatten_values(args, ctx)?
        .into_iter()
        .filter(|arg| !arg.value.is_empty())
        .count();
    Ok(Value::Number(n as f64))
}

pub(super) fn min(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let values = collect_numbers("MIN", args, ctx)?;
    Ok(Value::Number(
        values.into_iter().reduce(f64::min).unwrap_or(0.0),
    ))
}

pub(super) fn max(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let values = collect_numbers("MAX", args, ctx)?;
    Ok(Value::Number(
        values.into_iter().reduce(f64::max).unwrap_or(0.0),
    ))
}

pub(super) fn median(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let mut values = collect_numbers("MEDIAN", args, ctx)?;
    if values.is_empty() {
        return Err(FormulaError::Argument(
            "MEDIAN requires at least one number".to_string(),
        ));
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Ok(Value::Number(median))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::{ErrorKind, FormulaError};
    use crate::store::CellStore;
    use crate::types::{CellAddress, Value};

    fn sample() -> crate::store::MemoryStore {
        store_with(&[
            ("A1", "10"),
            ("A2", "20"),
            ("A3", "text"),
            ("A4", "30"),
            ("B1", "5"),
        ])
    }

    #[test]
    fn test_sum_skips_text_and_empty_cells() {
        let store = sample();
        assert_eq!(eval_in("=SUM(A1:A5)", &store), Ok(Value::Number(60.0)));
        assert_eq!(eval_in("=SUM(A1:A5, B1, 1)", &store), Ok(Value::Number(66.0)));
        assert_eq!(eval_in("=SUM(A3)", &store), Ok(Value::Number(0.0)));
    }

    #[test]
    fn test_sum_matches_cell_addition() {
        let store = store_with(&[("A1", "1.5"), ("A3", "2")]);
        assert_eq!(
            eval_in("=SUM(A1:A3)", &store),
            eval_in("=A1+A2+A3", &store)
        );
    }

    #[test]
    fn test_direct_arguments_are_coerced() {
        assert_eq!(eval("=SUM(\"4\", TRUE, 1)"), Ok(Value::Number(6.0)));
        assert!(matches!(
            eval("=SUM(\"four\")"),
            Err(FormulaError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_average() {
        let store = sample();
        assert_eq!(eval_in("=AVERAGE(A1:A4)", &store), Ok(Value::Number(20.0)));
        assert_eq!(eval_in("=AVG(A1, A2)", &store), Ok(Value::Number(15.0)));
        assert_eq!(
            eval_in("=AVERAGE(C1:C5)", &store),
            Err(FormulaError::DivisionByZero)
        );
    }

    #[test]
    fn test_count_and_counta() {
        let store = sample();
        assert_eq!(eval_in("=COUNT(A1:A5)", &store), Ok(Value::Number(3.0)));
        assert_eq!(eval_in("=COUNT(1, \"2\", \"x\")", &store), Ok(Value::Number(2.0)));
        assert_eq!(eval_in("=COUNTA(A1:A5)", &store), Ok(Value::Number(4.0)));
    }

    #[test]
    fn test_min_max_median() {
        let store = sample();
        assert_eq!(eval_in("=MIN(A1:B4)", &store), Ok(Value::Number(5.0)));
        assert_eq!(eval_in("=MAX(A1:B4)", &store), Ok(Value::Number(30.0)));
        assert_eq!(eval_in("=MIN(C1:C3)", &store), Ok(Value::Number(0.0)));
        assert_eq!(eval_in("=MEDIAN(A1:A4)", &store), Ok(Value::Number(20.0)));
        assert_eq!(eval_in("=MEDIAN(A1:B4)", &store), Ok(Value::Number(15.0)));
        assert!(matches!(
            eval_in("=MEDIAN(C1:C3)", &store),
            Err(FormulaError::Argument(_))
        ));
    }

    #[test]
    fn test_errored_cell_in_range_propagates() {
        let store = sample();
        let addr = CellAddress::new(SHEET, "A2".parse().unwrap());
        store.write(addr, "=1/0");
        store.set_calculated_value(&addr, Err(FormulaError::DivisionByZero));
        assert_eq!(
            eval_in("=SUM(A1:A4)", &store),
            Err(FormulaError::Propagated(ErrorKind::DivisionByZero))
        );
    }
}
