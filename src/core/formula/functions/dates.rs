//! Date functions: TODAY, NOW, DATE, YEAR, MONTH, DAY
//!
//! Dates are serial numbers in the 1900 date system: serial 0 is
//! 1899-12-30, so 1900-03-01 is 61. The time of day is the fractional part.

use chrono::{Datelike, Days, NaiveDate, Timelike};

use super::number_arg;
use crate::core::formula::evaluator::{evaluate, EvalContext};
use crate::core::formula::parser::Expr;
use crate::error::FormulaError;
use crate::types::Value;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("1899-12-30 is a valid date")
}

/// Days since 1899-12-30
fn date_to_serial(date: NaiveDate) -> f64 {
    (date - epoch()).num_days() as f64
}

/// The calendar day a serial number falls on
fn serial_to_date(serial: f64) -> Result<NaiveDate, FormulaError> {
    if !serial.is_finite() || serial < 0.0 {
        return Err(FormulaError::Argument(format!(
            "{} is not a valid date serial",
            serial
        )));
    }
    epoch()
        .checked_add_days(Days::new(serial.floor() as u64))
        .ok_or_else(|| FormulaError::Argument(format!("date serial {} is out of range", serial)))
}

/// A date argument: a serial number or `YYYY-MM-DD` text
fn date_arg(func: &str, arg: &Expr, ctx: &EvalContext<'_>) -> Result<NaiveDate, FormulaError> {
    let value = evaluate(arg, ctx)?;
    if let Value::Text(s) = &value {
        if let Ok(date) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            return Ok(date);
        }
    }
    let serial = value.as_number().ok_or_else(|| {
        FormulaError::TypeMismatch(format!(
            "{} expects a date, got \"{}\"",
            func,
            value.as_text()
        ))
    })?;
    serial_to_date(serial)
}

pub(super) fn today(_args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Number(date_to_serial(ctx.now.date())))
}

pub(super) fn now(_args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let day = date_to_serial(ctx.now.date());
    let seconds = f64::from(ctx.now.num_seconds_from_midnight());
    Ok(Value::Number(day + seconds / SECONDS_PER_DAY))
}

/// DATE(year, month, day)
///
/// Years 0-1899 are offset by 1900. Months and days outside their normal
/// range roll over, so DATE(2024, 13, 1) is 2025-01-01 and
/// DATE(2024, 3, 0) is 2024-02-29.
pub(super) fn date(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    let mut year = number_arg("DATE", &args[0], ctx)?.trunc() as i64;
    let month = number_arg("DATE", &args[1], ctx)?.trunc() as i64;
    let day = number_arg("DATE", &args[2], ctx)?.trunc() as i64;

    if (0..1900).contains(&year) {
        year += 1900;
    }

    let months = year.saturating_mul(12).saturating_add(month.saturating_sub(1));
    let first = i32::try_from(months.div_euclid(12))
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, months.rem_euclid(12) as u32 + 1, 1));

    let offset = day.saturating_sub(1);
    let date = first.and_then(|first| {
        if offset >= 0 {
            first.checked_add_days(Days::new(offset as u64))
        } else {
            first.checked_sub_days(Days::new(offset.unsigned_abs()))
        }
    });

    match date {
        Some(date) if date >= epoch() => Ok(Value::Number(date_to_serial(date))),
        _ => Err(FormulaError::Argument(format!(
            "DATE({}, {}, {}) is out of range",
            year, month, day
        ))),
    }
}

pub(super) fn year(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Number(f64::from(date_arg("YEAR", &args[0], ctx)?.year())))
}

pub(super) fn month(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Number(f64::from(date_arg("MONTH", &args[0], ctx)?.month())))
}

pub(super) fn day(args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, FormulaError> {
    Ok(Value::Number(f64::from(date_arg("DAY", &args[0], ctx)?.day())))
}
