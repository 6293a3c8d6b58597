//! Cell and value types shared by the store, the evaluator and the engine

use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::core::reference::{CellCoord, RangeRef, Reference};
use crate::error::{FormulaError, GridcalcError, GridcalcResult};

/// Identifier of one sheet. Sheets recalculate independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(pub u32);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet#{}", self.0)
    }
}

/// Fully qualified position of a cell: (sheet, row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub sheet: SheetId,
    pub coord: CellCoord,
}

impl CellAddress {
    pub fn new(sheet: SheetId, coord: CellCoord) -> Self {
        Self { sheet, coord }
    }

    /// Build an address from 1-based row/column numbers, rejecting zero.
    pub fn checked(sheet: SheetId, row: u32, col: u32) -> GridcalcResult<Self> {
        let coord = CellCoord::new(row, col);
        if !coord.is_valid() {
            return Err(GridcalcError::InvalidAddress {
                sheet: sheet.0,
                row,
                col,
            });
        }
        Ok(Self::new(sheet, coord))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.coord)
    }
}

/// A typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// An unset cell: 0 in arithmetic, "" in text
    Empty,
}

impl Value {
    /// Numeric coercion: booleans are 1/0, empty is 0, text must parse.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Empty => Some(0.0),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Empty => String::new(),
        }
    }

    /// Nonzero numbers, TRUE and non-empty text (other than "FALSE") are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Boolean(b) => *b,
            Value::Empty => false,
            Value::Text(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Format a number with at most 15 significant digits and no trailing zeros.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let abs = n.abs();
    if !(1e-9..1e15).contains(&abs) {
        return format!("{}", n);
    }
    let magnitude = abs.log10().floor() as i32;
    let decimals = (14 - magnitude).clamp(0, 24) as usize;
    let text = format!("{:.*}", decimals, n);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Outcome of evaluating a formula cell
pub type CellResult = Result<Value, FormulaError>;

/// What the raw input of a cell holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Number,
    Formula,
}

impl DataType {
    pub fn of(raw: &str) -> Self {
        if raw.starts_with('=') {
            DataType::Formula
        } else if raw.trim().parse::<f64>().is_ok_and(|n| n.is_finite()) {
            DataType::Number
        } else {
            DataType::Text
        }
    }
}

/// A stored cell: raw input plus, for formula cells, the cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Raw input exactly as the user typed it
    pub value: String,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FormulaError>,
}

impl Cell {
    pub fn new(raw: impl Into<String>) -> Self {
        let value = raw.into();
        Self {
            data_type: DataType::of(&value),
            value,
            calculated_value: None,
            error: None,
        }
    }

    /// The formula text, when this is a formula cell
    pub fn formula(&self) -> Option<&str> {
        (self.data_type == DataType::Formula).then_some(self.value.as_str())
    }

    /// Literal value of a non-formula cell
    pub fn literal(&self) -> Value {
        match self.data_type {
            DataType::Number => self
                .value
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or(Value::Empty),
            DataType::Text if self.value.is_empty() => Value::Empty,
            DataType::Text => Value::Text(self.value.clone()),
            DataType::Formula => Value::Empty,
        }
    }

    /// What a reader of this cell sees: the literal, the cached result, or the error.
    pub fn result(&self) -> CellResult {
        match self.data_type {
            DataType::Formula => match &self.error {
                Some(err) => Err(err.clone()),
                None => Ok(self.calculated_value.clone().unwrap_or(Value::Empty)),
            },
            _ => Ok(self.literal()),
        }
    }
}

/// Per-cell recalculation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Up to date
    Clean,
    /// An input changed; waiting for recompute
    Dirty,
    /// Being recomputed
    Evaluating,
    /// Last recompute produced an error value
    Error,
}
