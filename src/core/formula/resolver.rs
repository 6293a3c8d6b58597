//! Reference resolution
//!
//! Reads the values behind cell and range references through the
//! [`CellStore`](crate::store::CellStore). A referenced cell holding an error
//! resolves to [`FormulaError::Propagated`] with the original kind.

use super::evaluator::EvalContext;
use crate::core::reference::{CellCoord, RangeRef};
use crate::error::FormulaError;
use crate::types::{CellAddress, CellResult, Value};

/// Values of a rectangular range, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValues {
    rows: usize,
    cols: usize,
    values: Vec<Value>,
}

impl RangeValues {
    pub fn new(rows: usize, cols: usize, values: Vec<Value>) -> Self {
        debug_assert_eq!(rows * cols, values.len());
        Self { rows, cols, values }
    }

    /// A 1x1 range holding one value
    pub fn single(value: Value) -> Self {
        Self::new(1, 1, vec![value])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Value at a 0-based (row, col) offset within the range
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col)
    }

    /// Values of one 0-based column, top to bottom
    pub fn column(&self, col: usize) -> impl Iterator<Item = &Value> + '_ {
        (0..self.rows).filter_map(move |row| self.get(row, col))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// True for a single row or a single column
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }
}

/// Current value of one cell on the context's sheet.
///
/// Unset cells read as [`Value::Empty`]. Formula cells read their cached
/// result; an errored formula cell reads as a propagated error.
pub fn resolve_cell(ctx: &EvalContext<'_>, coord: CellCoord) -> CellResult {
    let addr = CellAddress::new(ctx.sheet, coord);
    match ctx.store.get_cell(&addr) {
        None => Ok(Value::Empty),
        Some(cell) => cell.result().map_err(|err| err.propagate()),
    }
}

/// Values of every cell in a range, row-major.
///
/// The first errored cell (in row-major order) fails the whole range.
pub fn resolve_range(ctx: &EvalContext<'_>, range: RangeRef) -> Result<RangeValues, FormulaError> {
    check_range_size(range, ctx.config.max_range_cells)?;

    let values = range
        .cells()
        .map(|coord| resolve_cell(ctx, coord))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RangeValues::new(range.rows(), range.cols(), values))
}

/// Reject ranges larger than the configured limit
pub fn check_range_size(range: RangeRef, max_cells: usize) -> Result<(), FormulaError> {
    if range.len() > max_cells {
        return Err(FormulaError::Argument(format!(
            "range {} has {} cells, more than the limit of {}",
            range,
            range.len(),
            max_cells
        )));
    }
    Ok(())
}
