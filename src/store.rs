//! Cell storage boundary
//!
//! The engine never owns cell contents. It reads them through [`CellStore`]
//! and writes recomputed results back through the same trait. Persistence,
//! transport and raw-input writes belong to the surrounding application.

use dashmap::DashMap;
use tracing::debug;

use crate::types::{Cell, CellAddress, CellResult, DataType, SheetId, Value};

/// Storage the engine reads cells from and writes results to.
///
/// Methods take `&self` so one store can serve several sheets recalculating
/// on different threads.
pub trait CellStore: Send + Sync {
    /// Current contents of a cell, or None when it was never written.
    fn get_cell(&self, addr: &CellAddress) -> Option<Cell>;

    /// Persist the result of recomputing a formula cell.
    fn set_calculated_value(&self, addr: &CellAddress, result: CellResult);

    /// Every written cell of a sheet, in row-major order.
    fn addresses(&self, sheet: SheetId) -> Vec<CellAddress>;
}

/// In-memory [`CellStore`] backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryStore {
    cells: DashMap<CellAddress, Cell>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Application-side write of raw input. Empty input clears the cell.
    pub fn write(&self, addr: CellAddress, raw: impl Into<String>) {
        let raw = raw.into();
        if raw.is_empty() {
            self.cells.remove(&addr);
        } else {
            self.cells.insert(addr, Cell::new(raw));
        }
    }

    pub fn clear(&self, addr: &CellAddress) {
        self.cells.remove(addr);
    }

    /// What a reader sees at `addr`; unset cells read as empty.
    pub fn value(&self, addr: &CellAddress) -> CellResult {
        self.cells
            .get(addr)
            .map(|cell| cell.result())
            .unwrap_or(Ok(Value::Empty))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl CellStore for MemoryStore {
    fn get_cell(&self, addr: &CellAddress) -> Option<Cell> {
        self.cells.get(addr).map(|cell| cell.clone())
    }

    fn set_calculated_value(&self, addr: &CellAddress, result: CellResult) {
        let Some(mut cell) = self.cells.get_mut(addr) else {
            debug!(%addr, "dropping result for a cell that no longer exists");
            return;
        };
        if cell.data_type != DataType::Formula {
            debug!(%addr, "dropping result for a cell that no longer holds a formula");
            return;
        }
        match result {
            Ok(value) => {
                cell.calculated_value = Some(value);
                cell.error = None;
            }
            Err(err) => {
                cell.calculated_value = None;
                cell.error = Some(err);
            }
        }
    }

    fn addresses(&self, sheet: SheetId) -> Vec<CellAddress> {
        let mut addrs: Vec<CellAddress> = self
            .cells
            .iter()
            .map(|entry| *entry.key())
            .filter(|addr| addr.sheet == sheet)
            .collect();
        addrs.sort();
        addrs
    }
}
