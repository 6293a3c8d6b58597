//! Gridcalc - spreadsheet formula engine with dependency-ordered recalculation
//!
//! This library parses spreadsheet formulas (cell references, ranges,
//! functions, operators), tracks which cells read which, and recomputes
//! derived values when inputs change, detecting cycles and propagating
//! errors from cell to cell.
//!
//! # Features
//!
//! - Excel-style formulas (SUM, AVERAGE, IF, VLOOKUP, CONCATENATE, dates, ...)
//! - Per-sheet dependency graph with cycle detection
//! - Contagious, cell-resident errors (`#DIV/0!`, `#CIRC!`, ...)
//! - Pluggable cell storage through the [`CellStore`] trait
//!
//! # Example
//!
//! ```
//! use royalbit_gridcalc::{CellAddress, Engine, EngineConfig, MemoryStore, SheetId, Value};
//!
//! let engine = Engine::new(EngineConfig::default());
//! let store = MemoryStore::new();
//! let sheet = SheetId(1);
//!
//! for (row, raw) in [(1, "50000"), (2, "35000"), (3, "=A1-A2")] {
//!     store.write(CellAddress::checked(sheet, row, 1)?, raw);
//!     engine.on_cell_written(&store, sheet, row, 1, raw)?;
//! }
//!
//! let a3 = CellAddress::checked(sheet, 3, 1)?;
//! assert_eq!(store.value(&a3), Ok(Value::Number(15000.0)));
//! # Ok::<(), royalbit_gridcalc::GridcalcError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use core::{Engine, RecalcReport};
pub use error::{ErrorKind, FormulaError, GridcalcError, GridcalcResult};
pub use store::{CellStore, MemoryStore};
pub use types::{Cell, CellAddress, CellCoord, CellResult, CellState, DataType, SheetId, Value};
