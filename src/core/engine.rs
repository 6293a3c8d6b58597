//! Recalculation engine
//!
//! Owns one dependency graph per sheet and keeps every formula cell's cached
//! result in the [`CellStore`] consistent with its inputs. A write locks only
//! its own sheet for the whole recalculation; other sheets proceed in
//! parallel.

use chrono::Local;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, debug_span, trace, warn};

use super::formula::{EvalContext, Formula};
use super::graph::{DependencyGraph, Step};
use crate::config::EngineConfig;
use crate::core::reference::CellCoord;
use crate::error::{FormulaError, GridcalcResult};
use crate::store::CellStore;
use crate::types::{CellAddress, CellResult, CellState, DataType, SheetId};

/// What a recalculation pass changed, in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecalcReport {
    pub recomputed: Vec<(CellCoord, CellResult)>,
    pub cycles: Vec<Vec<CellCoord>>,
}

impl RecalcReport {
    /// Result written for `coord` in this pass, if it was recomputed
    pub fn result(&self, coord: CellCoord) -> Option<&CellResult> {
        self.recomputed
            .iter()
            .find(|(c, _)| *c == coord)
            .map(|(_, result)| result)
    }

    pub fn is_empty(&self) -> bool {
        self.recomputed.is_empty()
    }
}

#[derive(Debug, Default)]
struct SheetState {
    graph: DependencyGraph,
    formulas: HashMap<CellCoord, Formula>,
    states: HashMap<CellCoord, CellState>,
}

/// The formula engine
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    sheets: DashMap<SheetId, Arc<Mutex<SheetState>>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sheets: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn sheet(&self, sheet: SheetId) -> Arc<Mutex<SheetState>> {
        // Clone the Arc so the map shard is released before the sheet lock is taken
        Arc::clone(self.sheets.entry(sheet).or_default().value())
    }

    fn existing_sheet(&self, sheet: SheetId) -> Option<Arc<Mutex<SheetState>>> {
        self.sheets.get(&sheet).map(|entry| Arc::clone(entry.value()))
    }

    /// React to a user edit of one cell.
    ///
    /// The application has already stored `raw` at the address; the engine
    /// recompiles the cell, updates its edges and recomputes every formula
    /// that depends on it. Formula failures are stored on the cells, never
    /// returned here. Only a zero row or column is an error.
    pub fn on_cell_written(
        &self,
        store: &dyn CellStore,
        sheet: SheetId,
        row: u32,
        col: u32,
        raw: &str,
    ) -> GridcalcResult<RecalcReport> {
        let addr = CellAddress::checked(sheet, row, col)?;
        let coord = addr.coord;

        let sheet_state = self.sheet(sheet);
        let mut state = lock(&sheet_state);

        let span = debug_span!("recalc", %sheet, cell = %coord);
        let _enter = span.enter();

        if DataType::of(raw) == DataType::Formula {
            let formula = Formula::compile(raw, &self.config);
            state.graph.set_precedents(coord, formula.precedents());
            state.formulas.insert(coord, formula);
        } else {
            state.graph.set_precedents(coord, &BTreeSet::new());
            state.formulas.remove(&coord);
            state.states.remove(&coord);
        }

        let dirty: BTreeSet<CellCoord> = state
            .graph
            .dependent_closure(coord)
            .into_iter()
            .filter(|c| state.formulas.contains_key(c))
            .collect();

        debug!(dirty = dirty.len(), "cell written");
        Ok(self.recompute(&mut state, store, sheet, dirty))
    }

    /// React to a cell being cleared; same as writing empty input
    pub fn on_cell_cleared(
        &self,
        store: &dyn CellStore,
        sheet: SheetId,
        row: u32,
        col: u32,
    ) -> GridcalcResult<RecalcReport> {
        self.on_cell_written(store, sheet, row, col, "")
    }

    /// One-shot evaluation for previews. Does not touch any graph or cell.
    pub fn evaluate_formula(&self, store: &dyn CellStore, sheet: SheetId, text: &str) -> CellResult {
        let formula = Formula::compile(text, &self.config);
        let ctx = EvalContext::new(store, sheet, &self.config);
        formula.evaluate(&ctx)
    }

    /// Rebuild a sheet from the store and recompute every formula.
    ///
    /// Used after a restart, when the engine holds no graph for the sheet.
    pub fn recalculate_sheet(&self, store: &dyn CellStore, sheet: SheetId) -> RecalcReport {
        let sheet_state = self.sheet(sheet);
        let mut state = lock(&sheet_state);

        let span = debug_span!("recalc_sheet", %sheet);
        let _enter = span.enter();

        *state = SheetState::default();
        for addr in store.addresses(sheet) {
            let Some(cell) = store.get_cell(&addr) else {
                continue;
            };
            if let Some(text) = cell.formula() {
                let formula = Formula::compile(text, &self.config);
                state.graph.set_precedents(addr.coord, formula.precedents());
                state.formulas.insert(addr.coord, formula);
            }
        }

        let dirty: BTreeSet<CellCoord> = state.formulas.keys().copied().collect();
        debug!(formulas = dirty.len(), "sheet rebuilt");
        self.recompute(&mut state, store, sheet, dirty)
    }

    /// Recalculation state of a formula cell; None for literal or unknown cells
    pub fn cell_state(&self, addr: &CellAddress) -> Option<CellState> {
        let sheet_state = self.existing_sheet(addr.sheet)?;
        let state = lock(&sheet_state);
        state.states.get(&addr.coord).copied()
    }

    /// Cells the formula at `addr` reads
    pub fn precedents(&self, addr: &CellAddress) -> Vec<CellCoord> {
        let Some(sheet_state) = self.existing_sheet(addr.sheet) else {
            return Vec::new();
        };
        let state = lock(&sheet_state);
        state.graph.precedents(addr.coord)
    }

    /// Formula cells that read `addr`
    pub fn dependents(&self, addr: &CellAddress) -> Vec<CellCoord> {
        let Some(sheet_state) = self.existing_sheet(addr.sheet) else {
            return Vec::new();
        };
        let state = lock(&sheet_state);
        state.graph.dependents(addr.coord)
    }

    fn recompute(
        &self,
        state: &mut SheetState,
        store: &dyn CellStore,
        sheet: SheetId,
        dirty: BTreeSet<CellCoord>,
    ) -> RecalcReport {
        let mut report = RecalcReport::default();
        if dirty.is_empty() {
            return report;
        }

        for coord in &dirty {
            state.states.insert(*coord, CellState::Dirty);
        }

        // One clock reading per pass so TODAY/NOW agree across cells
        let ctx = EvalContext::with_now(store, sheet, &self.config, Local::now().naive_local());

        for step in state.graph.evaluation_order(&dirty) {
            match step {
                Step::Evaluate(coord) => {
                    let Some(formula) = state.formulas.get(&coord) else {
                        continue;
                    };
                    state.states.insert(coord, CellState::Evaluating);
                    let result = formula.evaluate(&ctx);
                    trace!(cell = %coord, ?result, "evaluated");
                    self.finish(state, store, sheet, coord, result, &mut report);
                }
                Step::Cycle(cells) => {
                    let members: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
                    warn!(%sheet, cells = %members.join(", "), "circular reference");
                    for &coord in &cells {
                        self.finish(
                            state,
                            store,
                            sheet,
                            coord,
                            Err(FormulaError::CircularReference),
                            &mut report,
                        );
                    }
                    report.cycles.push(cells);
                }
            }
        }

        debug!(
            recomputed = report.recomputed.len(),
            cycles = report.cycles.len(),
            "recalculation finished"
        );
        report
    }

    fn finish(
        &self,
        state: &mut SheetState,
        store: &dyn CellStore,
        sheet: SheetId,
        coord: CellCoord,
        result: CellResult,
        report: &mut RecalcReport,
    ) {
        let cell_state = if result.is_ok() {
            CellState::Clean
        } else {
            CellState::Error
        };
        state.states.insert(coord, cell_state);
        store.set_calculated_value(&CellAddress::new(sheet, coord), result.clone());
        report.recomputed.push((coord, result));
    }
}

fn lock(sheet: &Mutex<SheetState>) -> MutexGuard<'_, SheetState> {
    sheet.lock().unwrap_or_else(PoisonError::into_inner)
}
