//! Dependency graph between the cells of one sheet
//!
//! An edge `A -> B` means B's formula reads A. Edges of a cell are replaced
//! wholesale whenever its formula is recompiled. Evaluation order comes from
//! Tarjan's strongly connected components over the dirty subgraph, so cycles
//! fall out of the same pass that orders everything else.

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::{BTreeSet, VecDeque};

use crate::core::reference::CellCoord;

/// One step of a recalculation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Evaluate this cell; its dirty precedents have already been handled
    Evaluate(CellCoord),
    /// These cells read each other; none of them can be evaluated
    Cycle(Vec<CellCoord>),
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraphMap<CellCoord, ()>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cells `cell` reads with `precedents`.
    ///
    /// Only the difference is applied: stale edges are removed, new edges
    /// added. Nodes left without any edge are dropped.
    pub fn set_precedents(&mut self, cell: CellCoord, precedents: &BTreeSet<CellCoord>) {
        let old: BTreeSet<CellCoord> = self.precedents(cell).into_iter().collect();

        for stale in old.difference(precedents) {
            self.graph.remove_edge(*stale, cell);
            self.prune(*stale);
        }
        for added in precedents.difference(&old) {
            self.graph.add_edge(*added, cell, ());
        }
        self.prune(cell);
    }

    fn prune(&mut self, node: CellCoord) {
        if self.graph.contains_node(node)
            && self.graph.neighbors_directed(node, Direction::Incoming).next().is_none()
            && self.graph.neighbors_directed(node, Direction::Outgoing).next().is_none()
        {
            self.graph.remove_node(node);
        }
    }

    /// Cells `cell` reads, sorted
    pub fn precedents(&self, cell: CellCoord) -> Vec<CellCoord> {
        self.neighbors(cell, Direction::Incoming)
    }

    /// Cells that read `cell`, sorted
    pub fn dependents(&self, cell: CellCoord) -> Vec<CellCoord> {
        self.neighbors(cell, Direction::Outgoing)
    }

    fn neighbors(&self, cell: CellCoord, dir: Direction) -> Vec<CellCoord> {
        if !self.graph.contains_node(cell) {
            return Vec::new();
        }
        let mut cells: Vec<CellCoord> = self.graph.neighbors_directed(cell, dir).collect();
        cells.sort();
        cells.dedup();
        cells
    }

    /// `start` plus every cell that transitively reads it
    pub fn dependent_closure(&self, start: CellCoord) -> BTreeSet<CellCoord> {
        let mut closure = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(cell) = queue.pop_front() {
            if !self.graph.contains_node(cell) {
                continue;
            }
            for dependent in self.graph.neighbors_directed(cell, Direction::Outgoing) {
                if closure.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        closure
    }

    /// Order `dirty` so every cell comes after the dirty cells it reads.
    ///
    /// Strongly connected components of more than one cell, and cells that
    /// read themselves, are reported as [`Step::Cycle`] at the position the
    /// component would occupy. Output is deterministic for a given graph.
    pub fn evaluation_order(&self, dirty: &BTreeSet<CellCoord>) -> Vec<Step> {
        let mut sub: DiGraphMap<CellCoord, ()> = DiGraphMap::new();
        for &cell in dirty {
            sub.add_node(cell);
        }
        for &cell in dirty {
            if !self.graph.contains_node(cell) {
                continue;
            }
            for dependent in self.graph.neighbors_directed(cell, Direction::Outgoing) {
                if dirty.contains(&dependent) {
                    sub.add_edge(cell, dependent, ());
                }
            }
        }

        // tarjan_scc yields components in reverse topological order
        let mut components = tarjan_scc(&sub);
        components.reverse();

        components
            .into_iter()
            .map(|mut component| {
                if component.len() == 1 && !sub.contains_edge(component[0], component[0]) {
                    Step::Evaluate(component[0])
                } else {
                    component.sort();
                    Step::Cycle(component)
                }
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
