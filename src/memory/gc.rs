//! Mark-and-sweep collection over the heap's two pools
//!
//! # Roots
//!
//! A collection marks from:
//! - Every value on the heap's shadow root stack
//! - The extra roots passed by the caller (the global environment and the
//!   symbol table's values)
//!
//! # Marking
//!
//! Marking uses an explicit worklist. Pairs and closures mark their cell,
//! queue the `car` and continue along the `cdr`, so long lists never grow the
//! native stack. Symbols and strings mark their string slot. Already-marked
//! cells stop the walk, which makes cyclic structure safe.
//!
//! # Sweeping
//!
//! Unmarked cells are reset to the error marker and returned to the free
//! list; unmarked strings are dropped. Marks are cleared afterwards.

use super::heap::Heap;
use super::value::{Kind, Value};

/// Lifetime counters for one heap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collections: u64,
    pub cells_freed: u64,
    pub strings_freed: u64,
    pub last_cells_freed: usize,
    pub last_strings_freed: usize,
}

/// Outcome of a single collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcReport {
    pub cells_freed: usize,
    pub strings_freed: usize,
    pub cells_live: usize,
    pub strings_live: usize,
}

impl Heap {
    /// Run a full collection.
    ///
    /// Anything not reachable from the root stack or `extra_roots` is
    /// reclaimed; reachable values keep their indices.
    pub fn collect<I>(&mut self, extra_roots: I) -> GcReport
    where
        I: IntoIterator<Item = Value>,
    {
        let mut worklist: Vec<Value> = self.roots.clone();
        worklist.extend(extra_roots);
        tracing::trace!(
            roots = worklist.len(),
            cells_in_use = self.cells_in_use(),
            "gc: mark"
        );

        self.mark(worklist);
        let (cells_freed, strings_freed) = self.sweep();

        self.stats.collections += 1;
        self.stats.cells_freed += cells_freed as u64;
        self.stats.strings_freed += strings_freed as u64;
        self.stats.last_cells_freed = cells_freed;
        self.stats.last_strings_freed = strings_freed;

        let report = GcReport {
            cells_freed,
            strings_freed,
            cells_live: self.cells_in_use(),
            strings_live: self.strings_in_use(),
        };
        tracing::debug!(
            collection = self.stats.collections,
            cells_freed,
            strings_freed,
            cells_live = report.cells_live,
            strings_live = report.strings_live,
            "gc: done"
        );
        report
    }

    fn mark(&mut self, mut worklist: Vec<Value>) {
        while let Some(mut value) = worklist.pop() {
            loop {
                match value.kind() {
                    Kind::Pair(index) | Kind::Closure(index) => {
                        let i = index as usize;
                        if i >= self.cells.len() || self.cell_marks.get(i) {
                            break;
                        }
                        self.cell_marks.set(i);
                        let cell = self.cells[i];
                        worklist.push(cell.car);
                        value = cell.cdr;
                    }
                    Kind::Symbol(index) | Kind::String(index) => {
                        let i = index as usize;
                        if i < self.strings.len() && self.strings[i].is_some() {
                            self.string_marks.set(i);
                        }
                        break;
                    }
                    _ => break,
                }
            }
        }
    }

    fn sweep(&mut self) -> (usize, usize) {
        let mut cells_freed = 0;
        for i in 0..self.cells.len() {
            if self.cell_live.get(i) && !self.cell_marks.get(i) {
                self.cells[i].car = Value::ERROR;
                self.cells[i].cdr = Value::ERROR;
                self.cell_live.clear(i);
                self.cell_free.push(i as u32);
                cells_freed += 1;
            }
        }
        self.cell_marks.clear_all();

        let mut strings_freed = 0;
        for i in 0..self.strings.len() {
            if self.strings[i].is_some() && !self.string_marks.get(i) {
                self.strings[i] = None;
                self.string_free.push(i as u32);
                strings_freed += 1;
            }
        }
        self.string_marks.clear_all();

        debug_assert_eq!(self.cell_live.count(), self.cells_in_use());
        (cells_freed, strings_freed)
    }
}
