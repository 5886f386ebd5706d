//! Fixed-capacity heap for pairs, closures and strings
//!
//! This module provides the interpreter's only dynamic storage:
//! - A cell pool: two [`Value`] slots (`car`, `cdr`) per cell, used by pairs
//!   and closures
//! - A string pool: owned byte buffers shared by string and symbol values
//! - A shadow stack of root values registered by in-flight evaluator frames
//!
//! # Ownership
//!
//! Values refer to storage by pool index, never by pointer, so cyclic lists
//! are just indices pointing at each other. A referenced slot must be live
//! (allocated and not yet swept); handing a stale index to an accessor is a
//! programming error caught by debug assertions.
//!
//! # Capacity
//!
//! Both pools are sized once at construction and never grow. When a free list
//! runs dry, allocation fails with [`HeapError::OutOfCells`] or
//! [`HeapError::OutOfStrings`]; reclaiming space is the collector's job
//! (see [`super::gc`]).

use super::gc::GcStats;
use super::value::Value;
use std::borrow::Cow;
use std::fmt;

/// Errors raised by the memory layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// Cell pool exhausted
    OutOfCells { capacity: usize },

    /// String pool exhausted
    OutOfStrings { capacity: usize },

    /// Shadow root stack exhausted
    RootStackOverflow { capacity: usize },

    /// Operand has the wrong tag for the operation
    WrongType {
        operation: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    /// List walk visited more cells than the pool holds
    CircularList { operation: &'static str },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::OutOfCells { capacity } => {
                write!(f, "out of memory: all {} cells in use", capacity)
            }
            HeapError::OutOfStrings { capacity } => {
                write!(f, "out of string memory: all {} strings in use", capacity)
            }
            HeapError::RootStackOverflow { capacity } => {
                write!(f, "stack overflow: {} roots registered", capacity)
            }
            HeapError::WrongType {
                operation,
                expected,
                got,
            } => write!(f, "{}: needs a {}, got {}", operation, expected, got),
            HeapError::CircularList { operation } => {
                write!(f, "{}: circular list", operation)
            }
        }
    }
}

impl std::error::Error for HeapError {}

/// One pool slot: storage for a pair or a closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub car: Value,
    pub cdr: Value,
}

impl Cell {
    const EMPTY: Cell = Cell {
        car: Value::ERROR,
        cdr: Value::ERROR,
    };
}

/// Compact one-bit-per-slot set
#[derive(Debug, Clone)]
pub(crate) struct Bitset {
    words: Vec<u64>,
}

impl Bitset {
    pub(crate) fn new(len: usize) -> Self {
        Bitset {
            words: vec![0; len.div_ceil(64)],
        }
    }

    #[inline]
    pub(crate) fn get(&self, i: usize) -> bool {
        self.words[i / 64] & (1 << (i % 64)) != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize) {
        self.words[i / 64] |= 1 << (i % 64);
    }

    #[inline]
    pub(crate) fn clear(&mut self, i: usize) {
        self.words[i / 64] &= !(1 << (i % 64));
    }

    pub(crate) fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub(crate) fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Handle to a registered root, valid until the stack is truncated below it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootSlot(usize);

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    pub(super) cells: Vec<Cell>,
    pub(super) cell_free: Vec<u32>,
    pub(super) cell_live: Bitset,
    pub(super) cell_marks: Bitset,

    pub(super) strings: Vec<Option<Box<[u8]>>>,
    pub(super) string_free: Vec<u32>,
    pub(super) string_marks: Bitset,

    pub(super) roots: Vec<Value>,
    root_capacity: usize,

    pub(super) stats: GcStats,
}

impl Heap {
    /// Create a heap with fixed pool sizes.
    ///
    /// Free lists hand out the lowest index first, so the first strings
    /// allocated on a fresh heap occupy slots `0, 1, 2, ...`.
    pub fn new(cell_capacity: usize, string_capacity: usize, root_capacity: usize) -> Self {
        let cell_capacity = cell_capacity.min(u32::MAX as usize);
        let string_capacity = string_capacity.min(u32::MAX as usize);
        Heap {
            cells: vec![Cell::EMPTY; cell_capacity],
            cell_free: (0..cell_capacity as u32).rev().collect(),
            cell_live: Bitset::new(cell_capacity),
            cell_marks: Bitset::new(cell_capacity),
            strings: vec![None; string_capacity],
            string_free: (0..string_capacity as u32).rev().collect(),
            string_marks: Bitset::new(string_capacity),
            roots: Vec::with_capacity(root_capacity),
            root_capacity,
            stats: GcStats::default(),
        }
    }

    pub fn cell_capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn string_capacity(&self) -> usize {
        self.strings.len()
    }

    pub fn free_cells(&self) -> usize {
        self.cell_free.len()
    }

    pub fn free_strings(&self) -> usize {
        self.string_free.len()
    }

    pub fn cells_in_use(&self) -> usize {
        self.cells.len() - self.cell_free.len()
    }

    pub fn strings_in_use(&self) -> usize {
        self.strings.len() - self.string_free.len()
    }

    /// Collector counters accumulated over this heap's lifetime
    pub fn gc_stats(&self) -> &GcStats {
        &self.stats
    }

    // Cells

    /// Allocate a pair holding `car` and `cdr`
    pub fn cons(&mut self, car: Value, cdr: Value) -> Result<Value, HeapError> {
        let index = self.alloc_cell(car, cdr)?;
        Ok(Value::pair(index))
    }

    /// Allocate a closure cell `(env . (params . body))`; `code` is the
    /// `(params . body)` list.
    pub fn make_closure(&mut self, env: Value, code: Value) -> Result<Value, HeapError> {
        let index = self.alloc_cell(env, code)?;
        Ok(Value::closure(index))
    }

    fn alloc_cell(&mut self, car: Value, cdr: Value) -> Result<u32, HeapError> {
        let index = self.cell_free.pop().ok_or(HeapError::OutOfCells {
            capacity: self.cells.len(),
        })?;
        let i = index as usize;
        self.cells[i] = Cell { car, cdr };
        self.cell_live.set(i);
        Ok(index)
    }

    /// Read a live cell by index
    pub fn cell(&self, index: u32) -> Option<&Cell> {
        let i = index as usize;
        if i < self.cells.len() && self.cell_live.get(i) {
            Some(&self.cells[i])
        } else {
            None
        }
    }

    fn pair_cell(&self, pair: Value, operation: &'static str) -> Result<&Cell, HeapError> {
        if !pair.is_pair() {
            return Err(HeapError::WrongType {
                operation,
                expected: "pair",
                got: pair.type_name(),
            });
        }
        let i = pair.index() as usize;
        debug_assert!(
            i < self.cells.len() && self.cell_live.get(i),
            "{}: stale pair index {}",
            operation,
            i
        );
        Ok(&self.cells[i])
    }

    fn pair_cell_mut(
        &mut self,
        pair: Value,
        operation: &'static str,
    ) -> Result<&mut Cell, HeapError> {
        if !pair.is_pair() {
            return Err(HeapError::WrongType {
                operation,
                expected: "pair",
                got: pair.type_name(),
            });
        }
        let i = pair.index() as usize;
        debug_assert!(
            i < self.cells.len() && self.cell_live.get(i),
            "{}: stale pair index {}",
            operation,
            i
        );
        Ok(&mut self.cells[i])
    }

    pub fn car(&self, pair: Value) -> Result<Value, HeapError> {
        self.pair_cell(pair, "car").map(|c| c.car)
    }

    pub fn cdr(&self, pair: Value) -> Result<Value, HeapError> {
        self.pair_cell(pair, "cdr").map(|c| c.cdr)
    }

    pub fn set_car(&mut self, pair: Value, value: Value) -> Result<(), HeapError> {
        self.pair_cell_mut(pair, "set-car!")?.car = value;
        Ok(())
    }

    pub fn set_cdr(&mut self, pair: Value, value: Value) -> Result<(), HeapError> {
        self.pair_cell_mut(pair, "set-cdr!")?.cdr = value;
        Ok(())
    }

    /// Split a closure into `(env, params, body)`
    pub fn closure_parts(&self, closure: Value) -> Result<(Value, Value, Value), HeapError> {
        let pair = closure.closure_pair().ok_or(HeapError::WrongType {
            operation: "apply",
            expected: "closure",
            got: closure.type_name(),
        })?;
        let env = self.car(pair)?;
        let code = self.cdr(pair)?;
        Ok((env, self.car(code)?, self.cdr(code)?))
    }

    /// Iterate over allocated cells in index order
    pub fn live_cells(&self) -> impl Iterator<Item = (u32, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(i, _)| self.cell_live.get(*i))
            .map(|(i, cell)| (i as u32, cell))
    }

    // Lists

    /// Build a proper list from a slice
    pub fn list_from(&mut self, items: &[Value]) -> Result<Value, HeapError> {
        items
            .iter()
            .rev()
            .try_fold(Value::NIL, |tail, &item| self.cons(item, tail))
    }

    /// Collect a proper list into a vector
    pub fn list_to_vec(&self, list: Value, operation: &'static str) -> Result<Vec<Value>, HeapError> {
        let mut items = Vec::new();
        let mut rest = list;
        while rest.is_pair() {
            if items.len() >= self.cells.len() {
                return Err(HeapError::CircularList { operation });
            }
            let cell = self.pair_cell(rest, operation)?;
            items.push(cell.car);
            rest = cell.cdr;
        }
        if !rest.is_null() {
            return Err(HeapError::WrongType {
                operation,
                expected: "proper list",
                got: rest.type_name(),
            });
        }
        Ok(items)
    }

    /// Count the pairs on a list's spine, ignoring an improper tail
    pub fn list_length(&self, list: Value, operation: &'static str) -> Result<usize, HeapError> {
        let mut count = 0;
        let mut rest = list;
        while rest.is_pair() {
            if count >= self.cells.len() {
                return Err(HeapError::CircularList { operation });
            }
            count += 1;
            rest = self.pair_cell(rest, operation)?.cdr;
        }
        Ok(count)
    }

    /// The non-pair value ending a list's spine: `()` for proper lists
    pub fn list_tail(&self, list: Value) -> Result<Value, HeapError> {
        let mut count = 0;
        let mut rest = list;
        while rest.is_pair() {
            if count >= self.cells.len() {
                return Err(HeapError::CircularList { operation: "list" });
            }
            count += 1;
            rest = self.pair_cell(rest, "list")?.cdr;
        }
        Ok(rest)
    }

    // Strings

    /// Copy bytes into a fresh string slot. Equal contents do not alias.
    pub fn make_string(&mut self, bytes: &[u8]) -> Result<Value, HeapError> {
        let index = self.string_free.pop().ok_or(HeapError::OutOfStrings {
            capacity: self.strings.len(),
        })?;
        self.strings[index as usize] = Some(bytes.into());
        Ok(Value::string(index))
    }

    /// Bytes behind a string or symbol value
    pub fn string_bytes(&self, value: Value) -> Result<&[u8], HeapError> {
        if !value.is_string() && !value.is_symbol() {
            return Err(HeapError::WrongType {
                operation: "string",
                expected: "string",
                got: value.type_name(),
            });
        }
        let i = value.index() as usize;
        match self.strings.get(i).and_then(|s| s.as_deref()) {
            Some(bytes) => Ok(bytes),
            None => {
                debug_assert!(false, "stale string index {}", i);
                Ok(&[])
            }
        }
    }

    /// Text behind a string or symbol value, lossily decoded
    pub fn string_text(&self, value: Value) -> Result<Cow<'_, str>, HeapError> {
        self.string_bytes(value).map(String::from_utf8_lossy)
    }

    /// Iterate over allocated strings in index order
    pub fn live_strings(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.strings
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|bytes| (i as u32, bytes)))
    }

    // Shadow root stack

    /// Register a value as a collection root
    pub fn push_root(&mut self, value: Value) -> Result<RootSlot, HeapError> {
        if self.roots.len() >= self.root_capacity {
            tracing::warn!(capacity = self.root_capacity, "root stack exhausted");
            return Err(HeapError::RootStackOverflow {
                capacity: self.root_capacity,
            });
        }
        self.roots.push(value);
        Ok(RootSlot(self.roots.len() - 1))
    }

    /// Register two roots at once
    pub fn push_root2(&mut self, a: Value, b: Value) -> Result<(RootSlot, RootSlot), HeapError> {
        let first = self.push_root(a)?;
        match self.push_root(b) {
            Ok(second) => Ok((first, second)),
            Err(e) => {
                self.roots.pop();
                Err(e)
            }
        }
    }

    /// Replace the value held by a registered root
    pub fn set_root(&mut self, slot: RootSlot, value: Value) {
        self.roots[slot.0] = value;
    }

    pub fn root(&self, slot: RootSlot) -> Value {
        self.roots[slot.0]
    }

    /// Current number of registered roots
    pub fn root_depth(&self) -> usize {
        self.roots.len()
    }

    pub fn root_capacity(&self) -> usize {
        self.root_capacity
    }

    /// Drop every root registered above `depth`
    pub fn truncate_roots(&mut self, depth: usize) {
        self.roots.truncate(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cons_car_cdr() {
        let mut heap = Heap::new(8, 4, 4);
        let p = heap.cons(Value::number(1.0), Value::NIL).unwrap();
        assert!(p.is_pair());
        assert_eq!(heap.car(p).unwrap(), Value::number(1.0));
        assert_eq!(heap.cdr(p).unwrap(), Value::NIL);
        assert_eq!(heap.cells_in_use(), 1);
    }

    #[test]
    fn test_car_of_non_pair() {
        let heap = Heap::new(8, 4, 4);
        let err = heap.car(Value::number(5.0)).unwrap_err();
        assert!(matches!(
            err,
            HeapError::WrongType {
                operation: "car",
                expected: "pair",
                ..
            }
        ));
    }

    #[test]
    fn test_set_car_and_cdr() {
        let mut heap = Heap::new(8, 4, 4);
        let p = heap.cons(Value::NIL, Value::NIL).unwrap();
        heap.set_car(p, Value::TRUE).unwrap();
        heap.set_cdr(p, p).unwrap();
        assert_eq!(heap.car(p).unwrap(), Value::TRUE);
        assert_eq!(heap.cdr(p).unwrap(), p);
    }

    #[test]
    fn test_out_of_cells() {
        let mut heap = Heap::new(2, 1, 1);
        heap.cons(Value::NIL, Value::NIL).unwrap();
        heap.cons(Value::NIL, Value::NIL).unwrap();
        assert_eq!(
            heap.cons(Value::NIL, Value::NIL),
            Err(HeapError::OutOfCells { capacity: 2 })
        );
    }

    #[test]
    fn test_strings_do_not_alias() {
        let mut heap = Heap::new(2, 4, 1);
        let a = heap.make_string(b"abc").unwrap();
        let b = heap.make_string(b"abc").unwrap();
        assert_ne!(a, b);
        assert_eq!(heap.string_bytes(a).unwrap(), b"abc");
        assert_eq!(heap.string_text(b).unwrap(), "abc");
    }

    #[test]
    fn test_first_strings_take_low_slots() {
        let mut heap = Heap::new(2, 4, 1);
        assert_eq!(heap.make_string(b"x").unwrap().index(), 0);
        assert_eq!(heap.make_string(b"y").unwrap().index(), 1);
    }

    #[test]
    fn test_list_helpers() {
        let mut heap = Heap::new(16, 1, 1);
        let items = [Value::number(1.0), Value::number(2.0), Value::number(3.0)];
        let list = heap.list_from(&items).unwrap();
        assert_eq!(heap.list_to_vec(list, "test").unwrap(), items);
        assert_eq!(heap.list_length(list, "test").unwrap(), 3);

        let dotted = heap.cons(Value::number(1.0), Value::number(2.0)).unwrap();
        assert!(heap.list_to_vec(dotted, "test").is_err());
        assert_eq!(heap.list_length(dotted, "test").unwrap(), 1);
    }

    #[test]
    fn test_circular_list_is_detected() {
        let mut heap = Heap::new(4, 1, 1);
        let p = heap.cons(Value::NIL, Value::NIL).unwrap();
        heap.set_cdr(p, p).unwrap();
        assert!(matches!(
            heap.list_length(p, "length"),
            Err(HeapError::CircularList { .. })
        ));
    }

    #[test]
    fn test_root_stack_overflow_and_truncate() {
        let mut heap = Heap::new(2, 1, 2);
        let depth = heap.root_depth();
        let slot = heap.push_root(Value::NIL).unwrap();
        heap.set_root(slot, Value::TRUE);
        assert_eq!(heap.root(slot), Value::TRUE);
        heap.push_root(Value::NIL).unwrap();
        assert_eq!(
            heap.push_root(Value::NIL),
            Err(HeapError::RootStackOverflow { capacity: 2 })
        );
        heap.truncate_roots(depth);
        assert_eq!(heap.root_depth(), 0);
        assert!(heap.push_root2(Value::NIL, Value::NIL).is_ok());
    }
}
