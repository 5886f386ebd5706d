//! Symbol interning
//!
//! A symbol's payload is the string-pool index holding its name, so two
//! symbols are `eq?` exactly when they share a slot. The table maps name
//! bytes to the one canonical symbol for that name and keeps every interned
//! name alive across collections (its values are passed to the collector as
//! extra roots).

use super::heap::{Heap, HeapError};
use super::value::Value;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    by_name: FxHashMap<Box<[u8]>, Value>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical symbol for `name`, allocating its string only
    /// when the name has not been seen before.
    pub fn intern(&mut self, heap: &mut Heap, name: &[u8]) -> Result<Value, HeapError> {
        if let Some(&symbol) = self.by_name.get(name) {
            return Ok(symbol);
        }
        let string = heap.make_string(name)?;
        let symbol = Value::symbol(string.index());
        self.by_name.insert(name.into(), symbol);
        Ok(symbol)
    }

    /// Intern an existing string or symbol value.
    ///
    /// An equal name already in the table wins; otherwise the value's own
    /// slot becomes the canonical one and nothing is allocated.
    pub fn intern_value(&mut self, heap: &Heap, value: Value) -> Result<Value, HeapError> {
        let bytes = heap.string_bytes(value)?;
        if let Some(&symbol) = self.by_name.get(bytes) {
            return Ok(symbol);
        }
        let symbol = Value::symbol(value.index());
        self.by_name.insert(bytes.into(), symbol);
        Ok(symbol)
    }

    /// Canonical symbol for `name`, if interned
    pub fn get(&self, name: &[u8]) -> Option<Value> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every interned symbol, for use as collector roots
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.by_name.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut heap = Heap::new(2, 8, 2);
        let mut table = SymbolTable::new();
        let a = table.intern(&mut heap, b"foo").unwrap();
        let b = table.intern(&mut heap, b"foo").unwrap();
        assert_eq!(a, b);
        assert_eq!(heap.strings_in_use(), 1);
        assert_ne!(a, table.intern(&mut heap, b"bar").unwrap());
    }

    #[test]
    fn test_intern_value_reuses_slot() {
        let mut heap = Heap::new(2, 8, 2);
        let mut table = SymbolTable::new();
        let s = heap.make_string(b"fresh").unwrap();
        let sym = table.intern_value(&heap, s).unwrap();
        assert_eq!(sym.index(), s.index());
        assert_eq!(table.intern(&mut heap, b"fresh").unwrap(), sym);

        let other = heap.make_string(b"fresh").unwrap();
        assert_eq!(table.intern_value(&heap, other).unwrap(), sym);
    }

    #[test]
    fn test_interned_names_survive_collection() {
        let mut heap = Heap::new(2, 4, 2);
        let mut table = SymbolTable::new();
        let sym = table.intern(&mut heap, b"kept").unwrap();
        heap.make_string(b"garbage").unwrap();
        heap.collect(table.values());
        assert_eq!(heap.string_bytes(sym).unwrap(), b"kept");
        assert_eq!(heap.strings_in_use(), 1);
    }
}
