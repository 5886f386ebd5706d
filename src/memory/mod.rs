//! Memory model for the Scheme interpreter
//!
//! This module provides the runtime's storage:
//! - [`value`]: NaN-boxed 64-bit [`value::Value`] words
//! - [`heap`]: Fixed-capacity cell and string pools plus the shadow root stack
//! - [`gc`]: Mark-and-sweep collection over both pools
//! - [`symbols`]: Symbol interning
//!
//! # Roots
//!
//! The collector cannot see Rust locals. Any evaluator frame that holds a heap
//! value across a possible collection registers it on the heap's root stack
//! and truncates the stack back on exit, on success and error alike.

pub mod gc;
pub mod heap;
pub mod symbols;
pub mod value;

pub use heap::{Heap, HeapError};
pub use symbols::SymbolTable;
pub use value::{Kind, Value};
