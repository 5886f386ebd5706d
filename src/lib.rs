//! # Introduction
//!
//! scm754 is a Scheme interpreter built around a NaN-boxed value
//! representation: every value is one 64-bit word, either an IEEE-754 double
//! or a tagged quiet NaN carrying a type and an index into the heap.
//! Pairs and closures live in a fixed-capacity cell arena and strings in a
//! fixed-capacity pool, both reclaimed by a mark-and-sweep collector.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Reader → heap values → Evaluator → Printer
//! ```
//!
//! 1. [`parser`] tokenizes source and reads data into the heap.
//! 2. [`interpreter`] evaluates those data, with proper tail calls.
//! 3. [`memory`] holds the value encoding, the heap, the symbol table and the
//!    collector.
//! 4. [`snapshot`] records heap and output state after each top-level form
//!    for the visualizer.
//! 5. [`ui`] is the ratatui visualizer; not part of the stable library API.
//!
//! ## Supported language
//!
//! Special forms: `quote`, `if`, `define`, `lambda`, `let` (including named
//! `let`), `let*`, `and`, `or`. Around sixty built-in procedures covering
//! pairs, numbers, characters, strings, symbols and output.

pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;
pub mod ui;
