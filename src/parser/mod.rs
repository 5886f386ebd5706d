//! Scheme source reader
//!
//! This module turns source text into heap values:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`reader`]: Datum construction (tokens → pairs, symbols, strings, numbers)
//!
//! # Reader Implementation
//!
//! Hand-written lexer plus a recursive reader with an explicit nesting limit.
//! No external parser generator dependencies.

pub mod lexer;
pub mod reader;

pub use lexer::SourceLocation;
pub use reader::Reader;
