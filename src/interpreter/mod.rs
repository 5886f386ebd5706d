//! Scheme evaluation
//!
//! - [`engine`]: the [`engine::Interpreter`] state and top-level driving
//! - [`eval`]: the tail-calling evaluator and the special forms
//! - [`environment`]: frames, lookup, definition and parameter binding
//! - [`builtins`]: the built-in procedures
//! - [`ops`]: the operation table shared by all of the above
//! - [`printer`]: `write` and `display` renderings
//! - [`errors`]: the error taxonomy
//!
//! # Evaluation Model
//!
//! Source text is read into heap values, and those values are evaluated
//! directly: there is no separate syntax tree. Calls in tail position reuse
//! the evaluator's loop instead of recursing, so iterative procedures run in
//! constant Rust stack. Every value a partially finished evaluation still
//! needs is registered on the heap's shadow root stack, which lets a
//! collection run at the top of any evaluator pass.

pub mod builtins;
pub mod constants;
pub mod engine;
pub mod environment;
pub mod errors;
pub mod eval;
pub mod ops;
pub mod printer;
