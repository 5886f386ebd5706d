//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! - **[`app`]**: application state, keyboard event loop, pane focus
//! - **[`panes`]**: stateless render functions for each visible pane
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! Construct an [`App`] from an [`Interpreter`] that has already run
//! [`Interpreter::run_recorded`], then call [`App::run`] to browse the
//! recorded history.
//!
//! [`Interpreter`]: crate::interpreter::engine::Interpreter
//! [`Interpreter::run_recorded`]: crate::interpreter::engine::Interpreter::run_recorded
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
