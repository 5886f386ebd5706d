//! TUI pane rendering modules
//!
//! - [`source`]: source display with Scheme highlighting and the current form
//! - [`terminal`]: program output plus the current form's value or error
//! - [`environment`]: global bindings
//! - [`heap`]: pool occupancy, collector counters and live cells
//! - [`status`]: status bar with keybindings and position
//!
//! Each module exports one `render_*` function that draws from a snapshot
//! and keeps its own scroll state.

pub mod environment;
pub mod heap;
pub mod source;
pub mod status;
pub mod terminal;

pub use environment::{render_environment_pane, ListScrollState};
pub use heap::render_heap_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::{render_status_bar, StatusRenderData};
pub use terminal::render_terminal_pane;
