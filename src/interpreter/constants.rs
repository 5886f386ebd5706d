// Constants for the Scheme interpreter

/// Cells in the pair/closure pool
pub const DEFAULT_CELL_CAPACITY: usize = 65_536;

/// Slots in the string pool (strings and symbol names)
pub const DEFAULT_STRING_CAPACITY: usize = 4_096;

/// Entries on the shadow root stack
pub const DEFAULT_ROOT_CAPACITY: usize = 2_048;

/// Evaluator dispatches between sampled collections
pub const DEFAULT_GC_INTERVAL: u64 = 1_024;

/// Snapshot history budget for the visualizer
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 256 * 1024 * 1024;

/// Elements printed per list before eliding with `...`
pub const PRINT_MAX_ELEMENTS: usize = 1_000;

/// Nesting printed before eliding with `...`
pub const PRINT_MAX_DEPTH: usize = 100;
