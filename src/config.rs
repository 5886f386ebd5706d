//! Interpreter configuration
//!
//! Pool sizes are fixed when the [`Interpreter`](crate::interpreter::engine::Interpreter)
//! is created; nothing grows afterwards.

use crate::interpreter::constants::{
    DEFAULT_CELL_CAPACITY, DEFAULT_GC_INTERVAL, DEFAULT_ROOT_CAPACITY, DEFAULT_SNAPSHOT_LIMIT,
    DEFAULT_STRING_CAPACITY,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cell_capacity: usize,
    pub string_capacity: usize,
    pub root_capacity: usize,

    /// Dispatches between sampled collections; 0 disables sampling
    pub gc_interval: u64,

    /// Collect at the next dispatch once free cells drop below this
    pub gc_low_water: usize,

    /// Byte budget for recorded snapshots
    pub snapshot_limit: usize,
}

impl Config {
    /// Defaults with a custom cell pool; the low-water mark follows the size
    pub fn with_cells(cell_capacity: usize) -> Self {
        Config {
            cell_capacity,
            gc_low_water: cell_capacity / 8,
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cell_capacity: DEFAULT_CELL_CAPACITY,
            string_capacity: DEFAULT_STRING_CAPACITY,
            root_capacity: DEFAULT_ROOT_CAPACITY,
            gc_interval: DEFAULT_GC_INTERVAL,
            gc_low_water: DEFAULT_CELL_CAPACITY / 8,
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_water_tracks_capacity() {
        let config = Config::with_cells(800);
        assert_eq!(config.gc_low_water, 100);
        assert_eq!(config.string_capacity, DEFAULT_STRING_CAPACITY);
    }
}
