// Snapshot management for stepping through evaluated forms

use crate::memory::heap::Heap;
use crate::parser::SourceLocation;
use std::io::Write;

/// Output sink for `display`, `write` and `newline`.
///
/// A capturing terminal keeps everything for later inspection (tests and the
/// visualizer); an echoing one forwards straight to stdout.
#[derive(Debug, Clone, Default)]
pub struct MockTerminal {
    pub text: String,
    echo: bool,
}

impl MockTerminal {
    pub fn new() -> Self {
        MockTerminal {
            text: String::new(),
            echo: false,
        }
    }

    /// Terminal that writes to stdout instead of capturing
    pub fn echoing() -> Self {
        MockTerminal {
            text: String::new(),
            echo: true,
        }
    }

    pub fn is_echoing(&self) -> bool {
        self.echo
    }

    /// Print without newline
    pub fn print(&mut self, text: &str) {
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            // A closed stdout is not an evaluation error
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
            // Only the unfinished last line is kept, for `at_line_start`
            match text.rfind('\n') {
                Some(i) => {
                    self.text.clear();
                    self.text.push_str(&text[i + 1..]);
                }
                None => self.text.push_str(text),
            }
        } else {
            self.text.push_str(text);
        }
    }

    /// Whether the last printed character ends a line
    pub fn at_line_start(&self) -> bool {
        self.text.is_empty() || self.text.ends_with('\n')
    }

    /// Get all lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.text.split('\n').map(|s| s.to_string()).collect();
        // Remove trailing empty string if text ended with newline
        if lines.last().is_some_and(|s| s.is_empty()) {
            lines.pop();
        }
        lines
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// One global binding as shown in the visualizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: String,
}

/// State after evaluating one top-level form
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Index of the top-level form just evaluated; `None` before the first
    pub form_index: Option<usize>,
    pub location: SourceLocation,
    pub heap: Heap,
    pub terminal: MockTerminal,
    pub bindings: Vec<Binding>,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl Snapshot {
    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // Cells are two words; bitsets and free lists add roughly another word
        let cells = self.heap.cell_capacity() * 24;
        let strings: usize = self
            .heap
            .live_strings()
            .map(|(_, bytes)| bytes.len() + 16)
            .sum::<usize>()
            + self.heap.string_capacity() * 24;
        let bindings: usize = self
            .bindings
            .iter()
            .map(|b| b.name.len() + b.value.len() + 48)
            .sum();

        cells + strings + bindings + self.terminal.text.len()
    }
}

/// Manages the recorded history
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), String> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(format!(
                "Snapshot memory limit exceeded: {} + {} > {}",
                self.current_memory, snapshot_size, self.max_memory
            ));
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            form_index: None,
            location: SourceLocation::new(1, 1),
            heap: Heap::new(16, 4, 4),
            terminal: MockTerminal::new(),
            bindings: Vec::new(),
            result: None,
            error: None,
        }
    }

    #[test]
    fn test_terminal_lines() {
        let mut terminal = MockTerminal::new();
        terminal.print("a");
        terminal.print("b\nc\n");
        assert_eq!(terminal.get_output(), vec!["ab", "c"]);
        assert!(terminal.at_line_start());
    }

    #[test]
    fn test_manager_enforces_limit() {
        let size = snapshot().estimated_size();
        let mut manager = SnapshotManager::new(size * 2);
        assert!(manager.push(snapshot()).is_ok());
        assert!(manager.push(snapshot()).is_ok());
        assert!(manager.push(snapshot()).is_err());
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.memory_usage(), size * 2);
    }
}
