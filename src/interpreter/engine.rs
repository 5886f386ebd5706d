// Interpreter state and top-level driving for the Scheme interpreter

use crate::config::Config;
use crate::interpreter::errors::SchemeError;
use crate::interpreter::printer::{display_value, write_value};
use crate::memory::gc::GcReport;
use crate::memory::{Heap, SymbolTable, Value};
use crate::parser::{Reader, SourceLocation};
use crate::snapshot::{Binding, MockTerminal, Snapshot, SnapshotManager};

/// The interpreter: one heap, one symbol table, one interaction environment
pub struct Interpreter {
    pub(crate) heap: Heap,

    pub(crate) symbols: SymbolTable,

    /// Outermost environment: a one-frame chain `(frame)`
    pub(crate) global_env: Value,

    pub(crate) config: Config,

    /// Sink for `display`, `write` and `newline`
    pub(crate) terminal: MockTerminal,

    /// Evaluator dispatches since the last sampled collection
    pub(crate) dispatch_count: u64,

    /// Recorded history for the visualizer
    snapshot_manager: SnapshotManager,

    /// Index of the snapshot currently being viewed
    history_position: usize,
}

impl Interpreter {
    /// Create an interpreter whose output is captured in its terminal
    pub fn new(config: Config) -> Result<Self, SchemeError> {
        Self::with_terminal(config, MockTerminal::new())
    }

    /// Create an interpreter that writes output straight to stdout
    pub fn with_stdout(config: Config) -> Result<Self, SchemeError> {
        Self::with_terminal(config, MockTerminal::echoing())
    }

    fn with_terminal(config: Config, terminal: MockTerminal) -> Result<Self, SchemeError> {
        let heap = Heap::new(
            config.cell_capacity,
            config.string_capacity,
            config.root_capacity,
        );
        let mut interpreter = Interpreter {
            heap,
            symbols: SymbolTable::new(),
            global_env: Value::NIL,
            snapshot_manager: SnapshotManager::new(config.snapshot_limit),
            config,
            terminal,
            dispatch_count: 0,
            history_position: 0,
        };
        interpreter.global_env = interpreter.create_environment()?;
        tracing::debug!(
            cells = interpreter.heap.cell_capacity(),
            strings = interpreter.heap.string_capacity(),
            roots = interpreter.heap.root_capacity(),
            symbols = interpreter.symbols.len(),
            "interpreter ready"
        );
        Ok(interpreter)
    }

    // ========== Core entry points ==========

    /// Read the next datum from `reader` into this interpreter's heap
    pub fn read(&mut self, reader: &mut Reader) -> Result<Value, SchemeError> {
        reader.read(&mut self.heap, &mut self.symbols)
    }

    /// Evaluate in the interaction environment
    pub fn eval_global(&mut self, expr: Value) -> Result<Value, SchemeError> {
        let env = self.global_env;
        self.eval(expr, env)
    }

    /// `write` representation of a value
    pub fn write(&self, value: Value) -> String {
        write_value(&self.heap, value)
    }

    /// `display` representation of a value
    pub fn display(&self, value: Value) -> String {
        display_value(&self.heap, value)
    }

    /// Read and evaluate every form in `source`, stopping at the first error.
    /// Returns the value of the last form, or `Unspecified` for empty input.
    pub fn run_source(&mut self, source: &str) -> Result<Value, SchemeError> {
        let mut reader = Reader::new(source)?;
        let mut last = Value::UNSPECIFIED;
        loop {
            let expr = self.read(&mut reader)?;
            if expr.is_eof() {
                return Ok(last);
            }
            last = self.eval_global(expr)?;
        }
    }

    /// Evaluate `source` and render the last value with `write`; an
    /// unspecified result renders as the empty string.
    pub fn eval_str(&mut self, source: &str) -> Result<String, SchemeError> {
        let value = self.run_source(source)?;
        if value.is_unspecified() {
            Ok(String::new())
        } else {
            Ok(self.write(value))
        }
    }

    /// Collect garbage now, rooted at the symbol table, the interaction
    /// environment and the shadow root stack
    pub fn collect_garbage(&mut self) -> GcReport {
        let extra = self
            .symbols
            .values()
            .chain(std::iter::once(self.global_env));
        self.heap.collect(extra)
    }

    /// Run `f`, then drop every root it registered, whether it failed or not
    pub(crate) fn with_root_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SchemeError>,
    ) -> Result<T, SchemeError> {
        let depth = self.heap.root_depth();
        let result = f(self);
        self.heap.truncate_roots(depth);
        result
    }

    /// Bindings of the interaction environment, oldest first, shadowed
    /// duplicates removed
    pub fn global_bindings(&self) -> Vec<Binding> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut bindings = Vec::new();
        let frame = self.heap.car(self.global_env).unwrap_or(Value::NIL);
        let entries = self
            .heap
            .list_to_vec(frame, "environment")
            .unwrap_or_default();
        for entry in entries {
            let (Ok(symbol), Ok(value)) = (self.heap.car(entry), self.heap.cdr(entry)) else {
                continue;
            };
            if seen.insert(symbol) {
                bindings.push(Binding {
                    name: self.display(symbol),
                    value: self.write(value),
                });
            }
        }
        bindings.reverse();
        bindings
    }

    // ========== Recording for the visualizer ==========

    /// Evaluate `source` form by form, recording a snapshot before the first
    /// form and after every form. Stops at the first error, which is recorded
    /// in the final snapshot and returned.
    pub fn run_recorded(&mut self, source: &str) -> Result<(), SchemeError> {
        self.record(None, SourceLocation::new(1, 1), None, None);

        let mut reader = match Reader::new(source) {
            Ok(reader) => reader,
            Err(e) => {
                let location = e.location;
                let error = SchemeError::Read(e);
                self.record(None, location, None, Some(error.to_string()));
                return Err(error);
            }
        };

        let mut index = 0;
        loop {
            let outcome = self.read(&mut reader).and_then(|expr| {
                if expr.is_eof() {
                    Ok(None)
                } else {
                    self.eval_global(expr).map(Some)
                }
            });
            let location = reader.last_location();
            match outcome {
                Ok(None) => return Ok(()),
                Ok(Some(value)) => {
                    let shown = (!value.is_unspecified()).then(|| self.write(value));
                    if !self.record(Some(index), location, shown, None) {
                        return Ok(());
                    }
                }
                Err(e) => {
                    self.record(Some(index), location, None, Some(e.to_string()));
                    return Err(e);
                }
            }
            index += 1;
        }
    }

    /// Push a snapshot; false once the history budget is spent
    fn record(
        &mut self,
        form_index: Option<usize>,
        location: SourceLocation,
        result: Option<String>,
        error: Option<String>,
    ) -> bool {
        let snapshot = Snapshot {
            form_index,
            location,
            heap: self.heap.clone(),
            terminal: self.terminal.clone(),
            bindings: self.global_bindings(),
            result,
            error,
        };
        match self.snapshot_manager.push(snapshot) {
            Ok(()) => true,
            Err(message) => {
                tracing::warn!(%message, "snapshot recording stopped");
                false
            }
        }
    }

    /// Move to the previous snapshot
    pub fn step_backward(&mut self) -> Result<(), String> {
        if self.history_position == 0 {
            return Err("Already at the beginning of execution".to_string());
        }
        self.history_position -= 1;
        Ok(())
    }

    /// Move to the next snapshot
    pub fn step_forward(&mut self) -> Result<(), String> {
        if self.history_position + 1 >= self.snapshot_manager.len() {
            return Err("No more snapshots available (execution finished)".to_string());
        }
        self.history_position += 1;
        Ok(())
    }

    /// Rewind to the beginning of execution history
    pub fn rewind_to_start(&mut self) -> Result<(), String> {
        if self.snapshot_manager.is_empty() {
            return Err("No snapshots available".to_string());
        }
        self.history_position = 0;
        Ok(())
    }

    /// Jump to the last recorded snapshot
    pub fn jump_to_end(&mut self) {
        self.history_position = self.snapshot_manager.len().saturating_sub(1);
    }

    // ========== Getter methods ==========

    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.snapshot_manager.get(self.history_position)
    }

    pub fn history_position(&self) -> usize {
        self.history_position
    }

    pub fn total_snapshots(&self) -> usize {
        self.snapshot_manager.len()
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn global_env(&self) -> Value {
        self.global_env
    }

    pub fn terminal(&self) -> &MockTerminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut MockTerminal {
        &mut self.terminal
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> Interpreter {
        Interpreter::new(Config::default()).expect("interpreter")
    }

    #[test]
    fn test_eval_str() {
        let mut interp = interpreter();
        assert_eq!(interp.eval_str("(+ 1 2 3)").unwrap(), "6");
        assert_eq!(interp.eval_str("(define x 1)").unwrap(), "");
    }

    #[test]
    fn test_root_scope_unwinds_on_error() {
        let mut interp = interpreter();
        let depth = interp.heap.root_depth();
        let result: Result<(), SchemeError> = interp.with_root_scope(|i| {
            i.heap.push_root(Value::NIL)?;
            i.heap.push_root(Value::NIL)?;
            Err(SchemeError::CannotApplyEmptyList)
        });
        assert!(result.is_err());
        assert_eq!(interp.heap.root_depth(), depth);
    }

    #[test]
    fn test_global_bindings_hide_shadowed() {
        let mut interp = interpreter();
        interp.run_source("(define a 1) (define b 2) (define a 3)").unwrap();
        let bindings = interp.global_bindings();
        assert_eq!(
            bindings,
            vec![
                Binding {
                    name: "b".to_string(),
                    value: "2".to_string()
                },
                Binding {
                    name: "a".to_string(),
                    value: "3".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_recording_and_navigation() {
        let mut interp = interpreter();
        interp
            .run_recorded("(define x 2)\n(display x)\n(* x 21)")
            .unwrap();
        assert_eq!(interp.total_snapshots(), 4);

        interp.jump_to_end();
        let last = interp.current_snapshot().unwrap();
        assert_eq!(last.form_index, Some(2));
        assert_eq!(last.result.as_deref(), Some("42"));
        assert_eq!(last.terminal.get_output(), vec!["2"]);
        assert!(interp.step_forward().is_err());

        interp.rewind_to_start().unwrap();
        assert_eq!(interp.current_snapshot().unwrap().form_index, None);
        assert!(interp.step_backward().is_err());
        interp.step_forward().unwrap();
        assert_eq!(interp.history_position(), 1);
    }

    #[test]
    fn test_recording_stops_at_error() {
        let mut interp = interpreter();
        let err = interp.run_recorded("(define x 1)\n(car x)\n(define y 2)");
        assert!(matches!(err, Err(SchemeError::WrongType { .. })));
        assert_eq!(interp.total_snapshots(), 3);
        interp.jump_to_end();
        let last = interp.current_snapshot().unwrap();
        assert!(last.error.is_some());
        assert_eq!(last.location.line, 2);
    }
}
