//! Main TUI application state and logic

use super::panes::{
    render_environment_pane, render_heap_pane, render_source_pane, render_status_bar,
    render_terminal_pane, ListScrollState, SourceScrollState, StatusRenderData,
};
use crate::interpreter::engine::Interpreter;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Terminal,
    Environment,
    Heap,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> terminal -> environment -> heap)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Terminal,
            FocusedPane::Terminal => FocusedPane::Environment,
            FocusedPane::Environment => FocusedPane::Heap,
            FocusedPane::Heap => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Heap,
            FocusedPane::Terminal => FocusedPane::Source,
            FocusedPane::Environment => FocusedPane::Terminal,
            FocusedPane::Heap => FocusedPane::Environment,
        }
    }
}

/// The main application state
pub struct App {
    /// Interpreter holding the recorded history
    pub interpreter: Interpreter,

    /// The source code that was evaluated
    pub source_code: String,

    pub focused_pane: FocusedPane,

    pub source_scroll: SourceScrollState,
    pub terminal_scroll: usize,
    pub environment_scroll: ListScrollState,
    pub heap_scroll: ListScrollState,

    pub should_quit: bool,

    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    pub fn new(interpreter: Interpreter, source_code: String) -> Self {
        let long_ago = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        App {
            interpreter,
            source_code,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState {
                offset: 0,
                target_line_row: None,
            },
            terminal_scroll: usize::MAX,
            environment_scroll: ListScrollState {
                offset: 0,
                prev_item_count: 0,
            },
            heap_scroll: ListScrollState {
                offset: 0,
                prev_item_count: 0,
            },
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            last_play_time: long_ago,
            last_space_press: long_ago,
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_secs(1) {
                if self.interpreter.step_forward().is_ok() {
                    self.status_message = "Playing...".to_string();
                    self.terminal_scroll = usize::MAX;
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Terminal (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Environment (top) | Heap (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(columns[1]);

        let snapshot = self.interpreter.current_snapshot();
        let has_error = snapshot.is_some_and(|s| s.error.is_some());
        let current_line = snapshot
            .filter(|s| s.form_index.is_some())
            .map_or(0, |s| s.location.line);

        render_source_pane(
            frame,
            left_rows[0],
            &self.source_code,
            current_line,
            has_error,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        render_terminal_pane(
            frame,
            left_rows[1],
            snapshot,
            self.focused_pane == FocusedPane::Terminal,
            &mut self.terminal_scroll,
        );

        render_environment_pane(
            frame,
            right_rows[0],
            snapshot
                .map(|s| s.bindings.as_slice())
                .unwrap_or_default(),
            self.focused_pane == FocusedPane::Environment,
            &mut self.environment_scroll,
        );

        render_heap_pane(
            frame,
            right_rows[1],
            snapshot.map(|s| &s.heap),
            self.focused_pane == FocusedPane::Heap,
            &mut self.heap_scroll,
        );

        render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                current_step: self.interpreter.history_position(),
                total_steps: self.interpreter.total_snapshots(),
                has_error,
                is_playing: self.is_playing,
            },
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1);
                let mut stepped = 0;
                for _ in 0..n {
                    if self.interpreter.step_forward().is_err() {
                        break;
                    }
                    stepped += 1;
                }
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.terminal_scroll = usize::MAX;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                let result = self.interpreter.step_backward();
                self.report_step(result, "Stepped backward", "Cannot step backward");
            }
            KeyCode::Right => {
                self.is_playing = false;
                let result = self.interpreter.step_forward();
                self.report_step(result, "Stepped forward", "Cannot step forward");
            }
            KeyCode::Up => self.scroll(-1),
            KeyCode::Down => self.scroll(1),
            KeyCode::Char(' ') => {
                // 200ms debounce against key repeat
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or_else(Instant::now);
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.interpreter.jump_to_end();
                self.status_message = "Jumped to end".to_string();
                self.terminal_scroll = usize::MAX;
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                let result = self.interpreter.rewind_to_start();
                self.report_step(result, "Jumped to start", "Cannot rewind");
            }
            _ => {}
        }
    }

    fn scroll(&mut self, delta: isize) {
        let step = |offset: usize| offset.saturating_add_signed(delta);
        match self.focused_pane {
            // Moving the highlighted row against the scroll direction
            FocusedPane::Source => {
                if let Some(row) = self.source_scroll.target_line_row {
                    self.source_scroll.target_line_row = Some(row.saturating_add_signed(-delta));
                }
            }
            FocusedPane::Terminal => self.terminal_scroll = step(self.terminal_scroll),
            FocusedPane::Environment => {
                self.environment_scroll.offset = step(self.environment_scroll.offset)
            }
            FocusedPane::Heap => self.heap_scroll.offset = step(self.heap_scroll.offset),
        }
    }

    fn report_step(&mut self, result: Result<(), String>, done: &str, refused: &str) {
        match result {
            Ok(()) => {
                self.status_message = done.to_string();
                self.terminal_scroll = usize::MAX;
            }
            Err(message) => {
                self.status_message = format!("{}: {}", refused, message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crossterm::event::KeyModifiers;

    fn app(source: &str) -> App {
        let mut interpreter = Interpreter::new(Config::default()).expect("interpreter");
        let _ = interpreter.run_recorded(source);
        interpreter.rewind_to_start().expect("rewind");
        App::new(interpreter, source.to_string())
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_focus_cycles() {
        let mut pane = FocusedPane::Source;
        for _ in 0..4 {
            pane = pane.next();
        }
        assert_eq!(pane, FocusedPane::Source);
        assert_eq!(FocusedPane::Source.prev(), FocusedPane::Heap);
    }

    #[test]
    fn test_stepping_keys() {
        let mut app = app("(define a 1)\n(define b 2)\n(+ a b)");
        press(&mut app, KeyCode::Right);
        assert_eq!(app.interpreter.history_position(), 1);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.interpreter.history_position(), 3);
        press(&mut app, KeyCode::Right);
        assert!(app.status_message.starts_with("Cannot step forward"));
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.interpreter.history_position(), 0);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.interpreter.history_position(), 2);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
