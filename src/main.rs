// scm754: NaN-boxed Scheme interpreter with heap visualization

mod repl;

use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use scm754::config::Config;
use scm754::interpreter::constants::{
    DEFAULT_CELL_CAPACITY, DEFAULT_GC_INTERVAL, DEFAULT_ROOT_CAPACITY, DEFAULT_STRING_CAPACITY,
};
use scm754::interpreter::engine::Interpreter;
use scm754::ui::App;

#[derive(Parser, Debug)]
#[command(name = "scm754", version, about = "A NaN-boxed Scheme interpreter")]
struct Cli {
    /// Scheme source file to run; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Step through the file's evaluation in the heap visualizer
    #[arg(long, requires = "file")]
    tui: bool,

    /// Capacity of the pair/closure cell pool
    #[arg(long, default_value_t = DEFAULT_CELL_CAPACITY)]
    cells: usize,

    /// Capacity of the string pool (symbol names included)
    #[arg(long, default_value_t = DEFAULT_STRING_CAPACITY)]
    strings: usize,

    /// Capacity of the GC root stack, which bounds evaluation depth
    #[arg(long, default_value_t = DEFAULT_ROOT_CAPACITY)]
    roots: usize,

    /// Evaluator steps between collections; 0 collects only when memory runs low
    #[arg(long, default_value_t = DEFAULT_GC_INTERVAL)]
    gc_interval: u64,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            string_capacity: self.strings,
            root_capacity: self.roots,
            gc_interval: self.gc_interval,
            ..Config::with_cells(self.cells)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let Some(path) = &cli.file else {
        let mut interpreter = Interpreter::with_stdout(config)?;
        repl::run(&mut interpreter)?;
        return Ok(());
    };

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    };

    if cli.tui {
        return run_tui(config, source);
    }

    let mut interpreter = Interpreter::with_stdout(config)?;
    if let Err(e) = interpreter.run_source(&source) {
        if !interpreter.terminal().at_line_start() {
            println!();
        }
        eprintln!("; error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn run_tui(config: Config, source: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut interpreter = Interpreter::new(config)?;

    eprintln!("Evaluating...");
    match interpreter.run_recorded(&source) {
        Ok(()) => {
            eprintln!("Evaluation completed successfully.");
            eprintln!("Total snapshots: {}", interpreter.total_snapshots());
        }
        Err(e) => {
            eprintln!("; error: {}", e);
            eprintln!("Entering TUI with partial history...");
        }
    }

    if let Err(e) = interpreter.rewind_to_start() {
        eprintln!("Warning: Failed to rewind to start: {}", e);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(interpreter, source);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_builds_config() {
        let cli = Cli::parse_from(["scm754", "--cells", "800", "--gc-interval", "0", "prog.scm"]);
        let config = cli.config();
        assert_eq!(config.cell_capacity, 800);
        assert_eq!(config.gc_low_water, 100);
        assert_eq!(config.gc_interval, 0);
        assert_eq!(config.root_capacity, DEFAULT_ROOT_CAPACITY);
        assert_eq!(cli.file, Some(PathBuf::from("prog.scm")));
    }

    #[test]
    fn test_tui_requires_file() {
        assert!(Cli::try_parse_from(["scm754", "--tui"]).is_err());
    }
}
