//! Interactive read-eval-print loop

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use scm754::interpreter::engine::Interpreter;
use scm754::interpreter::errors::SchemeError;
use scm754::parser::Reader;

const PROMPT: &str = "scheme> ";
const CONTINUATION_PROMPT: &str = "    ... ";

/// Read lines until end of input, evaluating each complete group of forms.
///
/// Errors are reported and the loop continues; only a failure of the line
/// editor itself ends it early.
pub fn run(interpreter: &mut Interpreter) -> Result<(), ReadlineError> {
    let mut editor = DefaultEditor::new()?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };
        match editor.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                if needs_more_input(&buffer) {
                    continue;
                }
                if !buffer.trim().is_empty() {
                    let _ = editor.add_history_entry(buffer.trim_end());
                    evaluate(interpreter, &buffer);
                }
                buffer.clear();
            }
            // Ctrl-C abandons the pending input
            Err(ReadlineError::Interrupted) => buffer.clear(),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Evaluate every form in `source`, printing each value that is not
/// unspecified. The first error is printed and ends this input.
fn evaluate(interpreter: &mut Interpreter, source: &str) {
    let mut reader = match Reader::new(source) {
        Ok(reader) => reader,
        Err(e) => return report(interpreter, &SchemeError::Read(e)),
    };

    loop {
        let outcome = interpreter.read(&mut reader).and_then(|expr| {
            if expr.is_eof() {
                Ok(None)
            } else {
                interpreter.eval_global(expr).map(Some)
            }
        });
        match outcome {
            Ok(None) => return,
            Ok(Some(value)) if value.is_unspecified() => {}
            Ok(Some(value)) => {
                let text = interpreter.write(value);
                print_line(interpreter, &text);
            }
            Err(e) => return report(interpreter, &e),
        }
    }
}

fn report(interpreter: &mut Interpreter, error: &SchemeError) {
    print_line(interpreter, &format!("; error: {}", error));
}

/// Print on a line of its own, after any unfinished program output
fn print_line(interpreter: &mut Interpreter, text: &str) {
    let terminal = interpreter.terminal_mut();
    if !terminal.at_line_start() {
        terminal.print("\n");
    }
    terminal.print(text);
    terminal.print("\n");
}

/// Whether `source` ends inside an open list, string or block comment
fn needs_more_input(source: &str) -> bool {
    let mut depth: i64 = 0;
    let mut chars = source.chars().peekable();
    let mut in_string = false;
    let mut block_comments = 0;

    while let Some(c) = chars.next() {
        if block_comments > 0 {
            match (c, chars.peek()) {
                ('|', Some('#')) => {
                    chars.next();
                    block_comments -= 1;
                }
                ('#', Some('|')) => {
                    chars.next();
                    block_comments += 1;
                }
                _ => {}
            }
            continue;
        }
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '#' => match chars.peek() {
                Some('\\') => {
                    chars.next();
                    chars.next();
                }
                Some('|') => {
                    chars.next();
                    block_comments += 1;
                }
                _ => {}
            },
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ => {}
        }
    }

    depth > 0 || in_string || block_comments > 0
}

#[cfg(test)]
mod tests {
    use super::needs_more_input;

    #[test]
    fn test_open_lists_continue() {
        assert!(needs_more_input("(define (f x)\n"));
        assert!(!needs_more_input("(define (f x) x)\n"));
        assert!(!needs_more_input("42\n"));
    }

    #[test]
    fn test_delimiters_inside_atoms_are_ignored() {
        assert!(!needs_more_input("(display \"(\")\n"));
        assert!(!needs_more_input("(char? #\\()\n"));
        assert!(!needs_more_input("(+ 1 2) ; (\n"));
        assert!(needs_more_input("\"unterminated\n"));
        assert!(needs_more_input("#| open\n"));
    }

    #[test]
    fn test_extra_close_is_evaluated() {
        assert!(!needs_more_input(")\n"));
    }
}
