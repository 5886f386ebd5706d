//! Built-in procedure implementations
//!
//! Every built-in receives its already-evaluated arguments as a slice whose
//! length has been checked against the op table's arity. Implementations
//! validate argument types themselves and report `WrongType` naming the
//! procedure.
//!
//! # Numeric Rules
//!
//! - `+` and `*` fold from 0 and 1; unary `-` negates and unary `/` inverts
//! - `quotient` truncates toward zero, `modulo` takes the sign of the divisor
//! - Any zero divisor is a `DivisionByZero` error
//! - Comparisons chain pairwise and stop at the first pair that fails
//!
//! `apply` is handled by the evaluator so the applied procedure keeps tail
//! position.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::SchemeError;
use crate::interpreter::ops::Op;
use crate::interpreter::printer::{display_value, format_number, write_value};
use crate::memory::value::Value;
use crate::parser::lexer::parse_number;

fn number_arg(op: Op, value: Value) -> Result<f64, SchemeError> {
    value
        .as_number()
        .ok_or_else(|| SchemeError::wrong_type(op.name(), "number", value.type_name()))
}

fn char_arg(op: Op, value: Value) -> Result<char, SchemeError> {
    value
        .as_char()
        .ok_or_else(|| SchemeError::wrong_type(op.name(), "char", value.type_name()))
}

fn numbers(op: Op, args: &[Value]) -> Result<Vec<f64>, SchemeError> {
    args.iter().map(|&v| number_arg(op, v)).collect()
}

/// A number with no fractional part, as an index or count
fn integer_arg(op: Op, value: Value) -> Result<i64, SchemeError> {
    let n = number_arg(op, value)?;
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(SchemeError::InvalidArgument {
            procedure: op.name(),
            message: format!("needs an integer, got {}", format_number(n)),
        });
    }
    Ok(n as i64)
}

/// A numeric operand as the caller wrote it, unclamped
fn operand_text(value: Value) -> String {
    value.as_number().map(format_number).unwrap_or_default()
}

fn fold_lowercase(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Ordering test shared by the numeric, char and string comparisons
fn holds(op: Op, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        Op::NumberLt | Op::CharLt | Op::CharCiLt => ordering == Less,
        Op::NumberGt | Op::CharGt | Op::CharCiGt => ordering == Greater,
        Op::NumberLe | Op::CharLe | Op::CharCiLe => ordering != Greater,
        Op::NumberGe | Op::CharGe | Op::CharCiGe => ordering != Less,
        _ => ordering == Equal,
    }
}

impl Interpreter {
    pub(crate) fn call_builtin(&mut self, op: Op, args: &[Value]) -> Result<Value, SchemeError> {
        match op {
            // Pairs and lists
            Op::Car => Ok(self.heap.car(args[0])?),
            Op::Cdr => Ok(self.heap.cdr(args[0])?),
            Op::Cons => Ok(self.heap.cons(args[0], args[1])?),
            Op::SetCar => {
                self.heap.set_car(args[0], args[1])?;
                Ok(Value::UNSPECIFIED)
            }
            Op::SetCdr => {
                self.heap.set_cdr(args[0], args[1])?;
                Ok(Value::UNSPECIFIED)
            }
            Op::List => Ok(self.heap.list_from(args)?),
            Op::Length => {
                if self.heap.list_tail(args[0])? != Value::NIL {
                    return Err(SchemeError::wrong_type("length", "list", args[0].type_name()));
                }
                let n = self.heap.list_length(args[0], "length")?;
                Ok(Value::number(n as f64))
            }

            // Type predicates
            Op::IsProcedure => Ok(Value::boolean(args[0].is_callable())),
            Op::IsNull => Ok(Value::boolean(args[0].is_null())),
            Op::IsBoolean => Ok(Value::boolean(args[0].is_boolean())),
            Op::IsEofObject => Ok(Value::boolean(args[0].is_eof())),
            Op::IsSymbol => Ok(Value::boolean(args[0].is_symbol())),
            Op::IsString => Ok(Value::boolean(args[0].is_string())),
            Op::IsPair => Ok(Value::boolean(args[0].is_pair())),
            Op::IsChar => Ok(Value::boolean(args[0].is_char())),
            Op::IsNumber => Ok(Value::boolean(args[0].is_number())),
            Op::Not => Ok(Value::boolean(!args[0].is_truthy())),

            // Equivalence
            Op::IsEq => Ok(Value::boolean(args[0] == args[1])),
            Op::IsEqv => {
                let same_number = matches!(
                    (args[0].as_number(), args[1].as_number()),
                    (Some(a), Some(b)) if a == b
                );
                Ok(Value::boolean(args[0] == args[1] || same_number))
            }

            // Output
            Op::Newline => {
                self.terminal.print("\n");
                Ok(Value::UNSPECIFIED)
            }
            Op::Display => {
                let text = display_value(&self.heap, args[0]);
                self.terminal.print(&text);
                Ok(Value::UNSPECIFIED)
            }
            Op::Write => {
                let text = write_value(&self.heap, args[0]);
                self.terminal.print(&text);
                Ok(Value::UNSPECIFIED)
            }
            Op::Load => self.load(args[0]),

            // Arithmetic
            Op::Add => Ok(Value::number(numbers(op, args)?.iter().fold(0.0, |a, b| a + b))),
            Op::Mul => Ok(Value::number(numbers(op, args)?.iter().fold(1.0, |a, b| a * b))),
            Op::Sub => {
                let ns = numbers(op, args)?;
                let result = match ns.as_slice() {
                    [only] => -only,
                    [first, rest @ ..] => rest.iter().fold(*first, |a, b| a - b),
                    [] => 0.0,
                };
                Ok(Value::number(result))
            }
            Op::Div => {
                let ns = numbers(op, args)?;
                let (dividend, divisors) = match ns.as_slice() {
                    [only] => (1.0, std::slice::from_ref(only)),
                    [first, rest @ ..] => (*first, rest),
                    [] => (1.0, &[][..]),
                };
                if divisors.contains(&0.0) {
                    return Err(SchemeError::DivisionByZero { procedure: "/" });
                }
                Ok(Value::number(divisors.iter().fold(dividend, |a, b| a / b)))
            }
            Op::Quotient | Op::Modulo => {
                let x = number_arg(op, args[0])?;
                let y = number_arg(op, args[1])?;
                if y == 0.0 {
                    return Err(SchemeError::DivisionByZero {
                        procedure: op.name(),
                    });
                }
                let result = if op == Op::Quotient {
                    (x / y).trunc()
                } else {
                    x - y * (x / y).floor()
                };
                Ok(Value::number(result))
            }
            Op::Max | Op::Min => {
                let ns = numbers(op, args)?;
                let pick = if op == Op::Max { f64::max } else { f64::min };
                Ok(Value::number(ns[1..].iter().fold(ns[0], |a, &b| pick(a, b))))
            }
            Op::IsZero => Ok(Value::boolean(number_arg(op, args[0])? == 0.0)),
            Op::NumberToString => {
                let text = format_number(number_arg(op, args[0])?);
                Ok(self.heap.make_string(text.as_bytes())?)
            }

            // Comparisons
            Op::NumberLt | Op::NumberGt | Op::NumberLe | Op::NumberGe | Op::NumberEq => {
                let mut previous = number_arg(op, args[0])?;
                for &v in &args[1..] {
                    let n = number_arg(op, v)?;
                    let holds = match op {
                        Op::NumberLt => previous < n,
                        Op::NumberGt => previous > n,
                        Op::NumberLe => previous <= n,
                        Op::NumberGe => previous >= n,
                        _ => previous == n,
                    };
                    if !holds {
                        return Ok(Value::FALSE);
                    }
                    previous = n;
                }
                Ok(Value::TRUE)
            }
            Op::CharLt | Op::CharGt | Op::CharLe | Op::CharGe | Op::CharEq => {
                self.compare_chars(op, args, |c| c)
            }
            Op::CharCiLt | Op::CharCiGt | Op::CharCiLe | Op::CharCiGe | Op::CharCiEq => {
                self.compare_chars(op, args, fold_lowercase)
            }

            // Strings and symbols
            Op::StringLength => {
                let text = self.string_arg(op, args[0])?;
                Ok(Value::number(text.chars().count() as f64))
            }
            Op::StringEq => {
                let first = self.string_arg(op, args[0])?;
                for &v in &args[1..] {
                    if self.string_arg(op, v)? != first {
                        return Ok(Value::FALSE);
                    }
                }
                Ok(Value::TRUE)
            }
            Op::StringRef => {
                let text = self.string_arg(op, args[0])?;
                let k = integer_arg(op, args[1])?;
                usize::try_from(k)
                    .ok()
                    .and_then(|k| text.chars().nth(k))
                    .map(Value::character)
                    .ok_or_else(|| SchemeError::InvalidArgument {
                        procedure: "string-ref",
                        message: format!("index {} out of range", operand_text(args[1])),
                    })
            }
            Op::Substring => self.substring(args),
            Op::SymbolToString => {
                let Some(name) = args[0].symbol_string() else {
                    return Err(SchemeError::wrong_type(op.name(), "symbol", args[0].type_name()));
                };
                let name = self.heap.string_bytes(name)?.to_vec();
                Ok(self.heap.make_string(&name)?)
            }
            Op::StringToSymbol => {
                self.string_arg(op, args[0])?;
                Ok(self.symbols.intern_value(&self.heap, args[0])?)
            }
            Op::StringToNumber => {
                let text = self.string_arg(op, args[0])?;
                let radix = match args.get(1) {
                    Some(&r) => integer_arg(op, r)?,
                    None => 10,
                };
                let parsed = match radix {
                    10 => parse_number(&text),
                    2 | 8 | 16 => i64::from_str_radix(&text, radix as u32).ok().map(|n| n as f64),
                    _ => {
                        return Err(SchemeError::InvalidArgument {
                            procedure: "string->number",
                            message: format!("unsupported radix {}", radix),
                        })
                    }
                };
                Ok(parsed.map(Value::number).unwrap_or(Value::FALSE))
            }

            Op::Apply
            | Op::If
            | Op::Or
            | Op::Let
            | Op::And
            | Op::LetStar
            | Op::Quote
            | Op::Lambda
            | Op::Define => Err(SchemeError::NotCallable {
                value: format!("#<procedure {}>", op.name()),
            }),
        }
    }

    /// Text of a string argument
    fn string_arg(&self, op: Op, value: Value) -> Result<String, SchemeError> {
        if !value.is_string() {
            return Err(SchemeError::wrong_type(op.name(), "string", value.type_name()));
        }
        Ok(self.heap.string_text(value)?.into_owned())
    }

    fn compare_chars(
        &self,
        op: Op,
        args: &[Value],
        normalize: fn(char) -> char,
    ) -> Result<Value, SchemeError> {
        let mut previous = normalize(char_arg(op, args[0])?);
        for &v in &args[1..] {
            let c = normalize(char_arg(op, v)?);
            if !holds(op, previous.cmp(&c)) {
                return Ok(Value::FALSE);
            }
            previous = c;
        }
        Ok(Value::TRUE)
    }

    /// `(substring s [start [end]])`, character-indexed
    fn substring(&mut self, args: &[Value]) -> Result<Value, SchemeError> {
        let op = Op::Substring;
        let text = self.string_arg(op, args[0])?;
        let chars: Vec<char> = text.chars().collect();
        let start = match args.get(1) {
            Some(&v) => integer_arg(op, v)?,
            None => 0,
        };
        let end = match args.get(2) {
            Some(&v) => integer_arg(op, v)?,
            None => chars.len() as i64,
        };
        if start < 0 || end < start || end > chars.len() as i64 {
            let bound = |i: usize, default: i64| {
                args.get(i)
                    .map_or_else(|| default.to_string(), |&v| operand_text(v))
            };
            return Err(SchemeError::InvalidArgument {
                procedure: "substring",
                message: format!(
                    "range {}..{} invalid for length {}",
                    bound(1, start),
                    bound(2, end),
                    chars.len()
                ),
            });
        }
        let slice: String = chars[start as usize..end as usize].iter().collect();
        Ok(self.heap.make_string(slice.as_bytes())?)
    }

    /// Read and evaluate every form of a file in the interaction environment
    fn load(&mut self, path: Value) -> Result<Value, SchemeError> {
        let path = self.string_arg(Op::Load, path)?;
        tracing::debug!(%path, "load");
        let source = std::fs::read_to_string(&path).map_err(|e| SchemeError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        self.run_source(&source)?;
        Ok(Value::UNSPECIFIED)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::SchemeError;

    fn eval(source: &str) -> Result<String, SchemeError> {
        let mut interp = Interpreter::new(Config::default()).expect("interpreter");
        interp.eval_str(source)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("(+)").unwrap(), "0");
        assert_eq!(eval("(*)").unwrap(), "1");
        assert_eq!(eval("(- 5)").unwrap(), "-5");
        assert_eq!(eval("(- 10 1 2)").unwrap(), "7");
        assert_eq!(eval("(/ 2)").unwrap(), "0.5");
        assert_eq!(eval("(/ 12 2 3)").unwrap(), "2");
        assert_eq!(eval("(max 1 5 3)").unwrap(), "5");
        assert_eq!(eval("(min 4 2 8)").unwrap(), "2");
    }

    #[test]
    fn test_quotient_and_modulo() {
        assert_eq!(eval("(quotient 7 2)").unwrap(), "3");
        assert_eq!(eval("(quotient -7 2)").unwrap(), "-3");
        assert_eq!(eval("(modulo -7 2)").unwrap(), "1");
        assert_eq!(eval("(modulo 7 -2)").unwrap(), "-1");
        assert_eq!(
            eval("(modulo 1 0)"),
            Err(SchemeError::DivisionByZero {
                procedure: "modulo"
            })
        );
        assert_eq!(
            eval("(/ 1 0)"),
            Err(SchemeError::DivisionByZero { procedure: "/" })
        );
    }

    #[test]
    fn test_comparisons_chain() {
        assert_eq!(eval("(< 1 2 3)").unwrap(), "#t");
        assert_eq!(eval("(< 1 3 2)").unwrap(), "#f");
        assert_eq!(eval("(= 2 2 2)").unwrap(), "#t");
        assert_eq!(eval("(>= 3 3 1)").unwrap(), "#t");
        assert_eq!(eval("(char<? #\\a #\\b)").unwrap(), "#t");
        assert_eq!(eval("(char-ci=? #\\a #\\A)").unwrap(), "#t");
        assert_eq!(eval("(char=? #\\a #\\A)").unwrap(), "#f");
    }

    #[test]
    fn test_type_errors_name_the_procedure() {
        assert_eq!(
            eval("(+ 1 \"a\")"),
            Err(SchemeError::WrongType {
                procedure: "+".to_string(),
                expected: "number",
                got: "string"
            })
        );
        assert!(matches!(eval("(char<? 1 2)"), Err(SchemeError::WrongType { .. })));
        assert!(matches!(eval("(string-length 'a)"), Err(SchemeError::WrongType { .. })));
    }

    #[test]
    fn test_strings() {
        assert_eq!(eval("(string-length \"hello\")").unwrap(), "5");
        assert_eq!(eval("(string-ref \"abc\" 1)").unwrap(), "#\\b");
        assert!(eval("(string-ref \"abc\" 3)").is_err());
        assert_eq!(eval("(substring \"hello\" 1 3)").unwrap(), "\"el\"");
        assert_eq!(eval("(substring \"hello\" 2)").unwrap(), "\"llo\"");
        assert_eq!(eval("(substring \"hello\")").unwrap(), "\"hello\"");
        assert!(eval("(substring \"hello\" 3 2)").is_err());
        assert_eq!(eval("(string=? \"ab\" \"ab\")").unwrap(), "#t");
        assert_eq!(eval("(number->string 42)").unwrap(), "\"42\"");
        assert_eq!(eval("(string->number \"2.5\")").unwrap(), "2.5");
        assert_eq!(eval("(string->number \"ff\" 16)").unwrap(), "255");
        assert_eq!(eval("(string->number \"abc\")").unwrap(), "#f");
    }

    #[test]
    fn test_index_errors_show_the_operand() {
        assert_eq!(
            eval("(string-ref \"a\" 1e30)"),
            Err(SchemeError::InvalidArgument {
                procedure: "string-ref",
                message: "index 1e30 out of range".to_string(),
            })
        );
        assert_eq!(
            eval("(substring \"abc\" -1e20 2)"),
            Err(SchemeError::InvalidArgument {
                procedure: "substring",
                message: "range -1e20..2 invalid for length 3".to_string(),
            })
        );
        assert_eq!(
            eval("(substring \"abc\" 2)"),
            Ok("\"c\"".to_string())
        );
    }

    #[test]
    fn test_symbols() {
        assert_eq!(eval("(eq? 'a (string->symbol \"a\"))").unwrap(), "#t");
        assert_eq!(eval("(symbol->string 'abc)").unwrap(), "\"abc\"");
        assert!(matches!(
            eval("(symbol->string \"abc\")"),
            Err(SchemeError::WrongType { expected: "symbol", .. })
        ));
        assert_eq!(eval("(eq? (string->symbol \"new\") 'new)").unwrap(), "#t");
    }

    #[test]
    fn test_predicates_and_equivalence() {
        assert_eq!(eval("(null? '())").unwrap(), "#t");
        assert_eq!(eval("(pair? '(1))").unwrap(), "#t");
        assert_eq!(eval("(procedure? car)").unwrap(), "#t");
        assert_eq!(eval("(procedure? (lambda (x) x))").unwrap(), "#t");
        assert_eq!(eval("(boolean? #f)").unwrap(), "#t");
        assert_eq!(eval("(not 0)").unwrap(), "#f");
        assert_eq!(eval("(eqv? 2.0 2)").unwrap(), "#t");
        assert_eq!(eval("(eq? '(1) '(1))").unwrap(), "#f");
        assert_eq!(eval("(zero? 0)").unwrap(), "#t");
    }

    #[test]
    fn test_lists() {
        assert_eq!(eval("(length '(1 2 3))").unwrap(), "3");
        assert!(eval("(length '(1 . 2))").is_err());
        assert_eq!(eval("(list 1 2 (+ 1 2))").unwrap(), "(1 2 3)");
        assert_eq!(
            eval("(define p (cons 1 2)) (set-car! p 3) (set-cdr! p '()) p").unwrap(),
            "(3)"
        );
    }

    #[test]
    fn test_output_is_captured() {
        let mut interp = Interpreter::new(Config::default()).expect("interpreter");
        interp
            .run_source("(display \"hi\") (newline) (write \"hi\") (write #\\a)")
            .unwrap();
        assert_eq!(interp.terminal().get_output(), vec!["hi", "\"hi\"#\\a"]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            eval("(load \"/nonexistent/file.scm\")"),
            Err(SchemeError::Io { .. })
        ));
    }
}
