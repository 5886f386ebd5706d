//! External representation of values
//!
//! [`write_value`] produces the machine-readable form (strings quoted, chars
//! as `#\x`); [`display_value`] the human form. Both bound their output on
//! cyclic structure: a list stops with `...` after [`PRINT_MAX_ELEMENTS`]
//! elements and nesting stops at [`PRINT_MAX_DEPTH`].

use super::constants::{PRINT_MAX_DEPTH, PRINT_MAX_ELEMENTS};
use super::ops::Op;
use crate::memory::heap::Heap;
use crate::memory::value::{Kind, Value};

/// Render `value` the way `write` prints it
pub fn write_value(heap: &Heap, value: Value) -> String {
    let mut printer = Printer::new(heap, true);
    printer.print(value, 0);
    printer.out
}

/// Render `value` the way `display` prints it
pub fn display_value(heap: &Heap, value: Value) -> String {
    let mut printer = Printer::new(heap, false);
    printer.print(value, 0);
    printer.out
}

/// One-level rendering used by the heap view: pairs and closures show their
/// cell index instead of their contents.
pub fn describe_shallow(heap: &Heap, value: Value) -> String {
    match value.kind() {
        Kind::Pair(i) => format!("#<pair {}>", i),
        Kind::Closure(i) => format!("#<closure {}>", i),
        _ => write_value(heap, value),
    }
}

/// Numbers print without a fraction when integral, like `%.16g`
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "+nan.0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+inf.0" } else { "-inf.0" }.to_string();
    }
    let magnitude = n.abs();
    if n.fract() == 0.0 && magnitude < 1e16 {
        format!("{}", n as i64)
    } else if magnitude >= 1e16 || magnitude < 1e-7 {
        format!("{:e}", n)
    } else {
        format!("{}", n)
    }
}

fn char_name(c: char) -> Option<&'static str> {
    match c {
        ' ' => Some("space"),
        '\n' => Some("newline"),
        '\t' => Some("tab"),
        '\r' => Some("return"),
        '\0' => Some("nul"),
        '\x07' => Some("alarm"),
        '\x08' => Some("backspace"),
        '\x1b' => Some("escape"),
        '\x7f' => Some("delete"),
        _ => None,
    }
}

struct Printer<'a> {
    heap: &'a Heap,
    quoted: bool,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(heap: &'a Heap, quoted: bool) -> Self {
        Printer {
            heap,
            quoted,
            out: String::new(),
        }
    }

    fn print(&mut self, value: Value, depth: usize) {
        match value.kind() {
            Kind::Number(n) => self.out.push_str(&format_number(n)),
            Kind::EmptyList => self.out.push_str("()"),
            Kind::Boolean(true) => self.out.push_str("#t"),
            Kind::Boolean(false) => self.out.push_str("#f"),
            Kind::EndOfFile => self.out.push_str("#!eof"),
            Kind::Dot => self.out.push_str("#!dot"),
            Kind::RightParen => self.out.push_str("#!rparen"),
            Kind::Unspecified => self.out.push_str("#!unspecified"),
            Kind::Error => self.out.push_str("#!error"),
            Kind::Symbol(_) => {
                let name = self.heap.string_text(value).unwrap_or_default();
                self.out.push_str(&name);
            }
            Kind::String(_) => {
                let text = self.heap.string_text(value).unwrap_or_default();
                if self.quoted {
                    self.print_escaped(&text);
                } else {
                    self.out.push_str(&text);
                }
            }
            Kind::Char(c) => {
                if !self.quoted {
                    self.out.push(c);
                } else if let Some(name) = char_name(c) {
                    self.out.push_str("#\\");
                    self.out.push_str(name);
                } else if c.is_control() {
                    self.out.push_str(&format!("#\\x{:x}", c as u32));
                } else {
                    self.out.push_str("#\\");
                    self.out.push(c);
                }
            }
            Kind::Procedure(id) => match Op::from_id(id) {
                Some(op) => self.out.push_str(&format!("#<procedure {}>", op.name())),
                None => self.out.push_str("#<procedure>"),
            },
            Kind::Closure(_) => self.out.push_str("#<closure>"),
            Kind::Pair(_) => self.print_list(value, depth),
        }
    }

    fn print_escaped(&mut self, text: &str) {
        self.out.push('"');
        for c in text.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                '\r' => self.out.push_str("\\r"),
                _ => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    fn print_list(&mut self, list: Value, depth: usize) {
        if depth >= PRINT_MAX_DEPTH {
            self.out.push_str("(...)");
            return;
        }
        self.out.push('(');
        let mut rest = list;
        let mut count = 0;
        while rest.is_pair() {
            if count > 0 {
                self.out.push(' ');
            }
            if count >= PRINT_MAX_ELEMENTS {
                self.out.push_str("...");
                self.out.push(')');
                return;
            }
            let car = self.heap.car(rest).unwrap_or(Value::ERROR);
            self.print(car, depth + 1);
            rest = self.heap.cdr(rest).unwrap_or(Value::ERROR);
            count += 1;
        }
        if !rest.is_null() {
            self.out.push_str(" . ");
            self.print(rest, depth + 1);
        }
        self.out.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(1e20), "1e20");
        assert_eq!(format_number(f64::INFINITY), "+inf.0");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf.0");
        assert_eq!(format_number(f64::NAN), "+nan.0");
    }

    #[test]
    fn test_write_and_display_strings() {
        let mut heap = Heap::new(8, 4, 4);
        let s = heap.make_string(b"a \"b\"\n").unwrap();
        assert_eq!(write_value(&heap, s), "\"a \\\"b\\\"\\n\"");
        assert_eq!(display_value(&heap, s), "a \"b\"\n");
    }

    #[test]
    fn test_chars() {
        let heap = Heap::new(1, 1, 1);
        assert_eq!(write_value(&heap, Value::character('a')), "#\\a");
        assert_eq!(write_value(&heap, Value::character(' ')), "#\\space");
        assert_eq!(display_value(&heap, Value::character('a')), "a");
    }

    #[test]
    fn test_lists() {
        let mut heap = Heap::new(16, 4, 4);
        let proper = heap
            .list_from(&[Value::number(1.0), Value::TRUE, Value::NIL])
            .unwrap();
        assert_eq!(write_value(&heap, proper), "(1 #t ())");

        let tail = heap.cons(Value::number(2.0), Value::number(3.0)).unwrap();
        let dotted = heap.cons(Value::number(1.0), tail).unwrap();
        assert_eq!(write_value(&heap, dotted), "(1 2 . 3)");
    }

    #[test]
    fn test_cycles_are_bounded() {
        let mut heap = Heap::new(4, 1, 1);
        let p = heap.cons(Value::number(1.0), Value::NIL).unwrap();
        heap.set_cdr(p, p).unwrap();
        let text = write_value(&heap, p);
        assert!(text.ends_with("...)"));

        let q = heap.cons(Value::NIL, Value::NIL).unwrap();
        heap.set_car(q, q).unwrap();
        assert!(write_value(&heap, q).contains("(...)"));
    }

    #[test]
    fn test_procedures_and_sentinels() {
        let heap = Heap::new(1, 1, 1);
        assert_eq!(write_value(&heap, Op::Car.value()), "#<procedure car>");
        assert_eq!(write_value(&heap, Value::closure(0)), "#<closure>");
        assert_eq!(write_value(&heap, Value::EOF), "#!eof");
        assert_eq!(describe_shallow(&heap, Value::pair(3)), "#<pair 3>");
    }
}
