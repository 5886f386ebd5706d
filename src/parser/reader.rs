//! Datum reader
//!
//! Turns the token stream into heap-allocated values, one top-level datum per
//! [`Reader::read`] call. Symbols are interned through the [`SymbolTable`],
//! strings get fresh pool slots and lists are built from pairs.
//!
//! Internally a `)` is read as [`Value::RPAREN`] and a `.` as [`Value::DOT`];
//! the list reader consumes both markers, and a marker reaching the top level
//! is a read error. The reader never collects garbage, so partially built
//! lists need no rooting.

use super::lexer::{Lexer, SourceLocation, Token};
use crate::interpreter::errors::{ReadError, SchemeError};
use crate::memory::heap::Heap;
use crate::memory::symbols::SymbolTable;
use crate::memory::value::Value;

/// Deepest list nesting accepted by the reader
pub const MAX_READ_DEPTH: usize = 512;

pub struct Reader {
    tokens: Vec<Token>,
    position: usize,
    last_location: SourceLocation,
}

impl Reader {
    /// Tokenize `source`. Lexical errors are reported here, before any datum
    /// is read.
    pub fn new(source: &str) -> Result<Self, ReadError> {
        let tokens = Lexer::new(source).tokenize().map_err(|e| ReadError {
            message: e.message,
            location: e.location,
        })?;
        Ok(Reader {
            tokens,
            position: 0,
            last_location: SourceLocation::new(1, 1),
        })
    }

    /// Read the next datum, or [`Value::EOF`] once the input is exhausted
    pub fn read(&mut self, heap: &mut Heap, symbols: &mut SymbolTable) -> Result<Value, SchemeError> {
        self.last_location = self.peek().location();
        let datum = self.read_datum(heap, symbols, 0)?;
        if datum.is_rparen() {
            return Err(self.error("unexpected ')'", self.last_location));
        }
        if datum.is_dot() {
            return Err(self.error("unexpected '.'", self.last_location));
        }
        Ok(datum)
    }

    /// Location of the first token of the datum most recently read
    pub fn last_location(&self) -> SourceLocation {
        self.last_location
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn next_token(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn error(&self, message: &str, location: SourceLocation) -> SchemeError {
        SchemeError::Read(ReadError {
            message: message.to_string(),
            location,
        })
    }

    /// Read one datum, returning the marker values for `)` and `.`
    fn read_datum(
        &mut self,
        heap: &mut Heap,
        symbols: &mut SymbolTable,
        depth: usize,
    ) -> Result<Value, SchemeError> {
        let token = self.next_token();
        if depth > MAX_READ_DEPTH {
            return Err(self.error("nesting too deep", token.location()));
        }

        match token {
            Token::Eof(_) => Ok(Value::EOF),
            Token::RParen(_) => Ok(Value::RPAREN),
            Token::Dot(_) => Ok(Value::DOT),
            Token::LParen(loc) => self.read_list(heap, symbols, depth + 1, loc),
            Token::Quote(loc) => {
                let quoted = self.read_datum(heap, symbols, depth + 1)?;
                if quoted.is_eof() || quoted.is_rparen() || quoted.is_dot() {
                    return Err(self.error("expected a datum after quote", loc));
                }
                let quote = symbols.intern(heap, b"quote")?;
                let tail = heap.cons(quoted, Value::NIL)?;
                Ok(heap.cons(quote, tail)?)
            }
            Token::Boolean(b, _) => Ok(Value::boolean(b)),
            Token::Number(n, _) => Ok(Value::number(n)),
            Token::Char(c, _) => Ok(Value::character(c)),
            Token::Str(s, _) => Ok(heap.make_string(s.as_bytes())?),
            Token::Symbol(name, _) => Ok(symbols.intern(heap, name.as_bytes())?),
        }
    }

    /// Read list elements after `(` up to and including the closing `)`
    fn read_list(
        &mut self,
        heap: &mut Heap,
        symbols: &mut SymbolTable,
        depth: usize,
        open: SourceLocation,
    ) -> Result<Value, SchemeError> {
        let mut items = Vec::new();
        let mut tail = Value::NIL;

        loop {
            let location = self.peek().location();
            let item = self.read_datum(heap, symbols, depth)?;
            if item.is_rparen() {
                break;
            }
            if item.is_eof() {
                return Err(self.error("unterminated list", open));
            }
            if item.is_dot() {
                if items.is_empty() {
                    return Err(self.error("'.' must follow at least one element", location));
                }
                let last = self.read_datum(heap, symbols, depth)?;
                if last.is_eof() || last.is_rparen() || last.is_dot() {
                    return Err(self.error("expected a datum after '.'", location));
                }
                let close_location = self.peek().location();
                if !self.read_datum(heap, symbols, depth)?.is_rparen() {
                    return Err(self.error("expected ')' after dotted tail", close_location));
                }
                tail = last;
                break;
            }
            items.push(item);
        }

        let list = items
            .iter()
            .rev()
            .try_fold(tail, |rest, &item| heap.cons(item, rest))?;
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Heap, SymbolTable) {
        (Heap::new(256, 64, 16), SymbolTable::new())
    }

    #[test]
    fn test_read_list() {
        let (mut heap, mut symbols) = setup();
        let mut reader = Reader::new("(1 2 3)").unwrap();
        let list = reader.read(&mut heap, &mut symbols).unwrap();
        let items = heap.list_to_vec(list, "test").unwrap();
        assert_eq!(
            items,
            vec![Value::number(1.0), Value::number(2.0), Value::number(3.0)]
        );
        assert!(reader.read(&mut heap, &mut symbols).unwrap().is_eof());
    }

    #[test]
    fn test_read_dotted_pair() {
        let (mut heap, mut symbols) = setup();
        let mut reader = Reader::new("(1 2 . 3)").unwrap();
        let list = reader.read(&mut heap, &mut symbols).unwrap();
        let second = heap.cdr(list).unwrap();
        assert_eq!(heap.car(second).unwrap(), Value::number(2.0));
        assert_eq!(heap.cdr(second).unwrap(), Value::number(3.0));
    }

    #[test]
    fn test_quote_expands() {
        let (mut heap, mut symbols) = setup();
        let mut reader = Reader::new("'x").unwrap();
        let form = reader.read(&mut heap, &mut symbols).unwrap();
        let quote = symbols.get(b"quote").unwrap();
        let x = symbols.get(b"x").unwrap();
        assert_eq!(heap.list_to_vec(form, "test").unwrap(), vec![quote, x]);
    }

    #[test]
    fn test_symbols_are_interned() {
        let (mut heap, mut symbols) = setup();
        let mut reader = Reader::new("foo foo").unwrap();
        let a = reader.read(&mut heap, &mut symbols).unwrap();
        let b = reader.read(&mut heap, &mut symbols).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stray_markers_are_errors() {
        let (mut heap, mut symbols) = setup();
        for source in [")", ". 1", "(. 1)", "(1 . 2 3)", "(1 .)", "(1 2"] {
            let mut reader = Reader::new(source).unwrap();
            let result = reader.read(&mut heap, &mut symbols);
            assert!(
                matches!(result, Err(SchemeError::Read(_))),
                "{:?} should not read",
                source
            );
        }
    }

    #[test]
    fn test_depth_limit() {
        let (mut heap, mut symbols) = setup();
        let source = "(".repeat(MAX_READ_DEPTH + 2);
        let mut reader = Reader::new(&source).unwrap();
        assert!(reader.read(&mut heap, &mut symbols).is_err());
    }

    #[test]
    fn test_last_location() {
        let (mut heap, mut symbols) = setup();
        let mut reader = Reader::new("1\n  (a b)").unwrap();
        reader.read(&mut heap, &mut symbols).unwrap();
        reader.read(&mut heap, &mut symbols).unwrap();
        assert_eq!(reader.last_location(), SourceLocation::new(2, 3));
        assert!(reader.is_at_end());
    }
}
