//! Lexer (tokenizer) for Scheme source text
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! [`Reader`](super::reader::Reader). Line comments (`;`) and block comments
//! (`#| ... |#`) are skipped.
//!
//! # Atoms
//!
//! An atom runs until whitespace or one of `( ) " ; '`. It is a number when it
//! starts with a digit, or with `+`, `-` or `.` followed by a digit; `+inf.0`,
//! `-inf.0` and `+nan.0` are numbers too. A lone `.` is the dotted-pair
//! separator. Everything else is a symbol.

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that read errors can report
/// an accurate line and column.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen(SourceLocation),
    RParen(SourceLocation),
    Dot(SourceLocation),
    Quote(SourceLocation),

    Boolean(bool, SourceLocation),
    Number(f64, SourceLocation),
    Char(char, SourceLocation),
    Str(String, SourceLocation),
    Symbol(String, SourceLocation),

    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::LParen(loc)
            | Token::RParen(loc)
            | Token::Dot(loc)
            | Token::Quote(loc)
            | Token::Boolean(_, loc)
            | Token::Number(_, loc)
            | Token::Char(_, loc)
            | Token::Str(_, loc)
            | Token::Symbol(_, loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Quote(_) => write!(f, "quote"),
            Token::Boolean(b, _) => write!(f, "boolean {}", if *b { "#t" } else { "#f" }),
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Char(c, _) => write!(f, "character {:?}", c),
            Token::Str(s, _) => write!(f, "string {:?}", s),
            Token::Symbol(s, _) => write!(f, "symbol '{}'", s),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for Scheme source text
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            '(' | '[' => Ok(Token::LParen(loc)),
            ')' | ']' => Ok(Token::RParen(loc)),
            '\'' => Ok(Token::Quote(loc)),
            '"' => self.string_literal(loc),
            '`' | ',' => Err(LexError {
                message: "quasiquote is not supported".to_string(),
                location: loc,
            }),
            '#' if self.peek() == Some('\\') => {
                self.advance();
                self.char_literal(loc)
            }
            _ => {
                let text = self.atom(ch);
                classify_atom(text, loc)
            }
        }
    }

    /// Collect the rest of an atom starting with `first`
    fn atom(&mut self, first: char) -> String {
        let mut text = String::new();
        text.push(first);
        while let Some(ch) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Ok(Token::Str(string, loc)),
                '\\' => {
                    let escaped = self.advance().ok_or_else(|| LexError {
                        message: "Unexpected end of file in string literal".to_string(),
                        location: self.current_location(),
                    })?;
                    let unescaped = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        'a' => '\x07',
                        '0' => '\0',
                        '\\' => '\\',
                        '"' => '"',
                        '\n' => continue,
                        _ => {
                            return Err(LexError {
                                message: format!("Unknown escape sequence: \\{}", escaped),
                                location: self.current_location(),
                            });
                        }
                    };
                    string.push(unescaped);
                }
                _ => string.push(ch),
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            location: loc,
        })
    }

    /// Character after `#\`: a single character or a name like `space`
    fn char_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let first = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in character literal".to_string(),
            location: loc,
        })?;
        let name = self.atom(first);
        if name.chars().count() == 1 {
            return Ok(Token::Char(first, loc));
        }

        let c = match name.to_ascii_lowercase().as_str() {
            "space" => ' ',
            "newline" | "linefeed" => '\n',
            "tab" => '\t',
            "return" => '\r',
            "nul" | "null" => '\0',
            "alarm" => '\x07',
            "backspace" => '\x08',
            "escape" | "altmode" => '\x1b',
            "delete" | "rubout" => '\x7f',
            lower => lower
                .strip_prefix('x')
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .and_then(char::from_u32)
                .ok_or_else(|| LexError {
                    message: format!("Unknown character name: #\\{}", name),
                    location: loc,
                })?,
        };
        Ok(Token::Char(c, loc))
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some(';') => self.skip_line_comment(),
                Some('#') if self.peek_ahead(1) == Some('|') => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
    }

    /// Skip `#| ... |#`, which may nest
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance();
        self.advance();
        let mut depth = 1;

        while !self.is_at_end() {
            if self.peek() == Some('|') && self.peek_ahead(1) == Some('#') {
                self.advance();
                self.advance();
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            } else if self.peek() == Some('#') && self.peek_ahead(1) == Some('|') {
                self.advance();
                self.advance();
                depth += 1;
            } else {
                self.advance();
            }
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '[' | ']' | '"' | ';' | '\'')
}

fn classify_atom(text: String, loc: SourceLocation) -> Result<Token, LexError> {
    if text == "." {
        return Ok(Token::Dot(loc));
    }
    if let Some(rest) = text.strip_prefix('#') {
        return hash_syntax(rest, &text, loc);
    }
    if let Some(n) = parse_number(&text) {
        return Ok(Token::Number(n, loc));
    }
    if looks_numeric(&text) {
        return Err(LexError {
            message: format!("Invalid number: {}", text),
            location: loc,
        });
    }
    Ok(Token::Symbol(text, loc))
}

/// `#t`, `#false`, `#x1f`, `#d10` and friends
fn hash_syntax(rest: &str, text: &str, loc: SourceLocation) -> Result<Token, LexError> {
    match rest {
        "t" | "true" => return Ok(Token::Boolean(true, loc)),
        "f" | "false" => return Ok(Token::Boolean(false, loc)),
        _ => {}
    }

    let mut chars = rest.chars();
    let radix = match chars.next().map(|c| c.to_ascii_lowercase()) {
        Some('x') => 16,
        Some('b') => 2,
        Some('o') => 8,
        Some('d') => 10,
        _ => {
            return Err(LexError {
                message: format!("Unknown # syntax: {}", text),
                location: loc,
            })
        }
    };
    let digits = chars.as_str();
    let parsed = if radix == 10 {
        parse_number(digits)
    } else {
        i64::from_str_radix(digits, radix).ok().map(|n| n as f64)
    };
    parsed
        .map(|n| Token::Number(n, loc))
        .ok_or_else(|| LexError {
            message: format!("Invalid number: {}", text),
            location: loc,
        })
}

fn looks_numeric(text: &str) -> bool {
    let bytes = text.as_bytes();
    match bytes {
        [first, ..] if first.is_ascii_digit() => true,
        [b'+' | b'-', b'.', d, ..] => d.is_ascii_digit(),
        [b'+' | b'-' | b'.', d, ..] => d.is_ascii_digit(),
        _ => false,
    }
}

/// Parse a decimal number, or `None` if the atom is not numeric
pub fn parse_number(text: &str) -> Option<f64> {
    match text {
        "+inf.0" => return Some(f64::INFINITY),
        "-inf.0" => return Some(f64::NEG_INFINITY),
        "+nan.0" | "-nan.0" => return Some(f64::NAN),
        _ => {}
    }
    if !looks_numeric(text) {
        return None;
    }
    text.parse::<f64>().ok()
}
