//! Dense table of special forms and built-in procedures
//!
//! Every name the evaluator knows natively has a stable integer id. The
//! special forms come first (ids 0-7), followed by the procedures. At
//! startup the names are interned in table order into an empty string pool,
//! so each name's symbol index equals its id and recognizing a special form
//! or built-in from a symbol is a bounds check instead of a string comparison.

use crate::memory::value::Value;

/// Operand count accepted by a built-in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
        }
    }

    /// Human-readable form for error messages
    pub fn describe(self) -> String {
        match self {
            Arity::Exact(k) => format!("exactly {}", k),
            Arity::AtLeast(k) => format!("at least {}", k),
            Arity::Between(lo, hi) => format!("between {} and {}", lo, hi),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Op {
    // Special forms
    If,
    Or,
    Let,
    And,
    LetStar,
    Quote,
    Lambda,
    Define,

    // Procedures
    Newline,
    Car,
    Cdr,
    IsProcedure,
    IsNull,
    IsBoolean,
    IsEofObject,
    IsSymbol,
    IsString,
    IsPair,
    IsChar,
    IsNumber,
    Length,
    Display,
    Load,
    IsZero,
    StringLength,
    NumberToString,
    IsEq,
    IsEqv,
    Apply,
    Max,
    Cons,
    SetCar,
    SetCdr,
    Modulo,
    Quotient,
    Add,
    Sub,
    Mul,
    Div,
    Write,
    NumberLt,
    NumberGt,
    NumberLe,
    NumberGe,
    NumberEq,
    CharLt,
    CharGt,
    CharLe,
    CharGe,
    CharEq,
    CharCiLt,
    CharCiGt,
    CharCiLe,
    CharCiGe,
    CharCiEq,
    StringEq,
    StringRef,
    Substring,
    Not,
    List,
    Min,
    SymbolToString,
    StringToSymbol,
    StringToNumber,
}

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub op: Op,
    pub name: &'static str,
    pub arity: Arity,
}

const fn info(op: Op, name: &'static str, arity: Arity) -> OpInfo {
    OpInfo { op, name, arity }
}

use self::Arity::{AtLeast, Between, Exact};

/// Indexed by `Op as usize`. Special-form arities are checked by the forms
/// themselves; the entries here document their shape.
pub static OPS: &[OpInfo] = &[
    info(Op::If, "if", Between(2, 3)),
    info(Op::Or, "or", AtLeast(0)),
    info(Op::Let, "let", AtLeast(2)),
    info(Op::And, "and", AtLeast(0)),
    info(Op::LetStar, "let*", AtLeast(2)),
    info(Op::Quote, "quote", Exact(1)),
    info(Op::Lambda, "lambda", AtLeast(2)),
    info(Op::Define, "define", AtLeast(1)),
    info(Op::Newline, "newline", Exact(0)),
    info(Op::Car, "car", Exact(1)),
    info(Op::Cdr, "cdr", Exact(1)),
    info(Op::IsProcedure, "procedure?", Exact(1)),
    info(Op::IsNull, "null?", Exact(1)),
    info(Op::IsBoolean, "boolean?", Exact(1)),
    info(Op::IsEofObject, "eof-object?", Exact(1)),
    info(Op::IsSymbol, "symbol?", Exact(1)),
    info(Op::IsString, "string?", Exact(1)),
    info(Op::IsPair, "pair?", Exact(1)),
    info(Op::IsChar, "char?", Exact(1)),
    info(Op::IsNumber, "number?", Exact(1)),
    info(Op::Length, "length", Exact(1)),
    info(Op::Display, "display", Exact(1)),
    info(Op::Load, "load", Exact(1)),
    info(Op::IsZero, "zero?", Exact(1)),
    info(Op::StringLength, "string-length", Exact(1)),
    info(Op::NumberToString, "number->string", Exact(1)),
    info(Op::IsEq, "eq?", Exact(2)),
    info(Op::IsEqv, "eqv?", Exact(2)),
    info(Op::Apply, "apply", Exact(2)),
    info(Op::Max, "max", AtLeast(1)),
    info(Op::Cons, "cons", Exact(2)),
    info(Op::SetCar, "set-car!", Exact(2)),
    info(Op::SetCdr, "set-cdr!", Exact(2)),
    info(Op::Modulo, "modulo", Exact(2)),
    info(Op::Quotient, "quotient", Exact(2)),
    info(Op::Add, "+", AtLeast(0)),
    info(Op::Sub, "-", AtLeast(1)),
    info(Op::Mul, "*", AtLeast(0)),
    info(Op::Div, "/", AtLeast(1)),
    info(Op::Write, "write", Exact(1)),
    info(Op::NumberLt, "<", AtLeast(1)),
    info(Op::NumberGt, ">", AtLeast(1)),
    info(Op::NumberLe, "<=", AtLeast(1)),
    info(Op::NumberGe, ">=", AtLeast(1)),
    info(Op::NumberEq, "=", AtLeast(1)),
    info(Op::CharLt, "char<?", AtLeast(1)),
    info(Op::CharGt, "char>?", AtLeast(1)),
    info(Op::CharLe, "char<=?", AtLeast(1)),
    info(Op::CharGe, "char>=?", AtLeast(1)),
    info(Op::CharEq, "char=?", AtLeast(1)),
    info(Op::CharCiLt, "char-ci<?", AtLeast(1)),
    info(Op::CharCiGt, "char-ci>?", AtLeast(1)),
    info(Op::CharCiLe, "char-ci<=?", AtLeast(1)),
    info(Op::CharCiGe, "char-ci>=?", AtLeast(1)),
    info(Op::CharCiEq, "char-ci=?", AtLeast(1)),
    info(Op::StringEq, "string=?", AtLeast(1)),
    info(Op::StringRef, "string-ref", Exact(2)),
    info(Op::Substring, "substring", Between(1, 3)),
    info(Op::Not, "not", Exact(1)),
    info(Op::List, "list", AtLeast(0)),
    info(Op::Min, "min", AtLeast(1)),
    info(Op::SymbolToString, "symbol->string", Exact(1)),
    info(Op::StringToSymbol, "string->symbol", Exact(1)),
    info(Op::StringToNumber, "string->number", Between(1, 2)),
];

/// Number of special forms at the front of the table
pub const SPECIAL_FORM_COUNT: u32 = 8;

impl Op {
    #[inline]
    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Op> {
        OPS.get(id as usize).map(|info| info.op)
    }

    pub fn info(self) -> &'static OpInfo {
        &OPS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn arity(self) -> Arity {
        self.info().arity
    }

    pub fn is_special_form(self) -> bool {
        self.id() < SPECIAL_FORM_COUNT
    }

    /// Special form named by a symbol, if any
    #[inline]
    pub fn special_form(symbol: Value) -> Option<Op> {
        if symbol.is_symbol() && symbol.index() < SPECIAL_FORM_COUNT {
            Op::from_id(symbol.index())
        } else {
            None
        }
    }

    /// Built-in procedure whose name is this symbol, if any
    #[inline]
    pub fn procedure(symbol: Value) -> Option<Op> {
        if symbol.is_symbol() && symbol.index() >= SPECIAL_FORM_COUNT {
            Op::from_id(symbol.index())
        } else {
            None
        }
    }

    /// The procedure value for a built-in
    pub fn value(self) -> Value {
        Value::procedure(self.id())
    }
}
