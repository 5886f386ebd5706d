//! NaN-boxed runtime value representation
//!
//! Every Scheme datum fits in one 64-bit word. Ordinary doubles are stored
//! as-is; everything else lives in the negative quiet-NaN region, where the
//! upper 16 bits act as the type tag and the low 32 bits carry a payload
//! (pool index, character code point or procedure id).
//!
//! # Tag Layout
//!
//! ```text
//! 0xfff0_...  -inf                 (number, never a tag)
//! 0xfff1_...  empty list
//! 0xfff2_...  #t
//! 0xfff3_...  #f
//! 0xfff4_...  end of file
//! 0xfff5_...  dot marker           (reader internal)
//! 0xfff6_...  right paren marker   (reader internal)
//! 0xfff7_...  unspecified
//! 0xfff8_...  canonical -nan       (number, never a tag)
//! 0xfff9_...  error marker
//! 0xfffa_...  symbol     + string pool index
//! 0xfffb_...  string     + string pool index
//! 0xfffc_...  pair       + cell pool index
//! 0xfffd_...  character  + code point
//! 0xfffe_...  procedure  + built-in id
//! 0xffff_...  closure    + cell pool index
//! ```
//!
//! Doubles whose upper 16 bits fall on a reserved tag (negative NaNs with
//! those payloads) are canonicalized to `0xfff8_0000_0000_0000` on the way
//! in, so tag tests never misclassify a number.

use std::fmt;

/// Mask selecting the tag bits
pub const TAG_MASK: u64 = 0xffff_0000_0000_0000;

/// Mask selecting the 32-bit payload
pub const PAYLOAD_MASK: u64 = 0x0000_0000_ffff_ffff;

pub const TAG_NIL: u64 = 0xfff1_0000_0000_0000;
pub const TAG_TRUE: u64 = 0xfff2_0000_0000_0000;
pub const TAG_FALSE: u64 = 0xfff3_0000_0000_0000;
pub const TAG_EOF: u64 = 0xfff4_0000_0000_0000;
pub const TAG_DOT: u64 = 0xfff5_0000_0000_0000;
pub const TAG_RPAREN: u64 = 0xfff6_0000_0000_0000;
pub const TAG_UNSPECIFIED: u64 = 0xfff7_0000_0000_0000;
pub const TAG_ERROR: u64 = 0xfff9_0000_0000_0000;
pub const TAG_SYMBOL: u64 = 0xfffa_0000_0000_0000;
pub const TAG_STRING: u64 = 0xfffb_0000_0000_0000;
pub const TAG_PAIR: u64 = 0xfffc_0000_0000_0000;
pub const TAG_CHAR: u64 = 0xfffd_0000_0000_0000;
pub const TAG_PROCEDURE: u64 = 0xfffe_0000_0000_0000;
pub const TAG_CLOSURE: u64 = 0xffff_0000_0000_0000;

/// The NaN every colliding double is folded into
const CANONICAL_NAN: u64 = 0xfff8_0000_0000_0000;

/// A Scheme value packed into a single machine word
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

const _: () = assert!(std::mem::size_of::<Value>() == 8);

/// Decoded view of a [`Value`], convenient for `match`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Number(f64),
    EmptyList,
    Boolean(bool),
    EndOfFile,
    Dot,
    RightParen,
    Unspecified,
    Error,
    Symbol(u32),
    String(u32),
    Pair(u32),
    Char(char),
    Procedure(u32),
    Closure(u32),
}

/// True when the upper 16 bits name one of the non-numeric tags
#[inline]
fn is_reserved(bits: u64) -> bool {
    let tag = bits & TAG_MASK;
    (TAG_NIL..=TAG_UNSPECIFIED).contains(&tag) || tag >= TAG_ERROR
}

impl Value {
    pub const NIL: Value = Value(TAG_NIL);
    pub const TRUE: Value = Value(TAG_TRUE);
    pub const FALSE: Value = Value(TAG_FALSE);
    pub const EOF: Value = Value(TAG_EOF);
    pub const DOT: Value = Value(TAG_DOT);
    pub const RPAREN: Value = Value(TAG_RPAREN);
    pub const UNSPECIFIED: Value = Value(TAG_UNSPECIFIED);
    pub const ERROR: Value = Value(TAG_ERROR);

    // Constructors

    /// Box a double. Doubles that collide with a tag become the canonical NaN.
    #[inline]
    pub fn number(n: f64) -> Self {
        let bits = n.to_bits();
        if is_reserved(bits) {
            Value(CANONICAL_NAN)
        } else {
            Value(bits)
        }
    }

    #[inline]
    pub fn boolean(b: bool) -> Self {
        if b {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    #[inline]
    pub fn character(c: char) -> Self {
        Value(TAG_CHAR | c as u64)
    }

    #[inline]
    pub fn symbol(index: u32) -> Self {
        Value(TAG_SYMBOL | index as u64)
    }

    #[inline]
    pub fn string(index: u32) -> Self {
        Value(TAG_STRING | index as u64)
    }

    #[inline]
    pub fn pair(index: u32) -> Self {
        Value(TAG_PAIR | index as u64)
    }

    #[inline]
    pub fn procedure(id: u32) -> Self {
        Value(TAG_PROCEDURE | id as u64)
    }

    #[inline]
    pub fn closure(index: u32) -> Self {
        Value(TAG_CLOSURE | index as u64)
    }

    /// Rebuild a value from raw bits (used by tests and the heap view)
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Value(bits)
    }

    // Raw access

    #[inline]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn tag(self) -> u64 {
        self.0 & TAG_MASK
    }

    /// The 32-bit payload: pool index, code point or procedure id
    #[inline]
    pub fn index(self) -> u32 {
        (self.0 & PAYLOAD_MASK) as u32
    }

    // Type predicates

    #[inline]
    pub fn is_number(self) -> bool {
        !is_reserved(self.0)
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.tag() == TAG_NIL
    }

    #[inline]
    pub fn is_boolean(self) -> bool {
        self.tag() == TAG_TRUE || self.tag() == TAG_FALSE
    }

    #[inline]
    pub fn is_eof(self) -> bool {
        self.tag() == TAG_EOF
    }

    #[inline]
    pub fn is_dot(self) -> bool {
        self.tag() == TAG_DOT
    }

    #[inline]
    pub fn is_rparen(self) -> bool {
        self.tag() == TAG_RPAREN
    }

    #[inline]
    pub fn is_unspecified(self) -> bool {
        self.tag() == TAG_UNSPECIFIED
    }

    #[inline]
    pub fn is_error(self) -> bool {
        self.tag() == TAG_ERROR
    }

    #[inline]
    pub fn is_symbol(self) -> bool {
        self.tag() == TAG_SYMBOL
    }

    #[inline]
    pub fn is_string(self) -> bool {
        self.tag() == TAG_STRING
    }

    #[inline]
    pub fn is_pair(self) -> bool {
        self.tag() == TAG_PAIR
    }

    #[inline]
    pub fn is_char(self) -> bool {
        self.tag() == TAG_CHAR
    }

    #[inline]
    pub fn is_procedure(self) -> bool {
        self.tag() == TAG_PROCEDURE
    }

    #[inline]
    pub fn is_closure(self) -> bool {
        self.tag() == TAG_CLOSURE
    }

    /// Anything that can be applied: built-ins and closures
    #[inline]
    pub fn is_callable(self) -> bool {
        self.is_procedure() || self.is_closure()
    }

    /// Only `#f` is false
    #[inline]
    pub fn is_truthy(self) -> bool {
        self.0 != TAG_FALSE
    }

    // Accessors

    #[inline]
    pub fn as_number(self) -> Option<f64> {
        if self.is_number() {
            Some(f64::from_bits(self.0))
        } else {
            None
        }
    }

    #[inline]
    pub fn as_char(self) -> Option<char> {
        if self.is_char() {
            char::from_u32(self.index())
        } else {
            None
        }
    }

    /// The pair view of a closure: `(env . (params . body))`
    #[inline]
    pub fn closure_pair(self) -> Option<Value> {
        if self.is_closure() {
            Some(Value::pair(self.index()))
        } else {
            None
        }
    }

    /// The string view of a symbol, sharing its pool slot
    #[inline]
    pub fn symbol_string(self) -> Option<Value> {
        if self.is_symbol() {
            Some(Value::string(self.index()))
        } else {
            None
        }
    }

    /// Decode into a matchable [`Kind`]
    pub fn kind(self) -> Kind {
        if self.is_number() {
            return Kind::Number(f64::from_bits(self.0));
        }
        match self.tag() {
            TAG_NIL => Kind::EmptyList,
            TAG_TRUE => Kind::Boolean(true),
            TAG_FALSE => Kind::Boolean(false),
            TAG_EOF => Kind::EndOfFile,
            TAG_DOT => Kind::Dot,
            TAG_RPAREN => Kind::RightParen,
            TAG_UNSPECIFIED => Kind::Unspecified,
            TAG_SYMBOL => Kind::Symbol(self.index()),
            TAG_STRING => Kind::String(self.index()),
            TAG_PAIR => Kind::Pair(self.index()),
            TAG_CHAR => Kind::Char(char::from_u32(self.index()).unwrap_or('\u{fffd}')),
            TAG_PROCEDURE => Kind::Procedure(self.index()),
            TAG_CLOSURE => Kind::Closure(self.index()),
            _ => Kind::Error,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(self) -> &'static str {
        match self.kind() {
            Kind::Number(_) => "number",
            Kind::EmptyList => "empty list",
            Kind::Boolean(_) => "boolean",
            Kind::EndOfFile => "eof-object",
            Kind::Dot | Kind::RightParen => "reader marker",
            Kind::Unspecified => "unspecified",
            Kind::Error => "error",
            Kind::Symbol(_) => "symbol",
            Kind::String(_) => "string",
            Kind::Pair(_) => "pair",
            Kind::Char(_) => "char",
            Kind::Procedure(_) => "procedure",
            Kind::Closure(_) => "closure",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::UNSPECIFIED
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Kind::Number(n) => write!(f, "Number({})", n),
            Kind::Symbol(i) => write!(f, "Symbol(#{})", i),
            Kind::String(i) => write!(f, "String(#{})", i),
            Kind::Pair(i) => write!(f, "Pair(#{})", i),
            Kind::Closure(i) => write!(f, "Closure(#{})", i),
            Kind::Procedure(id) => write!(f, "Procedure({})", id),
            Kind::Char(c) => write!(f, "Char({:?})", c),
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_distinct() {
        let all = [
            Value::NIL,
            Value::TRUE,
            Value::FALSE,
            Value::EOF,
            Value::DOT,
            Value::RPAREN,
            Value::UNSPECIFIED,
            Value::ERROR,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(!a.is_number(), "{:?} classified as number", a);
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_infinities_and_nan_are_numbers() {
        assert!(Value::number(f64::INFINITY).is_number());
        assert!(Value::number(f64::NEG_INFINITY).is_number());
        assert_eq!(
            Value::number(f64::NEG_INFINITY).as_number(),
            Some(f64::NEG_INFINITY)
        );
        let nan = Value::number(f64::NAN);
        assert!(nan.is_number());
        assert!(nan.as_number().unwrap().is_nan());
    }

    #[test]
    fn test_colliding_nan_is_canonicalized() {
        // Looks exactly like a pair tag
        let colliding = f64::from_bits(TAG_PAIR | 42);
        let v = Value::number(colliding);
        assert!(v.is_number());
        assert!(!v.is_pair());
        assert_eq!(v.to_bits(), CANONICAL_NAN);
    }

    #[test]
    fn test_indexed_variants() {
        let p = Value::pair(7);
        assert!(p.is_pair());
        assert_eq!(p.index(), 7);
        assert_eq!(p.kind(), Kind::Pair(7));

        let c = Value::closure(7);
        assert!(c.is_closure());
        assert!(c.is_callable());
        assert_eq!(c.closure_pair(), Some(p));

        let s = Value::symbol(3);
        assert_eq!(s.symbol_string(), Some(Value::string(3)));
        assert_ne!(s, Value::string(3));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::FALSE.is_truthy());
        assert!(Value::TRUE.is_truthy());
        assert!(Value::NIL.is_truthy());
        assert!(Value::number(0.0).is_truthy());
    }

    #[test]
    fn test_character_roundtrip() {
        for c in ['a', ' ', '\n', 'λ', '\u{1F600}'] {
            assert_eq!(Value::character(c).as_char(), Some(c));
        }
    }
}
