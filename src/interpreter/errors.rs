//! Error types for reading and evaluation
//!
//! This module defines [`SchemeError`], the single error type returned by the
//! reader, the evaluator and every built-in procedure, and [`ReadError`] for
//! malformed source text.
//!
//! Errors propagate with `?` to the top-level driver, which prints them. Scheme
//! code cannot catch them.

use crate::memory::heap::HeapError;
use crate::parser::SourceLocation;
use std::fmt;

/// Malformed source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Read error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ReadError {}

/// Errors raised while reading or evaluating
#[derive(Debug, Clone, PartialEq)]
pub enum SchemeError {
    /// A pool ran out of free slots
    OutOfMemory { pool: &'static str, capacity: usize },

    /// Operand has the wrong type
    WrongType {
        procedure: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Symbol not bound anywhere in the environment chain
    UnboundVariable { name: String },

    /// Wrong operand count for a built-in procedure
    ArityMismatch {
        procedure: String,
        expected: String,
        got: usize,
    },

    /// Closure parameters and arguments do not line up
    ParameterArgumentMismatch { expected: String, got: usize },

    /// Malformed special form
    BadSyntax { form: &'static str, message: String },

    /// Application of something that is not a procedure or closure
    NotCallable { value: String },

    DivisionByZero { procedure: &'static str },

    /// Shadow root stack exhausted
    StackOverflow { capacity: usize },

    /// `()` evaluated as an expression
    CannotApplyEmptyList,

    /// Argument of the right type but an unusable value
    InvalidArgument {
        procedure: &'static str,
        message: String,
    },

    /// Reader failure
    Read(ReadError),

    /// File could not be read by `load` or the driver
    Io { path: String, message: String },
}

impl SchemeError {
    pub fn wrong_type(procedure: &str, expected: &'static str, got: &'static str) -> Self {
        SchemeError::WrongType {
            procedure: procedure.to_string(),
            expected,
            got,
        }
    }

    pub fn bad_syntax(form: &'static str, message: impl Into<String>) -> Self {
        SchemeError::BadSyntax {
            form,
            message: message.into(),
        }
    }

    /// Source location, for errors that carry one
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            SchemeError::Read(e) => Some(&e.location),
            _ => None,
        }
    }
}

impl fmt::Display for SchemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemeError::OutOfMemory { pool, capacity } => {
                write!(f, "out of memory: {} pool exhausted ({} slots)", pool, capacity)
            }
            SchemeError::WrongType {
                procedure,
                expected,
                got,
            } => write!(f, "{}: needs a {}, got {}", procedure, expected, got),
            SchemeError::UnboundVariable { name } => write!(f, "unbound variable: {}", name),
            SchemeError::ArityMismatch {
                procedure,
                expected,
                got,
            } => write!(
                f,
                "{}: expected {} argument(s), got {}",
                procedure, expected, got
            ),
            SchemeError::ParameterArgumentMismatch { expected, got } => write!(
                f,
                "parameter/argument mismatch: expected {}, got {} argument(s)",
                expected, got
            ),
            SchemeError::BadSyntax { form, message } => {
                write!(f, "bad {} syntax: {}", form, message)
            }
            SchemeError::NotCallable { value } => {
                write!(f, "attempt to apply non-procedure {}", value)
            }
            SchemeError::DivisionByZero { procedure } => {
                write!(f, "{}: division by zero", procedure)
            }
            SchemeError::StackOverflow { capacity } => {
                write!(f, "stack overflow: root stack full ({} entries)", capacity)
            }
            SchemeError::CannotApplyEmptyList => write!(f, "cannot evaluate the empty list"),
            SchemeError::InvalidArgument { procedure, message } => {
                write!(f, "{}: {}", procedure, message)
            }
            SchemeError::Read(e) => write!(f, "{}", e),
            SchemeError::Io { path, message } => write!(f, "cannot read {}: {}", path, message),
        }
    }
}

impl std::error::Error for SchemeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemeError::Read(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReadError> for SchemeError {
    fn from(e: ReadError) -> Self {
        SchemeError::Read(e)
    }
}

impl From<HeapError> for SchemeError {
    fn from(e: HeapError) -> Self {
        match e {
            HeapError::OutOfCells { capacity } => SchemeError::OutOfMemory {
                pool: "cell",
                capacity,
            },
            HeapError::OutOfStrings { capacity } => SchemeError::OutOfMemory {
                pool: "string",
                capacity,
            },
            HeapError::RootStackOverflow { capacity } => SchemeError::StackOverflow { capacity },
            HeapError::WrongType {
                operation,
                expected,
                got,
            } => SchemeError::wrong_type(operation, expected, got),
            HeapError::CircularList { operation } => SchemeError::InvalidArgument {
                procedure: operation,
                message: "circular list".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_errors_map_to_taxonomy() {
        let e: SchemeError = HeapError::OutOfCells { capacity: 4 }.into();
        assert_eq!(
            e,
            SchemeError::OutOfMemory {
                pool: "cell",
                capacity: 4
            }
        );
        let e: SchemeError = HeapError::RootStackOverflow { capacity: 8 }.into();
        assert_eq!(e, SchemeError::StackOverflow { capacity: 8 });
    }

    #[test]
    fn test_wrong_type_message() {
        let e = SchemeError::wrong_type("+", "number", "string");
        assert_eq!(e.to_string(), "+: needs a number, got string");
    }

    #[test]
    fn test_read_error_carries_location() {
        let e: SchemeError = ReadError {
            message: "unexpected ')'".to_string(),
            location: SourceLocation::new(3, 7),
        }
        .into();
        assert_eq!(e.location(), Some(&SourceLocation::new(3, 7)));
        assert!(e.to_string().starts_with("Read error at line 3, column 7"));
    }
}
