//! Error types for the FHIRPath engine.
//!
//! The tokenizer and parser fail with the offending source embedded; the
//! evaluator wraps downstream failures with the original expression string
//! so a caller embedding this in a validator can report a single line of
//! context without re-deriving it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("syntax error in \"{source}\": {message}")]
    ParseError { source: String, message: String },

    #[error("FhirPathError: on \"{source}\": {message}")]
    EvalError { source: String, message: String },

    #[error("function not found: {0}")]
    FunctionNotFound(String),

    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn parse(source: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ParseError {
            source: source.into(),
            message: message.into(),
        }
    }

    /// Wrap any error with the originating expression's source text, matching
    /// the `FhirPathError: on "<expr>": ...` convention.
    pub fn with_source(self, source: &str) -> Self {
        match self {
            Error::EvalError { message, .. } => Error::EvalError {
                source: source.to_string(),
                message,
            },
            other => Error::EvalError {
                source: source.to_string(),
                message: other.to_string(),
            },
        }
    }
}
