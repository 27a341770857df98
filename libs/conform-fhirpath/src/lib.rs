//! FHIRPath engine: tokenizer, Pratt parser with an LRU expression cache,
//! and a tree-walking evaluator with the standard function library.

mod ast;
mod cache;
mod context;
mod engine;
mod error;
mod eval;
mod functions;
mod lexer;
mod parser;
mod temporal;
mod token;
mod value;

pub use ast::{AstNode, Literal, Symbol};
pub use context::EvalContext;
pub use engine::FhirPathEngine;
pub use error::{Error, Result};
pub use value::{
    compare, equals, equivalent, DatePrecision, DateTimePrecision, PartialDate, PartialDateTime, PartialTime,
    TimePrecision, TypedValue,
};
