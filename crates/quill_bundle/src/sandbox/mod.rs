//! A minimal evaluator for emitted resource modules.
//!
//! The language is the small CommonJS subset the emitter produces:
//! `var`/`let`/`const` bindings, `module.exports = ...`,
//! `exports.name = ...`, `module.exports.name = ...` and `throw`.
//! Expressions are string literals, identifiers bound earlier, `+`
//! concatenation, object literals and parentheses. There are no calls, no
//! globals and no I/O, so evaluating untrusted output cannot reach the host.

mod eval;
mod lexer;
mod parser;

use std::collections::BTreeMap;
use std::fmt;

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A string.
    Str(String),
    /// An object with string keys.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// The value's type name as reported in shape errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Object(_) => f.write_str("[object Object]"),
        }
    }
}

/// Why evaluation stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The source is not in the accepted language.
    #[error("syntax error on line {line}: {message}")]
    Syntax {
        /// 1-based line of the offending token.
        line: u32,
        /// What was expected.
        message: String,
    },

    /// An identifier was used before being bound.
    #[error("{name} is not defined")]
    Reference {
        /// The unbound name.
        name: String,
    },

    /// An operation was applied to the wrong kind of value.
    #[error("type error: {message}")]
    Type {
        /// Description of the mismatch.
        message: String,
    },

    /// The module executed a `throw`.
    #[error("uncaught exception: {message}")]
    Thrown {
        /// The thrown value, stringified.
        message: String,
    },
}

/// Evaluates `code` and returns its exported value.
///
/// The result is `module.exports` if the module assigned it, otherwise the
/// `exports` object (which may be empty).
pub fn evaluate(code: &str) -> Result<Value, EvalError> {
    let tokens = lexer::lex(code)?;
    let program = parser::parse(&tokens)?;
    eval::run(&program)
}
