use thiserror::Error;

use crate::parser::ParseError;

/// Typed errors produced while evaluating an expression.
///
/// These are values, not failures of the tool: [`super::safe_evaluate`] hands
/// them back to the caller so a broken answer simply compares unequal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParseError),
    #[error("Cannot evaluate an invalid expression")]
    InvalidExpression,
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Unsupported operand types for {operation}: '{left}' and '{right}'")]
    UnsupportedOperands {
        operation: String,
        left: String,
        right: String,
    },
    #[error("Operation '{operation}' is not supported for type {type_name}")]
    UnsupportedOperation {
        operation: String,
        type_name: String,
    },
    #[error(
        "Invalid argument type for '{operation}': expected {expected}, got {got}"
    )]
    InvalidArgumentType {
        operation: String,
        expected: String,
        got: String,
    },
    #[error("Object of type {type_name} is not callable")]
    ObjectNotCallable { type_name: String },
    #[error("Object of type {type_name} is not iterable")]
    NotIterable { type_name: String },
    #[error("Unhashable type: '{type_name}'")]
    Unhashable { type_name: String },
    #[error("Unknown attribute '{attribute}' for type {type_name}")]
    UnknownAttribute {
        attribute: String,
        type_name: String,
    },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("Function '{name}' got an unexpected keyword argument '{keyword}'")]
    UnexpectedKeyword { name: String, keyword: String },
    #[error("{type_name} index out of range")]
    IndexOutOfRange { type_name: String },
    #[error("Key not found: {key}")]
    MissingKey { key: String },
    #[error("Cannot unpack {found} values into {expected} targets")]
    UnpackMismatch { expected: usize, found: usize },
    #[error("Division by zero")]
    ZeroDivision,
    #[error("Integer overflow in '{operation}'")]
    Overflow { operation: String },
    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
    #[error("Result exceeds the limit of {limit} {unit}")]
    TooLarge { limit: usize, unit: &'static str },
}

impl EvaluationError {
    pub(super) fn unsupported(operation: &str, left: &str, right: &str) -> Self {
        Self::UnsupportedOperands {
            operation: operation.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    pub(super) fn invalid_argument(operation: &str, expected: &str, got: &str) -> Self {
        Self::InvalidArgumentType {
            operation: operation.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub(super) fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}
