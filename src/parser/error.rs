use thiserror::Error;

use crate::lexer::LexError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Expected {expected}, got {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Positional argument follows keyword argument at line {line}, column {column}")]
    PositionalAfterKeyword { line: usize, column: usize },
    #[error("Expression is nested deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("Expression has more than {limit} tokens")]
    TooLong { limit: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;
