use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Invalid numeric literal '{literal}' at line {line}, column {column}")]
    InvalidNumericLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Invalid escape sequence '{escape}' at line {line}, column {column}")]
    InvalidEscape {
        escape: String,
        line: usize,
        column: usize,
    },
    #[error("Unsupported string prefix '{prefix}' at line {line}, column {column}")]
    UnsupportedStringPrefix {
        prefix: String,
        line: usize,
        column: usize,
    },
}

pub type LexResult<T> = Result<T, LexError>;
