//! Practice problems and the verdict on a candidate answer.

use crate::interpreter::{Value, safe_evaluate};
use crate::parser::safe_parse;
use crate::shape::Shape;

pub mod catalog;

pub use catalog::{Catalog, CatalogError, ProblemKind};

pub const CORRECT: &str = "Correct!";
pub const NOT_SIMPLIFIED: &str = "Correct, but not fully simplified";
pub const INCORRECT: &str = "Incorrect :(";

/// Outcome of checking one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The answer does not evaluate to the expected value, or does not
    /// evaluate at all.
    ValueMismatch,
    /// Right value, but not written in the expected form.
    ShapeMismatch,
    FullMatch,
}

impl Verdict {
    pub fn message(self) -> &'static str {
        match self {
            Verdict::ValueMismatch => INCORRECT,
            Verdict::ShapeMismatch => NOT_SIMPLIFIED,
            Verdict::FullMatch => CORRECT,
        }
    }

    pub fn passed(self) -> bool {
        self == Verdict::FullMatch
    }
}

#[derive(Debug, Clone)]
pub struct Problem {
    prompt: String,
    answer: Value,
    shape: Shape,
}

impl Problem {
    pub fn new(prompt: impl Into<String>, answer: Value, shape: Shape) -> Self {
        Self {
            prompt: prompt.into(),
            answer,
            shape,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn answer(&self) -> &Value {
        &self.answer
    }

    /// Compares values first; only a value match is parsed and checked
    /// against the expected shape.
    pub fn check_answer(&self, answer: &str) -> Verdict {
        match safe_evaluate(answer) {
            Ok(value) if value == self.answer => {
                if self.shape.matches(&safe_parse(answer)) {
                    Verdict::FullMatch
                } else {
                    Verdict::ShapeMismatch
                }
            }
            _ => Verdict::ValueMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::LiteralKind;

    #[test]
    fn messages_are_fixed() {
        assert_eq!(Verdict::FullMatch.message(), "Correct!");
        assert_eq!(
            Verdict::ShapeMismatch.message(),
            "Correct, but not fully simplified"
        );
        assert_eq!(Verdict::ValueMismatch.message(), "Incorrect :(");
        assert!(Verdict::FullMatch.passed());
        assert!(!Verdict::ShapeMismatch.passed());
        assert!(!Verdict::ValueMismatch.passed());
    }

    #[test]
    fn value_is_checked_before_shape() {
        let problem = Problem::new("2+3", Value::Integer(5), Shape::Literal(LiteralKind::Number));
        assert_eq!(problem.check_answer("5"), Verdict::FullMatch);
        assert_eq!(problem.check_answer("5.0"), Verdict::FullMatch);
        assert_eq!(problem.check_answer("2+3"), Verdict::ShapeMismatch);
        assert_eq!(problem.check_answer("6"), Verdict::ValueMismatch);
        assert_eq!(problem.check_answer("5 +"), Verdict::ValueMismatch);
        assert_eq!(problem.check_answer("1 / 0"), Verdict::ValueMismatch);
        assert_eq!(problem.check_answer(""), Verdict::ValueMismatch);
    }

    #[test]
    fn none_answers_do_not_match_errors() {
        let problem = Problem::new("None", Value::None, Shape::Boolean);
        assert_eq!(problem.check_answer("undefined"), Verdict::ValueMismatch);
        assert_eq!(problem.check_answer("None"), Verdict::ShapeMismatch);
    }
}
