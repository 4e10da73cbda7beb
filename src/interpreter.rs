use crate::ast::Expression;
use crate::parser::safe_parse;

mod builtins;
mod error;
mod methods;
mod operators;
mod runtime;
mod value;

pub use builtins::BuiltinFunction;
pub use error::EvaluationError;
pub use value::Value;

use runtime::{Environment, InterpreterRuntime};

/// Longest list, string or range a single evaluation may materialize.
pub const MAX_SEQUENCE_LEN: usize = 100_000;
/// Values an evaluation may produce before giving up, counting nested
/// elements and string bytes.
pub const MAX_STEPS: usize = 2_000_000;

/// Outcome of evaluating an expression. Errors are ordinary values here.
pub type Evaluation = Result<Value, EvaluationError>;

/// Tree-walking evaluator for single expressions.
///
/// Every call starts from a fresh step budget and an empty scope, so an
/// `Interpreter` can be shared across problems.
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, expr: &Expression) -> Evaluation {
        let mut runtime = InterpreterRuntime::new();
        let mut environment = Environment::new();
        runtime.eval_expression(expr, &mut environment)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn evaluate(expr: &Expression) -> Evaluation {
    Interpreter::new().evaluate(expr)
}

/// Parses and evaluates `text`. Never panics; any failure comes back as the
/// error variant.
pub fn safe_evaluate(text: &str) -> Evaluation {
    evaluate(&safe_parse(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn repr(text: &str) -> String {
        match safe_evaluate(text) {
            Ok(value) => value.repr(),
            Err(error) => panic!("evaluating {text:?} failed: {error}"),
        }
    }

    #[test]
    fn evaluates_arithmetic_with_python_semantics() {
        assert_eq!(repr("1 + 2 * 3"), "7");
        assert_eq!(repr("7 // -2"), "-4");
        assert_eq!(repr("-7 % 3"), "2");
        assert_eq!(repr("1 / 2"), "0.5");
        assert_eq!(repr("2 ** -1"), "0.5");
        assert_eq!(repr("-2 ** 2"), "-4");
        assert_eq!(repr("True + True"), "2");
    }

    #[test]
    fn evaluates_comprehensions() {
        assert_eq!(repr("[x * x for x in range(4) if x % 2 == 0]"), "[0, 4]");
        assert_eq!(repr("{x % 3 for x in range(10)}"), "{0, 1, 2}");
        assert_eq!(
            repr("{k: len(k) for k in ['a', 'bb']}"),
            "{'a': 1, 'bb': 2}"
        );
        assert_eq!(
            repr("[(i, c) for i, c in enumerate('ab')]"),
            "[(0, 'a'), (1, 'b')]"
        );
        assert_eq!(repr("[y for x in [[1, 2], [3]] for y in x]"), "[1, 2, 3]");
        assert_eq!(repr("sum(x for x in range(5))"), "10");
    }

    #[test]
    fn boolean_operators_return_the_deciding_operand() {
        assert_eq!(repr("0 or 'fallback'"), "'fallback'");
        assert_eq!(repr("[] and 1"), "[]");
        assert_eq!(repr("1 < 2 < 3"), "True");
        assert_eq!(repr("1 < 3 < 2"), "False");
        assert_eq!(repr("'yes' if 2 in [1, 2] else 'no'"), "'yes'");
    }

    #[test]
    fn evaluates_builtins_and_methods() {
        assert_eq!(repr("sorted({3, 1, 2}, reverse=True)"), "[3, 2, 1]");
        assert_eq!(repr("list(zip('ab', [1, 2, 3]))"), "[('a', 1), ('b', 2)]");
        assert_eq!(repr("dict(a=1, b=2)"), "{'a': 1, 'b': 2}");
        assert_eq!(repr("', '.join(['x', 'y'])"), "'x, y'");
        assert_eq!(repr("'Hello'[::-1].upper()"), "'OLLEH'");
        assert_eq!(repr("[1, 2, 3][-1]"), "3");
        assert_eq!(repr("{'a': 1}.get('b', 0)"), "0");
        assert_eq!(repr("max(len(w) for w in 'a bb ccc'.split())"), "3");
    }

    #[test]
    fn evaluates_multiline_input() {
        let text = indoc! {"
            [
                n * 2
                for n in range(3)
            ]
        "};
        assert_eq!(repr(text), "[0, 2, 4]");
    }

    #[test]
    fn failures_are_values() {
        assert_eq!(safe_evaluate("1 / 0"), Err(EvaluationError::ZeroDivision));
        assert_eq!(
            safe_evaluate("[1, 2"),
            Err(EvaluationError::InvalidExpression)
        );
        assert_eq!(
            safe_evaluate("undefined_name"),
            Err(EvaluationError::UndefinedVariable {
                name: "undefined_name".to_string()
            })
        );
        assert!(safe_evaluate("{[1]: 2}").is_err());
        assert!(safe_evaluate("'a' * 10 ** 9").is_err());
        assert!(safe_evaluate("list(range(10 ** 12))").is_err());
        assert!(safe_evaluate("2 ** 1000").is_err());
        assert!(safe_evaluate("len(5)").is_err());
        assert!(safe_evaluate("").is_err());
    }

    #[test]
    fn deep_copies_are_charged_to_the_step_budget() {
        let sources = [
            "len([[0] * 50000] * 50000)",
            "len({x: [0] * 100000 for x in range(100000)})",
            "len(''.join(['a' * 100000] * 100000))",
            "len(set([(0,) * 100000] * 100000))",
            "sorted([[0] * 1000] * 100000) == 1",
            "[[0] * 100000 for i in range(100)]",
            "sum([[0] * 1000] * 1000, [])",
        ];
        for source in sources {
            assert!(
                matches!(
                    safe_evaluate(source),
                    Err(EvaluationError::TooLarge { .. })
                ),
                "{source} should exceed a limit"
            );
        }
        assert_eq!(repr("len([[0] * 1000] * 100)"), "100");
        assert_eq!(repr("len({x: [0] * 100 for x in range(100)})"), "100");
    }

    #[test]
    fn ranges_beyond_i64_length_index_exactly() {
        assert_eq!(
            repr("range(-9223372036854775807 - 1, 9223372036854775807, 2)[-1]"),
            "9223372036854775806"
        );
        assert_eq!(
            repr("range(-9223372036854775807 - 1, 9223372036854775807)[-1]"),
            "9223372036854775806"
        );
        assert_eq!(
            repr("range(-9223372036854775807 - 1, 9223372036854775807)[0]"),
            "-9223372036854775808"
        );
        assert_eq!(
            repr("9223372036854775806 in range(-9223372036854775807 - 1, 9223372036854775807, 2)"),
            "True"
        );
        assert!(matches!(
            safe_evaluate("len(range(-9223372036854775807 - 1, 9223372036854775807))"),
            Err(EvaluationError::Overflow { .. })
        ));
        assert_eq!(repr("[1, 2, 3][1::9223372036854775807]"), "[2]");
    }

    #[test]
    fn range_is_not_a_list() {
        assert_eq!(repr("range(3)"), "range(0, 3)");
        assert_eq!(safe_evaluate("range(3) == [0, 1, 2]"), Ok(Value::Boolean(false)));
        assert_eq!(safe_evaluate("list(range(3)) == [0, 1, 2]"), Ok(Value::Boolean(true)));
    }
}
