use anyhow::{Context, Result, ensure};
use std::path::Path;

use pydrill::interpreter::safe_evaluate;
use pydrill::problem::{Problem, ProblemKind, Verdict};
use test_support::{AnswerSpec, ExpectedVerdict, load_cases};

fn verdict(expected: ExpectedVerdict) -> Verdict {
    match expected {
        ExpectedVerdict::FullMatch => Verdict::FullMatch,
        ExpectedVerdict::ShapeMismatch => Verdict::ShapeMismatch,
        ExpectedVerdict::ValueMismatch => Verdict::ValueMismatch,
    }
}

#[test]
fn checks_answers() -> Result<()> {
    let cases = load_cases::<AnswerSpec>(Path::new("tests/answers"))?;

    for case in cases {
        let kind: ProblemKind = case
            .spec
            .kind
            .parse()
            .with_context(|| format!("Kind of {}", case.name))?;
        let answer = safe_evaluate(&case.spec.expected)
            .with_context(|| format!("Evaluating the expected value of {}", case.name))?;
        let problem = Problem::new(case.spec.expected.clone(), answer, kind.shape());
        ensure!(
            !case.spec.answers.is_empty(),
            "Case {} has no answers to check",
            case.name
        );

        for check in &case.spec.answers {
            let actual = problem.check_answer(&check.answer);
            assert_eq!(
                actual,
                verdict(check.verdict),
                "Answer {:?} in {} got '{}'",
                check.answer,
                case.name,
                actual.message()
            );
        }
    }

    Ok(())
}
