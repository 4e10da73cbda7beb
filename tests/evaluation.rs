use anyhow::{Context, Result, ensure};
use std::path::Path;

use pydrill::interpreter::safe_evaluate;
use test_support::{
    EvaluationClass, EvaluationSpec, detect_python_interpreter, load_cases, normalize_output,
    python_repr,
};

fn parity_required() -> bool {
    std::env::var("PYTHON_PARITY_REQUIRED")
        .map(|value| value == "1")
        .unwrap_or(false)
}

#[test]
fn evaluates_expressions() -> Result<()> {
    let cases = load_cases::<EvaluationSpec>(Path::new("tests/evaluation"))?;

    for case in cases {
        let source = case.read_text("input.py")?;
        let result = safe_evaluate(&source);
        match case.spec.class {
            EvaluationClass::Value => {
                let expected_file = case
                    .spec
                    .expected_file
                    .as_deref()
                    .with_context(|| format!("Missing expected_file in {}", case.name))?;
                let expected = normalize_output(&case.read_text(expected_file)?);
                let value = result.with_context(|| format!("Evaluating {}", case.name))?;
                assert_eq!(value.repr(), expected, "Value mismatch for {}", case.name);
            }
            EvaluationClass::Error => {
                ensure!(
                    result.is_err(),
                    "Expected an evaluation error in {}, got {:?}",
                    case.name,
                    result
                );
                if let Some(expected_file) = case.spec.expected_file.as_deref() {
                    let expected = normalize_output(&case.read_text(expected_file)?);
                    let actual = result.expect_err("result checked as err").to_string();
                    ensure!(
                        actual.contains(&expected),
                        "Expected error containing '{expected}' in {}, got '{actual}'",
                        case.name
                    );
                }
            }
        }
    }

    Ok(())
}

#[test]
fn matches_cpython_repr() -> Result<()> {
    let Some(interpreter) = detect_python_interpreter() else {
        ensure!(
            !parity_required(),
            "CPython parity required but no interpreter found. Set PYTHON or install python3."
        );
        eprintln!("Skipping CPython parity test: no PYTHON env or python3 interpreter found.");
        return Ok(());
    };

    let cases = load_cases::<EvaluationSpec>(Path::new("tests/evaluation"))?;
    for case in cases {
        if !case.spec.parity || case.spec.class != EvaluationClass::Value {
            continue;
        }
        let expected_file = case
            .spec
            .expected_file
            .as_deref()
            .with_context(|| format!("Missing expected_file in {}", case.name))?;
        let expected = normalize_output(&case.read_text(expected_file)?);
        let actual = normalize_output(&python_repr(&interpreter, &case.dir.join("input.py"))?);
        assert_eq!(actual, expected, "CPython mismatch for {}", case.name);
    }

    Ok(())
}
