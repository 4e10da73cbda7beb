use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedVerdict {
    FullMatch,
    ShapeMismatch,
    ValueMismatch,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerCheck {
    pub answer: String,
    pub verdict: ExpectedVerdict,
}

/// `tests/answers/<case>/case.yaml`: a problem of `kind` whose expected value
/// is whatever `expected` evaluates to, and the verdicts for some answers.
#[derive(Debug, Deserialize, Clone)]
pub struct AnswerSpec {
    pub kind: String,
    pub expected: String,
    pub answers: Vec<AnswerCheck>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationClass {
    Value,
    Error,
}

/// `tests/evaluation/<case>/case.yaml` next to an `input.py` expression.
#[derive(Debug, Deserialize, Clone)]
pub struct EvaluationSpec {
    pub class: EvaluationClass,
    /// Whether CPython must print the same `repr` for `input.py`.
    pub parity: bool,
    pub expected_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Case<S> {
    pub name: String,
    pub dir: PathBuf,
    pub spec: S,
}

impl<S> Case<S> {
    pub fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }
}

/// Loads every `<dir>/<case>/case.yaml`, sorted by case name.
pub fn load_cases<S: DeserializeOwned>(cases_dir: &Path) -> Result<Vec<Case<S>>> {
    let mut cases = Vec::new();

    for entry in
        fs::read_dir(cases_dir).with_context(|| format!("Reading {}", cases_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let case_path = path.join("case.yaml");
        if !case_path.exists() {
            continue;
        }

        let case_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", path.display()))?;
        let case_raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec: S = serde_yaml::from_str(&case_raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        cases.push(Case {
            name: case_name,
            dir: path,
            spec,
        });
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        cases_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}

pub fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

pub fn detect_python_interpreter() -> Option<String> {
    if let Ok(python) = std::env::var("PYTHON") {
        let status = Command::new(&python).arg("--version").output().ok()?;
        if status.status.success() {
            return Some(python);
        }
    }

    let status = Command::new("python3").arg("--version").output().ok()?;
    if status.status.success() {
        return Some("python3".to_string());
    }

    None
}

/// Evaluates the expression stored at `path` with CPython and returns its
/// `repr`.
pub fn python_repr(interpreter: &str, path: &Path) -> Result<String> {
    let output = Command::new(interpreter)
        .arg("-c")
        .arg("import sys; print(repr(eval(open(sys.argv[1]).read())))")
        .arg(path)
        .output()
        .with_context(|| format!("Running python on {}", path.display()))?;
    ensure!(
        output.status.success(),
        "python failed for {}: {}",
        path.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
