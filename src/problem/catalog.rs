use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::debug;

use crate::corpus::Corpus;
use crate::instantiate::{InstantiateConfig, InstantiateError, Instantiator};
use crate::interpreter::{EvaluationError, Value, safe_evaluate};
use crate::shape::{LiteralKind, Shape};

use super::Problem;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error(transparent)]
    Instantiate(#[from] InstantiateError),
    #[error("Corpus expression '{expression}' does not evaluate: {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EvaluationError,
    },
    #[error("Unknown problem kind '{name}'")]
    UnknownKind { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    Num,
    Bool,
    String,
    ListOfString,
    ListOfNum,
    SetOfNum,
    DictOfStringNum,
    ListComprehension,
    Addition,
}

/// Kinds drawn from the corpus, in the order `random_problem` picks from.
pub const CORPUS_KINDS: [ProblemKind; 8] = [
    ProblemKind::SetOfNum,
    ProblemKind::Bool,
    ProblemKind::DictOfStringNum,
    ProblemKind::ListOfNum,
    ProblemKind::ListOfString,
    ProblemKind::String,
    ProblemKind::Num,
    ProblemKind::ListComprehension,
];

impl ProblemKind {
    pub const ALL: [ProblemKind; 9] = [
        ProblemKind::Num,
        ProblemKind::Bool,
        ProblemKind::String,
        ProblemKind::ListOfString,
        ProblemKind::ListOfNum,
        ProblemKind::SetOfNum,
        ProblemKind::DictOfStringNum,
        ProblemKind::ListComprehension,
        ProblemKind::Addition,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProblemKind::Num => "num",
            ProblemKind::Bool => "bool",
            ProblemKind::String => "string",
            ProblemKind::ListOfString => "list_of_string",
            ProblemKind::ListOfNum => "list_of_num",
            ProblemKind::SetOfNum => "set_of_num",
            ProblemKind::DictOfStringNum => "dict_of_string_num",
            ProblemKind::ListComprehension => "list_comprehension",
            ProblemKind::Addition => "addition",
        }
    }

    /// Corpus categories a problem of this kind is seeded from.
    pub fn seed_categories(self) -> &'static [&'static str] {
        match self {
            ProblemKind::Num => &["num_expr"],
            ProblemKind::Bool => &["bool_expr"],
            ProblemKind::String => &["string_expr"],
            ProblemKind::ListOfString => &["list_of_string_expr"],
            ProblemKind::ListOfNum => &["list_of_num_expr"],
            ProblemKind::SetOfNum => &["set_comprehension_of_num"],
            ProblemKind::DictOfStringNum => {
                &["dict_comprehension_of_string_num", "dict_expr_of_string_num"]
            }
            ProblemKind::ListComprehension => &["list_comprehension_of_num"],
            ProblemKind::Addition => &[],
        }
    }

    pub fn shape(self) -> Shape {
        match self {
            ProblemKind::Num | ProblemKind::Addition => Shape::Literal(LiteralKind::Number),
            ProblemKind::Bool => Shape::Boolean,
            ProblemKind::String => Shape::Literal(LiteralKind::String),
            ProblemKind::ListOfString => Shape::List(LiteralKind::String),
            ProblemKind::ListOfNum => Shape::List(LiteralKind::Number),
            ProblemKind::SetOfNum => Shape::Set(LiteralKind::Number),
            ProblemKind::DictOfStringNum => Shape::Dict {
                key: LiteralKind::String,
                value: LiteralKind::Number,
            },
            ProblemKind::ListComprehension => Shape::Comprehension,
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProblemKind {
    type Err = CatalogError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ProblemKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| CatalogError::UnknownKind {
                name: name.to_string(),
            })
    }
}

/// Builds problems of every kind from one corpus.
pub struct Catalog<'c> {
    instantiator: Instantiator<'c>,
}

impl<'c> Catalog<'c> {
    pub fn new(corpus: &'c Corpus) -> Self {
        Self::with_config(corpus, InstantiateConfig::default())
    }

    pub fn with_config(corpus: &'c Corpus, config: InstantiateConfig) -> Self {
        Self {
            instantiator: Instantiator::with_config(corpus, config),
        }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        kind: ProblemKind,
        rng: &mut R,
    ) -> Result<Problem, CatalogError> {
        let Some(category) = kind.seed_categories().choose(rng) else {
            let a = rng.gen_range(0..10);
            let b = rng.gen_range(0..10);
            return Ok(Problem::new(
                format!("{a} + {b}"),
                Value::Integer(a + b),
                kind.shape(),
            ));
        };

        let expression = self.instantiator.instantiate_category(category, rng)?;
        let answer = safe_evaluate(&expression).map_err(|source| CatalogError::Evaluation {
            expression: expression.clone(),
            source,
        })?;
        debug!(%kind, %expression, "generated problem");

        let prompt = match kind {
            ProblemKind::ListComprehension => {
                format!("Find a list comprehension that returns: {}", answer.repr())
            }
            _ => expression,
        };
        Ok(Problem::new(prompt, answer, kind.shape()))
    }

    /// A problem of a uniformly chosen corpus kind.
    pub fn random_problem<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Problem, CatalogError> {
        let kind = *CORPUS_KINDS.choose(rng).unwrap_or(&ProblemKind::Num);
        self.generate(kind, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::problem::Verdict;

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in ProblemKind::ALL {
            assert_eq!(kind.name().parse::<ProblemKind>(), Ok(kind));
        }
        assert!("nope".parse::<ProblemKind>().is_err());
    }

    #[test]
    fn addition_uses_small_operands() {
        let corpus = Corpus::default();
        let catalog = Catalog::new(&corpus);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let problem = catalog
                .generate(ProblemKind::Addition, &mut rng)
                .expect("addition needs no corpus");
            let (a, b) = problem.prompt().split_once(" + ").expect("a + b prompt");
            let (a, b): (i64, i64) = (a.parse().expect("int"), b.parse().expect("int"));
            assert!((0..10).contains(&a) && (0..10).contains(&b));
            assert_eq!(problem.answer(), &Value::Integer(a + b));
            assert_eq!(problem.check_answer(&(a + b).to_string()), Verdict::FullMatch);
        }
    }

    #[test]
    fn comprehension_prompt_shows_the_answer() {
        let corpus = Corpus::from_categories([(
            "list_comprehension_of_num",
            vec!["[i * 2 for i in range(3)]"],
        )]);
        let catalog = Catalog::new(&corpus);
        let problem = catalog
            .generate(ProblemKind::ListComprehension, &mut StdRng::seed_from_u64(0))
            .expect("generates");
        assert_eq!(
            problem.prompt(),
            "Find a list comprehension that returns: [0, 2, 4]"
        );
        assert_eq!(problem.check_answer("[0, 2, 4]"), Verdict::ShapeMismatch);
        assert_eq!(
            problem.check_answer("[n + n for n in range(3)]"),
            Verdict::FullMatch
        );
    }

    #[test]
    fn broken_corpus_expressions_are_fatal() {
        let corpus = Corpus::from_categories([("num_expr", vec!["1 / 0"])]);
        let catalog = Catalog::new(&corpus);
        assert!(matches!(
            catalog.generate(ProblemKind::Num, &mut StdRng::seed_from_u64(0)),
            Err(CatalogError::Evaluation { .. })
        ));
        assert!(matches!(
            catalog.generate(ProblemKind::Bool, &mut StdRng::seed_from_u64(0)),
            Err(CatalogError::Instantiate(InstantiateError::UnknownCategory { .. }))
        ));
    }
}
