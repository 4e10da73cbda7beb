//! Expands seed templates into concrete expressions.
//!
//! Each pass rewrites every placeholder of the working string once: a plain
//! reference splices in a random template of its category verbatim, while a
//! named binding splices in a template whose own placeholders are all
//! replaced by the bound name. Passes repeat until nothing is left to
//! expand. A binding whose template references a different category throws
//! the whole expansion away and starts again from the seed.

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::debug;

use crate::corpus::Corpus;
use crate::template::{self, Binding, MalformedTemplateError, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstantiateConfig {
    /// Full restarts allowed before giving up on a seed.
    pub max_attempts: usize,
    /// Expansion passes allowed within one attempt.
    pub max_passes: usize,
}

impl Default for InstantiateConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            max_passes: 256,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstantiateError {
    #[error("Malformed template '{template}': {source}")]
    Malformed {
        template: String,
        #[source]
        source: MalformedTemplateError,
    },
    #[error("Unknown corpus category '{category}'")]
    UnknownCategory { category: String },
    #[error("Corpus category '{category}' has no templates")]
    EmptyCategory { category: String },
    #[error("Gave up on '{seed}' after {attempts} attempts")]
    Exhausted { seed: String, attempts: usize },
}

enum Attempt {
    Done(String),
    Restart(&'static str),
}

pub struct Instantiator<'c> {
    corpus: &'c Corpus,
    config: InstantiateConfig,
}

impl<'c> Instantiator<'c> {
    pub fn new(corpus: &'c Corpus) -> Self {
        Self::with_config(corpus, InstantiateConfig::default())
    }

    pub fn with_config(corpus: &'c Corpus, config: InstantiateConfig) -> Self {
        Self { corpus, config }
    }

    /// Expands `seed` until no placeholders remain.
    pub fn instantiate<R: Rng + ?Sized>(
        &self,
        seed: &str,
        rng: &mut R,
    ) -> Result<String, InstantiateError> {
        for attempt in 1..=self.config.max_attempts {
            match self.attempt(seed, rng)? {
                Attempt::Done(expression) => return Ok(expression),
                Attempt::Restart(reason) => {
                    debug!(seed, attempt, reason, "restarting expansion from the seed");
                }
            }
        }
        Err(InstantiateError::Exhausted {
            seed: seed.to_string(),
            attempts: self.config.max_attempts,
        })
    }

    /// Picks a random template of `category` and expands it.
    pub fn instantiate_category<R: Rng + ?Sized>(
        &self,
        category: &str,
        rng: &mut R,
    ) -> Result<String, InstantiateError> {
        let seed = self.choose(category, rng)?;
        self.instantiate(seed, rng)
    }

    fn attempt<R: Rng + ?Sized>(&self, seed: &str, rng: &mut R) -> Result<Attempt, InstantiateError> {
        let mut working = seed.to_string();
        for _ in 0..self.config.max_passes {
            let Some(next) = self.pass(&working, rng)? else {
                return Ok(Attempt::Restart("binding mismatch"));
            };
            working = next;
            let remaining = template::has_placeholders(&working).map_err(|source| {
                InstantiateError::Malformed {
                    template: working.clone(),
                    source,
                }
            })?;
            if !remaining {
                return Ok(Attempt::Done(template::unescape(&working).into_owned()));
            }
        }
        Ok(Attempt::Restart("pass limit reached"))
    }

    /// One rewrite of every placeholder in `working`. `None` signals a
    /// binding mismatch.
    fn pass<R: Rng + ?Sized>(
        &self,
        working: &str,
        rng: &mut R,
    ) -> Result<Option<String>, InstantiateError> {
        let mut next = String::with_capacity(working.len());
        for segment in template::segments(working) {
            match segment.map_err(|source| malformed(working, source))? {
                Segment::Literal(text) => next.push_str(&template::escape(&text)),
                Segment::Placeholder(placeholder) => {
                    let chosen = self.choose(placeholder.category, rng)?;
                    match placeholder.binding {
                        None => next.push_str(chosen),
                        Some(binding) => {
                            if !bind(chosen, binding, &mut next)? {
                                return Ok(None);
                            }
                        }
                    }
                }
            }
        }
        Ok(Some(next))
    }

    fn choose<R: Rng + ?Sized>(&self, category: &str, rng: &mut R) -> Result<&'c str, InstantiateError> {
        let templates =
            self.corpus
                .templates(category)
                .ok_or_else(|| InstantiateError::UnknownCategory {
                    category: category.to_string(),
                })?;
        templates
            .choose(rng)
            .map(String::as_str)
            .ok_or_else(|| InstantiateError::EmptyCategory {
                category: category.to_string(),
            })
    }
}

/// Appends `chosen` with each of its placeholders replaced by the bound name.
/// Returns false if one of them is not of the bound kind.
fn bind(chosen: &str, binding: Binding<'_>, next: &mut String) -> Result<bool, InstantiateError> {
    for segment in template::segments(chosen) {
        match segment.map_err(|source| malformed(chosen, source))? {
            Segment::Literal(text) => next.push_str(&template::escape(&text)),
            Segment::Placeholder(inner) if inner.category == binding.kind => {
                next.push_str(binding.name);
            }
            Segment::Placeholder(_) => return Ok(false),
        }
    }
    Ok(true)
}

fn malformed(template: &str, source: MalformedTemplateError) -> InstantiateError {
    InstantiateError::Malformed {
        template: template.to_string(),
        source,
    }
}

/// Expands `seed` against `corpus` with the default limits.
pub fn instantiate<R: Rng + ?Sized>(
    seed: &str,
    corpus: &Corpus,
    rng: &mut R,
) -> Result<String, InstantiateError> {
    Instantiator::new(corpus).instantiate(seed, rng)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn numbers() -> Corpus {
        Corpus::from_categories([("num_expr", vec!["1", "2", "3"])])
    }

    #[test]
    fn expands_to_one_of_the_nine_sums() {
        let corpus = numbers();
        let mut seen = BTreeSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let expression =
                instantiate("{num_expr}+{num_expr}", &corpus, &mut rng).expect("expands");
            seen.insert(expression);
        }
        let expected = ["1", "2", "3"]
            .iter()
            .flat_map(|a| ["1", "2", "3"].iter().map(move |b| format!("{a}+{b}")))
            .collect::<BTreeSet<_>>();
        assert_eq!(seen, expected);
    }

    #[test]
    fn is_deterministic_for_a_fixed_seed() {
        let corpus = Corpus::from_categories([
            ("num_expr", vec!["1", "{num_expr} * 2", "({num_expr} - 4)"]),
        ]);
        let run = || {
            let mut rng = StdRng::seed_from_u64(7);
            (0..20)
                .map(|_| instantiate("{num_expr}", &corpus, &mut rng).expect("expands"))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn literal_templates_come_back_unchanged() {
        let corpus = numbers();
        let mut rng = StdRng::seed_from_u64(0);
        for text in ["1 + 2", "[x for x in range(3)]", "'a' * 3", ""] {
            assert_eq!(instantiate(text, &corpus, &mut rng), Ok(text.to_string()));
        }
        assert_eq!(
            instantiate("{{1: {num_expr}}}", &corpus, &mut StdRng::seed_from_u64(1))
                .map(|text| text.starts_with('{') && text.ends_with('}')),
            Ok(true)
        );
    }

    #[test]
    fn binds_names_consistently() {
        let corpus = Corpus::from_categories([("x", vec!["{name}"]), ("name", vec!["x"])]);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            instantiate("[{x} for {x:name:x} in range(3)]", &corpus, &mut rng),
            Ok("[x for x in range(3)]".to_string())
        );
    }

    #[test]
    fn mismatched_bindings_never_leak() {
        let corpus = Corpus::from_categories([
            ("target", vec!["{name}", "{other}"]),
            ("name", vec!["n"]),
            ("other", vec!["BROKEN"]),
        ]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let expression = instantiate("[v for {target:name:v} in range(2)]", &corpus, &mut rng)
                .expect("expands");
            assert_eq!(expression, "[v for v in range(2)]");
        }
    }

    #[test]
    fn unsatisfiable_bindings_exhaust() {
        let corpus = Corpus::from_categories([("target", vec!["{other}"]), ("other", vec!["o"])]);
        let config = InstantiateConfig {
            max_attempts: 5,
            max_passes: 4,
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Instantiator::with_config(&corpus, config).instantiate("{target:name:v}", &mut rng),
            Err(InstantiateError::Exhausted {
                seed: "{target:name:v}".to_string(),
                attempts: 5
            })
        );
    }

    #[test]
    fn runaway_recursion_exhausts() {
        let corpus = Corpus::from_categories([("loop", vec!["({loop})"])]);
        let config = InstantiateConfig {
            max_attempts: 3,
            max_passes: 10,
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Instantiator::with_config(&corpus, config).instantiate("{loop}", &mut rng),
            Err(InstantiateError::Exhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn authoring_errors_are_fatal() {
        let mut rng = StdRng::seed_from_u64(0);
        let corpus = Corpus::from_categories([("empty", Vec::<String>::new())]);
        assert_eq!(
            instantiate("{missing}", &corpus, &mut rng),
            Err(InstantiateError::UnknownCategory {
                category: "missing".to_string()
            })
        );
        assert_eq!(
            instantiate("{empty}", &corpus, &mut rng),
            Err(InstantiateError::EmptyCategory {
                category: "empty".to_string()
            })
        );
        assert!(matches!(
            instantiate("{num_expr", &corpus, &mut rng),
            Err(InstantiateError::Malformed { .. })
        ));
    }
}
