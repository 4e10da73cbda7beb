use std::io::{self, Read};

use anyhow::{Context, Result, anyhow, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pydrill::corpus::Corpus;
use pydrill::instantiate::InstantiateConfig;
use pydrill::interpreter::safe_evaluate;
use pydrill::problem::{Catalog, ProblemKind};

const USAGE: &str = "usage: pydrill [--corpus DIR] [--seed N] [--count N] [--max-attempts N] \
                     (generate | eval | check KIND ANSWER)";

enum Command {
    Generate,
    Eval,
    Check { kind: ProblemKind, answer: String },
}

struct Options {
    corpus_dir: String,
    seed: Option<u64>,
    count: usize,
    config: InstantiateConfig,
    command: Command,
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.ok_or_else(|| anyhow!("Missing value after {flag}"))?;
    value
        .parse()
        .with_context(|| format!("Invalid value '{value}' for {flag}"))
}

fn parse_options() -> Result<Options> {
    let mut args = std::env::args().skip(1);
    let mut corpus_dir = "corpus".to_string();
    let mut seed = match std::env::var("PYDRILL_SEED") {
        Ok(value) => Some(parse_number("PYDRILL_SEED", Some(value))?),
        Err(_) => None,
    };
    let mut count = 1;
    let mut config = InstantiateConfig::default();
    let mut command = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--corpus" | "-c" => {
                corpus_dir = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing directory after {arg}"))?;
            }
            "--seed" | "-s" => seed = Some(parse_number(&arg, args.next())?),
            "--count" | "-n" => count = parse_number(&arg, args.next())?,
            "--max-attempts" => config.max_attempts = parse_number(&arg, args.next())?,
            "generate" => command = Some(Command::Generate),
            "eval" => command = Some(Command::Eval),
            "check" => {
                let kind = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing problem kind after check"))?
                    .parse::<ProblemKind>()?;
                let answer = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing answer after check {kind}"))?;
                command = Some(Command::Check { kind, answer });
            }
            _ => bail!("Unexpected argument '{arg}'\n{USAGE}"),
        }
    }

    Ok(Options {
        corpus_dir,
        seed,
        count,
        config,
        command: command.unwrap_or(Command::Generate),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = parse_options()?;
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match options.command {
        Command::Eval => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Reading stdin")?;
            for line in source.lines().filter(|line| !line.trim().is_empty()) {
                match safe_evaluate(line) {
                    Ok(value) => println!("{}", value.repr()),
                    Err(error) => println!("{error}"),
                }
            }
        }
        Command::Generate => {
            let corpus = Corpus::load(&options.corpus_dir)?;
            let catalog = Catalog::with_config(&corpus, options.config);
            for _ in 0..options.count {
                let problem = catalog.random_problem(&mut rng)?;
                println!("{}", problem.prompt());
            }
            info!(count = options.count, "generated problems");
        }
        Command::Check { kind, answer } => {
            let corpus = if kind == ProblemKind::Addition {
                Corpus::default()
            } else {
                Corpus::load(&options.corpus_dir)?
            };
            let catalog = Catalog::with_config(&corpus, options.config);
            let problem = catalog.generate(kind, &mut rng)?;
            let verdict = problem.check_answer(&answer);
            println!("{}", problem.prompt());
            println!("{}", verdict.message());
            if !verdict.passed() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
