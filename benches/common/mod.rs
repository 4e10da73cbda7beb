#![allow(dead_code)]
use pydrill::ast::Expression;
use pydrill::corpus::Corpus;
use pydrill::parser;

pub const WORKLOADS: [(&str, &str); 4] = [
    ("arithmetic", "(3 + 4) * 2 ** 5 - 17 // 3 % 4 + abs(-8) / 2"),
    (
        "comprehension",
        "[x * y for x in range(40) if x % 3 for y in range(x % 7) if y != 2]",
    ),
    (
        "dict",
        "{k: v * 2 for k, v in zip('abcdefghij', range(10)) if v > 2}",
    ),
    (
        "strings",
        "' '.join(sorted(w.upper() for w in 'the quick brown fox jumps over the lazy dog'.split()))",
    ),
];

pub fn load_expression(source: &str) -> Expression {
    parser::parse(source).unwrap_or_else(|err| panic!("parse {source}: {err}"))
}

pub fn load_corpus() -> Corpus {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/corpus");
    Corpus::load(dir).unwrap_or_else(|err| panic!("load {dir}: {err:#}"))
}
