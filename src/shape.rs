//! Structural predicates deciding whether an answer is fully simplified.
//!
//! All predicates are total over [`Expression`] and never match
//! [`Expression::Invalid`].

use crate::ast::{Expression, UnaryOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Set,
    Dict,
}

/// `node` is a literal of exactly `kind`. A minus sign directly in front of a
/// numeric literal still counts as a number literal; `True` never does.
pub fn is_bare_literal(node: &Expression, kind: LiteralKind) -> bool {
    match (node, kind) {
        (Expression::Integer(_) | Expression::Float(_), LiteralKind::Number) => true,
        (
            Expression::UnaryOp {
                op: UnaryOperator::Neg,
                operand,
            },
            LiteralKind::Number,
        ) => matches!(operand.as_ref(), Expression::Integer(_) | Expression::Float(_)),
        (Expression::String(_), LiteralKind::String) => true,
        _ => false,
    }
}

/// `True` or `False` spelled out, as opposed to e.g. `1 == 1`.
pub fn is_bare_boolean(node: &Expression) -> bool {
    matches!(node, Expression::Boolean(_))
}

/// A container display of `container` whose elements are all literals of
/// `element`. Dicts check keys against `element` and values against `value`.
pub fn is_homogeneous_container(
    node: &Expression,
    container: ContainerKind,
    element: LiteralKind,
    value: Option<LiteralKind>,
) -> bool {
    match (node, container) {
        (Expression::List(elements), ContainerKind::List)
        | (Expression::Set(elements), ContainerKind::Set) => elements
            .iter()
            .all(|element_node| is_bare_literal(element_node, element)),
        (Expression::Dict(entries), ContainerKind::Dict) => {
            let value = value.unwrap_or(element);
            entries
                .iter()
                .all(|(key, entry)| is_bare_literal(key, element) && is_bare_literal(entry, value))
        }
        _ => false,
    }
}

/// A list comprehension none of whose generators iterates over a list
/// display.
pub fn is_non_cheating_comprehension(node: &Expression) -> bool {
    match node {
        Expression::ListComp { generators, .. } => generators
            .iter()
            .all(|generator| !matches!(generator.iterable, Expression::List(_))),
        _ => false,
    }
}

/// Expected shape of a fully simplified answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Literal(LiteralKind),
    Boolean,
    List(LiteralKind),
    Set(LiteralKind),
    Dict { key: LiteralKind, value: LiteralKind },
    Comprehension,
}

impl Shape {
    pub fn matches(self, node: &Expression) -> bool {
        match self {
            Shape::Literal(kind) => is_bare_literal(node, kind),
            Shape::Boolean => is_bare_boolean(node),
            Shape::List(kind) => is_homogeneous_container(node, ContainerKind::List, kind, None),
            Shape::Set(kind) => is_homogeneous_container(node, ContainerKind::Set, kind, None),
            Shape::Dict { key, value } => {
                is_homogeneous_container(node, ContainerKind::Dict, key, Some(value))
            }
            Shape::Comprehension => is_non_cheating_comprehension(node),
        }
    }
}
