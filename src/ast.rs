//! Syntax tree for the expression sublanguage.
//!
//! The parser builds these nodes once; the interpreter walks them to produce
//! values and the shape verifier inspects them without evaluating anything.

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    None,
    Identifier(String),
    List(Vec<Expression>),
    Tuple(Vec<Expression>),
    Set(Vec<Expression>),
    Dict(Vec<(Expression, Expression)>),
    ListComp {
        element: Box<Expression>,
        generators: Vec<Comprehension>,
    },
    SetComp {
        element: Box<Expression>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expression>,
        value: Box<Expression>,
        generators: Vec<Comprehension>,
    },
    /// Only produced as the sole argument of a call, e.g. `sum(x for x in xs)`.
    GeneratorExp {
        element: Box<Expression>,
        generators: Vec<Comprehension>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    BoolOp {
        op: BoolOperator,
        values: Vec<Expression>,
    },
    Compare {
        left: Box<Expression>,
        comparisons: Vec<(CompareOperator, Expression)>,
    },
    Conditional {
        condition: Box<Expression>,
        then_value: Box<Expression>,
        else_value: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        keywords: Vec<(String, Expression)>,
    },
    Attribute {
        object: Box<Expression>,
        name: String,
    },
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Slice {
        object: Box<Expression>,
        lower: Option<Box<Expression>>,
        upper: Option<Box<Expression>>,
        step: Option<Box<Expression>>,
    },
    /// Stand-in for text that failed to parse. Never matches a shape.
    Invalid,
}

/// One `for target in iterable if cond...` clause of a comprehension.
#[derive(Debug, PartialEq, Clone)]
pub struct Comprehension {
    pub target: Target,
    pub iterable: Expression,
    pub conditions: Vec<Expression>,
}

/// Loop target forms accepted by the parser.
///
/// Note: tuple targets are flat (`for k, v in ...`); nested unpacking is not
/// part of the grammar.
#[derive(Debug, PartialEq, Clone)]
pub enum Target {
    Name(String),
    Tuple(Vec<String>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    NotIn,
    Is,
    IsNot,
}

impl Expression {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Expression::Invalid)
    }

    pub fn generators(&self) -> Option<&[Comprehension]> {
        match self {
            Expression::ListComp { generators, .. }
            | Expression::SetComp { generators, .. }
            | Expression::DictComp { generators, .. }
            | Expression::GeneratorExp { generators, .. } => Some(generators),
            _ => None,
        }
    }

    /// Direct sub-expressions, in source order.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Integer(_)
            | Expression::Float(_)
            | Expression::String(_)
            | Expression::Boolean(_)
            | Expression::None
            | Expression::Identifier(_)
            | Expression::Invalid => Vec::new(),
            Expression::List(elements)
            | Expression::Tuple(elements)
            | Expression::Set(elements)
            | Expression::BoolOp {
                values: elements, ..
            } => elements.iter().collect(),
            Expression::Dict(entries) => entries
                .iter()
                .flat_map(|(key, value)| [key, value])
                .collect(),
            Expression::ListComp {
                element,
                generators,
            }
            | Expression::SetComp {
                element,
                generators,
            }
            | Expression::GeneratorExp {
                element,
                generators,
            } => {
                let mut children = vec![element.as_ref()];
                children.extend(comprehension_parts(generators));
                children
            }
            Expression::DictComp {
                key,
                value,
                generators,
            } => {
                let mut children = vec![key.as_ref(), value.as_ref()];
                children.extend(comprehension_parts(generators));
                children
            }
            Expression::UnaryOp { operand, .. } => vec![operand.as_ref()],
            Expression::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expression::Compare { left, comparisons } => {
                let mut children = vec![left.as_ref()];
                children.extend(comparisons.iter().map(|(_, operand)| operand));
                children
            }
            Expression::Conditional {
                condition,
                then_value,
                else_value,
            } => vec![then_value.as_ref(), condition.as_ref(), else_value.as_ref()],
            Expression::Call {
                callee,
                args,
                keywords,
            } => {
                let mut children = vec![callee.as_ref()];
                children.extend(args.iter());
                children.extend(keywords.iter().map(|(_, value)| value));
                children
            }
            Expression::Attribute { object, .. } => vec![object.as_ref()],
            Expression::Index { object, index } => vec![object.as_ref(), index.as_ref()],
            Expression::Slice {
                object,
                lower,
                upper,
                step,
            } => {
                let mut children = vec![object.as_ref()];
                children.extend([lower, upper, step].into_iter().flatten().map(|part| &**part));
                children
            }
        }
    }

    /// Height of the tree, computed without recursion.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

fn comprehension_parts(generators: &[Comprehension]) -> impl Iterator<Item = &Expression> {
    generators.iter().flat_map(|generator| {
        std::iter::once(&generator.iterable).chain(generator.conditions.iter())
    })
}
