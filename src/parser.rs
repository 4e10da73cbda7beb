use crate::ast::{
    BinaryOperator, BoolOperator, CompareOperator, Comprehension, Expression, Target,
    UnaryOperator,
};
use crate::lexer;
use crate::token::{Token, TokenKind};

pub mod error;

pub use error::{ParseError, ParseResult};

/// Limit on nested subexpressions: each bracket, call or subscript with
/// contents and each prefix operator opens one level. The top level is free.
pub const MAX_NESTING: usize = 64;
/// Limit on the height of a finished tree, which also bounds evaluation depth.
pub const MAX_DEPTH: usize = 100;
pub const MAX_TOKENS: usize = 4096;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
            nesting: 0,
        }
    }

    /// Parses the whole token stream as a single expression, the way `eval`
    /// input is read: a bare `a, b` is a tuple.
    pub fn parse_input(mut self) -> ParseResult<Expression> {
        let expr = self.parse_expression_list()?;
        self.expect(TokenKind::EOF, "end of input")?;
        if expr.depth() > MAX_DEPTH {
            return Err(ParseError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(expr)
    }

    fn parse_expression_list(&mut self) -> ParseResult<Expression> {
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_expression_end() {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        Ok(Expression::Tuple(elements))
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.nested(|parser| {
            let value = parser.parse_or()?;
            if !parser.check(&TokenKind::If) {
                return Ok(value);
            }
            parser.advance();
            let condition = parser.parse_or()?;
            parser.expect(TokenKind::Else, "else")?;
            let else_value = parser.parse_expression()?;
            Ok(Expression::Conditional {
                condition: Box::new(condition),
                then_value: Box::new(value),
                else_value: Box::new(else_value),
            })
        })
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let first = self.parse_and()?;
        if !self.check(&TokenKind::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::Or) {
            values.push(self.parse_and()?);
        }
        Ok(Expression::BoolOp {
            op: BoolOperator::Or,
            values,
        })
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let first = self.parse_not()?;
        if !self.check(&TokenKind::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::And) {
            values.push(self.parse_not()?);
        }
        Ok(Expression::BoolOp {
            op: BoolOperator::And,
            values,
        })
    }

    fn parse_not(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::Not) {
            return self.nested(|parser| {
                let operand = parser.parse_not()?;
                Ok(Expression::UnaryOp {
                    op: UnaryOperator::Not,
                    operand: Box::new(operand),
                })
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let left = self.parse_bit_or()?;
        let mut comparisons = Vec::new();
        while let Some(op) = self.comparison_operator() {
            comparisons.push((op, self.parse_bit_or()?));
        }
        if comparisons.is_empty() {
            return Ok(left);
        }
        Ok(Expression::Compare {
            left: Box::new(left),
            comparisons,
        })
    }

    fn comparison_operator(&mut self) -> Option<CompareOperator> {
        let op = match self.current().kind {
            TokenKind::EqualEqual => CompareOperator::Equal,
            TokenKind::NotEqual => CompareOperator::NotEqual,
            TokenKind::Less => CompareOperator::Less,
            TokenKind::LessEqual => CompareOperator::LessEqual,
            TokenKind::Greater => CompareOperator::Greater,
            TokenKind::GreaterEqual => CompareOperator::GreaterEqual,
            TokenKind::In => CompareOperator::In,
            TokenKind::Not if self.peek_kind() == &TokenKind::In => {
                self.advance();
                CompareOperator::NotIn
            }
            TokenKind::Is => {
                if self.peek_kind() == &TokenKind::Not {
                    self.advance();
                    CompareOperator::IsNot
                } else {
                    CompareOperator::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_bit_or(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(
            &[(TokenKind::Pipe, BinaryOperator::BitOr)],
            Self::parse_bit_xor,
        )
    }

    fn parse_bit_xor(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(
            &[(TokenKind::Caret, BinaryOperator::BitXor)],
            Self::parse_bit_and,
        )
    }

    fn parse_bit_and(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(&[(TokenKind::Amp, BinaryOperator::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(
            &[
                (TokenKind::ShiftLeft, BinaryOperator::ShiftLeft),
                (TokenKind::ShiftRight, BinaryOperator::ShiftRight),
            ],
            Self::parse_arithmetic,
        )
    }

    fn parse_arithmetic(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(
            &[
                (TokenKind::Plus, BinaryOperator::Add),
                (TokenKind::Minus, BinaryOperator::Sub),
            ],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinaryOperator::Mul),
                (TokenKind::Slash, BinaryOperator::Div),
                (TokenKind::DoubleSlash, BinaryOperator::FloorDiv),
                (TokenKind::Percent, BinaryOperator::Mod),
            ],
            Self::parse_factor,
        )
    }

    /// Left-associative loop shared by every binary precedence level.
    fn parse_binary_level(
        &mut self,
        operators: &[(TokenKind<'static>, BinaryOperator)],
        operand: fn(&mut Self) -> ParseResult<Expression>,
    ) -> ParseResult<Expression> {
        let mut expr = operand(self)?;
        loop {
            let Some(op) = operators
                .iter()
                .find(|(kind, _)| kind == &self.current().kind)
                .map(|(_, op)| *op)
            else {
                break;
            };
            self.advance();
            let right = operand(self)?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOperator::Neg,
            TokenKind::Plus => UnaryOperator::Pos,
            TokenKind::Tilde => UnaryOperator::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        self.nested(|parser| {
            let operand = parser.parse_factor()?;
            Ok(Expression::UnaryOp {
                op,
                operand: Box::new(operand),
            })
        })
    }

    fn parse_power(&mut self) -> ParseResult<Expression> {
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::DoubleStar) {
            return Ok(base);
        }
        // `-2 ** 2` is `-(2 ** 2)` and `2 ** -1` is allowed, so the exponent is a factor.
        let exponent = self.nested(Self::parse_factor)?;
        Ok(Expression::BinaryOp {
            left: Box::new(base),
            op: BinaryOperator::Pow,
            right: Box::new(exponent),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::LParen => {
                    self.advance();
                    expr = self.parse_call(expr)?;
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_subscript(expr)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    expr = Expression::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.check(&TokenKind::RParen) {
            if let TokenKind::Identifier(name) = self.current().kind
                && self.peek_kind() == &TokenKind::Assign
            {
                self.advance();
                self.advance();
                keywords.push((name.to_string(), self.parse_expression()?));
            } else {
                if !keywords.is_empty() {
                    let span = self.current().span;
                    return Err(ParseError::PositionalAfterKeyword {
                        line: span.line,
                        column: span.column,
                    });
                }
                let arg = self.parse_expression()?;
                if self.check(&TokenKind::For) && args.is_empty() && keywords.is_empty() {
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(Expression::GeneratorExp {
                        element: Box::new(arg),
                        generators,
                    });
                    break;
                }
                args.push(arg);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, ")")?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            args,
            keywords,
        })
    }

    fn parse_subscript(&mut self, object: Expression) -> ParseResult<Expression> {
        let lower = if self.check(&TokenKind::Colon) {
            None
        } else {
            let index = self.parse_expression()?;
            if self.eat(&TokenKind::RBracket) {
                return Ok(Expression::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                });
            }
            Some(Box::new(index))
        };

        self.expect(TokenKind::Colon, ":")?;
        let upper = self.parse_optional_slice_part()?;
        let step = if self.eat(&TokenKind::Colon) {
            self.parse_optional_slice_part()?
        } else {
            None
        };
        self.expect(TokenKind::RBracket, "]")?;
        Ok(Expression::Slice {
            object: Box::new(object),
            lower,
            upper,
            step,
        })
    }

    fn parse_optional_slice_part(&mut self) -> ParseResult<Option<Box<Expression>>> {
        if matches!(
            self.current().kind,
            TokenKind::Colon | TokenKind::RBracket
        ) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.parse_expression()?)))
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let expr = match &self.current().kind {
            TokenKind::Integer(value) => Expression::Integer(*value),
            TokenKind::Float(value) => Expression::Float(*value),
            TokenKind::String(_) => return Ok(self.parse_string_literals()),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::None => Expression::None,
            TokenKind::Identifier(name) => Expression::Identifier(name.to_string()),
            TokenKind::LParen => {
                self.advance();
                return self.parse_parenthesized();
            }
            TokenKind::LBracket => {
                self.advance();
                return self.parse_list_display();
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_brace_display();
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(expr)
    }

    /// Adjacent string literals concatenate into one literal.
    fn parse_string_literals(&mut self) -> Expression {
        let mut text = String::new();
        while let TokenKind::String(part) = &self.current().kind {
            text.push_str(part);
            self.advance();
        }
        Expression::String(text)
    }

    fn parse_parenthesized(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::RParen) {
            return Ok(Expression::Tuple(Vec::new()));
        }
        let first = self.parse_expression()?;
        if self.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(TokenKind::RParen, ")")?;
            return Ok(Expression::GeneratorExp {
                element: Box::new(first),
                generators,
            });
        }
        if self.eat(&TokenKind::RParen) {
            return Ok(first);
        }
        self.expect(TokenKind::Comma, ", or )")?;
        let mut elements = vec![first];
        elements.extend(self.parse_sequence_rest(&TokenKind::RParen)?);
        Ok(Expression::Tuple(elements))
    }

    fn parse_list_display(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expression::List(Vec::new()));
        }
        let first = self.parse_expression()?;
        if self.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(TokenKind::RBracket, "]")?;
            return Ok(Expression::ListComp {
                element: Box::new(first),
                generators,
            });
        }
        let mut elements = vec![first];
        if self.eat(&TokenKind::Comma) {
            elements.extend(self.parse_sequence_rest(&TokenKind::RBracket)?);
        } else {
            self.expect(TokenKind::RBracket, ", or ]")?;
        }
        Ok(Expression::List(elements))
    }

    fn parse_brace_display(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expression::Dict(Vec::new()));
        }
        let first = self.parse_expression()?;

        if self.eat(&TokenKind::Colon) {
            let value = self.parse_expression()?;
            if self.check(&TokenKind::For) {
                let generators = self.parse_comprehension_clauses()?;
                self.expect(TokenKind::RBrace, "}")?;
                return Ok(Expression::DictComp {
                    key: Box::new(first),
                    value: Box::new(value),
                    generators,
                });
            }
            let mut entries = vec![(first, value)];
            while self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                let key = self.parse_expression()?;
                self.expect(TokenKind::Colon, ":")?;
                entries.push((key, self.parse_expression()?));
            }
            self.expect(TokenKind::RBrace, ", or }")?;
            return Ok(Expression::Dict(entries));
        }

        if self.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(TokenKind::RBrace, "}")?;
            return Ok(Expression::SetComp {
                element: Box::new(first),
                generators,
            });
        }
        let mut elements = vec![first];
        if self.eat(&TokenKind::Comma) {
            elements.extend(self.parse_sequence_rest(&TokenKind::RBrace)?);
        } else {
            self.expect(TokenKind::RBrace, ", or }")?;
        }
        Ok(Expression::Set(elements))
    }

    /// Parses the elements after a first element and its comma, up to and
    /// including the closing delimiter. A trailing comma is allowed.
    fn parse_sequence_rest(&mut self, close: &TokenKind<'a>) -> ParseResult<Vec<Expression>> {
        let mut elements = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(elements);
            }
            elements.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(close.clone(), "closing delimiter")?;
                return Ok(elements);
            }
        }
    }

    fn parse_comprehension_clauses(&mut self) -> ParseResult<Vec<Comprehension>> {
        let mut generators = Vec::new();
        while self.eat(&TokenKind::For) {
            let target = self.parse_target()?;
            self.expect(TokenKind::In, "in")?;
            let iterable = self.parse_or()?;
            let mut conditions = Vec::new();
            while self.eat(&TokenKind::If) {
                conditions.push(self.parse_or()?);
            }
            generators.push(Comprehension {
                target,
                iterable,
                conditions,
            });
        }
        Ok(generators)
    }

    fn parse_target(&mut self) -> ParseResult<Target> {
        let parenthesized = self.eat(&TokenKind::LParen);
        let mut names = vec![self.expect_identifier()?];
        let mut is_tuple = parenthesized;
        while self.eat(&TokenKind::Comma) {
            is_tuple = true;
            if matches!(self.current().kind, TokenKind::In | TokenKind::RParen) {
                break;
            }
            names.push(self.expect_identifier()?);
        }
        if parenthesized {
            self.expect(TokenKind::RParen, ")")?;
        }
        if is_tuple {
            Ok(Target::Tuple(names))
        } else {
            Ok(Target::Name(names.remove(0)))
        }
    }

    fn at_expression_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::EOF)
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.nesting > MAX_NESTING {
            return Err(ParseError::TooDeep { limit: MAX_NESTING });
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.current().kind {
            self.advance();
            Ok(name.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>, expected: &str) -> ParseResult<()> {
        if self.current().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn check(&self, kind: &TokenKind<'a>) -> bool {
        &self.current().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind<'a>) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current(&self) -> &Token<'a> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn peek_kind(&self) -> &TokenKind<'a> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.position + 1).min(last)].kind
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: format!("{:?}", token.kind),
            line: token.span.line,
            column: token.span.column,
        }
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Expression> {
    if tokens.len() > MAX_TOKENS {
        return Err(ParseError::TooLong { limit: MAX_TOKENS });
    }
    if !matches!(tokens.last().map(Token::kind), Some(TokenKind::EOF)) {
        return Err(ParseError::UnexpectedToken {
            expected: "end of input".to_string(),
            found: "truncated token stream".to_string(),
            line: 0,
            column: 0,
        });
    }
    Parser::new(tokens).parse_input()
}

pub fn parse(input: &str) -> ParseResult<Expression> {
    parse_tokens(lexer::tokenize(input)?)
}

/// Parses `input`, folding every failure into [`Expression::Invalid`].
pub fn safe_parse(input: &str) -> Expression {
    parse(input).unwrap_or(Expression::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn int(value: i64) -> Expression {
        Expression::Integer(value)
    }

    fn identifier(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        Expression::Call {
            callee: Box::new(identifier(name)),
            args,
            keywords: vec![],
        }
    }

    #[test]
    fn parses_arithmetic_with_precedence() {
        let expr = parse("1 + 2 * 3 - 4").expect("parse failed");
        assert_eq!(
            expr,
            binary(
                binary(int(1), BinaryOperator::Add, binary(int(2), BinaryOperator::Mul, int(3))),
                BinaryOperator::Sub,
                int(4),
            )
        );
    }

    #[test]
    fn power_binds_tighter_than_unary_minus_and_is_right_associative() {
        let expr = parse("-2 ** 3 ** 2").expect("parse failed");
        assert_eq!(
            expr,
            Expression::UnaryOp {
                op: UnaryOperator::Neg,
                operand: Box::new(binary(
                    int(2),
                    BinaryOperator::Pow,
                    binary(int(3), BinaryOperator::Pow, int(2)),
                )),
            }
        );
    }

    #[test]
    fn parses_list_comprehension_with_filters() {
        let expr = parse("[x * 2 for x in range(5) if x > 1 if x < 4]").expect("parse failed");
        assert_eq!(
            expr,
            Expression::ListComp {
                element: Box::new(binary(identifier("x"), BinaryOperator::Mul, int(2))),
                generators: vec![Comprehension {
                    target: Target::Name("x".to_string()),
                    iterable: call("range", vec![int(5)]),
                    conditions: vec![
                        Expression::Compare {
                            left: Box::new(identifier("x")),
                            comparisons: vec![(CompareOperator::Greater, int(1))],
                        },
                        Expression::Compare {
                            left: Box::new(identifier("x")),
                            comparisons: vec![(CompareOperator::Less, int(4))],
                        },
                    ],
                }],
            }
        );
    }

    #[test]
    fn parses_nested_generators_and_tuple_targets() {
        let expr = parse("{k: v for k, v in zip('ab', [1, 2]) for _ in [0]}").expect("parse failed");
        let Expression::DictComp { generators, .. } = expr else {
            panic!("expected dict comprehension");
        };
        assert_eq!(generators.len(), 2);
        assert_eq!(
            generators[0].target,
            Target::Tuple(vec!["k".to_string(), "v".to_string()])
        );
        assert_eq!(generators[1].iterable, Expression::List(vec![int(0)]));
    }

    #[test]
    fn distinguishes_brace_displays() {
        assert_eq!(parse("{}").expect("parse failed"), Expression::Dict(vec![]));
        assert_eq!(
            parse("{1, 2,}").expect("parse failed"),
            Expression::Set(vec![int(1), int(2)])
        );
        assert_eq!(
            parse("{'a': 1}").expect("parse failed"),
            Expression::Dict(vec![(Expression::String("a".to_string()), int(1))])
        );
        assert!(matches!(
            parse("{x for x in 'ab'}").expect("parse failed"),
            Expression::SetComp { .. }
        ));
    }

    #[test]
    fn distinguishes_parenthesized_forms() {
        assert_eq!(parse("(1)").expect("parse failed"), int(1));
        assert_eq!(parse("()").expect("parse failed"), Expression::Tuple(vec![]));
        assert_eq!(
            parse("(1,)").expect("parse failed"),
            Expression::Tuple(vec![int(1)])
        );
        assert_eq!(
            parse("1, 2").expect("parse failed"),
            Expression::Tuple(vec![int(1), int(2)])
        );
    }

    #[test]
    fn parses_calls_with_keywords_and_generator_argument() {
        assert_eq!(
            parse("dict(a=1)").expect("parse failed"),
            Expression::Call {
                callee: Box::new(identifier("dict")),
                args: vec![],
                keywords: vec![("a".to_string(), int(1))],
            }
        );
        let Expression::Call { args, .. } = parse("sum(x for x in range(3))").expect("parse failed")
        else {
            panic!("expected call");
        };
        assert!(matches!(args.as_slice(), [Expression::GeneratorExp { .. }]));
    }

    #[test]
    fn parses_chained_comparison_and_membership() {
        let expr = parse("1 < x <= 3 not in y is not None").expect("parse failed");
        let Expression::Compare { comparisons, .. } = expr else {
            panic!("expected comparison");
        };
        let operators = comparisons.iter().map(|(op, _)| *op).collect::<Vec<_>>();
        assert_eq!(
            operators,
            vec![
                CompareOperator::Less,
                CompareOperator::LessEqual,
                CompareOperator::NotIn,
                CompareOperator::IsNot,
            ]
        );
    }

    #[test]
    fn parses_conditional_and_boolean_operators() {
        let expr = parse("'a' if not x and y or z else 'b'").expect("parse failed");
        let Expression::Conditional { condition, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(
            *condition,
            Expression::BoolOp {
                op: BoolOperator::Or,
                ..
            }
        ));
    }

    #[test]
    fn parses_subscripts_slices_and_methods() {
        let expr = parse("'abc'.upper()[::-1][0]").expect("parse failed");
        let Expression::Index { object, index } = expr else {
            panic!("expected index");
        };
        assert_eq!(*index, int(0));
        assert!(matches!(
            *object,
            Expression::Slice {
                lower: None,
                upper: None,
                step: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn concatenates_adjacent_string_literals() {
        assert_eq!(
            parse("'ab' \"cd\"").expect("parse failed"),
            Expression::String("abcd".to_string())
        );
    }

    #[test]
    fn accepts_multiline_input() {
        let input = indoc! {"
            [x
             for x in range(3)]
        "};
        assert!(matches!(
            parse(input).expect("parse failed"),
            Expression::ListComp { .. }
        ));
    }

    #[test]
    fn reports_unexpected_tokens() {
        let err = parse("[1, 2").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected closing delimiter"));
        let err = parse("f(a=1, 2)").expect_err("expected parse failure");
        assert!(matches!(err, ParseError::PositionalAfterKeyword { .. }));
        assert!(parse("1 2").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn rejects_excessive_nesting_without_overflowing() {
        let deep_parens = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert_eq!(
            parse(&deep_parens),
            Err(ParseError::TooDeep { limit: MAX_NESTING })
        );

        let at_limit = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&at_limit), Ok(int(1)));
        let brackets = format!("{}{}", "[".repeat(MAX_NESTING), "]".repeat(MAX_NESTING));
        assert!(parse(&brackets).is_ok());
        let over_limit = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert_eq!(
            parse(&over_limit),
            Err(ParseError::TooDeep { limit: MAX_NESTING })
        );

        let long_chain = vec!["1"; 1000].join("+");
        assert_eq!(
            parse(&long_chain),
            Err(ParseError::TooDeep { limit: MAX_DEPTH })
        );

        let too_long = vec!["1"; 3000].join("+");
        assert_eq!(
            parse(&too_long),
            Err(ParseError::TooLong { limit: MAX_TOKENS })
        );
    }

    #[test]
    fn safe_parse_returns_sentinel() {
        assert_eq!(safe_parse("[1,2"), Expression::Invalid);
        assert_eq!(safe_parse("@"), Expression::Invalid);
        assert_eq!(safe_parse("[1, 2]"), Expression::List(vec![int(1), int(2)]));
    }
}
