use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind};

pub mod error;

pub use error::{LexError, LexResult};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    eof_reached: bool,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            eof_reached: false,
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_whitespace();

        let Some(&(start_idx, ch)) = self.chars.peek() else {
            self.eof_reached = true;
            let index = self.input.len();
            return Ok(Token::new(
                TokenKind::EOF,
                Span {
                    start: index,
                    end: index,
                    line: self.line,
                    column: self.column,
                },
            ));
        };

        let start_line = self.line;
        let start_column = self.column;
        let kind = match ch {
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '%' => self.single(TokenKind::Percent),
            '~' => self.single(TokenKind::Tilde),
            '&' => self.single(TokenKind::Amp),
            '|' => self.single(TokenKind::Pipe),
            '^' => self.single(TokenKind::Caret),
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '*' => self.one_or_two('*', TokenKind::Star, TokenKind::DoubleStar),
            '/' => self.one_or_two('/', TokenKind::Slash, TokenKind::DoubleSlash),
            '=' => self.one_or_two('=', TokenKind::Assign, TokenKind::EqualEqual),
            '<' => {
                self.advance_char();
                match self.peek_char() {
                    Some('=') => self.single(TokenKind::LessEqual),
                    Some('<') => self.single(TokenKind::ShiftLeft),
                    _ => TokenKind::Less,
                }
            }
            '>' => {
                self.advance_char();
                match self.peek_char() {
                    Some('=') => self.single(TokenKind::GreaterEqual),
                    Some('>') => self.single(TokenKind::ShiftRight),
                    _ => TokenKind::Greater,
                }
            }
            '!' => {
                self.advance_char();
                if self.peek_char() != Some('=') {
                    return Err(LexError::UnexpectedCharacter {
                        character: '!',
                        line: start_line,
                        column: start_column,
                    });
                }
                self.single(TokenKind::NotEqual)
            }
            '.' => {
                if self.next_is_digit_after(start_idx) {
                    return self.read_number(start_idx, start_line, start_column);
                }
                self.single(TokenKind::Dot)
            }
            '"' | '\'' => {
                self.advance_char();
                return self.read_string(ch, false, start_idx, start_line, start_column);
            }
            c if c.is_alphabetic() || c == '_' => {
                return self.read_identifier(start_idx, start_line, start_column);
            }
            c if c.is_ascii_digit() => {
                return self.read_number(start_idx, start_line, start_column);
            }
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    character: ch,
                    line: start_line,
                    column: start_column,
                });
            }
        };

        Ok(Token::new(
            kind,
            Span {
                start: start_idx,
                end: self.current_index(),
                line: start_line,
                column: start_column,
            },
        ))
    }

    fn single(&mut self, kind: TokenKind<'a>) -> TokenKind<'a> {
        self.advance_char();
        kind
    }

    fn one_or_two(
        &mut self,
        second: char,
        one: TokenKind<'a>,
        two: TokenKind<'a>,
    ) -> TokenKind<'a> {
        self.advance_char();
        if self.peek_char() == Some(second) {
            self.advance_char();
            two
        } else {
            one
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' || c == '\t' || c == '\n' || c == '\r' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = self.current_index();
        let ident = &self.input[start..end_idx];
        if let Some(quote @ ('\'' | '"')) = self.peek_char() {
            match ident.to_ascii_lowercase().as_str() {
                "r" | "u" => {
                    self.advance_char();
                    let raw = ident.eq_ignore_ascii_case("r");
                    return self.read_string(quote, raw, start, line, column);
                }
                "b" | "br" | "rb" | "f" | "fr" | "rf" => {
                    return Err(LexError::UnsupportedStringPrefix {
                        prefix: ident.to_string(),
                        line,
                        column,
                    });
                }
                _ => {}
            }
        }
        let kind = match ident {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "not" => TokenKind::Not,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "is" => TokenKind::Is,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            _ => TokenKind::Identifier(ident),
        };
        Ok(Token::new(
            kind,
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        ))
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        let mut is_float = false;
        self.consume_digits();

        if self.peek_char() == Some('.') {
            // `1.` is a float, but `1.real`-style attribute access is not supported.
            self.advance_char();
            is_float = true;
            self.consume_digits();
        }

        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some((_, '+' | '-'))) {
                lookahead.next();
            }
            if matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit()) {
                is_float = true;
                self.advance_char();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance_char();
                }
                self.consume_digits();
            }
        }

        let end_idx = self.current_index();
        let literal = &self.input[start..end_idx];
        let invalid = || LexError::InvalidNumericLiteral {
            literal: literal.to_string(),
            line,
            column,
        };
        let kind = if is_float {
            TokenKind::Float(literal.parse::<f64>().map_err(|_| invalid())?)
        } else {
            TokenKind::Integer(literal.parse::<i64>().map_err(|_| invalid())?)
        };
        Ok(Token::new(
            kind,
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        ))
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    /// Reads the rest of a string literal whose opening quote (and prefix)
    /// has been consumed.
    fn read_string(
        &mut self,
        quote: char,
        raw: bool,
        start: usize,
        line: usize,
        column: usize,
    ) -> LexResult<Token<'a>> {
        let mut content = String::new();
        while let Some((idx, c)) = self.advance_char() {
            if c == quote {
                return Ok(Token::new(
                    TokenKind::String(content),
                    Span {
                        start,
                        end: idx + c.len_utf8(),
                        line,
                        column,
                    },
                ));
            }
            match c {
                '\n' => break,
                '\\' => {
                    let Some((_, escaped)) = self.advance_char() else {
                        break;
                    };
                    if raw {
                        content.push('\\');
                        content.push(escaped);
                    } else {
                        self.read_escape(escaped, &mut content, line, column)?;
                    }
                }
                other => content.push(other),
            }
        }
        Err(LexError::UnterminatedString { line, column })
    }
}

impl Lexer<'_> {
    fn read_escape(
        &mut self,
        escaped: char,
        content: &mut String,
        line: usize,
        column: usize,
    ) -> LexResult<()> {
        let invalid = |escape: String| LexError::InvalidEscape {
            escape,
            line,
            column,
        };
        match escaped {
            '\n' => {}
            'n' => content.push('\n'),
            't' => content.push('\t'),
            'r' => content.push('\r'),
            'a' => content.push('\u{7}'),
            'b' => content.push('\u{8}'),
            'f' => content.push('\u{c}'),
            'v' => content.push('\u{b}'),
            '\\' | '\'' | '"' => content.push(escaped),
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek_char().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            self.advance_char();
                            code = code * 8 + digit;
                        }
                        None => break,
                    }
                }
                let c = char::from_u32(code).ok_or_else(|| invalid(format!("\\{code:o}")))?;
                content.push(c);
            }
            'x' | 'u' | 'U' => {
                let width = match escaped {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut digits = String::new();
                while digits.len() < width {
                    match self.peek_char() {
                        Some(c) if c.is_ascii_hexdigit() => {
                            self.advance_char();
                            digits.push(c);
                        }
                        _ => break,
                    }
                }
                let c = u32::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == width)
                    .and_then(char::from_u32)
                    .ok_or_else(|| invalid(format!("\\{escaped}{digits}")))?;
                content.push(c);
            }
            'N' => return Err(invalid("\\N".to_string())),
            // Unknown escapes keep their backslash.
            other => {
                content.push('\\');
                content.push(other);
            }
        }
        Ok(())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_reached {
            return None;
        }
        Some(self.next_token())
    }
}

impl<'a> Lexer<'a> {
    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn next_is_digit_after(&self, index: usize) -> bool {
        self.input[index + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

pub fn tokenize<'a>(input: &'a str) -> LexResult<Vec<Token<'a>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
