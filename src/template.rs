//! Splits expression templates into literal text and placeholders.
//!
//! A placeholder is `{category}` or `{category:type:name}`; `{{` and `}}`
//! stand for literal braces.

use std::borrow::Cow;
use std::iter::Peekable;
use std::str::CharIndices;

pub mod error;

pub use error::MalformedTemplateError;

/// `{category:type:name}`: the chosen template's own placeholders must all be
/// `kind`, and each is replaced by `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding<'a> {
    pub kind: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub category: &'a str,
    pub binding: Option<Binding<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Unescaped literal text.
    Literal(Cow<'a, str>),
    Placeholder(Placeholder<'a>),
}

/// Lazy segment iterator. Stops after the first error.
pub struct Segments<'a> {
    template: &'a str,
    chars: Peekable<CharIndices<'a>>,
    failed: bool,
}

impl<'a> Segments<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            chars: template.char_indices().peekable(),
            failed: false,
        }
    }

    fn read_literal(&mut self, start: usize) -> Result<Segment<'a>, MalformedTemplateError> {
        let mut owned: Option<String> = None;
        while let Some(&(offset, c)) = self.chars.peek() {
            match c {
                '{' | '}' => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    let doubled = lookahead.peek().is_some_and(|&(_, next)| next == c);
                    if !doubled {
                        if c == '}' {
                            return Err(MalformedTemplateError::UnmatchedClose { offset });
                        }
                        return Ok(self.literal(start, offset, owned));
                    }
                    self.chars.next();
                    self.chars.next();
                    owned
                        .get_or_insert_with(|| self.template[start..offset].to_string())
                        .push(c);
                }
                _ => {
                    self.chars.next();
                    if let Some(text) = owned.as_mut() {
                        text.push(c);
                    }
                }
            }
        }
        Ok(self.literal(start, self.template.len(), owned))
    }

    fn literal(&self, start: usize, end: usize, owned: Option<String>) -> Segment<'a> {
        Segment::Literal(match owned {
            Some(text) => Cow::Owned(text),
            None => Cow::Borrowed(&self.template[start..end]),
        })
    }

    fn read_field(&mut self, open: usize) -> Result<Segment<'a>, MalformedTemplateError> {
        self.chars.next();
        let close = loop {
            match self.chars.next() {
                Some((offset, '{')) => return Err(MalformedTemplateError::NestedBrace { offset }),
                Some((offset, '}')) => break offset,
                Some(_) => {}
                None => return Err(MalformedTemplateError::UnmatchedOpen { offset: open }),
            }
        };
        parse_field(&self.template[open + 1..close], open).map(Segment::Placeholder)
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Result<Segment<'a>, MalformedTemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let &(start, c) = self.chars.peek()?;
        let opens_field = c == '{' && !self.template[start..].starts_with("{{");
        let segment = if opens_field {
            self.read_field(start)
        } else {
            self.read_literal(start)
        };
        self.failed = segment.is_err();
        Some(segment)
    }
}

fn parse_field(field: &str, offset: usize) -> Result<Placeholder<'_>, MalformedTemplateError> {
    let (category, spec) = match field.find([':', '!']) {
        Some(split) if field[split..].starts_with('!') => {
            return Err(MalformedTemplateError::Conversion {
                field: field.to_string(),
                offset,
            });
        }
        Some(split) => (&field[..split], &field[split + 1..]),
        None => (field, ""),
    };
    if category.is_empty() {
        return Err(MalformedTemplateError::EmptyField { offset });
    }
    // An empty spec (`{category:}`) is an ordinary reference.
    if spec.is_empty() {
        return Ok(Placeholder {
            category,
            binding: None,
        });
    }
    let bad_spec = || MalformedTemplateError::BadSpec {
        spec: spec.to_string(),
        offset,
    };
    let (kind, name) = spec.split_once(':').ok_or_else(bad_spec)?;
    if kind.is_empty() || name.is_empty() || name.contains(':') {
        return Err(bad_spec());
    }
    if !is_identifier(name) {
        return Err(MalformedTemplateError::InvalidBindingName {
            name: name.to_string(),
            offset,
        });
    }
    Ok(Placeholder {
        category,
        binding: Some(Binding { kind, name }),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

pub fn segments(template: &str) -> Segments<'_> {
    Segments::new(template)
}

/// True when `template` still references a category.
pub fn has_placeholders(template: &str) -> Result<bool, MalformedTemplateError> {
    for segment in segments(template) {
        if let Segment::Placeholder(_) = segment? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Doubles every brace so `text` reads back as a single literal segment.
pub fn escape(text: &str) -> Cow<'_, str> {
    if text.contains(['{', '}']) {
        Cow::Owned(text.replace('{', "{{").replace('}', "}}"))
    } else {
        Cow::Borrowed(text)
    }
}

pub fn unescape(text: &str) -> Cow<'_, str> {
    if text.contains("{{") || text.contains("}}") {
        Cow::Owned(text.replace("{{", "{").replace("}}", "}"))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(template: &str) -> Result<Vec<Segment<'_>>, MalformedTemplateError> {
        segments(template).collect()
    }

    fn literal(text: &str) -> Segment<'_> {
        Segment::Literal(Cow::Borrowed(text))
    }

    fn reference(category: &str) -> Segment<'_> {
        Segment::Placeholder(Placeholder {
            category,
            binding: None,
        })
    }

    #[test]
    fn splits_literals_and_references() {
        assert_eq!(
            collect("{num_expr}+{num_expr}"),
            Ok(vec![reference("num_expr"), literal("+"), reference("num_expr")])
        );
        assert_eq!(collect(""), Ok(vec![]));
        assert_eq!(collect("1 + 2"), Ok(vec![literal("1 + 2")]));
    }

    #[test]
    fn parses_named_bindings() {
        let segments = collect("[{x} for {x:name:x} in range(3)]").expect("valid template");
        assert_eq!(
            segments[3],
            Segment::Placeholder(Placeholder {
                category: "x",
                binding: Some(Binding {
                    kind: "name",
                    name: "x"
                }),
            })
        );
        assert_eq!(segments[0], literal("["));
        assert_eq!(segments[4], literal(" in range(3)]"));
    }

    #[test]
    fn doubled_braces_are_literal() {
        assert_eq!(
            collect("{{1, {num}}}"),
            Ok(vec![
                literal("{1, "),
                reference("num"),
                literal("}"),
            ])
        );
        assert_eq!(collect("a{{b}}c"), Ok(vec![literal("a{b}c")]));
    }

    #[test]
    fn empty_spec_is_a_plain_reference() {
        assert_eq!(collect("{num:}"), Ok(vec![reference("num")]));
    }

    #[test]
    fn reports_malformed_templates() {
        assert_eq!(
            collect("1 + {num"),
            Err(MalformedTemplateError::UnmatchedOpen { offset: 4 })
        );
        assert_eq!(
            collect("a } b"),
            Err(MalformedTemplateError::UnmatchedClose { offset: 2 })
        );
        assert_eq!(
            collect("{}"),
            Err(MalformedTemplateError::EmptyField { offset: 0 })
        );
        assert!(matches!(
            collect("{num!r}"),
            Err(MalformedTemplateError::Conversion { .. })
        ));
        assert_eq!(
            collect("{a{b}}"),
            Err(MalformedTemplateError::NestedBrace { offset: 2 })
        );
        assert!(matches!(
            collect("{x:name}"),
            Err(MalformedTemplateError::BadSpec { .. })
        ));
        assert!(matches!(
            collect("{x:name:a:b}"),
            Err(MalformedTemplateError::BadSpec { .. })
        ));
        assert!(matches!(
            collect("{x:name:1x}"),
            Err(MalformedTemplateError::InvalidBindingName { .. })
        ));
    }

    #[test]
    fn iteration_stops_after_an_error() {
        let mut segments = segments("} {num}");
        assert!(matches!(segments.next(), Some(Err(_))));
        assert_eq!(segments.next(), None);
    }

    #[test]
    fn escape_and_unescape_are_inverse() {
        assert_eq!(escape("{1: 2}"), "{{1: 2}}");
        assert_eq!(unescape("{{1: 2}}"), "{1: 2}");
        assert!(matches!(escape("plain"), Cow::Borrowed("plain")));
        assert_eq!(has_placeholders("{{x}}"), Ok(false));
        assert_eq!(has_placeholders("{x}"), Ok(true));
    }
}
