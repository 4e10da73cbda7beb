use super::builtins::Arguments;
use super::operators::check_length;
use super::runtime::InterpreterRuntime;
use super::{EvaluationError, Value};

const STRING_METHODS: &[&str] = &[
    "capitalize",
    "count",
    "endswith",
    "find",
    "isalpha",
    "isdigit",
    "join",
    "lower",
    "lstrip",
    "replace",
    "rstrip",
    "split",
    "startswith",
    "strip",
    "title",
    "upper",
];
const SEQUENCE_METHODS: &[&str] = &["count", "index"];
const DICT_METHODS: &[&str] = &["get", "items", "keys", "values"];

pub(super) fn has_method(receiver: &Value, name: &str) -> bool {
    let methods = match receiver {
        Value::String(_) => STRING_METHODS,
        Value::List(_) | Value::Tuple(_) => SEQUENCE_METHODS,
        Value::Dict(_) => DICT_METHODS,
        _ => &[],
    };
    methods.contains(&name)
}

impl InterpreterRuntime {
    pub(super) fn call_method(
        &mut self,
        receiver: &Value,
        method: &str,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, EvaluationError> {
        let args = Arguments::new(method, positional, keywords);
        args.allow_keywords(&[])?;
        match receiver {
            Value::String(text) => self.call_string_method(text, method, args),
            Value::List(items) | Value::Tuple(items) => sequence_method(items, method, &args),
            Value::Dict(entries) => dict_method(entries, method, &args),
            other => Err(unknown(method, other)),
        }
    }

    fn call_string_method(
        &mut self,
        text: &str,
        method: &str,
        args: Arguments,
    ) -> Result<Value, EvaluationError> {
        let string = |value: String| -> Result<Value, EvaluationError> {
            Ok(Value::String(value))
        };
        match method {
            "upper" => {
                args.arity(0, 0)?;
                string(text.to_uppercase())
            }
            "lower" => {
                args.arity(0, 0)?;
                string(text.to_lowercase())
            }
            "strip" | "lstrip" | "rstrip" => {
                args.arity(0, 1)?;
                let stripped = match args.positional(0) {
                    None | Some(Value::None) => match method {
                        "strip" => text.trim(),
                        "lstrip" => text.trim_start(),
                        _ => text.trim_end(),
                    },
                    Some(chars) => {
                        let chars = text_argument(method, chars)?.chars().collect::<Vec<_>>();
                        let in_set = |c: char| chars.contains(&c);
                        match method {
                            "strip" => text.trim_matches(in_set),
                            "lstrip" => text.trim_start_matches(in_set),
                            _ => text.trim_end_matches(in_set),
                        }
                    }
                };
                string(stripped.to_string())
            }
            "split" => {
                args.arity(0, 1)?;
                let parts: Vec<Value> = match args.positional(0) {
                    None | Some(Value::None) => text
                        .split_whitespace()
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                    Some(separator) => {
                        let separator = text_argument("split", separator)?;
                        if separator.is_empty() {
                            return Err(EvaluationError::invalid_value("empty separator"));
                        }
                        text.split(separator.as_str())
                            .map(|part| Value::String(part.to_string()))
                            .collect()
                    }
                };
                Ok(Value::List(parts))
            }
            "join" => {
                args.arity(1, 1)?;
                let mut pieces = Vec::new();
                let source = args.positional(0).unwrap_or(&Value::None);
                for item in self.iterate(source)? {
                    match item {
                        Value::String(piece) => pieces.push(piece),
                        other => {
                            return Err(EvaluationError::invalid_argument(
                                "join",
                                "str",
                                other.type_name(),
                            ));
                        }
                    }
                }
                let joined = pieces.join(text);
                check_length(joined.len(), "characters")?;
                string(joined)
            }
            "replace" => {
                args.arity(2, 2)?;
                let old = text_at(&args, 0, "replace")?;
                let new = text_at(&args, 1, "replace")?;
                let estimate = if old.is_empty() {
                    text.len() + (text.chars().count() + 1) * new.len()
                } else {
                    text.len() + text.matches(old.as_str()).count() * new.len()
                };
                check_length(estimate, "characters")?;
                string(replace_all(text, &old, &new))
            }
            "count" => {
                args.arity(1, 1)?;
                let needle = text_at(&args, 0, "count")?;
                let count = if needle.is_empty() {
                    text.chars().count() + 1
                } else {
                    text.matches(needle.as_str()).count()
                };
                Ok(Value::Integer(count as i64))
            }
            "startswith" | "endswith" => {
                args.arity(1, 1)?;
                let affix = text_at(&args, 0, method)?;
                Ok(Value::Boolean(if method == "startswith" {
                    text.starts_with(affix.as_str())
                } else {
                    text.ends_with(affix.as_str())
                }))
            }
            "find" => {
                args.arity(1, 1)?;
                let needle = text_at(&args, 0, "find")?;
                let index = text
                    .find(needle.as_str())
                    .map_or(-1, |byte| text[..byte].chars().count() as i64);
                Ok(Value::Integer(index))
            }
            "title" => {
                args.arity(0, 0)?;
                string(title_case(text))
            }
            "capitalize" => {
                args.arity(0, 0)?;
                let mut chars = text.chars();
                let capitalized = match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.as_str().to_lowercase().chars())
                        .collect(),
                    None => String::new(),
                };
                string(capitalized)
            }
            "isalpha" => {
                args.arity(0, 0)?;
                Ok(Value::Boolean(
                    !text.is_empty() && text.chars().all(char::is_alphabetic),
                ))
            }
            "isdigit" => {
                args.arity(0, 0)?;
                Ok(Value::Boolean(
                    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()),
                ))
            }
            _ => Err(unknown(method, &Value::String(String::new()))),
        }
    }
}

fn sequence_method(
    items: &[Value],
    method: &str,
    args: &Arguments,
) -> Result<Value, EvaluationError> {
    args.arity(1, 1)?;
    let target = args.positional(0).unwrap_or(&Value::None);
    match method {
        "count" => Ok(Value::Integer(
            items.iter().filter(|&item| item == target).count() as i64,
        )),
        "index" => items
            .iter()
            .position(|item| item == target)
            .map(|position| Value::Integer(position as i64))
            .ok_or_else(|| {
                EvaluationError::invalid_value(format!("{} is not in sequence", target.repr()))
            }),
        _ => Err(unknown(method, &Value::List(Vec::new()))),
    }
}

fn dict_method(
    entries: &[(Value, Value)],
    method: &str,
    args: &Arguments,
) -> Result<Value, EvaluationError> {
    match method {
        "keys" | "values" | "items" => {
            args.arity(0, 0)?;
            let view = entries.iter().map(|(key, value)| match method {
                "keys" => key.clone(),
                "values" => value.clone(),
                _ => Value::Tuple(vec![key.clone(), value.clone()]),
            });
            Ok(Value::List(view.collect()))
        }
        "get" => {
            args.arity(1, 2)?;
            let key = args.positional(0).unwrap_or(&Value::None);
            super::value::ensure_hashable(key)?;
            Ok(Value::dict_lookup(entries, key)
                .or(args.positional(1))
                .cloned()
                .unwrap_or(Value::None))
        }
        _ => Err(unknown(method, &Value::Dict(Vec::new()))),
    }
}

fn text_at(args: &Arguments, index: usize, method: &str) -> Result<String, EvaluationError> {
    text_argument(method, args.positional(index).unwrap_or(&Value::None))
}

fn text_argument(method: &str, value: &Value) -> Result<String, EvaluationError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => Err(EvaluationError::invalid_argument(
            method,
            "str",
            other.type_name(),
        )),
    }
}

/// `str.replace`, including the empty pattern that inserts between characters.
fn replace_all(text: &str, old: &str, new: &str) -> String {
    if !old.is_empty() {
        return text.replace(old, new);
    }
    let mut replaced = String::from(new);
    for c in text.chars() {
        replaced.push(c);
        replaced.push_str(new);
    }
    replaced
}

fn title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut previous_cased = false;
    for c in text.chars() {
        if previous_cased {
            titled.extend(c.to_lowercase());
        } else {
            titled.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
    }
    titled
}

fn unknown(method: &str, receiver: &Value) -> EvaluationError {
    EvaluationError::UnknownAttribute {
        attribute: method.to_string(),
        type_name: receiver.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Value {
        Value::String(value.to_string())
    }

    fn call(receiver: &Value, method: &str, args: Vec<Value>) -> Result<Value, EvaluationError> {
        InterpreterRuntime::new().call_method(receiver, method, args, Vec::new())
    }

    #[test]
    fn string_methods_follow_python() {
        let repr = |result: Result<Value, EvaluationError>| result.map(|value| value.repr());
        assert_eq!(
            repr(call(&text("a,b,,c"), "split", vec![text(",")])),
            Ok("['a', 'b', '', 'c']".to_string())
        );
        assert_eq!(
            repr(call(&text("  a  b "), "split", vec![])),
            Ok("['a', 'b']".to_string())
        );
        assert_eq!(call(&text("hello world"), "title", vec![]), Ok(text("Hello World")));
        assert_eq!(call(&text("hELLO"), "capitalize", vec![]), Ok(text("Hello")));
        assert_eq!(call(&text("ab"), "replace", vec![text(""), text("-")]), Ok(text("-a-b-")));
        assert_eq!(call(&text("héllo"), "find", vec![text("l")]), Ok(Value::Integer(2)));
        assert_eq!(call(&text("xxhixx"), "strip", vec![text("x")]), Ok(text("hi")));
    }

    #[test]
    fn split_rejects_empty_separator() {
        assert!(matches!(
            call(&text("abc"), "split", vec![text("")]),
            Err(EvaluationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn dict_get_falls_back_to_default() {
        let dict = Value::Dict(vec![(text("a"), Value::Integer(1))]);
        assert_eq!(call(&dict, "get", vec![text("a")]), Ok(Value::Integer(1)));
        assert_eq!(call(&dict, "get", vec![text("b")]), Ok(Value::None));
        assert_eq!(
            call(&dict, "get", vec![text("b"), Value::Integer(0)]),
            Ok(Value::Integer(0))
        );
    }

    #[test]
    fn dict_views_are_plain_lists() {
        let dict = Value::Dict(vec![(text("a"), Value::Integer(1)), (text("b"), Value::Integer(2))]);
        assert_eq!(
            call(&dict, "keys", vec![]),
            Ok(Value::List(vec![text("a"), text("b")]))
        );
        assert_eq!(
            call(&dict, "items", vec![]).map(|value| value.repr()),
            Ok("[('a', 1), ('b', 2)]".to_string())
        );
        assert!(call(&dict, "values", vec![Value::Integer(0)]).is_err());
    }

    #[test]
    fn unknown_methods_are_attribute_errors() {
        assert!(!has_method(&Value::Integer(1), "upper"));
        assert!(has_method(&Value::Tuple(vec![]), "index"));
        assert!(!has_method(&Value::List(vec![]), "append"));
    }
}
