use std::cmp::Ordering;

use crate::ast::BinaryOperator;

use super::operators::binary_op;
use super::runtime::InterpreterRuntime;
use super::value::order;
use super::{EvaluationError, MAX_SEQUENCE_LEN, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltinFunction {
    Abs,
    All,
    Any,
    Bool,
    Dict,
    Enumerate,
    Float,
    Int,
    Len,
    List,
    Max,
    Min,
    Range,
    Reversed,
    Round,
    Set,
    Sorted,
    Str,
    Sum,
    Tuple,
    Zip,
}

impl BuiltinFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Self::Abs),
            "all" => Some(Self::All),
            "any" => Some(Self::Any),
            "bool" => Some(Self::Bool),
            "dict" => Some(Self::Dict),
            "enumerate" => Some(Self::Enumerate),
            "float" => Some(Self::Float),
            "int" => Some(Self::Int),
            "len" => Some(Self::Len),
            "list" => Some(Self::List),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            "range" => Some(Self::Range),
            "reversed" => Some(Self::Reversed),
            "round" => Some(Self::Round),
            "set" => Some(Self::Set),
            "sorted" => Some(Self::Sorted),
            "str" => Some(Self::Str),
            "sum" => Some(Self::Sum),
            "tuple" => Some(Self::Tuple),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::All => "all",
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Dict => "dict",
            Self::Enumerate => "enumerate",
            Self::Float => "float",
            Self::Int => "int",
            Self::Len => "len",
            Self::List => "list",
            Self::Max => "max",
            Self::Min => "min",
            Self::Range => "range",
            Self::Reversed => "reversed",
            Self::Round => "round",
            Self::Set => "set",
            Self::Sorted => "sorted",
            Self::Str => "str",
            Self::Sum => "sum",
            Self::Tuple => "tuple",
            Self::Zip => "zip",
        }
    }

    /// Keyword arguments accepted on top of the positional ones.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Enumerate => &["start"],
            Self::Sorted => &["reverse"],
            Self::Sum => &["start"],
            _ => &[],
        }
    }
}

/// Positional arguments plus the accepted keyword arguments of one call.
pub(super) struct Arguments {
    name: String,
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl Arguments {
    pub(super) fn new(
        name: impl Into<String>,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Self {
        Self {
            name: name.into(),
            positional,
            keywords,
        }
    }

    pub(super) fn allow_keywords(&self, allowed: &[&str]) -> Result<(), EvaluationError> {
        match self
            .keywords
            .iter()
            .find(|(keyword, _)| !allowed.contains(&keyword.as_str()))
        {
            Some((keyword, _)) => Err(EvaluationError::UnexpectedKeyword {
                name: self.name.clone(),
                keyword: keyword.clone(),
            }),
            None => Ok(()),
        }
    }

    pub(super) fn arity(&self, min: usize, max: usize) -> Result<(), EvaluationError> {
        let found = self.positional.len();
        if (min..=max).contains(&found) {
            return Ok(());
        }
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {min}")
        } else {
            format!("{min} to {max}")
        };
        Err(EvaluationError::ArityMismatch {
            name: self.name.clone(),
            expected,
            found,
        })
    }

    pub(super) fn positional(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Positional argument at `index`, or the keyword of the same role.
    pub(super) fn take(&mut self, index: usize, keyword: &str) -> Option<Value> {
        if index < self.positional.len() {
            return Some(self.positional[index].clone());
        }
        let position = self.keywords.iter().position(|(name, _)| name == keyword)?;
        Some(self.keywords.remove(position).1)
    }

    pub(super) fn into_positional(self) -> Vec<Value> {
        self.positional
    }
}

impl InterpreterRuntime {
    pub(super) fn call_builtin(
        &mut self,
        function: BuiltinFunction,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, EvaluationError> {
        let mut args = Arguments::new(function.name(), positional, keywords);
        if function != BuiltinFunction::Dict {
            args.allow_keywords(function.keywords())?;
        }
        match function {
            BuiltinFunction::Abs => {
                args.arity(1, 1)?;
                absolute(&args.positional[0])
            }
            BuiltinFunction::All | BuiltinFunction::Any => {
                args.arity(1, 1)?;
                let items = self.iterate(&args.positional[0])?;
                Ok(Value::Boolean(if function == BuiltinFunction::All {
                    items.iter().all(Value::is_truthy)
                } else {
                    items.iter().any(Value::is_truthy)
                }))
            }
            BuiltinFunction::Bool => {
                args.arity(0, 1)?;
                Ok(Value::Boolean(args.positional(0).is_some_and(Value::is_truthy)))
            }
            BuiltinFunction::Dict => self.construct_dict(args),
            BuiltinFunction::Enumerate => {
                args.arity(1, 2)?;
                let start = match args.take(1, "start") {
                    Some(start) => start.as_int().ok_or_else(|| {
                        EvaluationError::invalid_argument("enumerate", "int", start.type_name())
                    })?,
                    None => 0,
                };
                let items = self.iterate(&args.positional[0])?;
                let mut pairs = Vec::with_capacity(items.len());
                for (offset, item) in (0i64..).zip(items) {
                    let index = start.checked_add(offset).ok_or(EvaluationError::Overflow {
                        operation: "enumerate".to_string(),
                    })?;
                    pairs.push(Value::Tuple(vec![Value::Integer(index), item]));
                }
                Ok(Value::Iterator(pairs))
            }
            BuiltinFunction::Float => {
                args.arity(0, 1)?;
                args.positional(0).map_or(Ok(Value::Float(0.0)), to_float)
            }
            BuiltinFunction::Int => {
                args.arity(0, 1)?;
                args.positional(0).map_or(Ok(Value::Integer(0)), to_int)
            }
            BuiltinFunction::Len => {
                args.arity(1, 1)?;
                length(&args.positional[0])
            }
            BuiltinFunction::List | BuiltinFunction::Tuple | BuiltinFunction::Set => {
                args.arity(0, 1)?;
                let items = match args.positional(0) {
                    Some(source) => self.iterate(source)?,
                    None => Vec::new(),
                };
                match function {
                    BuiltinFunction::List => Ok(Value::List(items)),
                    BuiltinFunction::Tuple => Ok(Value::Tuple(items)),
                    _ => Value::set_from(items),
                }
            }
            BuiltinFunction::Max | BuiltinFunction::Min => {
                args.arity(1, usize::MAX)?;
                let name = function.name();
                let mut items = args.into_positional();
                if items.len() == 1 {
                    items = self.iterate(&items[0])?;
                }
                let wanted = if function == BuiltinFunction::Max {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
                let mut items = items.into_iter();
                let Some(mut best) = items.next() else {
                    return Err(EvaluationError::invalid_value(format!(
                        "{name}() arg is an empty sequence"
                    )));
                };
                for item in items {
                    if order(&item, &best)? == wanted {
                        best = item;
                    }
                }
                Ok(best)
            }
            BuiltinFunction::Range => {
                args.arity(1, 3)?;
                let mut bounds = Vec::with_capacity(3);
                for bound in &args.positional {
                    bounds.push(bound.as_int().ok_or_else(|| {
                        EvaluationError::invalid_argument("range", "int", bound.type_name())
                    })?);
                }
                let (start, stop, step) = match bounds.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => (0, 0, 1),
                };
                if step == 0 {
                    return Err(EvaluationError::invalid_value(
                        "range() arg 3 must not be zero",
                    ));
                }
                Ok(Value::Range { start, stop, step })
            }
            BuiltinFunction::Reversed => {
                args.arity(1, 1)?;
                let source = &args.positional[0];
                if matches!(source, Value::Set(_) | Value::Iterator(_)) {
                    return Err(EvaluationError::NotIterable {
                        type_name: format!("{} (not reversible)", source.type_name()),
                    });
                }
                let mut items = self.iterate(source)?;
                items.reverse();
                Ok(Value::Iterator(items))
            }
            BuiltinFunction::Round => {
                args.arity(1, 2)?;
                round(&args.positional[0], args.positional(1))
            }
            BuiltinFunction::Sorted => {
                args.arity(1, 1)?;
                let reverse = args.take(1, "reverse").is_some_and(|value| value.is_truthy());
                let mut items = self.iterate(&args.positional[0])?;
                sort_values(&mut items)?;
                if reverse {
                    items.reverse();
                }
                Ok(Value::List(items))
            }
            BuiltinFunction::Str => {
                args.arity(0, 1)?;
                Ok(Value::String(
                    args.positional(0).map(Value::to_output).unwrap_or_default(),
                ))
            }
            BuiltinFunction::Sum => {
                args.arity(1, 2)?;
                let mut total = args.take(1, "start").unwrap_or(Value::Integer(0));
                if matches!(total, Value::String(_)) {
                    return Err(EvaluationError::invalid_argument(
                        "sum",
                        "a non-string start",
                        "str",
                    ));
                }
                for item in self.iterate(&args.positional[0])? {
                    total = binary_op(BinaryOperator::Add, &total, &item)?;
                    self.charge(total.weight())?;
                }
                Ok(total)
            }
            BuiltinFunction::Zip => {
                let mut columns = Vec::with_capacity(args.positional.len());
                for source in &args.positional {
                    columns.push(self.iterate(source)?.into_iter());
                }
                let shortest = columns.iter().map(ExactSizeIterator::len).min().unwrap_or(0);
                let rows = (0..shortest)
                    .map(|_| Value::Tuple(columns.iter_mut().filter_map(Iterator::next).collect()))
                    .collect();
                Ok(Value::Iterator(rows))
            }
        }
    }

    fn construct_dict(&mut self, args: Arguments) -> Result<Value, EvaluationError> {
        args.arity(0, 1)?;
        let mut entries = Vec::new();
        match args.positional(0) {
            Some(Value::Dict(source)) => entries.extend(source.iter().cloned()),
            Some(source) => {
                for item in self.iterate(source)? {
                    let pair = self.iterate(&item)?;
                    let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
                        EvaluationError::invalid_value(format!(
                            "dictionary update sequence element has length {}; 2 is required",
                            pair.len()
                        ))
                    })?;
                    entries.push((key, value));
                }
            }
            None => {}
        }
        entries.extend(
            args.keywords
                .into_iter()
                .map(|(name, value)| (Value::String(name), value)),
        );
        Value::dict_from(entries)
    }
}

fn absolute(value: &Value) -> Result<Value, EvaluationError> {
    match value {
        Value::Float(value) => Ok(Value::Float(value.abs())),
        other => match other.as_int() {
            Some(value) => value
                .checked_abs()
                .map(Value::Integer)
                .ok_or(EvaluationError::Overflow {
                    operation: "abs".to_string(),
                }),
            None => Err(EvaluationError::UnsupportedOperation {
                operation: "abs".to_string(),
                type_name: other.type_name().to_string(),
            }),
        },
    }
}

fn to_float(value: &Value) -> Result<Value, EvaluationError> {
    if let Some(number) = value.as_float() {
        return Ok(Value::Float(number));
    }
    let Value::String(text) = value else {
        return Err(EvaluationError::invalid_argument(
            "float",
            "a string or a number",
            value.type_name(),
        ));
    };
    text.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| {
            EvaluationError::invalid_value(format!(
                "could not convert string to float: {}",
                value.repr()
            ))
        })
}

fn to_int(value: &Value) -> Result<Value, EvaluationError> {
    match value {
        Value::Float(number) => {
            if number.is_nan() {
                return Err(EvaluationError::invalid_value(
                    "cannot convert float NaN to integer",
                ));
            }
            let truncated = number.trunc();
            if truncated.abs() >= 9.223_372_036_854_775_807e18 {
                return Err(EvaluationError::Overflow {
                    operation: "int".to_string(),
                });
            }
            Ok(Value::Integer(truncated as i64))
        }
        Value::String(text) => text
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| {
                EvaluationError::invalid_value(format!(
                    "invalid literal for int() with base 10: {}",
                    value.repr()
                ))
            }),
        other => other.as_int().map(Value::Integer).ok_or_else(|| {
            EvaluationError::invalid_argument("int", "a string or a number", other.type_name())
        }),
    }
}

fn length(value: &Value) -> Result<Value, EvaluationError> {
    let len = match value {
        Value::String(text) => text.chars().count() as i64,
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => items.len() as i64,
        Value::Dict(entries) => entries.len() as i64,
        Value::Range { .. } => {
            i64::try_from(value.range_len()).map_err(|_| EvaluationError::Overflow {
                operation: "len".to_string(),
            })?
        }
        other => {
            return Err(EvaluationError::UnsupportedOperation {
                operation: "len".to_string(),
                type_name: other.type_name().to_string(),
            });
        }
    };
    Ok(Value::Integer(len))
}

/// `round` with ties going to the even neighbour.
fn round(value: &Value, digits: Option<&Value>) -> Result<Value, EvaluationError> {
    let digits = match digits {
        None | Some(Value::None) => None,
        Some(digits) => Some(digits.as_int().ok_or_else(|| {
            EvaluationError::invalid_argument("round", "int", digits.type_name())
        })?),
    };
    match (value, digits) {
        (Value::Float(number), None) => {
            if !number.is_finite() {
                return Err(EvaluationError::invalid_value(format!(
                    "cannot round {}",
                    value.repr()
                )));
            }
            to_int(&Value::Float(number.round_ties_even()))
        }
        (Value::Float(number), Some(digits)) => {
            let digits = digits.clamp(-308, 308) as i32;
            let factor = 10f64.powi(digits);
            let scaled = number * factor;
            if !scaled.is_finite() {
                return Ok(Value::Float(*number));
            }
            Ok(Value::Float(scaled.round_ties_even() / factor))
        }
        (other, digits) => {
            let Some(number) = other.as_int() else {
                return Err(EvaluationError::UnsupportedOperation {
                    operation: "round".to_string(),
                    type_name: other.type_name().to_string(),
                });
            };
            match digits {
                Some(digits) if digits < 0 => {
                    let Some(factor) = u32::try_from(-digits)
                        .ok()
                        .and_then(|exponent| 10i64.checked_pow(exponent))
                    else {
                        return Ok(Value::Integer(0));
                    };
                    let quotient = number.div_euclid(factor);
                    let remainder = number.rem_euclid(factor);
                    let rounded = match (remainder * 2).cmp(&factor) {
                        Ordering::Less => quotient,
                        Ordering::Greater => quotient + 1,
                        Ordering::Equal => quotient + quotient.rem_euclid(2),
                    };
                    rounded
                        .checked_mul(factor)
                        .map(Value::Integer)
                        .ok_or(EvaluationError::Overflow {
                            operation: "round".to_string(),
                        })
                }
                _ => Ok(Value::Integer(number)),
            }
        }
    }
}

/// Stable sort that surfaces the first failing comparison.
pub(super) fn sort_values(items: &mut [Value]) -> Result<(), EvaluationError> {
    if items.len() > MAX_SEQUENCE_LEN {
        return Err(EvaluationError::TooLarge {
            limit: MAX_SEQUENCE_LEN,
            unit: "elements",
        });
    }
    let mut failure = None;
    items.sort_by(|left, right| {
        order(left, right).unwrap_or_else(|error| {
            failure.get_or_insert(error);
            Ordering::Equal
        })
    });
    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
