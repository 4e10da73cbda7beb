use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::EvaluationError;
use super::builtins::BuiltinFunction;

/// Result of evaluating an expression.
///
/// Equality is value equality in the Python sense: numbers compare across
/// `bool`/`int`/`float`, sets and dicts ignore order, lists and tuples do not.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    None,
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion ordered, elements unique under `==`.
    Set(Vec<Value>),
    /// Insertion ordered, keys unique under `==`.
    Dict(Vec<(Value, Value)>),
    Range {
        start: i64,
        stop: i64,
        step: i64,
    },
    /// Result of a generator expression, `zip`, `enumerate` or `reversed`.
    Iterator(Vec<Value>),
    BuiltinFunction(BuiltinFunction),
    BoundMethod {
        receiver: Box<Value>,
        method: String,
    },
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Boolean(_) => "bool",
            Value::String(_) => "str",
            Value::None => "NoneType",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Range { .. } => "range",
            Value::Iterator(_) => "iterator",
            Value::BuiltinFunction(_) => "builtin_function_or_method",
            Value::BoundMethod { .. } => "method",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Boolean(value) => *value,
            Value::String(value) => !value.is_empty(),
            Value::None => false,
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Range { .. } => self.range_len() > 0,
            Value::Iterator(_) | Value::BuiltinFunction(_) | Value::BoundMethod { .. } => true,
        }
    }

    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Set(_) | Value::Dict(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Python `repr()`.
    pub fn repr(&self) -> String {
        match self {
            Value::Integer(value) => value.to_string(),
            Value::Float(value) => format_float(*value),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::String(value) => quote_string(value),
            Value::None => "None".to_string(),
            Value::List(items) => format!("[{}]", join_reprs(items)),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_reprs(items)),
            Value::Set(items) if items.is_empty() => "set()".to_string(),
            Value::Set(items) => format!("{{{}}}", join_reprs(items)),
            Value::Dict(entries) => {
                let rendered = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr(), value.repr()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{rendered}}}")
            }
            Value::Range { start, stop, step } if *step == 1 => format!("range({start}, {stop})"),
            Value::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
            Value::Iterator(_) => "<iterator object>".to_string(),
            Value::BuiltinFunction(function) => format!("<built-in function {}>", function.name()),
            Value::BoundMethod { receiver, method } => {
                format!(
                    "<built-in method {method} of {} object>",
                    receiver.type_name()
                )
            }
        }
    }

    /// Python `str()`: like `repr` except strings are not quoted.
    pub fn to_output(&self) -> String {
        match self {
            Value::String(value) => value.clone(),
            other => other.repr(),
        }
    }

    pub(super) fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            Value::Boolean(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub(super) fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Boolean(value) => Some(f64::from(u8::from(*value))),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub(super) fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_) | Value::Boolean(_))
    }

    pub(super) fn range_len(&self) -> i128 {
        match self {
            Value::Range { start, stop, step } => range_len(*start, *stop, *step),
            _ => 0,
        }
    }

    /// Number of values a deep copy of this one allocates, counting string
    /// bytes. Evaluation charges its step budget by weight.
    pub(super) fn weight(&self) -> usize {
        match self {
            Value::String(text) => text.len().saturating_add(1),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) | Value::Iterator(items) => {
                items
                    .iter()
                    .fold(1usize, |total, item| total.saturating_add(item.weight()))
            }
            Value::Dict(entries) => entries.iter().fold(1usize, |total, (key, value)| {
                total.saturating_add(key.weight()).saturating_add(value.weight())
            }),
            Value::BoundMethod { receiver, .. } => receiver.weight().saturating_add(1),
            _ => 1,
        }
    }

    /// Builds a set, dropping later duplicates the way `{1, 1.0}` keeps `1`.
    pub(super) fn set_from(items: Vec<Value>) -> Result<Value, EvaluationError> {
        let mut seen = HashSet::new();
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            ensure_hashable(&item)?;
            // Only iterators lack a key, and an iterator equals nothing.
            let fresh = match item.hash_key() {
                Some(key) => seen.insert(key),
                None => true,
            };
            if fresh {
                unique.push(item);
            }
        }
        Ok(Value::Set(unique))
    }

    /// Builds a dict; a repeated key keeps its first spelling and its last value.
    pub(super) fn dict_from(entries: Vec<(Value, Value)>) -> Result<Value, EvaluationError> {
        let mut positions = HashMap::new();
        let mut unique: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            ensure_hashable(&key)?;
            let existing = match key.hash_key() {
                Some(hash_key) => positions.get(&hash_key).copied().or_else(|| {
                    positions.insert(hash_key, unique.len());
                    None
                }),
                None => None,
            };
            match existing {
                Some(position) => unique[position].1 = value,
                None => unique.push((key, value)),
            }
        }
        Ok(Value::Dict(unique))
    }

    /// Canonical form shared by every value equal to this one. Iterators
    /// have none.
    fn hash_key(&self) -> Option<HashKey> {
        Some(match self {
            Value::Integer(value) => HashKey::Integer(*value),
            Value::Boolean(value) => HashKey::Integer(i64::from(*value)),
            Value::Float(value) => {
                if value.fract() == 0.0 && value.abs() < 9.2e18 {
                    HashKey::Integer(*value as i64)
                } else {
                    HashKey::Float(value.to_bits())
                }
            }
            Value::String(value) => HashKey::String(value.clone()),
            Value::None => HashKey::None,
            Value::Tuple(items) => {
                HashKey::Tuple(items.iter().map(Value::hash_key).collect::<Option<_>>()?)
            }
            Value::List(items) => {
                HashKey::List(items.iter().map(Value::hash_key).collect::<Option<_>>()?)
            }
            Value::Set(items) => {
                let mut keys = items
                    .iter()
                    .map(Value::hash_key)
                    .collect::<Option<Vec<_>>>()?;
                keys.sort();
                HashKey::Set(keys)
            }
            Value::Dict(entries) => {
                let mut keys = entries
                    .iter()
                    .map(|(key, value)| Some((key.hash_key()?, value.hash_key()?)))
                    .collect::<Option<Vec<_>>>()?;
                keys.sort();
                HashKey::Dict(keys)
            }
            Value::Range { start, step, .. } => match self.range_len() {
                0 => HashKey::Range(0, 0, 0),
                1 => HashKey::Range(1, *start, 0),
                len => HashKey::Range(len, *start, *step),
            },
            Value::BuiltinFunction(function) => HashKey::Builtin(*function),
            Value::BoundMethod { receiver, method } => {
                HashKey::Method(method.clone(), Box::new(receiver.hash_key()?))
            }
            Value::Iterator(_) => return None,
        })
    }

    pub(super) fn dict_lookup<'v>(entries: &'v [(Value, Value)], key: &Value) -> Option<&'v Value> {
        entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (left, right) if left.is_number() && right.is_number() => {
                match (left.as_int(), right.as_int()) {
                    (Some(left), Some(right)) => left == right,
                    _ => left.as_float() == right.as_float(),
                }
            }
            (Value::String(left), Value::String(right)) => left == right,
            (Value::None, Value::None) => true,
            (Value::List(left), Value::List(right)) | (Value::Tuple(left), Value::Tuple(right)) => {
                left == right
            }
            (Value::Set(left), Value::Set(right)) => {
                if left.len() != right.len() {
                    return false;
                }
                let right = Membership::new(right);
                left.iter().all(|item| right.contains(item))
            }
            (Value::Dict(left), Value::Dict(right)) => {
                if left.len() != right.len() {
                    return false;
                }
                let index = right
                    .iter()
                    .filter_map(|(key, value)| Some((key.hash_key()?, value)))
                    .collect::<HashMap<_, _>>();
                left.iter().all(|(key, value)| {
                    let other = key
                        .hash_key()
                        .and_then(|hash_key| index.get(&hash_key).copied());
                    other.is_some_and(|other| other == value)
                })
            }
            (
                Value::Range {
                    start: left_start,
                    step: left_step,
                    ..
                },
                Value::Range {
                    start: right_start,
                    step: right_step,
                    ..
                },
            ) => {
                let len = self.range_len();
                len == other.range_len()
                    && (len == 0
                        || (left_start == right_start && (len == 1 || left_step == right_step)))
            }
            (Value::BuiltinFunction(left), Value::BuiltinFunction(right)) => left == right,
            (
                Value::BoundMethod {
                    receiver: left_receiver,
                    method: left_method,
                },
                Value::BoundMethod {
                    receiver: right_receiver,
                    method: right_method,
                },
            ) => left_method == right_method && left_receiver == right_receiver,
            // Iterators only equal themselves, and there is no identity here.
            _ => false,
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum HashKey {
    Integer(i64),
    Float(u64),
    String(String),
    None,
    Tuple(Vec<HashKey>),
    List(Vec<HashKey>),
    Set(Vec<HashKey>),
    Dict(Vec<(HashKey, HashKey)>),
    Range(i128, i64, i64),
    Builtin(BuiltinFunction),
    Method(String, Box<HashKey>),
}

/// Hashed membership test over the elements of a set.
pub(super) struct Membership {
    keys: HashSet<HashKey>,
}

impl Membership {
    pub(super) fn new(items: &[Value]) -> Self {
        Self {
            keys: items.iter().filter_map(Value::hash_key).collect(),
        }
    }

    pub(super) fn contains(&self, item: &Value) -> bool {
        item.hash_key().is_some_and(|key| self.keys.contains(&key))
    }
}

pub(super) fn ensure_hashable(value: &Value) -> Result<(), EvaluationError> {
    if value.is_hashable() {
        Ok(())
    } else {
        Err(EvaluationError::Unhashable {
            type_name: value.type_name().to_string(),
        })
    }
}

/// Exact length of a range. It can exceed `i64::MAX`.
pub(super) fn range_len(start: i64, stop: i64, step: i64) -> i128 {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / (-step) + 1
    } else {
        0
    }
}

/// Ordering used by `<`, `sorted`, `min` and `max`.
pub(super) fn order(left: &Value, right: &Value) -> Result<Ordering, EvaluationError> {
    match (left, right) {
        (left, right) if left.is_number() && right.is_number() => {
            match (left.as_int(), right.as_int()) {
                (Some(left), Some(right)) => Ok(left.cmp(&right)),
                _ => Ok(left
                    .as_float()
                    .partial_cmp(&right.as_float())
                    .unwrap_or(Ordering::Equal)),
            }
        }
        (Value::String(left), Value::String(right)) => Ok(left.cmp(right)),
        (Value::List(left), Value::List(right)) | (Value::Tuple(left), Value::Tuple(right)) => {
            for (left, right) in left.iter().zip(right) {
                if left != right {
                    return order(left, right);
                }
            }
            Ok(left.len().cmp(&right.len()))
        }
        _ => Err(EvaluationError::unsupported(
            "<",
            left.type_name(),
            right.type_name(),
        )),
    }
}

fn join_reprs(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

fn quote_string(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut rendered = String::with_capacity(value.len() + 2);
    rendered.push(quote);
    for c in value.chars() {
        match c {
            '\\' => rendered.push_str("\\\\"),
            '\n' => rendered.push_str("\\n"),
            '\t' => rendered.push_str("\\t"),
            '\r' => rendered.push_str("\\r"),
            c if c == quote => {
                rendered.push('\\');
                rendered.push(c);
            }
            c if c.is_control() || (c.is_whitespace() && c != ' ') => {
                let code = u32::from(c);
                let escaped = match code {
                    0..=0xff => format!("\\x{code:02x}"),
                    0x100..=0xffff => format!("\\u{code:04x}"),
                    _ => format!("\\U{code:08x}"),
                };
                rendered.push_str(&escaped);
            }
            c => rendered.push(c),
        }
    }
    rendered.push(quote);
    rendered
}

pub(super) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // Rust prints `1e-5`; Python prints `1e-05`.
        let rendered = format!("{value:e}");
        let Some((mantissa, exponent)) = rendered.split_once('e') else {
            return rendered;
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> Value {
        Value::Integer(value)
    }

    fn string(value: &str) -> Value {
        Value::String(value.to_string())
    }

    #[test]
    fn numbers_compare_across_types() {
        assert_eq!(int(1), Value::Float(1.0));
        assert_eq!(int(1), Value::Boolean(true));
        assert_ne!(int(2), Value::Boolean(true));
        assert_ne!(int(1), string("1"));
    }

    #[test]
    fn string_repr_escapes_unprintable_characters() {
        assert_eq!(string("a\tb").repr(), "'a\\tb'");
        assert_eq!(string("\u{7}\u{7f}\u{a0}\u{2028}\0").repr(), r"'\x07\x7f\xa0\u2028\x00'");
        assert_eq!(string("é").repr(), "'é'");
    }

    #[test]
    fn weight_counts_nested_elements() {
        assert_eq!(int(7).weight(), 1);
        assert_eq!(string("abc").weight(), 4);
        assert_eq!(Value::List(vec![Value::List(vec![int(0); 3]); 2]).weight(), 9);
        assert_eq!(
            Value::Dict(vec![(string("a"), Value::Tuple(vec![int(1)]))]).weight(),
            5
        );
    }

    #[test]
    fn sets_compare_by_canonical_keys() {
        let left = Value::Set(vec![int(1), Value::Tuple(vec![int(2), string("x")])]);
        let right = Value::Set(vec![Value::Tuple(vec![Value::Float(2.0), string("x")]), int(1)]);
        assert_eq!(left, right);
        let members = Membership::new(&[Value::List(vec![int(1)]), int(3)]);
        assert!(members.contains(&Value::List(vec![Value::Boolean(true)])));
        assert!(members.contains(&Value::Float(3.0)));
        assert!(!members.contains(&Value::Tuple(vec![int(1)])));
        assert!(!members.contains(&Value::Iterator(vec![int(3)])));
    }

    #[test]
    fn containers_follow_python_equality() {
        assert_eq!(
            Value::Set(vec![int(1), int(2)]),
            Value::Set(vec![int(2), int(1)])
        );
        assert_eq!(
            Value::Dict(vec![(string("a"), int(1)), (string("b"), int(2))]),
            Value::Dict(vec![(string("b"), int(2)), (string("a"), int(1))])
        );
        assert_ne!(
            Value::List(vec![int(1), int(2)]),
            Value::List(vec![int(2), int(1)])
        );
        assert_ne!(Value::List(vec![int(1)]), Value::Tuple(vec![int(1)]));
        assert_ne!(
            Value::Range {
                start: 0,
                stop: 3,
                step: 1
            },
            Value::List(vec![int(0), int(1), int(2)])
        );
        assert_eq!(
            Value::Range {
                start: 0,
                stop: 0,
                step: 1
            },
            Value::Range {
                start: 5,
                stop: 2,
                step: 3
            }
        );
    }

    #[test]
    fn set_and_dict_construction_deduplicates() {
        let set = Value::set_from(vec![int(1), Value::Float(1.0), int(2)]).expect("set");
        assert_eq!(set.repr(), "{1, 2}");
        let dict = Value::dict_from(vec![(string("a"), int(1)), (string("a"), int(2))])
            .expect("dict");
        assert_eq!(dict.repr(), "{'a': 2}");
        assert_eq!(
            Value::set_from(vec![Value::List(vec![])]),
            Err(EvaluationError::Unhashable {
                type_name: "list".to_string()
            })
        );
    }

    #[test]
    fn renders_python_reprs() {
        assert_eq!(Value::Float(1.0).repr(), "1.0");
        assert_eq!(Value::Float(0.5).repr(), "0.5");
        assert_eq!(Value::Float(1e20).repr(), "1e+20");
        assert_eq!(Value::Float(1.5e-5).repr(), "1.5e-05");
        assert_eq!(string("it's").repr(), "\"it's\"");
        assert_eq!(string("a\nb").repr(), "'a\\nb'");
        assert_eq!(Value::Tuple(vec![int(1)]).repr(), "(1,)");
        assert_eq!(Value::Set(vec![]).repr(), "set()");
        assert_eq!(
            Value::Range {
                start: 0,
                stop: 3,
                step: 1
            }
            .repr(),
            "range(0, 3)"
        );
    }

    #[test]
    fn orders_sequences_lexicographically() {
        assert_eq!(
            order(&Value::List(vec![int(1), int(2)]), &Value::List(vec![int(1), int(3)])),
            Ok(Ordering::Less)
        );
        assert_eq!(order(&string("b"), &string("a")), Ok(Ordering::Greater));
        assert!(order(&int(1), &string("a")).is_err());
    }
}
