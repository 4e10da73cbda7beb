//! Arithmetic, bitwise and comparison operators over evaluated values.

use std::cmp::Ordering;

use crate::ast::{BinaryOperator, CompareOperator, UnaryOperator};

use super::value::{Membership, ensure_hashable, order, range_len};
use super::{EvaluationError, MAX_SEQUENCE_LEN, MAX_STEPS, Value};

enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    if let (Some(left), Some(right)) = (left.as_int(), right.as_int()) {
        return Some(Numbers::Ints(left, right));
    }
    Some(Numbers::Floats(left.as_float()?, right.as_float()?))
}

fn overflow(operation: &str) -> EvaluationError {
    EvaluationError::Overflow {
        operation: operation.to_string(),
    }
}

pub(super) fn binary_op(
    op: BinaryOperator,
    left: &Value,
    right: &Value,
) -> Result<Value, EvaluationError> {
    match op {
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Sub => subtract(left, right),
        BinaryOperator::Mul => multiply(left, right),
        BinaryOperator::Div => divide(left, right),
        BinaryOperator::FloorDiv => floor_divide(left, right),
        BinaryOperator::Mod => modulo(left, right),
        BinaryOperator::Pow => power(left, right),
        BinaryOperator::BitAnd | BinaryOperator::BitOr | BinaryOperator::BitXor => {
            bitwise(op, left, right)
        }
        BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => shift(op, left, right),
    }
}

fn add(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    match (numbers(left, right), left, right) {
        (Some(Numbers::Ints(a, b)), _, _) => {
            a.checked_add(b).map(Value::Integer).ok_or_else(|| overflow("+"))
        }
        (Some(Numbers::Floats(a, b)), _, _) => Ok(Value::Float(a + b)),
        (None, Value::String(a), Value::String(b)) => {
            check_length(a.chars().count() + b.chars().count(), "characters")?;
            Ok(Value::String(format!("{a}{b}")))
        }
        (None, Value::List(a), Value::List(b)) => {
            check_length(a.len() + b.len(), "elements")?;
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (None, Value::Tuple(a), Value::Tuple(b)) => {
            check_length(a.len() + b.len(), "elements")?;
            Ok(Value::Tuple(a.iter().chain(b).cloned().collect()))
        }
        _ => Err(EvaluationError::unsupported(
            "+",
            left.type_name(),
            right.type_name(),
        )),
    }
}

fn subtract(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    match (numbers(left, right), left, right) {
        (Some(Numbers::Ints(a, b)), _, _) => {
            a.checked_sub(b).map(Value::Integer).ok_or_else(|| overflow("-"))
        }
        (Some(Numbers::Floats(a, b)), _, _) => Ok(Value::Float(a - b)),
        (None, Value::Set(a), Value::Set(b)) => {
            let b = Membership::new(b);
            Ok(Value::Set(
                a.iter().filter(|&item| !b.contains(item)).cloned().collect(),
            ))
        }
        _ => Err(EvaluationError::unsupported(
            "-",
            left.type_name(),
            right.type_name(),
        )),
    }
}

fn multiply(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    match numbers(left, right) {
        Some(Numbers::Ints(a, b)) => {
            return a.checked_mul(b).map(Value::Integer).ok_or_else(|| overflow("*"));
        }
        Some(Numbers::Floats(a, b)) => return Ok(Value::Float(a * b)),
        None => {}
    }

    let (sequence, count) = match (left.as_int(), right.as_int()) {
        (_, Some(count)) => (left, count),
        (Some(count), _) => (right, count),
        _ => {
            return Err(EvaluationError::unsupported(
                "*",
                left.type_name(),
                right.type_name(),
            ));
        }
    };
    let count = usize::try_from(count).unwrap_or(0);
    match sequence {
        Value::String(text) => {
            if text.is_empty() || count == 0 {
                return Ok(Value::String(String::new()));
            }
            check_length(text.chars().count().saturating_mul(count), "characters")?;
            Ok(Value::String(text.repeat(count)))
        }
        Value::List(items) => Ok(Value::List(repeat_items(items, count)?)),
        Value::Tuple(items) => Ok(Value::Tuple(repeat_items(items, count)?)),
        _ => Err(EvaluationError::unsupported(
            "*",
            left.type_name(),
            right.type_name(),
        )),
    }
}

/// Repeats `items` after checking both the result length and the number of
/// values the copies would allocate, nested elements included.
fn repeat_items(items: &[Value], count: usize) -> Result<Vec<Value>, EvaluationError> {
    if items.is_empty() || count == 0 {
        return Ok(Vec::new());
    }
    check_length(items.len().saturating_mul(count), "elements")?;
    let weight = items
        .iter()
        .fold(0usize, |total, item| total.saturating_add(item.weight()));
    check_work(weight.saturating_mul(count))?;
    Ok(items.iter().cloned().cycle().take(items.len() * count).collect())
}

fn divide(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        return Err(EvaluationError::unsupported(
            "/",
            left.type_name(),
            right.type_name(),
        ));
    };
    if b == 0.0 {
        return Err(EvaluationError::ZeroDivision);
    }
    Ok(Value::Float(a / b))
}

fn floor_divide(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    match numbers(left, right) {
        Some(Numbers::Ints(_, 0)) => Err(EvaluationError::ZeroDivision),
        Some(Numbers::Ints(a, b)) => {
            let quotient = a.checked_div(b).ok_or_else(|| overflow("//"))?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Ok(Value::Integer(quotient - 1))
            } else {
                Ok(Value::Integer(quotient))
            }
        }
        Some(Numbers::Floats(_, b)) if b == 0.0 => Err(EvaluationError::ZeroDivision),
        Some(Numbers::Floats(a, b)) => Ok(Value::Float((a / b).floor())),
        None => Err(EvaluationError::unsupported(
            "//",
            left.type_name(),
            right.type_name(),
        )),
    }
}

fn modulo(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    match numbers(left, right) {
        Some(Numbers::Ints(_, 0)) => Err(EvaluationError::ZeroDivision),
        Some(Numbers::Ints(a, b)) => {
            // The result takes the sign of the divisor.
            let remainder = a.checked_rem(b).unwrap_or(0);
            if remainder != 0 && ((remainder < 0) != (b < 0)) {
                Ok(Value::Integer(remainder + b))
            } else {
                Ok(Value::Integer(remainder))
            }
        }
        Some(Numbers::Floats(_, b)) if b == 0.0 => Err(EvaluationError::ZeroDivision),
        Some(Numbers::Floats(a, b)) => {
            let remainder = a % b;
            if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                Ok(Value::Float(remainder + b))
            } else {
                Ok(Value::Float(remainder))
            }
        }
        None => Err(EvaluationError::unsupported(
            "%",
            left.type_name(),
            right.type_name(),
        )),
    }
}

fn power(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    match numbers(left, right) {
        Some(Numbers::Ints(base, exponent)) if exponent >= 0 => int_power(base, exponent),
        Some(Numbers::Ints(base, exponent)) => float_power(base as f64, exponent as f64),
        Some(Numbers::Floats(base, exponent)) => float_power(base, exponent),
        None => Err(EvaluationError::unsupported(
            "**",
            left.type_name(),
            right.type_name(),
        )),
    }
}

fn int_power(base: i64, exponent: i64) -> Result<Value, EvaluationError> {
    let result = match base {
        0 if exponent == 0 => 1,
        0 | 1 => base,
        -1 => {
            if exponent % 2 == 0 {
                1
            } else {
                -1
            }
        }
        _ => {
            let exponent = u32::try_from(exponent).map_err(|_| overflow("**"))?;
            base.checked_pow(exponent).ok_or_else(|| overflow("**"))?
        }
    };
    Ok(Value::Integer(result))
}

fn float_power(base: f64, exponent: f64) -> Result<Value, EvaluationError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvaluationError::ZeroDivision);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(EvaluationError::invalid_value(
            "negative number raised to a fractional power",
        ));
    }
    Ok(Value::Float(base.powf(exponent)))
}

fn bitwise(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    let symbol = match op {
        BinaryOperator::BitAnd => "&",
        BinaryOperator::BitOr => "|",
        _ => "^",
    };
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(match op {
            BinaryOperator::BitAnd => a & b,
            BinaryOperator::BitOr => a | b,
            _ => a ^ b,
        })),
        (Value::Set(a), Value::Set(b)) => {
            let (in_a, in_b) = (Membership::new(a), Membership::new(b));
            let items = match op {
                BinaryOperator::BitAnd => a.iter().filter(|&item| in_b.contains(item)).cloned().collect(),
                BinaryOperator::BitOr => a
                    .iter()
                    .chain(b.iter().filter(|&item| !in_a.contains(item)))
                    .cloned()
                    .collect(),
                _ => a
                    .iter()
                    .filter(|&item| !in_b.contains(item))
                    .chain(b.iter().filter(|&item| !in_a.contains(item)))
                    .cloned()
                    .collect(),
            };
            Ok(Value::Set(items))
        }
        _ => match (left.as_int(), right.as_int()) {
            (Some(a), Some(b)) => Ok(Value::Integer(match op {
                BinaryOperator::BitAnd => a & b,
                BinaryOperator::BitOr => a | b,
                _ => a ^ b,
            })),
            _ => Err(EvaluationError::unsupported(
                symbol,
                left.type_name(),
                right.type_name(),
            )),
        },
    }
}

fn shift(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    let symbol = if op == BinaryOperator::ShiftLeft {
        "<<"
    } else {
        ">>"
    };
    let (Some(value), Some(count)) = (left.as_int(), right.as_int()) else {
        return Err(EvaluationError::unsupported(
            symbol,
            left.type_name(),
            right.type_name(),
        ));
    };
    if count < 0 {
        return Err(EvaluationError::invalid_value("negative shift count"));
    }
    if op == BinaryOperator::ShiftRight {
        return Ok(Value::Integer(if count >= 64 {
            if value < 0 { -1 } else { 0 }
        } else {
            value >> count
        }));
    }
    if value == 0 {
        return Ok(Value::Integer(0));
    }
    if count >= 64 {
        return Err(overflow(symbol));
    }
    let shifted = i128::from(value) << count;
    i64::try_from(shifted)
        .map(Value::Integer)
        .map_err(|_| overflow(symbol))
}

pub(super) fn unary_op(op: UnaryOperator, operand: &Value) -> Result<Value, EvaluationError> {
    let unsupported = |symbol: &str| EvaluationError::UnsupportedOperation {
        operation: format!("unary {symbol}"),
        type_name: operand.type_name().to_string(),
    };
    match (op, operand) {
        (UnaryOperator::Not, value) => Ok(Value::Boolean(!value.is_truthy())),
        (UnaryOperator::Neg, Value::Float(value)) => Ok(Value::Float(-value)),
        (UnaryOperator::Pos, Value::Float(value)) => Ok(Value::Float(*value)),
        (UnaryOperator::Neg, value) => match value.as_int() {
            Some(value) => value
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| overflow("unary -")),
            None => Err(unsupported("-")),
        },
        (UnaryOperator::Pos, value) => value.as_int().map(Value::Integer).ok_or_else(|| unsupported("+")),
        (UnaryOperator::Invert, value) => value
            .as_int()
            .map(|value| Value::Integer(!value))
            .ok_or_else(|| unsupported("~")),
    }
}

pub(super) fn compare(
    op: CompareOperator,
    left: &Value,
    right: &Value,
) -> Result<bool, EvaluationError> {
    match op {
        CompareOperator::Equal => Ok(left == right),
        CompareOperator::NotEqual => Ok(left != right),
        CompareOperator::In => contains(right, left),
        CompareOperator::NotIn => contains(right, left).map(|found| !found),
        CompareOperator::Is => Ok(identical(left, right)),
        CompareOperator::IsNot => Ok(!identical(left, right)),
        CompareOperator::Less
        | CompareOperator::LessEqual
        | CompareOperator::Greater
        | CompareOperator::GreaterEqual => {
            if let (Value::Set(a), Value::Set(b)) = (left, right) {
                return Ok(compare_sets(op, a, b));
            }
            let ordering = order(left, right).map_err(|_| {
                EvaluationError::unsupported(compare_symbol(op), left.type_name(), right.type_name())
            })?;
            Ok(match op {
                CompareOperator::Less => ordering == Ordering::Less,
                CompareOperator::LessEqual => ordering != Ordering::Greater,
                CompareOperator::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

fn compare_symbol(op: CompareOperator) -> &'static str {
    match op {
        CompareOperator::Less => "<",
        CompareOperator::LessEqual => "<=",
        CompareOperator::Greater => ">",
        _ => ">=",
    }
}

fn compare_sets(op: CompareOperator, left: &[Value], right: &[Value]) -> bool {
    let subset = |a: &[Value], b: &[Value]| {
        let b = Membership::new(b);
        a.iter().all(|item| b.contains(item))
    };
    match op {
        CompareOperator::Less => left.len() < right.len() && subset(left, right),
        CompareOperator::LessEqual => subset(left, right),
        CompareOperator::Greater => left.len() > right.len() && subset(right, left),
        _ => subset(right, left),
    }
}

pub(super) fn contains(container: &Value, item: &Value) -> Result<bool, EvaluationError> {
    match container {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) | Value::Iterator(items) => {
            Ok(items.contains(item))
        }
        Value::Dict(entries) => {
            ensure_hashable(item)?;
            Ok(Value::dict_lookup(entries, item).is_some())
        }
        Value::String(text) => match item {
            Value::String(needle) => Ok(text.contains(needle.as_str())),
            other => Err(EvaluationError::invalid_argument(
                "in <string>",
                "str",
                other.type_name(),
            )),
        },
        Value::Range { start, stop, step } => {
            let candidate = match item {
                Value::Float(value) if value.fract() == 0.0 && value.abs() < 9.0e15 => {
                    Some(*value as i64)
                }
                other => other.as_int(),
            };
            let Some(candidate) = candidate else {
                return Ok(false);
            };
            let in_bounds = if *step > 0 {
                *start <= candidate && candidate < *stop
            } else {
                *stop < candidate && candidate <= *start
            };
            Ok(in_bounds
                && (i128::from(candidate) - i128::from(*start)) % i128::from(*step) == 0
                && range_len(*start, *stop, *step) > 0)
        }
        other => Err(EvaluationError::NotIterable {
            type_name: other.type_name().to_string(),
        }),
    }
}

fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::BuiltinFunction(a), Value::BuiltinFunction(b)) => a == b,
        _ => false,
    }
}

/// Rejects a single result that alone would exhaust the step budget.
pub(super) fn check_work(weight: usize) -> Result<(), EvaluationError> {
    if weight > MAX_STEPS {
        Err(EvaluationError::TooLarge {
            limit: MAX_STEPS,
            unit: "steps",
        })
    } else {
        Ok(())
    }
}

pub(super) fn check_length(length: usize, unit: &'static str) -> Result<(), EvaluationError> {
    if length > MAX_SEQUENCE_LEN {
        Err(EvaluationError::TooLarge {
            limit: MAX_SEQUENCE_LEN,
            unit,
        })
    } else {
        Ok(())
    }
}
