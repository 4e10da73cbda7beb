use std::collections::HashMap;

use crate::ast::{BoolOperator, Comprehension, Expression, Target};

use super::builtins::BuiltinFunction;
use super::methods;
use super::operators::{binary_op, check_length, compare, unary_op};
use super::{EvaluationError, MAX_SEQUENCE_LEN, MAX_STEPS, Value};

/// Stack of comprehension scopes. Names not bound here fall back to builtins.
pub(super) struct Environment {
    scopes: Vec<HashMap<String, Value>>,
}

impl Environment {
    pub(super) fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    fn load(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Some(value.clone());
            }
        }
        BuiltinFunction::from_name(name).map(Value::BuiltinFunction)
    }

    fn store(&mut self, name: String, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }
}

/// What a comprehension produces for each surviving binding.
#[derive(Clone, Copy)]
enum ComprehensionBody<'e> {
    Element(&'e Expression),
    Entry(&'e Expression, &'e Expression),
}

/// Tree-walking evaluator. `steps` counts produced values, nested elements
/// included, so that every evaluation terminates in bounded time and memory.
pub(super) struct InterpreterRuntime {
    pub(super) steps: usize,
}

impl InterpreterRuntime {
    pub(super) fn new() -> Self {
        Self { steps: 0 }
    }

    pub(super) fn eval_expression(
        &mut self,
        expr: &Expression,
        environment: &mut Environment,
    ) -> Result<Value, EvaluationError> {
        let value = self.eval_node(expr, environment)?;
        self.charge(value.weight())?;
        Ok(value)
    }

    fn eval_node(
        &mut self,
        expr: &Expression,
        environment: &mut Environment,
    ) -> Result<Value, EvaluationError> {
        match expr {
            Expression::Integer(value) => Ok(Value::Integer(*value)),
            Expression::Float(value) => Ok(Value::Float(*value)),
            Expression::String(value) => Ok(Value::String(value.clone())),
            Expression::Boolean(value) => Ok(Value::Boolean(*value)),
            Expression::None => Ok(Value::None),
            Expression::Identifier(name) => {
                environment
                    .load(name)
                    .ok_or_else(|| EvaluationError::UndefinedVariable {
                        name: name.to_string(),
                    })
            }
            Expression::List(elements) => Ok(Value::List(self.eval_all(elements, environment)?)),
            Expression::Tuple(elements) => Ok(Value::Tuple(self.eval_all(elements, environment)?)),
            Expression::Set(elements) => Value::set_from(self.eval_all(elements, environment)?),
            Expression::Dict(entries) => {
                let mut values = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval_expression(key, environment)?;
                    let value = self.eval_expression(value, environment)?;
                    values.push((key, value));
                }
                Value::dict_from(values)
            }
            Expression::ListComp {
                element,
                generators,
            } => {
                let items = self.eval_comprehension(
                    ComprehensionBody::Element(element),
                    generators,
                    environment,
                )?;
                Ok(Value::List(items))
            }
            Expression::GeneratorExp {
                element,
                generators,
            } => {
                let items = self.eval_comprehension(
                    ComprehensionBody::Element(element),
                    generators,
                    environment,
                )?;
                Ok(Value::Iterator(items))
            }
            Expression::SetComp {
                element,
                generators,
            } => {
                let items = self.eval_comprehension(
                    ComprehensionBody::Element(element),
                    generators,
                    environment,
                )?;
                Value::set_from(items)
            }
            Expression::DictComp {
                key,
                value,
                generators,
            } => {
                let items = self.eval_comprehension(
                    ComprehensionBody::Entry(key, value),
                    generators,
                    environment,
                )?;
                let entries = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Tuple(mut pair) if pair.len() == 2 => {
                            let value = pair.pop()?;
                            let key = pair.pop()?;
                            Some((key, value))
                        }
                        _ => None,
                    })
                    .collect();
                Value::dict_from(entries)
            }
            Expression::UnaryOp { op, operand } => {
                let operand = self.eval_expression(operand, environment)?;
                unary_op(*op, &operand)
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval_expression(left, environment)?;
                let right = self.eval_expression(right, environment)?;
                binary_op(*op, &left, &right)
            }
            Expression::BoolOp { op, values } => {
                // Short-circuits and yields the deciding operand, not a bool.
                let mut result = Value::None;
                for (index, operand) in values.iter().enumerate() {
                    result = self.eval_expression(operand, environment)?;
                    let is_last = index + 1 == values.len();
                    let decided = match op {
                        BoolOperator::And => !result.is_truthy(),
                        BoolOperator::Or => result.is_truthy(),
                    };
                    if decided || is_last {
                        break;
                    }
                }
                Ok(result)
            }
            Expression::Compare { left, comparisons } => {
                let mut current = self.eval_expression(left, environment)?;
                for (op, operand) in comparisons {
                    let next = self.eval_expression(operand, environment)?;
                    if !compare(*op, &current, &next)? {
                        return Ok(Value::Boolean(false));
                    }
                    current = next;
                }
                Ok(Value::Boolean(true))
            }
            Expression::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                let condition = self.eval_expression(condition, environment)?;
                if condition.is_truthy() {
                    self.eval_expression(then_value, environment)
                } else {
                    self.eval_expression(else_value, environment)
                }
            }
            Expression::Call {
                callee,
                args,
                keywords,
            } => {
                let callee = self.eval_expression(callee, environment)?;
                let args = self.eval_all(args, environment)?;
                let mut keyword_values = Vec::with_capacity(keywords.len());
                for (name, value) in keywords {
                    keyword_values.push((name.clone(), self.eval_expression(value, environment)?));
                }
                self.eval_call(callee, args, keyword_values)
            }
            Expression::Attribute { object, name } => {
                let receiver = self.eval_expression(object, environment)?;
                if methods::has_method(&receiver, name) {
                    Ok(Value::BoundMethod {
                        receiver: Box::new(receiver),
                        method: name.clone(),
                    })
                } else {
                    Err(EvaluationError::UnknownAttribute {
                        attribute: name.clone(),
                        type_name: receiver.type_name().to_string(),
                    })
                }
            }
            Expression::Index { object, index } => {
                let object = self.eval_expression(object, environment)?;
                let index = self.eval_expression(index, environment)?;
                get_item(&object, &index)
            }
            Expression::Slice {
                object,
                lower,
                upper,
                step,
            } => {
                let object = self.eval_expression(object, environment)?;
                let mut bounds = [None, None, None];
                for (slot, part) in bounds.iter_mut().zip([lower, upper, step]) {
                    if let Some(part) = part {
                        *slot = Some(self.eval_expression(part, environment)?);
                    }
                }
                let [lower, upper, step] = bounds;
                slice(&object, lower.as_ref(), upper.as_ref(), step.as_ref())
            }
            Expression::Invalid => Err(EvaluationError::InvalidExpression),
        }
    }

    fn eval_all(
        &mut self,
        elements: &[Expression],
        environment: &mut Environment,
    ) -> Result<Vec<Value>, EvaluationError> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(self.eval_expression(element, environment)?);
        }
        Ok(values)
    }

    fn eval_call(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, EvaluationError> {
        match callee {
            Value::BuiltinFunction(function) => self.call_builtin(function, args, keywords),
            Value::BoundMethod { receiver, method } => {
                self.call_method(&receiver, &method, args, keywords)
            }
            other => Err(EvaluationError::ObjectNotCallable {
                type_name: other.type_name().to_string(),
            }),
        }
    }

    fn eval_comprehension(
        &mut self,
        body: ComprehensionBody<'_>,
        generators: &[Comprehension],
        environment: &mut Environment,
    ) -> Result<Vec<Value>, EvaluationError> {
        let Some((first, rest)) = generators.split_first() else {
            return Ok(vec![self.eval_body(body, environment)?]);
        };
        // The outermost iterable is evaluated in the enclosing scope.
        let source = self.eval_expression(&first.iterable, environment)?;
        let items = self.iterate(&source)?;

        environment.push_scope();
        let mut output = Vec::new();
        let result = self.run_clause(first, items, rest, body, environment, &mut output);
        environment.pop_scope();
        result.map(|()| output)
    }

    fn run_clause(
        &mut self,
        clause: &Comprehension,
        items: Vec<Value>,
        rest: &[Comprehension],
        body: ComprehensionBody<'_>,
        environment: &mut Environment,
        output: &mut Vec<Value>,
    ) -> Result<(), EvaluationError> {
        'items: for item in items {
            self.charge(1)?;
            bind_target(&clause.target, item, environment)?;
            for condition in &clause.conditions {
                if !self.eval_expression(condition, environment)?.is_truthy() {
                    continue 'items;
                }
            }
            match rest.split_first() {
                Some((next, remaining)) => {
                    let source = self.eval_expression(&next.iterable, environment)?;
                    let next_items = self.iterate(&source)?;
                    self.run_clause(next, next_items, remaining, body, environment, output)?;
                }
                None => {
                    output.push(self.eval_body(body, environment)?);
                    check_length(output.len(), "elements")?;
                }
            }
        }
        Ok(())
    }

    fn eval_body(
        &mut self,
        body: ComprehensionBody<'_>,
        environment: &mut Environment,
    ) -> Result<Value, EvaluationError> {
        match body {
            ComprehensionBody::Element(element) => self.eval_expression(element, environment),
            ComprehensionBody::Entry(key, value) => {
                let key = self.eval_expression(key, environment)?;
                let value = self.eval_expression(value, environment)?;
                Ok(Value::Tuple(vec![key, value]))
            }
        }
    }

    /// Materializes the elements of an iterable value.
    pub(super) fn iterate(&mut self, value: &Value) -> Result<Vec<Value>, EvaluationError> {
        let items = match value {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) | Value::Iterator(items) => {
                items.clone()
            }
            Value::Dict(entries) => entries.iter().map(|(key, _)| key.clone()).collect(),
            Value::String(text) => text
                .chars()
                .map(|c| Value::String(c.to_string()))
                .collect(),
            Value::Range { start, step, .. } => {
                let len = value.range_len();
                if len > MAX_SEQUENCE_LEN as i128 {
                    return Err(EvaluationError::TooLarge {
                        limit: MAX_SEQUENCE_LEN,
                        unit: "elements",
                    });
                }
                (0..len)
                    .map(|offset| range_item(*start, *step, offset))
                    .collect::<Result<_, _>>()?
            }
            other => {
                return Err(EvaluationError::NotIterable {
                    type_name: other.type_name().to_string(),
                });
            }
        };
        let weight = items
            .iter()
            .fold(0usize, |total, item| total.saturating_add(item.weight()));
        self.charge(weight)?;
        Ok(items)
    }

    pub(super) fn charge(&mut self, steps: usize) -> Result<(), EvaluationError> {
        self.steps = self.steps.saturating_add(steps);
        if self.steps > MAX_STEPS {
            return Err(EvaluationError::TooLarge {
                limit: MAX_STEPS,
                unit: "steps",
            });
        }
        Ok(())
    }
}

fn bind_target(
    target: &Target,
    item: Value,
    environment: &mut Environment,
) -> Result<(), EvaluationError> {
    match target {
        Target::Name(name) => {
            environment.store(name.clone(), item);
            Ok(())
        }
        Target::Tuple(names) => {
            let parts = match item {
                Value::List(parts) | Value::Tuple(parts) | Value::Iterator(parts) => parts,
                Value::String(text) => text.chars().map(|c| Value::String(c.to_string())).collect(),
                other => {
                    return Err(EvaluationError::NotIterable {
                        type_name: other.type_name().to_string(),
                    });
                }
            };
            if parts.len() != names.len() {
                return Err(EvaluationError::UnpackMismatch {
                    expected: names.len(),
                    found: parts.len(),
                });
            }
            for (name, part) in names.iter().zip(parts) {
                environment.store(name.clone(), part);
            }
            Ok(())
        }
    }
}

/// Resolves a possibly negative index against a sequence of `len` items.
fn normalize_index(index: &Value, len: usize, type_name: &str) -> Result<usize, EvaluationError> {
    let Some(raw) = index.as_int() else {
        return Err(EvaluationError::invalid_argument(
            &format!("{type_name} index"),
            "int",
            index.type_name(),
        ));
    };
    let len = len as i64;
    let resolved = if raw < 0 { raw + len } else { raw };
    if (0..len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(EvaluationError::IndexOutOfRange {
            type_name: type_name.to_string(),
        })
    }
}

fn get_item(object: &Value, index: &Value) -> Result<Value, EvaluationError> {
    match object {
        Value::List(items) | Value::Tuple(items) => {
            let position = normalize_index(index, items.len(), object.type_name())?;
            Ok(items[position].clone())
        }
        Value::String(text) => {
            let chars = text.chars().collect::<Vec<_>>();
            let position = normalize_index(index, chars.len(), "string")?;
            Ok(Value::String(chars[position].to_string()))
        }
        Value::Range { start, step, .. } => {
            let len = object.range_len();
            let position = index.as_int().map(i128::from).ok_or_else(|| {
                EvaluationError::invalid_argument("range index", "int", index.type_name())
            })?;
            let position = if position < 0 { position + len } else { position };
            if !(0..len).contains(&position) {
                return Err(EvaluationError::IndexOutOfRange {
                    type_name: "range".to_string(),
                });
            }
            range_item(*start, *step, position)
        }
        Value::Dict(entries) => {
            super::value::ensure_hashable(index)?;
            Value::dict_lookup(entries, index)
                .cloned()
                .ok_or_else(|| EvaluationError::MissingKey { key: index.repr() })
        }
        other => Err(EvaluationError::UnsupportedOperation {
            operation: "subscript".to_string(),
            type_name: other.type_name().to_string(),
        }),
    }
}

/// Element `offset` of a range, or an overflow error when it leaves i64.
fn range_item(start: i64, step: i64, offset: i128) -> Result<Value, EvaluationError> {
    i64::try_from(i128::from(start) + offset * i128::from(step))
        .map(Value::Integer)
        .map_err(|_| EvaluationError::Overflow {
            operation: "range".to_string(),
        })
}

fn slice(
    object: &Value,
    lower: Option<&Value>,
    upper: Option<&Value>,
    step: Option<&Value>,
) -> Result<Value, EvaluationError> {
    let pick = |items: &[Value]| -> Result<Vec<Value>, EvaluationError> {
        let positions = slice_positions(items.len(), lower, upper, step)?;
        Ok(positions.iter().map(|&i| items[i].clone()).collect())
    };
    match object {
        Value::List(items) => Ok(Value::List(pick(items)?)),
        Value::Tuple(items) => Ok(Value::Tuple(pick(items)?)),
        Value::String(text) => {
            let chars = text.chars().collect::<Vec<_>>();
            let positions = slice_positions(chars.len(), lower, upper, step)?;
            Ok(Value::String(positions.iter().map(|&i| chars[i]).collect()))
        }
        other => Err(EvaluationError::UnsupportedOperation {
            operation: "slice".to_string(),
            type_name: other.type_name().to_string(),
        }),
    }
}

/// Python's `slice.indices` followed by the walk it describes.
fn slice_positions(
    len: usize,
    lower: Option<&Value>,
    upper: Option<&Value>,
    step: Option<&Value>,
) -> Result<Vec<usize>, EvaluationError> {
    let bound = |value: Option<&Value>| -> Result<Option<i64>, EvaluationError> {
        match value {
            None | Some(Value::None) => Ok(None),
            Some(value) => value.as_int().map(Some).ok_or_else(|| {
                EvaluationError::invalid_argument("slice", "int or None", value.type_name())
            }),
        }
    };
    let len = len as i64;
    let step = bound(step)?.unwrap_or(1);
    if step == 0 {
        return Err(EvaluationError::invalid_value("slice step cannot be zero"));
    }
    let clamp = |value: Option<i64>, default: i64| -> i64 {
        match value {
            None => default,
            Some(value) => {
                let value = if value < 0 { value + len } else { value };
                if step > 0 {
                    value.clamp(0, len)
                } else {
                    value.clamp(-1, len - 1)
                }
            }
        }
    };
    let (default_start, default_stop) = if step > 0 { (0, len) } else { (len - 1, -1) };
    let mut position = clamp(bound(lower)?, default_start);
    let stop = clamp(bound(upper)?, default_stop);

    let mut positions = Vec::new();
    while (step > 0 && position < stop) || (step < 0 && position > stop) {
        positions.push(position as usize);
        match position.checked_add(step) {
            Some(next) => position = next,
            None => break,
        }
    }
    Ok(positions)
}
