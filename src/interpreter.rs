//! Tree-walking evaluator for the operator catalog.
//!
//! Each operator node calls one of the three entry points with its children.
//! Children are evaluated one step with [`Node::value`]; whether an operand is
//! then followed through indirection (*target* access) or used as is depends
//! on the operator.  Most operators target all operands; `=` and `isset`
//! inspect the raw operand, and `if … else` evaluates only the chosen branch.
//!
//! Kind mismatches raised below surface as `UnsupportedOperand`, naming the
//! operator and the operand kinds, at the entry point that detected them.

use std::cmp::Ordering;
use std::path::Path;

use log::{debug, info};

use crate::ast::Node;
use crate::environment::Environment;
use crate::error::{ExprError, Result};
use crate::operator::OpCode;
use crate::tuple::{Attribute, Tuple};
use crate::value::{Value, ValueRef};

pub struct Evaluator;

// ─────────────────────────────────────────────────────────────────────────────
// Entry points
// ─────────────────────────────────────────────────────────────────────────────

impl Evaluator {
    pub fn unary(op: OpCode, env: &mut Environment, operand: &Node) -> Result<ValueRef> {
        debug!("Evaluating unary '{}'", op.spelling());

        if op == OpCode::IsSet {
            return Self::is_set(operand, env);
        }

        let mut value = operand.value(env)?;

        // A returned literal leaves the tree as a copy.
        if op == OpCode::Return && operand.is_constant() {
            value = value.copy();
        }

        match Self::unary_value(op, env, &value) {
            Err(e) => Err(Self::translate(e, op, env, &[&value])),
            ok => ok,
        }
    }

    pub fn binary(op: OpCode, env: &mut Environment, lhs: &Node, rhs: &Node) -> Result<ValueRef> {
        debug!("Evaluating binary '{}'", op.spelling());

        if op == OpCode::Assign {
            return Self::assign(env, lhs, rhs);
        }

        let mut a = lhs.value(env)?;
        let mut b = rhs.value(env)?;

        // Nothing handed out below may alias the tree's own literals.
        if op == OpCode::Resize && lhs.is_constant() {
            a = a.copy();
        }
        if op == OpCode::Call && rhs.is_constant() {
            b = b.copy();
        }

        let result = match op {
            OpCode::Element => Self::element(env, &a, &b, || {
                format!("{}[{}]", lhs.inorder_str(), rhs.inorder_str())
            })
            .map(|element| if lhs.is_constant() { element.copy() } else { element }),
            _ => Self::binary_value(op, env, &a, &b),
        };

        match result {
            Err(e) => Err(Self::translate(e, op, env, &[&a, &b])),
            ok => ok,
        }
    }

    pub fn ternary(
        op: OpCode,
        env: &mut Environment,
        first: &Node,
        second: &Node,
        third: &Node,
    ) -> Result<ValueRef> {
        debug!("Evaluating ternary '{}'", op.spelling());

        match op {
            // `A if B else C`: children are (A, B, C) in source order.
            OpCode::IfElse => {
                let condition = second.value(env)?;

                let flag = match condition.target_bool(env) {
                    Ok(flag) => flag,
                    Err(e) => return Err(Self::translate(e, op, env, &[&condition])),
                };

                let branch = if flag { first } else { third };
                let value = branch.value(env)?;

                Ok(if branch.is_constant() { value.copy() } else { value })
            }

            OpCode::Slice => {
                let collection = first.value(env)?;
                let from = second.value(env)?;
                let to = third.value(env)?;

                match Self::slice(env, &collection, &from, &to) {
                    Err(e) => Err(Self::translate(e, op, env, &[&collection, &from, &to])),
                    ok => ok,
                }
            }

            _ => Err(ExprError::unsupported(op.spelling(), "three operands")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

impl Evaluator {
    /// Turn an internal `WrongKind` into the public `UnsupportedOperand`.
    fn translate(e: ExprError, op: OpCode, env: &Environment, operands: &[&ValueRef]) -> ExprError {
        match e {
            ExprError::WrongKind { .. } => {
                let kinds = operands
                    .iter()
                    .map(|v| Self::describe(v, env))
                    .collect::<Vec<_>>()
                    .join(", ");

                ExprError::unsupported(op.spelling(), kinds)
            }
            other => other,
        }
    }

    /// Kind name of what a variable or reference stands for, else of the
    /// value itself.
    fn describe(value: &ValueRef, env: &Environment) -> &'static str {
        let stored = match &**value {
            Value::Variable(name) => env.get_actual(name.as_str()),
            Value::Reference(r) => env.get_path(&r.path, r.context.as_ref()),
            _ => None,
        };

        stored.map_or_else(|| value.kind().name(), |v| v.kind().name())
    }
}

fn mismatch(value: &Value) -> ExprError {
    ExprError::wrong_kind("operand", value.kind().name())
}

/// Map a possibly negative index into `0..size`.  `-p` counts from the end;
/// out-of-range positions clamp to the first or last element.
fn position(index: i64, size: usize) -> Option<usize> {
    if size == 0 {
        return None;
    }

    let last = i64::try_from(size - 1).unwrap_or(i64::MAX);
    let p = if index < 0 { index.saturating_add(last.saturating_add(1)) } else { index };

    usize::try_from(p.clamp(0, last)).ok()
}

/// `saveto`/`delete` outcome: I/O failures become a status record.
fn status(outcome: Result<()>) -> Result<ValueRef> {
    match outcome {
        Ok(()) => Ok(Value::tuple(Tuple::status(true, ""))),
        Err(e) if e.is_io() => {
            info!("File operation failed: {}", e);
            Ok(Value::tuple(Tuple::status(false, &e.to_string())))
        }
        Err(e) => Err(e),
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();

    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ─────────────────────────────────────────────────────────────────────────────
// Unary operators
// ─────────────────────────────────────────────────────────────────────────────

impl Evaluator {
    fn unary_value(op: OpCode, env: &mut Environment, value: &ValueRef) -> Result<ValueRef> {
        match op {
            OpCode::Not => Ok(Value::bool(!value.target_bool(env)?)),

            OpCode::Negate => {
                let target = value.target(env)?;
                match &*target {
                    Value::Int(i) => Ok(Value::int(i.wrapping_neg())),
                    Value::Float(x) => Ok(Value::float(-x)),
                    other => Err(mismatch(other)),
                }
            }

            OpCode::Sqrt => {
                let target = value.target(env)?;
                match &*target {
                    Value::Int(i) => Ok(Value::int((*i as f64).sqrt() as i64)),
                    Value::Float(x) => Ok(Value::float(x.sqrt())),
                    other => Err(mismatch(other)),
                }
            }

            OpCode::ToInt => Ok(Value::int(value.convert_target_int(env)?)),
            OpCode::ToFloat => Ok(Value::float(value.convert_target_float(env)?)),
            OpCode::ToStr => Ok(Value::string(value.convert_target_string(env)?)),
            OpCode::ToBool => Ok(Value::bool(value.convert_target_bool(env)?)),
            OpCode::ToChar => Ok(Value::char(value.convert_target_char(env)?)),
            OpCode::ToName => Ok(Value::Name(value.convert_target_name(env)?).into()),
            OpCode::ToBin => {
                let bytes = value.convert_target_binary(env)?;
                Ok(Value::binary(&bytes))
            }
            OpCode::ToRaw => Ok(Value::raw(value.convert_target_raw(env)?)),

            OpCode::Len => {
                let size = value.target(env)?.size()?;
                Ok(Value::int(i64::try_from(size).unwrap_or(i64::MAX)))
            }

            OpCode::Trim | OpCode::LTrim | OpCode::RTrim => {
                let target = value.target(env)?;
                Self::trim(op, &target)
            }

            OpCode::IsName => {
                let target = value.target(env)?;
                let result = match &*target {
                    Value::Name(_) => true,
                    Value::String(s) => is_identifier(&s.borrow()),
                    _ => false,
                };
                Ok(Value::bool(result))
            }

            OpCode::TypeOf => Ok(Value::name(value.target(env)?.kind().name())),

            OpCode::Exists => {
                let path = value.convert_target_string(env)?;
                Ok(Value::bool(env.file_system().exists(Path::new(&path))))
            }

            OpCode::Delete => {
                let path = value.convert_target_string(env)?;
                status(env.file_system().remove(Path::new(&path)))
            }

            OpCode::LoadStr => {
                let path = value.convert_target_string(env)?;
                Ok(Value::string(env.file_system().load_text(Path::new(&path))?))
            }

            OpCode::LoadRaw => {
                let path = value.convert_target_string(env)?;
                let text = env.file_system().load_text(Path::new(&path))?;
                Ok(Value::raw(text.lines()))
            }

            OpCode::LoadBin => {
                let path = value.convert_target_string(env)?;
                let bytes = env.file_system().load_binary(Path::new(&path))?;
                Ok(Value::binary(&bytes))
            }

            OpCode::Return => Ok(Value::ret(value.target(env)?)),

            _ => Err(ExprError::unsupported(op.spelling(), "one operand")),
        }
    }

    fn trim(op: OpCode, value: &Value) -> Result<ValueRef> {
        let cut = |text: &str| -> String {
            let trimmed = match op {
                OpCode::LTrim => text.trim_start(),
                OpCode::RTrim => text.trim_end(),
                _ => text.trim(),
            };
            trimmed.to_owned()
        };

        match value {
            Value::String(s) => Ok(Value::string(cut(&s.borrow()))),
            Value::Raw(lines) => Ok(Value::raw(lines.borrow().iter().map(|line| cut(line)))),
            other => Err(mismatch(other)),
        }
    }

    /// `isset` looks at the operand as written: only a variable qualifies.
    fn is_set(operand: &Node, env: &Environment) -> Result<ValueRef> {
        match operand.variable_name() {
            Some(name) => Ok(Value::bool(env.contains(name))),
            None => {
                let kind = operand.literal().map_or("expression", |v| v.kind().name());
                Err(ExprError::unsupported(OpCode::IsSet.spelling(), kind))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Binary operators
// ─────────────────────────────────────────────────────────────────────────────

impl Evaluator {
    fn binary_value(op: OpCode, env: &mut Environment, a: &ValueRef, b: &ValueRef) -> Result<ValueRef> {
        match op {
            // Both sides are always evaluated.
            OpCode::Or => {
                let x = a.target_bool(env)?;
                let y = b.target_bool(env)?;
                Ok(Value::bool(x || y))
            }

            OpCode::And => {
                let x = a.target_bool(env)?;
                let y = b.target_bool(env)?;
                Ok(Value::bool(x && y))
            }

            OpCode::Eq | OpCode::Ne | OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge => {
                let ordering = a.target_compare(env, b)?;
                Ok(Value::bool(holds(op, ordering)))
            }

            OpCode::Plus | OpCode::Minus | OpCode::Multiply | OpCode::Divide | OpCode::Mod | OpCode::Pow => {
                let x = a.target(env)?;
                let y = b.target(env)?;
                Self::arithmetic(op, &x, &y)
            }

            OpCode::In => {
                let x = a.target(env)?;
                let y = b.target(env)?;
                Self::membership(&x, &y)
            }

            OpCode::Match => {
                let subject = a.target(env)?;
                let pattern = b.target(env)?;
                Self::pattern_match(env, &subject, &pattern)
            }

            OpCode::Resize => Self::resize(env, a, b),

            OpCode::SaveTo => Self::save_to(env, a, b),

            OpCode::Call => Self::call(env, a, b),

            _ => Err(ExprError::unsupported(op.spelling(), "two operands")),
        }
    }

    fn arithmetic(op: OpCode, a: &ValueRef, b: &ValueRef) -> Result<ValueRef> {
        match (op, &**a, &**b) {
            (OpCode::Plus, Value::Int(x), Value::Int(y)) => Ok(Value::int(x.wrapping_add(*y))),
            (OpCode::Plus, Value::Float(x), Value::Float(y)) => Ok(Value::float(x + y)),
            (OpCode::Plus, Value::String(x), Value::String(y)) => {
                let mut text = x.borrow().clone();
                text.push_str(&y.borrow());
                Ok(Value::string(text))
            }
            (OpCode::Plus, Value::Binary(x), Value::Binary(y)) => {
                let mut bytes = x.borrow().to_vec();
                bytes.extend_from_slice(&y.borrow());
                Ok(Value::binary(&bytes))
            }
            (OpCode::Plus, Value::Raw(x), Value::Raw(y)) => {
                let lines: Vec<String> = x.borrow().iter().chain(y.borrow().iter()).cloned().collect();
                Ok(Value::raw(lines))
            }
            (OpCode::Plus, Value::Tuple(x) | Value::Meta(x), _) => {
                let mut record = x.borrow().copy();

                match &**b {
                    Value::Tuple(y) | Value::Meta(y) => {
                        for attribute in y.borrow().iter() {
                            record.push(Attribute {
                                name: attribute.name.clone(),
                                value: attribute.value.copy(),
                            });
                        }
                    }
                    _ => record.push(Attribute::unnamed(b.copy())),
                }

                Ok(match **a {
                    Value::Meta(_) => Value::meta(record),
                    _ => Value::tuple(record),
                })
            }

            (OpCode::Minus, Value::Int(x), Value::Int(y)) => Ok(Value::int(x.wrapping_sub(*y))),
            (OpCode::Minus, Value::Float(x), Value::Float(y)) => Ok(Value::float(x - y)),
            (OpCode::Minus, Value::String(x), Value::String(y)) => {
                let needle = y.borrow();
                let text = x.borrow();
                if needle.is_empty() {
                    Ok(Value::string(text.as_str()))
                } else {
                    Ok(Value::string(text.replace(needle.as_str(), "")))
                }
            }

            (OpCode::Multiply, Value::Int(x), Value::Int(y)) => Ok(Value::int(x.wrapping_mul(*y))),
            (OpCode::Multiply, Value::Float(x), Value::Float(y)) => Ok(Value::float(x * y)),
            (OpCode::Multiply, Value::String(x), Value::Int(n)) => {
                let times = usize::try_from(*n).unwrap_or(0);
                Ok(Value::string(x.borrow().repeat(times)))
            }

            (OpCode::Divide | OpCode::Mod, Value::Int(_), Value::Int(0)) => Err(ExprError::DivisionByZero),
            (OpCode::Divide, Value::Float(_), Value::Float(y)) if *y == 0.0 => Err(ExprError::DivisionByZero),

            (OpCode::Divide, Value::Int(x), Value::Int(y)) => Ok(Value::int(x.wrapping_div(*y))),
            (OpCode::Divide, Value::Float(x), Value::Float(y)) => Ok(Value::float(x / y)),

            (OpCode::Mod, Value::Int(x), Value::Int(y)) => Ok(Value::int(x.wrapping_rem(*y))),

            (OpCode::Pow, Value::Int(x), Value::Int(y)) => {
                Ok(Value::int((*x as f64).powf(*y as f64) as i64))
            }
            (OpCode::Pow, Value::Float(x), Value::Float(y)) => Ok(Value::float(x.powf(*y))),

            (_, other, _) => Err(mismatch(other)),
        }
    }

    fn membership(needle: &Value, haystack: &Value) -> Result<ValueRef> {
        let found = match (needle, haystack) {
            (Value::Char(c), Value::String(s)) => s.borrow().contains(*c),
            (Value::String(x), Value::String(s)) => s.borrow().contains(x.borrow().as_str()),
            (Value::String(x), Value::Raw(lines)) => {
                let x = x.borrow();
                lines.borrow().iter().any(|line| *line == *x)
            }
            (Value::Name(n), Value::Tuple(t) | Value::Meta(t)) => t.borrow().contains(n.as_str()),
            (_, other) => return Err(mismatch(other)),
        };

        Ok(Value::bool(found))
    }

    /// Regex search.  On success every named group that took part becomes a
    /// string variable.
    fn pattern_match(env: &mut Environment, subject: &Value, pattern: &Value) -> Result<ValueRef> {
        let pattern = pattern.actual_regex()?;

        let captures = match subject {
            Value::String(s) => pattern.captures(&s.borrow()),
            Value::Raw(lines) => lines.borrow().iter().find_map(|line| pattern.captures(line)),
            other => return Err(mismatch(other)),
        };

        match captures {
            Some(groups) => {
                for (name, text) in groups {
                    env.set(&name, Value::string(text));
                }
                Ok(Value::bool(true))
            }
            None => Ok(Value::bool(false)),
        }
    }

    /// Truncate or pad the target in place; padding is spaces for strings and
    /// empty lines for raw values.
    fn resize(env: &mut Environment, a: &ValueRef, b: &ValueRef) -> Result<ValueRef> {
        let target = a.target(env)?;
        let size = usize::try_from(b.target_int(env)?).unwrap_or(0);

        match &*target {
            Value::String(s) => {
                let mut s = s.borrow_mut();
                let length = s.chars().count();

                if size < length {
                    let cut = s.char_indices().nth(size).map_or(s.len(), |(i, _)| i);
                    s.truncate(cut);
                } else {
                    s.extend(std::iter::repeat(' ').take(size - length));
                }
            }
            Value::Raw(lines) => lines.borrow_mut().resize(size, String::new()),
            other => return Err(mismatch(other)),
        }

        Ok(target)
    }

    fn save_to(env: &mut Environment, a: &ValueRef, b: &ValueRef) -> Result<ValueRef> {
        let data = {
            let target = a.target(env)?;
            match &*target {
                Value::String(s) => s.borrow().as_bytes().to_vec(),
                other => other.convert_binary()?,
            }
        };
        let path = b.convert_target_string(env)?;

        status(env.file_system().save(Path::new(&path), &data))
    }

    /// `=`: the left operand must be a variable or reference as written.
    fn assign(env: &mut Environment, lhs: &Node, rhs: &Node) -> Result<ValueRef> {
        let slot = match lhs.literal() {
            Some(v) if matches!(**v, Value::Variable(_) | Value::Reference(_)) => v.clone(),
            Some(v) => return Err(ExprError::unsupported(OpCode::Assign.spelling(), v.kind().name())),
            None => return Err(ExprError::unsupported(OpCode::Assign.spelling(), "expression")),
        };

        let value = rhs.value(env)?;

        let stored = match &*value {
            Value::Variable(name) => env
                .get_actual(name.as_str())
                .ok_or_else(|| ExprError::not_found(name.as_str()))?
                .copy(),
            Value::Reference(r) => env
                .get_path(&r.path, r.context.as_ref())
                .ok_or_else(|| ExprError::not_found(value.to_string()))?
                .copy(),
            _ => {
                let target = value.target(env)?;
                if rhs.is_constant() {
                    target.copy()
                } else {
                    target
                }
            }
        };

        debug!("Assigning {} to {}", stored, slot);

        if let Value::Variable(name) = &*slot {
            env.set(name.as_str(), stored);
        } else if let Value::Reference(r) = &*slot {
            if !env.set_path(&r.path, r.context.as_ref(), stored) {
                return Err(ExprError::not_found(slot.to_string()));
            }
        }

        Ok(slot)
    }

    /// `C[i]`: position in a sized value, or attribute name in a record.
    fn element<F>(env: &mut Environment, a: &ValueRef, b: &ValueRef, text: F) -> Result<ValueRef>
    where
        F: Fn() -> String,
    {
        let collection = a.target(env)?;
        let index = b.target(env)?;

        if let (Value::Tuple(t) | Value::Meta(t), Value::Name(n)) = (&*collection, &*index) {
            return t.borrow().find(n.as_str()).cloned().ok_or_else(|| ExprError::not_found(text()));
        }

        let i = index.actual_int()?;
        let pos = position(i, collection.size()?).ok_or_else(|| ExprError::not_found(text()))?;

        let element = match &*collection {
            Value::String(s) => s.borrow().chars().nth(pos).map(Value::char),
            Value::Binary(bytes) => bytes.borrow().get(pos).map(|byte| Value::int(i64::from(*byte))),
            Value::Raw(lines) => lines.borrow().get(pos).map(|line| Value::string(line.as_str())),
            Value::Tuple(t) | Value::Meta(t) => t.borrow().get(pos).cloned(),
            other => return Err(mismatch(other)),
        };

        element.ok_or_else(|| ExprError::not_found(text()))
    }

    /// Invoke a function value, or a record whose `target` attribute is a
    /// reference to a registered function.  Named argument attributes are
    /// resolved in the caller's scope first.
    fn call(env: &mut Environment, a: &ValueRef, b: &ValueRef) -> Result<ValueRef> {
        let callee = a.target(env)?;

        let function = match &*callee {
            Value::Function(f) => f.clone(),
            Value::Tuple(t) | Value::Meta(t) => {
                let path = {
                    let record = t.borrow();
                    let target = record.find("target").ok_or_else(|| mismatch(&callee))?;
                    target.actual_reference()?.path.clone()
                };
                env.get_function(&path)
                    .ok_or_else(|| ExprError::not_found(format!("${}", path)))?
            }
            other => return Err(mismatch(other)),
        };

        let arguments = {
            let target = b.target(env)?;
            let record = target.actual_record()?;
            record.clone()
        };

        let mut bound = Tuple::new();
        for attribute in arguments.iter() {
            let value = match attribute.name {
                Some(_) => attribute.value.target(env)?,
                None => attribute.value.clone(),
            };
            bound.push(Attribute {
                name: attribute.name.clone(),
                value,
            });
        }

        let result = function.invoke(env, &bound)?;

        Ok(result.unwrap_or_else(|| Value::bool(false)))
    }
}

fn holds(op: OpCode, ordering: Ordering) -> bool {
    match op {
        OpCode::Eq => ordering == Ordering::Equal,
        OpCode::Ne => ordering != Ordering::Equal,
        OpCode::Lt => ordering == Ordering::Less,
        OpCode::Le => ordering != Ordering::Greater,
        OpCode::Gt => ordering == Ordering::Greater,
        OpCode::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ternary operators
// ─────────────────────────────────────────────────────────────────────────────

impl Evaluator {
    /// `C[from:to]`, both ends inclusive.  Strings and binaries take the
    /// ascending range between the two positions; raw lines are reversed when
    /// `from > to`.
    fn slice(env: &mut Environment, a: &ValueRef, b: &ValueRef, c: &ValueRef) -> Result<ValueRef> {
        let collection = a.target(env)?;
        let from = b.target_int(env)?;
        let to = c.target_int(env)?;
        let size = collection.size()?;

        let (Some(from), Some(to)) = (position(from, size), position(to, size)) else {
            return match &*collection {
                Value::String(_) | Value::Binary(_) | Value::Raw(_) => Ok(collection.copy()),
                other => Err(mismatch(other)),
            };
        };

        let (low, high) = (from.min(to), from.max(to));

        match &*collection {
            Value::String(s) => {
                let text: String = s.borrow().chars().skip(low).take(high - low + 1).collect();
                Ok(Value::string(text))
            }
            Value::Binary(bytes) => Ok(Value::binary(&bytes.borrow()[low..=high])),
            Value::Raw(lines) => {
                let lines = lines.borrow();
                let picked: Vec<String> = if from <= to {
                    lines[low..=high].to_vec()
                } else {
                    lines[low..=high].iter().rev().cloned().collect()
                };
                Ok(Value::raw(picked))
            }
            other => Err(mismatch(other)),
        }
    }
}
