//! Operator semantics.
//!
//! The interpreter short-circuits `and`/`or` itself; every other operator
//! (and compound assignment, which reuses this table) lands here with both
//! operands already evaluated.

use std::cmp::Ordering;

use crate::error::RadError;

use super::ast::{BinOp, UnaryOp};
use super::value::Value;

fn invalid(op: BinOp, lhs: &Value, rhs: &Value) -> RadError {
    RadError::type_mismatch(format!(
        "invalid operand types for '{}': {} and {}",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

/// Both operands as floats, if both are numbers and at least one is a float.
fn promote(lhs: &Value, rhs: &Value) -> Option<(f64, f64)> {
    match (lhs, rhs) {
        (Value::Float(a), Value::Float(b)) => Some((*a, *b)),
        (Value::Int(a), Value::Float(b)) => Some((*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some((*a, *b as f64)),
        _ => None,
    }
}

pub fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, RadError> {
    match op {
        BinOp::Add => add(lhs, rhs),
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => arith(op, lhs, rhs),
        BinOp::Gt | BinOp::Ge | BinOp::Lt | BinOp::Le => {
            let ord = compare(lhs, rhs).ok_or_else(|| invalid(op, lhs, rhs))?;
            Ok(Value::Bool(match op {
                BinOp::Gt => ord == Ordering::Greater,
                BinOp::Ge => ord != Ordering::Less,
                BinOp::Lt => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            }))
        }
        BinOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinOp::In => contains(op, rhs, lhs).map(Value::Bool),
        BinOp::NotIn => contains(op, rhs, lhs).map(|b| Value::Bool(!b)),
        BinOp::And => Ok(if lhs.is_truthy() { rhs.clone() } else { lhs.clone() }),
        BinOp::Or => Ok(if lhs.is_truthy() { lhs.clone() } else { rhs.clone() }),
    }
}

fn add(lhs: &Value, rhs: &Value) -> Result<Value, RadError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a.concat(b))),
        (Value::Str(a), Value::Int(_) | Value::Float(_) | Value::Bool(_)) => {
            let mut out = a.clone();
            out.push_str(&rhs.to_string());
            Ok(Value::Str(out))
        }
        (Value::List(a), Value::List(b)) => {
            let mut items = a.to_vec();
            items.extend(b.to_vec());
            Ok(Value::list(items))
        }
        _ => match promote(lhs, rhs) {
            Some((a, b)) => Ok(Value::Float(a + b)),
            None => Err(invalid(BinOp::Add, lhs, rhs)),
        },
    }
}

fn arith(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, RadError> {
    if let (BinOp::Mul, Value::Str(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Str(s)) = (op, lhs, rhs) {
        return Ok(Value::Str(s.repeat(*n)));
    }
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let (a, b) = (*a, *b);
        return match op {
            BinOp::Sub => Ok(Value::Int(a.wrapping_sub(b))),
            BinOp::Mul => Ok(Value::Int(a.wrapping_mul(b))),
            _ if b == 0 => Err(RadError::DivideByZero),
            BinOp::Div => Ok(Value::Float(a as f64 / b as f64)),
            _ => Ok(Value::Int(a.wrapping_rem(b))),
        };
    }
    let (a, b) = promote(lhs, rhs).ok_or_else(|| invalid(op, lhs, rhs))?;
    match op {
        BinOp::Sub => Ok(Value::Float(a - b)),
        BinOp::Mul => Ok(Value::Float(a * b)),
        _ if b == 0.0 => Err(RadError::DivideByZero),
        BinOp::Div => Ok(Value::Float(a / b)),
        _ => Ok(Value::Float(a % b)),
    }
}

/// Ordering for the comparison operators: numbers numerically, strings by
/// plain text.  `None` for anything else (and for NaN).
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => promote(lhs, rhs).and_then(|(a, b)| a.partial_cmp(&b)),
    }
}

/// `needle in haystack`.
fn contains(op: BinOp, haystack: &Value, needle: &Value) -> Result<bool, RadError> {
    match (haystack, needle) {
        (Value::Str(h), Value::Str(n)) => Ok(h.plain().contains(&n.plain())),
        (Value::Str(h), Value::Int(_) | Value::Float(_)) => Ok(h.plain().contains(&needle.to_string())),
        (Value::List(items), _) => Ok(items.borrow().iter().any(|v| v == needle)),
        (Value::Map(m), _) => m.contains_key(needle),
        _ => Err(invalid(op, needle, haystack)),
    }
}

pub fn unary(op: UnaryOp, v: &Value) -> Result<Value, RadError> {
    match (op, v) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Plus, Value::Int(_) | Value::Float(_)) => Ok(v.clone()),
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Incr, Value::Int(n)) => Ok(Value::Int(n.wrapping_add(1))),
        (UnaryOp::Incr, Value::Float(x)) => Ok(Value::Float(x + 1.0)),
        (UnaryOp::Decr, Value::Int(n)) => Ok(Value::Int(n.wrapping_sub(1))),
        (UnaryOp::Decr, Value::Float(x)) => Ok(Value::Float(x - 1.0)),
        _ => Err(RadError::type_mismatch(format!(
            "invalid operand type for '{}': {}",
            op.symbol(),
            v.type_name()
        ))),
    }
}
