//! Binary and unary operators
//!
//! Integer arithmetic is checked: overflow and integer division by zero are
//! `ArithmeticError`s. Mixing an int with a float promotes to float. `+`
//! concatenates when either side is a string, and joins two lists into a new
//! list.

use std::cmp::Ordering;

use super::types::{BinaryOp, Span, Val};
use super::Interpreter;
use crate::errors::{ErrorKind, ScriptError, ScriptResult};

impl Interpreter {
    /// Apply a non-short-circuit binary operator to evaluated operands
    pub fn binary_values(&mut self, op: BinaryOp, left: Val, right: Val, span: Span) -> ScriptResult<Val> {
        match op {
            BinaryOp::Add => add(left, right, span),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                arithmetic(op, &left, &right, span)
            }
            BinaryOp::Eq => Ok(Val::Bool(left == right)),
            BinaryOp::Ne => Ok(Val::Bool(left != right)),
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let ordering = compare(op, &left, &right, span)?;
                Ok(Val::Bool(match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Lte => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            // Short-circuit forms are handled by the evaluator; these only see values
            BinaryOp::And => Ok(if left.is_truthy() { right } else { left }),
            BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
        }
    }

    pub fn negate(&mut self, value: Val, span: Span) -> ScriptResult<Val> {
        match value {
            Val::Int(i) => i.checked_neg().map(Val::Int).ok_or_else(|| overflow(span)),
            Val::Float(x) => Ok(Val::Float(-x)),
            other => Err(ScriptError::type_error(
                format!("bad operand type for unary -: {}", other.type_name()),
                span,
            )),
        }
    }
}

fn add(left: Val, right: Val, span: Span) -> ScriptResult<Val> {
    match (&left, &right) {
        (Val::Str(a), b) => Ok(Val::string(format!("{}{}", a, b))),
        (a, Val::Str(b)) => Ok(Val::string(format!("{}{}", a, b))),
        (Val::List(a), Val::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Val::list(items))
        }
        _ => arithmetic(BinaryOp::Add, &left, &right, span),
    }
}

fn arithmetic(op: BinaryOp, left: &Val, right: &Val, span: Span) -> ScriptResult<Val> {
    match (left, right) {
        (Val::Int(a), Val::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div | BinaryOp::Mod if b == 0 => {
                    return Err(ScriptError::at(
                        ErrorKind::ArithmeticError,
                        if op == BinaryOp::Div {
                            "division by zero"
                        } else {
                            "modulo by zero"
                        },
                        span,
                    ))
                }
                BinaryOp::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result.map(Val::Int).ok_or_else(|| overflow(span))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Val::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            })),
            _ => Err(unsupported(op, left, right, span)),
        },
    }
}

fn compare(op: BinaryOp, left: &Val, right: &Val, span: Span) -> ScriptResult<Ordering> {
    let ordering = match (left, right) {
        (Val::Int(a), Val::Int(b)) => Some(a.cmp(b)),
        (Val::Str(a), Val::Str(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(unsupported(op, left, right, span)),
        },
    };
    // NaN compares false against everything
    Ok(ordering.unwrap_or(match op {
        BinaryOp::Lt | BinaryOp::Lte => Ordering::Greater,
        _ => Ordering::Less,
    }))
}

fn overflow(span: Span) -> ScriptError {
    ScriptError::at(ErrorKind::ArithmeticError, "integer overflow", span)
}

fn unsupported(op: BinaryOp, left: &Val, right: &Val, span: Span) -> ScriptError {
    ScriptError::type_error(
        format!(
            "unsupported operand types for {}: {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
        span,
    )
}
