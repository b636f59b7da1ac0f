//! Binary, unary, and comparison operators (distilled spec §4.1).
//!
//! Grounded on the sibling sandbox crate's `operators.rs` shape (dispatch
//! by left-operand type, one `match` per operator family) but rewritten
//! against `rustpython_parser::ast::{Operator, UnaryOp, CmpOp}` and the
//! `Rc<RefCell<_>>`-backed container model, and expanded with the
//! `Exception`-raising behavior (`ZeroDivisionError`, bitwise-on-non-int
//! `TypeError`s, negative shift counts) the distilled spec requires.

use rustpython_parser::ast::{CmpOp, Operator, UnaryOp};

use crate::flow::{raise_result, type_error, PyResult};
use crate::value::{dict_get, set_contains, PyValue};

pub fn apply_unary(op: UnaryOp, operand: PyValue) -> PyResult<PyValue> {
    match op {
        UnaryOp::Not => Ok(PyValue::Bool(!operand.is_truthy())),
        UnaryOp::USub => match operand {
            PyValue::Int(i) => Ok(PyValue::Int(i.wrapping_neg())),
            PyValue::Float(f) => Ok(PyValue::Float(-f)),
            PyValue::Bool(b) => Ok(PyValue::Int(-(b as i64))),
            other => type_error("int or float", other.type_name()),
        },
        UnaryOp::UAdd => match operand {
            PyValue::Int(_) | PyValue::Float(_) => Ok(operand),
            PyValue::Bool(b) => Ok(PyValue::Int(b as i64)),
            other => type_error("int or float", other.type_name()),
        },
        UnaryOp::Invert => match operand {
            PyValue::Int(i) => Ok(PyValue::Int(!i)),
            PyValue::Bool(b) => Ok(PyValue::Int(!(b as i64))),
            other => type_error("int", other.type_name()),
        },
    }
}

/// Python truncating-toward-negative-infinity floor division/modulo for
/// integers (distilled spec §4.1: "`//` on integers yields Integer
/// (truncating toward -infinity...)").
pub(crate) fn int_floordiv(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

pub(crate) fn int_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

/// Coerce to a numeric payload: `Some(int-if-integral, as-float)`.
fn as_num(v: &PyValue) -> Option<(Option<i64>, f64)> {
    match v {
        PyValue::Int(i) => Some((Some(*i), *i as f64)),
        PyValue::Bool(b) => Some((Some(*b as i64), *b as i64 as f64)),
        PyValue::Float(f) => Some((None, *f)),
        _ => None,
    }
}

fn mismatch_name(left: &PyValue, right: &PyValue) -> &'static str {
    if as_num(left).is_some() {
        right.type_name()
    } else {
        left.type_name()
    }
}

pub fn apply_binop(op: &Operator, left: &PyValue, right: &PyValue) -> PyResult<PyValue> {
    use PyValue::*;

    match op {
        Operator::Add => match (left, right) {
            (Str(a), Str(b)) => Ok(Str(format!("{a}{b}"))),
            (List(a), List(b)) => {
                let mut out = a.borrow().clone();
                out.extend(b.borrow().iter().cloned());
                Ok(PyValue::list(out))
            }
            (Tuple(a), Tuple(b)) => {
                let mut out = (**a).clone();
                out.extend(b.iter().cloned());
                Ok(PyValue::tuple(out))
            }
            _ => numeric_binop(left, right, "+"),
        },
        Operator::Sub => numeric_binop(left, right, "-"),
        Operator::Mult => match (left, right) {
            (Str(s), Int(n)) | (Int(n), Str(s)) => Ok(Str(repeat_str(s, *n))),
            (Str(s), Bool(b)) | (Bool(b), Str(s)) => Ok(Str(repeat_str(s, *b as i64))),
            (List(items), Int(n)) | (Int(n), List(items)) => {
                Ok(PyValue::list(repeat_vec(&items.borrow(), *n)))
            }
            (Tuple(items), Int(n)) | (Int(n), Tuple(items)) => {
                Ok(PyValue::tuple(repeat_vec(items, *n)))
            }
            _ => numeric_binop(left, right, "*"),
        },
        Operator::Div => match (as_num(left), as_num(right)) {
            (Some((_, a)), Some((_, b))) => {
                if b == 0.0 {
                    raise_result("ZeroDivisionError", "division by zero")
                } else {
                    Ok(Float(a / b))
                }
            }
            _ => type_error("int or float", mismatch_name(left, right)),
        },
        Operator::FloorDiv => match (as_num(left), as_num(right)) {
            (Some((Some(a), _)), Some((Some(b), _))) => {
                if b == 0 {
                    raise_result("ZeroDivisionError", "integer division or modulo by zero")
                } else {
                    Ok(Int(int_floordiv(a, b)))
                }
            }
            (Some((_, a)), Some((_, b))) => {
                if b == 0.0 {
                    raise_result("ZeroDivisionError", "float floor division by zero")
                } else {
                    Ok(Float((a / b).floor()))
                }
            }
            _ => type_error("int or float", mismatch_name(left, right)),
        },
        Operator::Mod => match (as_num(left), as_num(right)) {
            (Some((Some(a), _)), Some((Some(b), _))) => {
                if b == 0 {
                    raise_result("ZeroDivisionError", "integer division or modulo by zero")
                } else {
                    Ok(Int(int_mod(a, b)))
                }
            }
            (Some((_, a)), Some((_, b))) => {
                if b == 0.0 {
                    raise_result("ZeroDivisionError", "float modulo")
                } else {
                    Ok(Float(a - b * (a / b).floor()))
                }
            }
            _ => type_error("int or float", mismatch_name(left, right)),
        },
        Operator::Pow => match (as_num(left), as_num(right)) {
            (Some((Some(a), _)), Some((Some(b), _))) if b >= 0 => {
                Ok(Int(a.wrapping_pow(b as u32)))
            }
            (Some((_, a)), Some((_, b))) => Ok(Float(a.powf(b))),
            _ => type_error("int or float", mismatch_name(left, right)),
        },
        Operator::LShift | Operator::RShift => match (left.as_int(), right.as_int()) {
            (Some(a), Some(b)) if matches!(left, Int(_) | Bool(_)) && matches!(right, Int(_) | Bool(_)) => {
                if b < 0 {
                    return raise_result("ValueError", "negative shift count");
                }
                let shifted = if matches!(op, Operator::LShift) {
                    if b >= 64 { 0 } else { a.wrapping_shl(b as u32) }
                } else if b >= 64 {
                    if a < 0 { -1 } else { 0 }
                } else {
                    a.wrapping_shr(b as u32)
                };
                Ok(Int(shifted))
            }
            _ => type_error("int", mismatch_name(left, right)),
        },
        Operator::BitAnd | Operator::BitOr | Operator::BitXor => {
            match (left, right) {
                (Int(a) | Bool(_), Int(_) | Bool(_)) => {
                    let a = if let Bool(b) = left { *b as i64 } else { *a };
                    let b = match right {
                        Int(b) => *b,
                        Bool(b) => *b as i64,
                        _ => unreachable!(),
                    };
                    Ok(Int(match op {
                        Operator::BitAnd => a & b,
                        Operator::BitOr => a | b,
                        Operator::BitXor => a ^ b,
                        _ => unreachable!(),
                    }))
                }
                _ => type_error("int", mismatch_name(left, right)),
            }
        }
        Operator::MatMult => type_error("numeric operands", mismatch_name(left, right)),
    }
}

fn numeric_binop(left: &PyValue, right: &PyValue, op: &str) -> PyResult<PyValue> {
    match (as_num(left), as_num(right)) {
        (Some((Some(a), _)), Some((Some(b), _))) => Ok(PyValue::Int(match op {
            "+" => a.wrapping_add(b),
            "-" => a.wrapping_sub(b),
            "*" => a.wrapping_mul(b),
            _ => unreachable!(),
        })),
        (Some((_, a)), Some((_, b))) => Ok(PyValue::Float(match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            _ => unreachable!(),
        })),
        _ => type_error("int or float", mismatch_name(left, right)),
    }
}

fn repeat_str(s: &str, n: i64) -> String {
    if n <= 0 {
        String::new()
    } else {
        s.repeat(n as usize)
    }
}

fn repeat_vec(items: &[PyValue], n: i64) -> Vec<PyValue> {
    if n <= 0 {
        Vec::new()
    } else {
        let mut out = Vec::with_capacity(items.len() * n as usize);
        for _ in 0..n {
            out.extend(items.iter().cloned());
        }
        out
    }
}

/// One link of a (possibly chained) comparison: `a OP b`. Chained
/// comparisons evaluate each bound once and short-circuit on the first
/// falsy link (distilled spec §4.1, §8.1 property 3); the caller
/// (evaluator) handles the chaining/short-circuit, this just evaluates a
/// single link.
pub fn apply_cmpop(op: &CmpOp, left: &PyValue, right: &PyValue) -> PyResult<bool> {
    match op {
        CmpOp::Eq => Ok(left == right),
        CmpOp::NotEq => Ok(left != right),
        CmpOp::Is => Ok(left.is_same(right)),
        CmpOp::IsNot => Ok(!left.is_same(right)),
        CmpOp::In => contains(left, right),
        CmpOp::NotIn => contains(left, right).map(|b| !b),
        CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => ordering_cmp(op, left, right),
    }
}

fn ordering_cmp(op: &CmpOp, left: &PyValue, right: &PyValue) -> PyResult<bool> {
    use std::cmp::Ordering;
    let ord = match (left, right) {
        (PyValue::Str(a), PyValue::Str(b)) => a.partial_cmp(b),
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    let ord = match ord {
        Some(o) => o,
        None => return type_error("comparable operands", mismatch_name(left, right)),
    };
    Ok(match op {
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::LtE => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::GtE => ord != Ordering::Less,
        _ => unreachable!(),
    })
}

fn contains(left: &PyValue, right: &PyValue) -> PyResult<bool> {
    match right {
        PyValue::Str(hay) => match left {
            PyValue::Str(needle) => Ok(hay.contains(needle.as_str())),
            other => type_error("str", other.type_name()),
        },
        PyValue::List(items) => Ok(set_contains(&items.borrow(), left)),
        PyValue::Tuple(items) => Ok(set_contains(items, left)),
        PyValue::Set(items) => Ok(set_contains(&items.borrow(), left)),
        PyValue::Dict(pairs) => Ok(dict_get(&pairs.borrow(), left).is_some()),
        other => type_error("a container", other.type_name()),
    }
}
