//! The evaluator: expression and statement tree-walking (distilled spec
//! §4.1 "Evaluator").
//!
//! Grounded on the sibling `litter` crate's `Evaluator`-style recursive
//! walk (one function per `Expr`/`Stmt` shape, dispatched by `match`)
//! rather than this workspace's bytecode-compiler-and-VM engine - the
//! distilled spec is explicit that there is no bytecode and no VM here
//! (§Non-goals). `eval_expr`/`exec_stmt`/`exec_block`/`make_function` are
//! the four entry points the rest of the crate (`invoke.rs`, `classes.rs`,
//! `Sandbox::run`) calls back into.

use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::Sign;
use num_traits::ToPrimitive;
use rustpython_parser::ast::{
    self as ast, BoolOp, Constant, Expr, Ranged, Stmt, StmtFunctionDef,
};

use crate::ctx::{Ctx, ImportResolution};
use crate::env::Env;
use crate::flow::{raise_result, type_error, Outcome, PyResult, Signal};
use crate::invoke;
use crate::operators;
use crate::slice;
use crate::fstring;
use crate::value::{
    dict_get, dict_set, iter_values, set_add, ExceptionData, FunctionBody, FunctionData, Param,
    PyValue,
};

/// Run a statement block in sequence, propagating the first non-`Ok`
/// outcome (a `return`/`break`/`continue`/`raise` signal, or an
/// uncatchable error).
pub fn exec_block(stmts: &[Stmt], env: &Env, ctx: &Ctx) -> PyResult<()> {
    for stmt in stmts {
        exec_stmt(stmt, env, ctx)?;
    }
    Ok(())
}

pub fn exec_stmt(stmt: &Stmt, env: &Env, ctx: &Ctx) -> PyResult<()> {
    ctx.tick()?;
    match stmt {
        Stmt::Expr(s) => {
            eval_expr(&s.value, env, ctx)?;
            Ok(())
        }
        Stmt::Assign(s) => exec_assign(s, env, ctx),
        Stmt::AugAssign(s) => exec_aug_assign(s, env, ctx),
        Stmt::AnnAssign(s) => exec_ann_assign(s, env, ctx),
        Stmt::If(s) => exec_if(s, env, ctx),
        Stmt::While(s) => exec_while(s, env, ctx),
        Stmt::For(s) => exec_for(s, env, ctx),
        Stmt::Return(s) => {
            let value = match &s.value {
                Some(e) => eval_expr(e, env, ctx)?,
                None => PyValue::None,
            };
            Err(Outcome::Signal(Signal::Return(value)))
        }
        Stmt::Break(_) => Err(Outcome::Signal(Signal::Break)),
        Stmt::Continue(_) => Err(Outcome::Signal(Signal::Continue)),
        Stmt::Pass(_) => Ok(()),
        Stmt::FunctionDef(f) => {
            let func = make_function(f, env, ctx)?;
            env.bind_here(f.name.as_str(), func);
            Ok(())
        }
        Stmt::ClassDef(c) => crate::classes::eval_class_def(c, env, ctx),
        Stmt::Try(s) => exec_try(s, env, ctx),
        Stmt::Raise(s) => exec_raise(s, env, ctx),
        Stmt::Assert(s) => exec_assert(s, env, ctx),
        Stmt::Global(s) => {
            for name in &s.names {
                env.declare_global(name.as_str());
            }
            Ok(())
        }
        Stmt::Nonlocal(s) => {
            for name in &s.names {
                if !env.has_enclosing_binding(name.as_str()) {
                    return raise_result(
                        "SyntaxError",
                        format!("no binding for nonlocal '{name}' found"),
                    );
                }
                env.declare_nonlocal(name.as_str());
            }
            Ok(())
        }
        Stmt::Import(s) => exec_import(s, env, ctx),
        Stmt::ImportFrom(s) => exec_import_from(s, env, ctx),
        other => Err(Outcome::Error(crate::error::Error::Unsupported(format!(
            "{other:?}"
        )))),
    }
}

pub fn eval_expr(expr: &Expr, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    ctx.tick()?;
    match expr {
        Expr::Constant(c) => Ok(constant_to_value(&c.value)),
        Expr::Name(n) => eval_name(n.id.as_str(), env, ctx),
        Expr::BinOp(b) => {
            let left = eval_expr(&b.left, env, ctx)?;
            let right = eval_expr(&b.right, env, ctx)?;
            operators::apply_binop(&b.op, &left, &right)
        }
        Expr::UnaryOp(u) => {
            let operand = eval_expr(&u.operand, env, ctx)?;
            operators::apply_unary(u.op, operand)
        }
        Expr::BoolOp(b) => eval_bool_op(b, env, ctx),
        Expr::Compare(c) => eval_compare(c, env, ctx),
        Expr::IfExp(i) => {
            if eval_expr(&i.test, env, ctx)?.is_truthy() {
                eval_expr(&i.body, env, ctx)
            } else {
                eval_expr(&i.orelse, env, ctx)
            }
        }
        Expr::NamedExpr(n) => {
            let value = eval_expr(&n.value, env, ctx)?;
            assign_target(&n.target, value.clone(), env, ctx)?;
            Ok(value)
        }
        Expr::Lambda(l) => make_lambda(l, env, ctx),
        Expr::Call(c) => eval_call(c, env, ctx),
        Expr::Attribute(a) => {
            let value = eval_expr(&a.value, env, ctx)?;
            invoke::get_attr(&value, a.attr.as_str())
        }
        Expr::Subscript(s) => eval_subscript_get(s, env, ctx),
        Expr::List(l) => Ok(PyValue::list(eval_elts(&l.elts, env, ctx)?)),
        Expr::Tuple(t) => Ok(PyValue::tuple(eval_elts(&t.elts, env, ctx)?)),
        Expr::Set(s) => {
            let mut items = Vec::new();
            for el in &s.elts {
                set_add(&mut items, eval_expr(el, env, ctx)?);
            }
            Ok(PyValue::set(items))
        }
        Expr::Dict(d) => eval_dict(d, env, ctx),
        Expr::Starred(s) => eval_expr(&s.value, env, ctx),
        Expr::ListComp(c) => {
            let items = eval_comprehension_items(&c.elt, &c.generators, env, ctx)?;
            Ok(PyValue::list(items))
        }
        Expr::SetComp(c) => {
            let items = eval_comprehension_items(&c.elt, &c.generators, env, ctx)?;
            let mut out = Vec::new();
            for item in items {
                set_add(&mut out, item);
            }
            Ok(PyValue::set(out))
        }
        // Not a true lazily-evaluated generator (async/generators are an
        // explicit Non-goal): materialized eagerly, same as a list comp.
        Expr::GeneratorExp(c) => {
            let items = eval_comprehension_items(&c.elt, &c.generators, env, ctx)?;
            Ok(PyValue::list(items))
        }
        Expr::DictComp(c) => eval_dict_comp(c, env, ctx),
        Expr::JoinedStr(j) => eval_joined_str(j, env, ctx),
        Expr::FormattedValue(f) => Ok(PyValue::Str(render_formatted_value(f, env, ctx)?)),
        Expr::Slice(_) => Err(Outcome::Error(crate::error::Error::Unsupported(
            "slice used outside subscript context".to_string(),
        ))),
        other => Err(Outcome::Error(crate::error::Error::Unsupported(format!(
            "{other:?}"
        )))),
    }
}

fn constant_to_value(c: &Constant) -> PyValue {
    match c {
        Constant::None => PyValue::None,
        Constant::Bool(b) => PyValue::Bool(*b),
        Constant::Int(i) => PyValue::Int(i.to_i64().unwrap_or(match i.sign() {
            Sign::Minus => i64::MIN,
            _ => i64::MAX,
        })),
        Constant::Float(f) => PyValue::Float(*f),
        Constant::Str(s) => PyValue::Str(s.clone()),
        Constant::Bytes(b) => PyValue::list(b.iter().map(|x| PyValue::Int(*x as i64)).collect()),
        Constant::Tuple(items) => PyValue::tuple(items.iter().map(constant_to_value).collect()),
        Constant::Ellipsis | Constant::Complex { .. } => PyValue::None,
    }
}

fn eval_name(name: &str, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    if let Some(v) = env.get(name) {
        return Ok(v);
    }
    if let Some(v) = ctx.get_builtin(name) {
        return Ok(v);
    }
    raise_result("NameError", format!("name '{name}' is not defined"))
}

fn eval_bool_op(b: &ast::ExprBoolOp, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    let mut last = PyValue::None;
    let last_idx = b.values.len().saturating_sub(1);
    for (i, value_expr) in b.values.iter().enumerate() {
        last = eval_expr(value_expr, env, ctx)?;
        let short_circuit = match b.op {
            BoolOp::And => !last.is_truthy(),
            BoolOp::Or => last.is_truthy(),
        };
        if short_circuit || i == last_idx {
            return Ok(last);
        }
    }
    Ok(last)
}

/// Chained comparisons (`a < b <= c`) evaluate each bound once and
/// short-circuit on the first falsy link.
fn eval_compare(c: &ast::ExprCompare, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    let mut left = eval_expr(&c.left, env, ctx)?;
    for (op, right_expr) in c.ops.iter().zip(c.comparators.iter()) {
        let right = eval_expr(right_expr, env, ctx)?;
        if !operators::apply_cmpop(op, &left, &right)? {
            return Ok(PyValue::Bool(false));
        }
        left = right;
    }
    Ok(PyValue::Bool(true))
}

fn eval_elts(elts: &[Expr], env: &Env, ctx: &Ctx) -> PyResult<Vec<PyValue>> {
    let mut out = Vec::new();
    for e in elts {
        if let Expr::Starred(s) = e {
            let v = eval_expr(&s.value, env, ctx)?;
            out.extend(iter_values(&v)?);
        } else {
            out.push(eval_expr(e, env, ctx)?);
        }
    }
    Ok(out)
}

fn eval_dict(d: &ast::ExprDict, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    let mut pairs = Vec::new();
    for (key_opt, value_expr) in d.keys.iter().zip(d.values.iter()) {
        match key_opt {
            Some(key_expr) => {
                let key = eval_expr(key_expr, env, ctx)?;
                if !key.is_hashable() {
                    return type_error("hashable key", key.type_name());
                }
                let value = eval_expr(value_expr, env, ctx)?;
                dict_set(&mut pairs, key, value);
            }
            None => {
                let value = eval_expr(value_expr, env, ctx)?;
                if let PyValue::Dict(other) = value {
                    for (k, v) in other.borrow().iter() {
                        dict_set(&mut pairs, k.clone(), v.clone());
                    }
                } else {
                    return type_error("dict", value.type_name());
                }
            }
        }
    }
    Ok(PyValue::dict(pairs))
}

/// Shared recursive walk for list/set/generator comprehensions: one
/// function handles any number of `for`/`if` clauses, binding each
/// generator's target in its own child scope so later clauses (and the
/// element expression) see the bindings of all the ones before it.
fn eval_comprehension_items(
    elt: &Expr,
    generators: &[ast::Comprehension],
    env: &Env,
    ctx: &Ctx,
) -> PyResult<Vec<PyValue>> {
    let mut out = Vec::new();
    comprehension_recurse(elt, generators, 0, env, ctx, &mut out)?;
    Ok(out)
}

fn comprehension_recurse(
    elt: &Expr,
    generators: &[ast::Comprehension],
    idx: usize,
    env: &Env,
    ctx: &Ctx,
    out: &mut Vec<PyValue>,
) -> PyResult<()> {
    if idx >= generators.len() {
        out.push(eval_expr(elt, env, ctx)?);
        return Ok(());
    }
    let gen = &generators[idx];
    let iterable = eval_expr(&gen.iter, env, ctx)?;
    let items = iter_values(&iterable)?;
    let scope = env.child();
    for item in items {
        ctx.tick()?;
        assign_target(&gen.target, item, &scope, ctx)?;
        let mut admitted = true;
        for cond in &gen.ifs {
            if !eval_expr(cond, &scope, ctx)?.is_truthy() {
                admitted = false;
                break;
            }
        }
        if admitted {
            comprehension_recurse(elt, generators, idx + 1, &scope, ctx, out)?;
        }
    }
    Ok(())
}

fn eval_dict_comp(c: &ast::ExprDictComp, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    let mut pairs = Vec::new();
    dict_comp_recurse(&c.key, &c.value, &c.generators, 0, env, ctx, &mut pairs)?;
    Ok(PyValue::dict(pairs))
}

#[allow(clippy::too_many_arguments)]
fn dict_comp_recurse(
    key_expr: &Expr,
    value_expr: &Expr,
    generators: &[ast::Comprehension],
    idx: usize,
    env: &Env,
    ctx: &Ctx,
    out: &mut Vec<(PyValue, PyValue)>,
) -> PyResult<()> {
    if idx >= generators.len() {
        let key = eval_expr(key_expr, env, ctx)?;
        if !key.is_hashable() {
            return type_error("hashable key", key.type_name());
        }
        let value = eval_expr(value_expr, env, ctx)?;
        dict_set(out, key, value);
        return Ok(());
    }
    let gen = &generators[idx];
    let iterable = eval_expr(&gen.iter, env, ctx)?;
    let items = iter_values(&iterable)?;
    let scope = env.child();
    for item in items {
        ctx.tick()?;
        assign_target(&gen.target, item, &scope, ctx)?;
        let mut admitted = true;
        for cond in &gen.ifs {
            if !eval_expr(cond, &scope, ctx)?.is_truthy() {
                admitted = false;
                break;
            }
        }
        if admitted {
            dict_comp_recurse(key_expr, value_expr, generators, idx + 1, &scope, ctx, out)?;
        }
    }
    Ok(())
}

fn eval_joined_str(j: &ast::ExprJoinedStr, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    let mut out = String::new();
    for part in &j.values {
        match part {
            Expr::Constant(c) => {
                if let Constant::Str(s) = &c.value {
                    out.push_str(s);
                }
            }
            Expr::FormattedValue(f) => out.push_str(&render_formatted_value(f, env, ctx)?),
            other => out.push_str(&eval_expr(other, env, ctx)?.to_print_string()),
        }
    }
    Ok(PyValue::Str(out))
}

fn conversion_char(flag: ast::ConversionFlag) -> Option<char> {
    use ast::ConversionFlag::*;
    match flag {
        None => Option::None,
        Str => Some('s'),
        Repr => Some('r'),
        Ascii => Some('a'),
    }
}

fn render_formatted_value(f: &ast::ExprFormattedValue, env: &Env, ctx: &Ctx) -> PyResult<String> {
    let value = eval_expr(&f.value, env, ctx)?;
    let value = fstring::apply_conversion(&value, conversion_char(f.conversion));
    let spec_text = match &f.format_spec {
        Some(spec_expr) => match eval_expr(spec_expr, env, ctx)? {
            PyValue::Str(s) => s,
            other => other.to_print_string(),
        },
        None => String::new(),
    };
    Ok(fstring::format_value(&value, &spec_text))
}

// --- assignment -------------------------------------------------------

fn exec_assign(s: &ast::StmtAssign, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let value = eval_expr(&s.value, env, ctx)?;
    for target in &s.targets {
        assign_target(target, value.clone(), env, ctx)?;
    }
    Ok(())
}

fn exec_aug_assign(s: &ast::StmtAugAssign, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let current = eval_expr(&s.target, env, ctx)?;
    let rhs = eval_expr(&s.value, env, ctx)?;
    let updated = operators::apply_binop(&s.op, &current, &rhs)?;
    assign_target(&s.target, updated, env, ctx)
}

fn exec_ann_assign(s: &ast::StmtAnnAssign, env: &Env, ctx: &Ctx) -> PyResult<()> {
    match &s.value {
        Some(value_expr) => {
            let value = eval_expr(value_expr, env, ctx)?;
            assign_target(&s.target, value, env, ctx)
        }
        None => Ok(()),
    }
}

fn assign_target(target: &Expr, value: PyValue, env: &Env, ctx: &Ctx) -> PyResult<()> {
    match target {
        Expr::Name(n) => {
            env.set(n.id.as_str(), value);
            Ok(())
        }
        Expr::Attribute(a) => {
            let obj = eval_expr(&a.value, env, ctx)?;
            invoke::set_attr(&obj, a.attr.as_str(), value)
        }
        Expr::Subscript(s) => assign_subscript(s, value, env, ctx),
        Expr::Tuple(t) => assign_unpack(&t.elts, value, env, ctx),
        Expr::List(l) => assign_unpack(&l.elts, value, env, ctx),
        Expr::Starred(s) => assign_target(&s.value, value, env, ctx),
        other => Err(Outcome::Error(crate::error::Error::Unsupported(format!(
            "assignment target {other:?}"
        )))),
    }
}

fn assign_unpack(targets: &[Expr], value: PyValue, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let items = iter_values(&value)?;
    let star_idx = targets.iter().position(|t| matches!(t, Expr::Starred(_)));
    match star_idx {
        None => {
            if items.len() != targets.len() {
                return raise_result(
                    "ValueError",
                    format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    ),
                );
            }
            for (t, v) in targets.iter().zip(items) {
                assign_target(t, v, env, ctx)?;
            }
            Ok(())
        }
        Some(star) => {
            let before = star;
            let after = targets.len() - star - 1;
            if items.len() < before + after {
                return raise_result(
                    "ValueError",
                    format!("not enough values to unpack (expected at least {})", before + after),
                );
            }
            for (t, v) in targets[..before].iter().zip(items.iter().cloned()) {
                assign_target(t, v, env, ctx)?;
            }
            let mid_end = items.len() - after;
            let mid = items[before..mid_end].to_vec();
            assign_target(&targets[star], PyValue::list(mid), env, ctx)?;
            for (t, v) in targets[star + 1..].iter().zip(items[mid_end..].iter().cloned()) {
                assign_target(t, v, env, ctx)?;
            }
            Ok(())
        }
    }
}

fn require_int(v: &PyValue) -> PyResult<i64> {
    match v.as_int() {
        Some(i) => Ok(i),
        None => type_error("int", v.type_name()),
    }
}

fn assign_subscript(s: &ast::ExprSubscript, value: PyValue, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let target = eval_expr(&s.value, env, ctx)?;
    if let Expr::Slice(sl) = s.slice.as_ref() {
        let start = eval_opt_index(&sl.lower, env, ctx)?;
        let stop = eval_opt_index(&sl.upper, env, ctx)?;
        let step = eval_opt_index(&sl.step, env, ctx)?;
        if step.is_some_and(|s| s != 1) {
            return Err(Outcome::Error(crate::error::Error::Unsupported(
                "extended-slice assignment (non-unit step)".to_string(),
            )));
        }
        return match &target {
            PyValue::List(items) => {
                let replacement = iter_values(&value)?;
                let mut items = items.borrow_mut();
                let idx = slice::indices(items.len() as i64, start, stop, Some(1))?;
                let (lo, hi) = match (idx.first(), idx.last()) {
                    (Some(&a), Some(&b)) => (a, b + 1),
                    _ => {
                        let lo = start.unwrap_or(0).clamp(0, items.len() as i64) as usize;
                        (lo, lo)
                    }
                };
                items.splice(lo..hi, replacement);
                Ok(())
            }
            other => type_error("list", other.type_name()),
        };
    }
    let idx = eval_expr(s.slice.as_ref(), env, ctx)?;
    match &target {
        PyValue::List(items) => {
            let i = require_int(&idx)?;
            let len = items.borrow().len();
            match slice::resolve_index(len, i) {
                Some(pos) => {
                    items.borrow_mut()[pos] = value;
                    Ok(())
                }
                None => raise_result("IndexError", "list assignment index out of range"),
            }
        }
        PyValue::Dict(pairs) => {
            if !idx.is_hashable() {
                return type_error("hashable key", idx.type_name());
            }
            dict_set(&mut pairs.borrow_mut(), idx, value);
            Ok(())
        }
        other => raise_result(
            "TypeError",
            format!("'{}' object does not support item assignment", other.type_name()),
        ),
    }
}

// --- subscript / indexing reads ---------------------------------------

fn eval_opt_index(e: &Option<Box<Expr>>, env: &Env, ctx: &Ctx) -> PyResult<Option<i64>> {
    match e {
        None => Ok(None),
        Some(expr) => Ok(Some(require_int(&eval_expr(expr, env, ctx)?)?)),
    }
}

fn eval_subscript_get(s: &ast::ExprSubscript, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    let target = eval_expr(&s.value, env, ctx)?;
    if let Expr::Slice(sl) = s.slice.as_ref() {
        let start = eval_opt_index(&sl.lower, env, ctx)?;
        let stop = eval_opt_index(&sl.upper, env, ctx)?;
        let step = eval_opt_index(&sl.step, env, ctx)?;
        return match &target {
            PyValue::List(items) => slice::slice_list(&items.borrow(), start, stop, step),
            PyValue::Tuple(items) => slice::slice_tuple(items, start, stop, step),
            PyValue::Str(text) => slice::slice_str(text, start, stop, step),
            other => type_error("sliceable", other.type_name()),
        };
    }
    let idx = eval_expr(s.slice.as_ref(), env, ctx)?;
    subscript_index(&target, &idx)
}

fn subscript_index(target: &PyValue, idx: &PyValue) -> PyResult<PyValue> {
    match target {
        PyValue::List(items) => {
            let items = items.borrow();
            let i = require_int(idx)?;
            match slice::resolve_index(items.len(), i) {
                Some(p) => Ok(items[p].clone()),
                None => raise_result("IndexError", "list index out of range"),
            }
        }
        PyValue::Tuple(items) => {
            let i = require_int(idx)?;
            match slice::resolve_index(items.len(), i) {
                Some(p) => Ok(items[p].clone()),
                None => raise_result("IndexError", "tuple index out of range"),
            }
        }
        PyValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = require_int(idx)?;
            match slice::resolve_index(chars.len(), i) {
                Some(p) => Ok(PyValue::Str(chars[p].to_string())),
                None => raise_result("IndexError", "string index out of range"),
            }
        }
        PyValue::Dict(pairs) => {
            if !idx.is_hashable() {
                return type_error("hashable key", idx.type_name());
            }
            match dict_get(&pairs.borrow(), idx) {
                Some(v) => Ok(v),
                None => raise_result("KeyError", crate::value::repr(idx)),
            }
        }
        other => type_error("subscriptable value", other.type_name()),
    }
}

// --- control flow -------------------------------------------------------

fn exec_if(s: &ast::StmtIf, env: &Env, ctx: &Ctx) -> PyResult<()> {
    if eval_expr(&s.test, env, ctx)?.is_truthy() {
        exec_block(&s.body, env, ctx)
    } else {
        exec_block(&s.orelse, env, ctx)
    }
}

fn exec_while(s: &ast::StmtWhile, env: &Env, ctx: &Ctx) -> PyResult<()> {
    loop {
        ctx.tick()?;
        if !eval_expr(&s.test, env, ctx)?.is_truthy() {
            return exec_block(&s.orelse, env, ctx);
        }
        match exec_block(&s.body, env, ctx) {
            Ok(()) => {}
            Err(Outcome::Signal(Signal::Break)) => return Ok(()),
            Err(Outcome::Signal(Signal::Continue)) => {}
            Err(other) => return Err(other),
        }
    }
}

fn exec_for(s: &ast::StmtFor, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let iterable = eval_expr(&s.iter, env, ctx)?;
    let items = iter_values(&iterable)?;
    for item in items {
        ctx.tick()?;
        assign_target(&s.target, item, env, ctx)?;
        match exec_block(&s.body, env, ctx) {
            Ok(()) => {}
            Err(Outcome::Signal(Signal::Break)) => return Ok(()),
            Err(Outcome::Signal(Signal::Continue)) => continue,
            Err(other) => return Err(other),
        }
    }
    exec_block(&s.orelse, env, ctx)
}

fn exec_try(s: &ast::StmtTry, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let body_result = exec_block(&s.body, env, ctx);
    let outcome = match body_result {
        Ok(()) => exec_block(&s.orelse, env, ctx),
        Err(Outcome::Signal(Signal::Raise(exc))) => handle_except(&s.handlers, exc, env, ctx),
        Err(other) => Err(other),
    };
    // `finally` always runs; whatever new signal it produces supersedes
    // whatever was already propagating (distilled spec §4.1 "finally").
    match exec_block(&s.finalbody, env, ctx) {
        Ok(()) => outcome,
        Err(finally_outcome) => Err(finally_outcome),
    }
}

fn handle_except(
    handlers: &[ast::ExceptHandler],
    exc: PyValue,
    env: &Env,
    ctx: &Ctx,
) -> PyResult<()> {
    let exc_data = match &exc {
        PyValue::Exception(e) => e.clone(),
        _ => return Err(Outcome::Signal(Signal::Raise(exc))),
    };
    for handler in handlers {
        let ast::ExceptHandler::ExceptHandler(h) = handler;
        let matched = match &h.type_ {
            None => !is_resource_limit_fault(&exc_data),
            Some(type_expr) => exception_matches(type_expr, &exc_data, env, ctx)?,
        };
        if !matched {
            continue;
        }
        let handler_env = env.child();
        if let Some(name) = &h.name {
            handler_env.bind_here(name.as_str(), exc.clone());
        }
        ctx.push_exception(exc.clone());
        let result = exec_block(&h.body, &handler_env, ctx);
        ctx.pop_exception();
        return result;
    }
    Err(Outcome::Signal(Signal::Raise(exc)))
}

/// Extract the dotted identifier path of an `except` type expression
/// (`module.Err` -> `"module.Err"`) without evaluating it - the runtime
/// never models a real exception-class hierarchy, only the textual tail
/// match the distilled spec calls for (§4.4 "type-tail exception
/// matching").
fn dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(n) => Some(n.id.to_string()),
        Expr::Attribute(a) => {
            let base = dotted_name(&a.value)?;
            Some(format!("{base}.{}", a.attr.as_str()))
        }
        _ => None,
    }
}

fn exception_matches(
    type_expr: &Expr,
    exc: &ExceptionData,
    env: &Env,
    ctx: &Ctx,
) -> PyResult<bool> {
    if let Expr::Tuple(t) = type_expr {
        for el in &t.elts {
            if exception_matches(el, exc, env, ctx)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    if let Some(dotted) = dotted_name(type_expr) {
        let tail = dotted.rsplit('.').next().unwrap_or(&dotted);
        if tail == exc.type_tail() {
            return Ok(true);
        }
        let is_catch_all = tail == "Exception" || tail == "BaseException";
        return Ok(is_catch_all && !is_resource_limit_fault(exc));
    }
    match eval_expr(type_expr, env, ctx)? {
        PyValue::Class(c) => Ok(c.name == exc.type_tail()),
        _ => Ok(false),
    }
}

/// Cancellation, step-limit, and recursion-limit faults are catchable only
/// by their exact type name, never by a bare `except:` or a catch-all
/// `except Exception`/`except BaseException` (spec.md §4.5: these faults
/// are "structurally indistinguishable ... except by their type label").
/// Letting a catch-all swallow them would let a sandboxed script trap
/// cancellation and keep running, defeating the host's one cooperative-
/// cancellation guarantee (§5).
fn is_resource_limit_fault(exc: &ExceptionData) -> bool {
    matches!(
        exc.type_tail(),
        "CancelledError" | "TimeoutError" | "RecursionError"
    )
}

fn exec_raise(s: &ast::StmtRaise, env: &Env, ctx: &Ctx) -> PyResult<()> {
    match &s.exc {
        None => match ctx.current_exception() {
            Some(exc) => Err(Outcome::Signal(Signal::Raise(exc))),
            None => raise_result("RuntimeError", "no active exception to re-raise"),
        },
        Some(exc_expr) => {
            let value = eval_expr(exc_expr, env, ctx)?;
            let exc = to_exception(value, ctx)?;
            Err(Outcome::Signal(Signal::Raise(exc)))
        }
    }
}

fn to_exception(value: PyValue, ctx: &Ctx) -> PyResult<PyValue> {
    match value {
        PyValue::Exception(_) => Ok(value),
        PyValue::NativeFunction(_) | PyValue::Builtin(_) => {
            invoke::call_value(&value, Vec::new(), Vec::new(), ctx)
        }
        other => raise_result(
            "TypeError",
            format!("exceptions must derive from BaseException, not {}", other.type_name()),
        ),
    }
}

fn exec_assert(s: &ast::StmtAssert, env: &Env, ctx: &Ctx) -> PyResult<()> {
    if eval_expr(&s.test, env, ctx)?.is_truthy() {
        return Ok(());
    }
    let message = match &s.msg {
        Some(m) => eval_expr(m, env, ctx)?.to_print_string(),
        None => String::new(),
    };
    Err(Outcome::Signal(Signal::Raise(PyValue::exception(
        "AssertionError",
        message,
    ))))
}

// --- calls ---------------------------------------------------------------

fn eval_call(c: &ast::ExprCall, env: &Env, ctx: &Ctx) -> PyResult<PyValue> {
    if let Expr::Name(n) = c.func.as_ref() {
        if n.id.as_str() == "super" && c.args.is_empty() && c.keywords.is_empty() {
            return eval_super_call(env);
        }
    }
    let (args, kwargs) = eval_call_args(&c.args, &c.keywords, env, ctx)?;
    if let Expr::Attribute(attr) = c.func.as_ref() {
        let receiver = eval_expr(&attr.value, env, ctx)?;
        return eval_method_call(&receiver, attr.attr.as_str(), args, kwargs, ctx);
    }
    let callee = eval_expr(&c.func, env, ctx)?;
    invoke::call_value(&callee, args, kwargs, ctx)
}

fn eval_call_args(
    arg_exprs: &[Expr],
    keywords: &[ast::Keyword],
    env: &Env,
    ctx: &Ctx,
) -> PyResult<(Vec<PyValue>, Vec<(String, PyValue)>)> {
    let mut args = Vec::new();
    for a in arg_exprs {
        if let Expr::Starred(s) = a {
            let value = eval_expr(&s.value, env, ctx)?;
            args.extend(iter_values(&value)?);
        } else {
            args.push(eval_expr(a, env, ctx)?);
        }
    }
    let mut kwargs = Vec::new();
    for kw in keywords {
        match &kw.arg {
            Some(name) => kwargs.push((name.to_string(), eval_expr(&kw.value, env, ctx)?)),
            None => {
                let value = eval_expr(&kw.value, env, ctx)?;
                if let PyValue::Dict(pairs) = value {
                    for (k, v) in pairs.borrow().iter() {
                        if let PyValue::Str(s) = k {
                            kwargs.push((s.clone(), v.clone()));
                        }
                    }
                } else {
                    return type_error("dict", "non-dict");
                }
            }
        }
    }
    Ok((args, kwargs))
}

fn eval_method_call(
    receiver: &PyValue,
    name: &str,
    args: Vec<PyValue>,
    kwargs: Vec<(String, PyValue)>,
    ctx: &Ctx,
) -> PyResult<PyValue> {
    let kw = crate::kwargs::Kwargs::new(kwargs.clone());
    match receiver {
        PyValue::Str(s) => crate::methods::call_str_method(s, name, &args, &kw),
        PyValue::List(items) => crate::methods::call_list_method(items, name, &args, &kw, ctx),
        PyValue::Tuple(items) => crate::methods::call_tuple_method(items, name, &args),
        PyValue::Dict(pairs) => crate::methods::call_dict_method(pairs, name, &args, &kw),
        PyValue::Set(items) => crate::methods::call_set_method(items, name, &args),
        // `dict` has no instance to dispatch through for this one - it's
        // reached as `dict.fromkeys(...)`, called on the builtin itself.
        PyValue::NativeFunction(n) if n.name == "dict" && name == "fromkeys" => {
            crate::methods::dict_fromkeys(&args)
        }
        _ => {
            let attr = invoke::get_attr(receiver, name)?;
            invoke::call_value(&attr, args, kwargs, ctx)
        }
    }
}

fn eval_super_call(env: &Env) -> PyResult<PyValue> {
    let owner = match env.get("__class__") {
        Some(PyValue::Class(c)) => c,
        _ => return raise_result("TypeError", "super(): no current class (not inside a method)"),
    };
    let instance = match env.get("__self__") {
        Some(v) => v,
        None => return raise_result("TypeError", "super(): no self argument"),
    };
    crate::classes::make_super(&owner, instance)
}

// --- function / lambda construction --------------------------------------

fn collect_params(args: &ast::Arguments) -> Vec<Param> {
    // Positional-only, plain, and keyword-only parameters are flattened
    // into one list; this runtime does not enforce the positional-only /
    // keyword-only distinction (documented simplification, DESIGN.md).
    args.posonlyargs
        .iter()
        .chain(args.args.iter())
        .chain(args.kwonlyargs.iter())
        .map(|a| Param {
            name: a.def.arg.to_string(),
            default: a.default.as_ref().map(|d| (**d).clone()),
        })
        .collect()
}

pub fn make_function(f: &StmtFunctionDef, env: &Env, _ctx: &Ctx) -> PyResult<PyValue> {
    Ok(PyValue::Function(Rc::new(FunctionData {
        name: Some(f.name.to_string()),
        params: collect_params(&f.args),
        vararg: f.args.vararg.as_ref().map(|a| a.arg.to_string()),
        kwarg: f.args.kwarg.as_ref().map(|a| a.arg.to_string()),
        body: FunctionBody::Block(f.body.clone()),
        closure: env.clone(),
        owner: RefCell::new(None),
    })))
}

fn make_lambda(l: &ast::ExprLambda, env: &Env, _ctx: &Ctx) -> PyResult<PyValue> {
    Ok(PyValue::Function(Rc::new(FunctionData {
        name: None,
        params: collect_params(&l.args),
        vararg: l.args.vararg.as_ref().map(|a| a.arg.to_string()),
        kwarg: l.args.kwarg.as_ref().map(|a| a.arg.to_string()),
        body: FunctionBody::Expr(l.body.clone()),
        closure: env.clone(),
        owner: RefCell::new(None),
    })))
}

// --- import ---------------------------------------------------------------

fn exec_import(s: &ast::StmtImport, env: &Env, ctx: &Ctx) -> PyResult<()> {
    for alias in &s.names {
        let module_name = alias.name.as_str();
        let binding_name = alias.asname.as_ref().map(|a| a.as_str()).unwrap_or(module_name);
        match ctx.resolve_import(module_name) {
            ImportResolution::Found(value) => {
                env.bind_here(binding_name, value);
            }
            ImportResolution::NotFound => {
                return raise_result("ImportError", format!("no module named '{module_name}'"));
            }
        }
    }
    Ok(())
}

fn exec_import_from(s: &ast::StmtImportFrom, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let module_name = match &s.module {
        Some(m) => m.as_str(),
        None => return raise_result("ImportError", "relative imports are not supported"),
    };
    let module = match ctx.resolve_import(module_name) {
        ImportResolution::Found(value) => value,
        ImportResolution::NotFound => {
            return raise_result("ImportError", format!("no module named '{module_name}'"));
        }
    };
    for alias in &s.names {
        let item_name = alias.name.as_str();
        let binding_name = alias.asname.as_ref().map(|a| a.as_str()).unwrap_or(item_name);
        let value = invoke::get_attr(&module, item_name)?;
        env.bind_here(binding_name, value);
    }
    Ok(())
}

/// 1-based source line a node starts on, if source text was registered
/// with the [`Ctx`] (§6.1 "errors carry a source line").
#[allow(dead_code)]
fn line_of<T: Ranged>(ctx: &Ctx, node: &T) -> Option<usize> {
    ctx.line_of(u32::from(node.range().start()))
}
