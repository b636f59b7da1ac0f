//! The invocation engine: parameter binding and call dispatch (distilled
//! spec §4.2 "Invocation engine").
//!
//! One call path handles every callable kind - `Function`, `NativeFunction`,
//! `Builtin`, `Class` (construction), and `BoundMethod` - rather than the
//! evaluator special-casing each at the call site. Attribute access is
//! unified the same way: [`get_attr`] is the single place that knows how a
//! field on an instance shadows an inherited method, how a method becomes
//! bound, and how `super()` walks the chain.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::ctx::Ctx;
use crate::flow::{raise_result, Outcome, PyResult, Signal};
use crate::kwargs::Kwargs;
use crate::value::{
    BoundMethodData, ClassData, FunctionBody, FunctionData, InstanceData, PyValue,
};

/// Bind a call's positional/keyword arguments into `call_env` per the
/// parameter-binding algorithm of §4.2: positionals fill left to right,
/// extras go to `*args` (or are a `TypeError` without one); keyword
/// arguments fill the matching named parameter or go to `**kwargs` (or are
/// a `TypeError` without one); anything still unbound falls back to its
/// default, re-evaluated in the function's *defining* environment (an
/// explicit, documented Open Question resolution - see DESIGN.md).
pub fn bind_params(
    func: &FunctionData,
    args: Vec<PyValue>,
    kwargs: Vec<(String, PyValue)>,
    call_env: &crate::env::Env,
    ctx: &Ctx,
) -> PyResult<()> {
    let fname = || func.name.as_deref().unwrap_or("<lambda>");
    let mut bound: HashSet<String> = HashSet::new();
    let nparams = func.params.len();
    let npos = args.len().min(nparams);

    for (param, value) in func.params.iter().zip(args.iter()).take(npos) {
        call_env.bind_here(&param.name, value.clone());
        bound.insert(param.name.clone());
    }

    let leftover = &args[npos..];
    if !leftover.is_empty() {
        match &func.vararg {
            Some(name) => {
                call_env.bind_here(name, PyValue::tuple(leftover.to_vec()));
                bound.insert(name.clone());
            }
            None => {
                return raise_result(
                    "TypeError",
                    format!(
                        "{}() takes {} positional argument(s) but {} were given",
                        fname(),
                        nparams,
                        args.len()
                    ),
                );
            }
        }
    } else if let Some(name) = &func.vararg {
        call_env.bind_here(name, PyValue::tuple(Vec::new()));
        bound.insert(name.clone());
    }

    let mut extra_kwargs = Vec::new();
    for (name, value) in kwargs {
        if bound.contains(&name) {
            return raise_result(
                "TypeError",
                format!("{}() got multiple values for argument '{}'", fname(), name),
            );
        }
        if func.params.iter().any(|p| p.name == name) {
            call_env.bind_here(&name, value);
            bound.insert(name);
        } else {
            extra_kwargs.push((name, value));
        }
    }
    if !extra_kwargs.is_empty() {
        match &func.kwarg {
            Some(name) => {
                let pairs = extra_kwargs
                    .into_iter()
                    .map(|(k, v)| (PyValue::Str(k), v))
                    .collect();
                call_env.bind_here(name, PyValue::dict(pairs));
                bound.insert(name.clone());
            }
            None => {
                return raise_result(
                    "TypeError",
                    format!(
                        "{}() got an unexpected keyword argument '{}'",
                        fname(),
                        extra_kwargs[0].0
                    ),
                );
            }
        }
    } else if let Some(name) = &func.kwarg {
        call_env.bind_here(name, PyValue::dict(Vec::new()));
        bound.insert(name.clone());
    }

    for param in &func.params {
        if bound.contains(&param.name) {
            continue;
        }
        match &param.default {
            Some(expr) => {
                let value = crate::eval::eval_expr(expr, &func.closure, ctx)?;
                call_env.bind_here(&param.name, value);
            }
            None => {
                return raise_result(
                    "TypeError",
                    format!(
                        "{}() missing required argument: '{}'",
                        fname(),
                        param.name
                    ),
                );
            }
        }
    }
    Ok(())
}

/// Call anything callable: a user function, a native/host builtin, a class
/// (construction), or a bound method.
pub fn call_value(
    callee: &PyValue,
    args: Vec<PyValue>,
    kwargs: Vec<(String, PyValue)>,
    ctx: &Ctx,
) -> PyResult<PyValue> {
    match callee {
        PyValue::Function(f) => call_function(f, args, kwargs, ctx),
        PyValue::NativeFunction(n) => (n.func)(ctx, args, Kwargs::new(kwargs)),
        PyValue::Builtin(b) => {
            ctx.tick()?;
            Ok((b.func)(&args))
        }
        PyValue::Class(c) => instantiate(c, args, kwargs, ctx),
        PyValue::BoundMethod(m) => {
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push(m.receiver.clone());
            full_args.extend(args);
            call_value(&m.method, full_args, kwargs, ctx)
        }
        other => raise_result(
            "TypeError",
            format!("'{}' object is not callable", other.type_name()),
        ),
    }
}

fn call_function(
    f: &Rc<FunctionData>,
    args: Vec<PyValue>,
    kwargs: Vec<(String, PyValue)>,
    ctx: &Ctx,
) -> PyResult<PyValue> {
    ctx.tick()?;
    let _guard = ctx.enter_call(f.name.as_deref())?;
    let call_env = f.closure.child();
    bind_params(f, args, kwargs, &call_env, ctx)?;
    if let Some(owner) = f.owner.borrow().clone() {
        // Stashed so a zero-arg `super()` inside the body can find its
        // anchor class and receiver without the evaluator threading them
        // through every call.
        call_env.bind_here("__class__", PyValue::Class(owner));
        if let Some(first) = f.params.first() {
            if let Some(self_value) = call_env.get(&first.name) {
                call_env.bind_here("__self__", self_value);
            }
        }
    }
    match &f.body {
        FunctionBody::Expr(e) => crate::eval::eval_expr(e, &call_env, ctx),
        FunctionBody::Block(stmts) => match crate::eval::exec_block(stmts, &call_env, ctx) {
            Ok(()) => Ok(PyValue::None),
            Err(Outcome::Signal(Signal::Return(v))) => Ok(v),
            Err(other) => Err(other),
        },
    }
}

/// `ClassName(args)`: allocate an instance and run `__init__` if the class
/// (or a base) defines one. The constructor's return value is discarded -
/// like Python, `__init__` is expected to return `None`.
pub fn instantiate(
    class: &Rc<ClassData>,
    args: Vec<PyValue>,
    kwargs: Vec<(String, PyValue)>,
    ctx: &Ctx,
) -> PyResult<PyValue> {
    let instance = Rc::new(InstanceData {
        class: class.clone(),
        attrs: RefCell::new(HashMap::new()),
    });
    if let Some(PyValue::Function(init)) = class.resolve("__init__") {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(PyValue::Instance(instance.clone()));
        full_args.extend(args);
        call_function(&init, full_args, kwargs, ctx)?;
    }
    Ok(PyValue::Instance(instance))
}

/// Resolve `value.name` for the class/instance/module/super kinds; string,
/// list, dict, set, and tuple attribute access instead goes through the
/// method-dispatch tables in `methods.rs`, looked up directly by the
/// evaluator at the call site rather than through this generic path.
pub fn get_attr(value: &PyValue, name: &str) -> PyResult<PyValue> {
    match value {
        PyValue::Instance(inst) => {
            if let Some(v) = inst.attrs.borrow().get(name) {
                return Ok(v.clone());
            }
            match inst.class.resolve(name) {
                Some(PyValue::Function(f)) => Ok(PyValue::BoundMethod(Rc::new(BoundMethodData {
                    receiver: value.clone(),
                    method: PyValue::Function(f),
                }))),
                Some(other) => Ok(other),
                // Distilled spec §3.3: an instance attribute miss yields
                // `None` rather than an `AttributeError` - "intentionally
                // non-raising for probes", matching the `Dict`/indexing
                // miss convention rather than ordinary Python's attribute
                // lookup (see DESIGN.md).
                None => Ok(PyValue::None),
            }
        }
        PyValue::Class(c) => match c.resolve(name) {
            Some(v) => Ok(v),
            None => raise_result(
                "AttributeError",
                format!("type object '{}' has no attribute '{}'", c.name, name),
            ),
        },
        PyValue::Super(s) => match crate::classes::super_getattr(s, name) {
            Some(PyValue::Function(f)) => Ok(PyValue::BoundMethod(Rc::new(BoundMethodData {
                receiver: s.instance.clone(),
                method: PyValue::Function(f),
            }))),
            Some(other) => Ok(other),
            None => raise_result(
                "AttributeError",
                format!("'super' object has no attribute '{}'", name),
            ),
        },
        PyValue::Module(m) => match m.attrs.iter().find(|(k, _)| k == name) {
            Some((_, v)) => Ok(v.clone()),
            None => raise_result(
                "AttributeError",
                format!("module '{}' has no attribute '{}'", m.name, name),
            ),
        },
        PyValue::Exception(e) => match name {
            "args" => Ok(PyValue::tuple(vec![PyValue::Str(e.message.clone())])),
            _ => raise_result(
                "AttributeError",
                format!("'{}' object has no attribute '{}'", e.type_tail(), name),
            ),
        },
        other => raise_result(
            "AttributeError",
            format!("'{}' object has no attribute '{}'", other.type_name(), name),
        ),
    }
}

/// Set `value.name = new_value`; only instances carry mutable attributes.
pub fn set_attr(value: &PyValue, name: &str, new_value: PyValue) -> PyResult<()> {
    match value {
        PyValue::Instance(inst) => {
            inst.attrs.borrow_mut().insert(name.to_string(), new_value);
            Ok(())
        }
        PyValue::Class(c) => {
            c.class_attrs.borrow_mut().insert(name.to_string(), new_value);
            Ok(())
        }
        other => raise_result(
            "AttributeError",
            format!(
                "'{}' object attributes cannot be set",
                other.type_name()
            ),
        ),
    }
}
