//! Class statement evaluation and `super()` dispatch (distilled spec §3.3
//! "Class/Instance", §4.2 "super() dispatch").

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rustpython_parser::ast::{Expr, Stmt, StmtClassDef};

use crate::ctx::Ctx;
use crate::env::Env;
use crate::flow::{raise_result, type_error, PyResult};
use crate::value::{ClassData, PyValue, SuperData};

/// Evaluate a `class Name(Base): ...` statement and bind the resulting
/// class in `env`. Only single inheritance is supported (Non-goal:
/// "multiple inheritance, metaclasses, decorators" - more than one base is
/// a catchable `TypeError` rather than a silent pick-one).
pub fn eval_class_def(stmt: &StmtClassDef, env: &Env, ctx: &Ctx) -> PyResult<()> {
    let base = match stmt.bases.len() {
        0 => None,
        1 => match crate::eval::eval_expr(&stmt.bases[0], env, ctx)? {
            PyValue::Class(c) => Some(c),
            other => return type_error("class", other.type_name()),
        },
        _ => return raise_result("TypeError", "multiple inheritance is not supported"),
    };

    let class_env = env.child();
    let mut methods = HashMap::new();
    let mut class_attrs = HashMap::new();

    for item in &stmt.body {
        match item {
            Stmt::FunctionDef(f) => {
                let func = crate::eval::make_function(f, &class_env, ctx)?;
                methods.insert(f.name.to_string(), func);
            }
            Stmt::Assign(a) => {
                let value = crate::eval::eval_expr(&a.value, &class_env, ctx)?;
                for target in &a.targets {
                    if let Expr::Name(n) = target {
                        class_attrs.insert(n.id.to_string(), value.clone());
                    }
                }
            }
            Stmt::Pass(_) | Stmt::Expr(_) => {}
            other => {
                crate::eval::exec_stmt(other, &class_env, ctx)?;
            }
        }
    }

    let class = Rc::new(ClassData {
        name: stmt.name.to_string(),
        base,
        methods,
        class_attrs: RefCell::new(class_attrs),
    });

    for method in class.methods.values() {
        if let PyValue::Function(f) = method {
            *f.owner.borrow_mut() = Some(class.clone());
        }
    }

    env.bind_here(stmt.name.as_str(), PyValue::Class(class));
    Ok(())
}

/// Build the `super()` proxy for a call made with no arguments inside a
/// method body: `owner` is the class the currently-executing method was
/// *defined* on, not the instance's runtime class - resolving from the
/// runtime class would walk the wrong chain for an inherited method.
pub fn make_super(owner: &Rc<ClassData>, instance: PyValue) -> PyResult<PyValue> {
    match &owner.base {
        Some(base) => Ok(PyValue::Super(Rc::new(SuperData {
            start: base.clone(),
            instance,
        }))),
        None => raise_result("TypeError", "super(): no base class for this class"),
    }
}

/// Resolve an attribute on a `super()` proxy by walking `start`'s chain
/// upward (distilled spec §4.4 "Super: resolution begins at the anchor
/// class's base").
pub fn super_getattr(data: &SuperData, name: &str) -> Option<PyValue> {
    data.start.resolve(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    #[test]
    fn super_with_no_base_is_a_type_error() {
        let class = Rc::new(ClassData {
            name: "Root".into(),
            base: None,
            methods: Map::new(),
            class_attrs: RefCell::new(Map::new()),
        });
        let instance = PyValue::None;
        assert!(make_super(&class, instance).is_err());
    }
}
