//! Lexical environment: a linked list of frames with interior mutability,
//! `global`/`nonlocal` overlays, and a single host import-resolution hook.
//!
//! Grounded on the invocation model of this workspace's sibling
//! embeddable-sandbox crate (a flat locals/globals split), generalized to
//! a proper frame chain because closures and nested `def`s need real
//! lexical scoping, and `global`/`nonlocal` need somewhere to record which
//! names in *this* frame were redirected to an outer one.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::value::PyValue;

/// A single lexical scope.
pub struct Frame {
    bindings: RefCell<HashMap<String, PyValue>>,
    /// Names this frame redirects to the global (module) frame.
    globals: RefCell<HashSet<String>>,
    /// Names this frame redirects to the nearest enclosing frame that
    /// already binds them.
    nonlocals: RefCell<HashSet<String>>,
    parent: Option<Env>,
}

/// A handle to a [`Frame`]. Cheap to clone; clones share the same frame.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

impl Env {
    pub fn root() -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            globals: RefCell::new(HashSet::new()),
            nonlocals: RefCell::new(HashSet::new()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            globals: RefCell::new(HashSet::new()),
            nonlocals: RefCell::new(HashSet::new()),
            parent: Some(self.clone()),
        }))
    }

    /// The outermost (module-level) frame in this chain.
    pub fn global_frame(&self) -> Env {
        let mut current = self.clone();
        while let Some(parent) = current.0.parent.clone() {
            current = parent;
        }
        current
    }

    /// Look up a name by walking outward through the frame chain.
    pub fn get(&self, name: &str) -> Option<PyValue> {
        if let Some(v) = self.0.bindings.borrow().get(name) {
            return Some(v.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Declare `name` in this frame as redirected to the global frame.
    /// Must be called before the first assignment to `name` in this frame.
    pub fn declare_global(&self, name: &str) {
        self.0.globals.borrow_mut().insert(name.to_string());
    }

    /// Declare `name` in this frame as redirected to the nearest enclosing
    /// frame that binds it. Callers must first check
    /// [`Env::has_enclosing_binding`] - spec.md §3.2 requires `nonlocal` to
    /// fail at the declaration site, not silently bind locally later, when
    /// no enclosing frame already defines the name.
    pub fn declare_nonlocal(&self, name: &str) {
        self.0.nonlocals.borrow_mut().insert(name.to_string());
    }

    /// Whether some frame strictly enclosing this one already binds
    /// `name`. Used to validate a `nonlocal` declaration at the point it
    /// executes.
    pub fn has_enclosing_binding(&self, name: &str) -> bool {
        match &self.0.parent {
            Some(parent) => parent.get(name).is_some(),
            None => false,
        }
    }

    /// Bind `name` to `value`, honoring any `global`/`nonlocal`
    /// declaration active for `name` in this frame.
    pub fn set(&self, name: &str, value: PyValue) {
        if self.0.globals.borrow().contains(name) {
            self.global_frame().bind_here(name, value);
            return;
        }
        if self.0.nonlocals.borrow().contains(name) {
            if let Some(parent) = &self.0.parent {
                if parent.assign_existing(name, value.clone()) {
                    return;
                }
            }
            // Unreachable in practice: `Stmt::Nonlocal` validates an
            // enclosing binding exists before `declare_nonlocal` is ever
            // called. Falling through to a local bind here (rather than
            // panicking) just keeps this defensive rather than load-bearing.
        }
        self.bind_here(name, value);
    }

    /// Force a binding directly in this frame, bypassing global/nonlocal
    /// overlays. Used for parameter binding and `for`-loop targets.
    pub fn bind_here(&self, name: &str, value: PyValue) {
        self.0.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Walk outward looking for an existing binding of `name` and update
    /// it in place; returns false if no frame in the chain binds it.
    fn assign_existing(&self, name: &str, value: PyValue) -> bool {
        if self.0.bindings.borrow().contains_key(name) {
            self.0.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.0.parent {
            Some(p) => p.assign_existing(name, value),
            None => false,
        }
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A cooperative cancellation flag. Cloning shares the same underlying
/// flag; a host holds one half, the evaluator consults the other at every
/// evaluation boundary (§4.5 of the specification this crate implements).
#[derive(Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(false)))
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let root = Env::root();
        root.bind_here("x", PyValue::Int(1));
        let child = root.child();
        assert_eq!(child.get("x"), Some(PyValue::Int(1)));
    }

    #[test]
    fn assignment_without_declaration_is_local() {
        let root = Env::root();
        root.bind_here("x", PyValue::Int(1));
        let child = root.child();
        child.set("x", PyValue::Int(2));
        assert_eq!(child.get("x"), Some(PyValue::Int(2)));
        assert_eq!(root.get("x"), Some(PyValue::Int(1)));
    }

    #[test]
    fn nonlocal_writes_through_to_enclosing_frame() {
        let root = Env::root();
        root.bind_here("x", PyValue::Int(1));
        let child = root.child();
        child.bind_here("x", PyValue::Int(9));
        let grandchild = child.child();
        grandchild.declare_nonlocal("x");
        grandchild.set("x", PyValue::Int(2));
        assert_eq!(child.get("x"), Some(PyValue::Int(2)));
        assert_eq!(root.get("x"), Some(PyValue::Int(1)));
    }

    #[test]
    fn has_enclosing_binding_is_false_with_no_matching_outer_frame() {
        let root = Env::root();
        let child = root.child();
        assert!(!child.has_enclosing_binding("x"));

        root.bind_here("y", PyValue::Int(1));
        assert!(child.has_enclosing_binding("y"));
    }

    #[test]
    fn global_writes_through_to_root() {
        let root = Env::root();
        root.bind_here("x", PyValue::Int(1));
        let child = root.child().child();
        child.declare_global("x");
        child.set("x", PyValue::Int(7));
        assert_eq!(root.get("x"), Some(PyValue::Int(7)));
    }

    #[test]
    fn cancellation_token_is_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
