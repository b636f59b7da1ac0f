//! The ambient context threaded through every `evaluate` call.
//!
//! The distilled spec's glossary defines "Ambient context" as the value
//! implicitly carried alongside every evaluation: the cancellation token
//! and the active environment handle for built-ins (§4.1, §6.2). Rather
//! than duplicating an I/O-handle pair and an import hook on every single
//! [`crate::env::Frame`] (which the distilled spec's wording would also
//! permit - "each environment exposes a writer and reader"), this
//! implementation hangs those host-level resources off one `Ctx` per
//! `run`/`call` invocation and threads it by reference: fewer allocations,
//! same observable behavior, since a single `Sandbox` run only ever has
//! one writer/reader/import hook in force at a time. See DESIGN.md.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::env::CancellationToken;
use crate::value::PyValue;

/// Resource ceilings a host may place on one evaluation. Both default to
/// `None` (unlimited) so embedding is frictionless by default.
#[derive(Debug, Clone, Default)]
pub struct Limits {
    pub max_steps: Option<u64>,
    pub max_recursion_depth: Option<usize>,
}

/// The result of resolving a module name through the host's import hook.
pub enum ImportResolution {
    /// The module was found; here is its value (a `Module`, or any
    /// `PyValue` a script might reasonably `import`, e.g. a `Dict`).
    Found(PyValue),
    /// No such module is registered.
    NotFound,
}

/// `resolve(name) -> Found(value) | NotFound`, the single import hook of
/// §4.3. Registered once per `Sandbox` via built-in and host modules.
pub type ImportHook = Rc<dyn Fn(&str) -> ImportResolution>;

/// Everything ambient: the cancellation token, resource counters, the
/// import hook, and the print/input handles substituting for host I/O
/// (§4.3 "I/O handles").
pub struct Ctx {
    pub token: CancellationToken,
    pub limits: Limits,
    steps: Cell<u64>,
    depth: Cell<usize>,
    import_hook: Option<ImportHook>,
    writer: Rc<std::cell::RefCell<dyn Write>>,
    /// Source text of the program being evaluated, kept around so a thrown
    /// `Error`/`Exception` can be annotated with a line number from a
    /// `TextSize` byte offset (§6.1 "errors carry a source line").
    source: Option<Rc<str>>,
    /// Names of the `def`s currently being called, innermost last - the
    /// "enclosing function name" an `Error` can be annotated with.
    call_stack: RefCell<Vec<String>>,
    /// The global builtin-function table (`len`, `print`, `ValueError`, ...),
    /// consulted after the lexical environment chain is exhausted (§4.1
    /// name resolution: local -> enclosing -> module -> builtins).
    builtins: HashMap<String, PyValue>,
    /// Exceptions currently being handled, innermost last - lets a bare
    /// `raise` (no expression) inside an `except` block re-raise.
    active_exceptions: RefCell<Vec<PyValue>>,
}

impl Ctx {
    pub fn new(
        token: CancellationToken,
        limits: Limits,
        import_hook: Option<ImportHook>,
        writer: Rc<std::cell::RefCell<dyn Write>>,
    ) -> Self {
        Self {
            token,
            limits,
            steps: Cell::new(0),
            depth: Cell::new(0),
            import_hook,
            writer,
            source: None,
            call_stack: RefCell::new(Vec::new()),
            builtins: HashMap::new(),
            active_exceptions: RefCell::new(Vec::new()),
        }
    }

    pub fn with_source(mut self, source: impl Into<Rc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_builtins(mut self, builtins: HashMap<String, PyValue>) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn get_builtin(&self, name: &str) -> Option<PyValue> {
        self.builtins.get(name).cloned()
    }

    /// Push an exception onto the currently-handled stack; popped by the
    /// caller (the `except` handler in `eval.rs`) once its body finishes.
    pub fn push_exception(&self, exc: PyValue) {
        self.active_exceptions.borrow_mut().push(exc);
    }

    pub fn pop_exception(&self) {
        self.active_exceptions.borrow_mut().pop();
    }

    /// The innermost exception currently being handled, for a bare `raise`.
    pub fn current_exception(&self) -> Option<PyValue> {
        self.active_exceptions.borrow().last().cloned()
    }

    /// 1-based line number containing byte offset `offset` in the source
    /// text, or `None` if no source was registered.
    pub fn line_of(&self, offset: u32) -> Option<usize> {
        let source = self.source.as_ref()?;
        let offset = offset as usize;
        Some(source.as_bytes()[..offset.min(source.len())]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1)
    }

    /// The innermost currently-executing `def`'s name, if any.
    pub fn current_function(&self) -> Option<String> {
        self.call_stack.borrow().last().cloned()
    }

    /// Called at every recursive entry into `evaluate` (§4.5). Cancellation
    /// and a blown step budget are script-catchable faults (spec.md §7:
    /// "Errors ... are catchable by `except` ... e.g. `TimeoutError`,
    /// `CancelledError`"), so these raise a `PyValue::Exception` rather
    /// than the uncatchable `Error` channel.
    pub fn tick(&self) -> crate::flow::PyResult<()> {
        if self.token.is_cancelled() {
            return crate::flow::raise_result("CancelledError", "execution cancelled");
        }
        let n = self.steps.get() + 1;
        self.steps.set(n);
        if let Some(max) = self.limits.max_steps {
            if n > max {
                return crate::flow::raise_result("TimeoutError", "step limit exceeded");
            }
        }
        Ok(())
    }

    /// Enter a call frame, checking the recursion-depth ceiling; the
    /// returned guard restores the depth counter (and call-stack entry) on
    /// drop, including on the unwind path through `?`. A blown recursion
    /// budget is a catchable `RecursionError`, matching `tick()` above.
    pub fn enter_call(&self, name: Option<&str>) -> crate::flow::PyResult<CallGuard<'_>> {
        let depth = self.depth.get() + 1;
        if let Some(max) = self.limits.max_recursion_depth {
            if depth > max {
                return crate::flow::raise_result("RecursionError", "recursion limit exceeded");
            }
        }
        self.depth.set(depth);
        if let Some(name) = name {
            self.call_stack.borrow_mut().push(name.to_string());
        }
        Ok(CallGuard {
            ctx: self,
            pushed_name: name.is_some(),
        })
    }

    pub fn resolve_import(&self, name: &str) -> ImportResolution {
        match &self.import_hook {
            Some(hook) => hook(name),
            None => ImportResolution::NotFound,
        }
    }

    pub fn write_str(&self, s: &str) {
        let _ = self.writer.borrow_mut().write_all(s.as_bytes());
    }
}

/// RAII guard that decrements the call-depth counter when a call returns,
/// including when it returns early through `?`.
pub struct CallGuard<'a> {
    ctx: &'a Ctx,
    pushed_name: bool,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.ctx.depth.set(self.ctx.depth.get() - 1);
        if self.pushed_name {
            self.ctx.call_stack.borrow_mut().pop();
        }
    }
}
