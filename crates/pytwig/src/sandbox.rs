//! The host-embedding surface (distilled spec §6 "Embedding contract").
//!
//! [`Sandbox`] owns the persistent module-level [`Env`] a script runs
//! against, the merged builtin-function table, the registered import
//! modules, and the resource limits/cancellation token a host configures
//! once and reuses across many [`Sandbox::run`] calls. Parsing is
//! delegated entirely to `rustpython-parser`; this module's job starts at
//! "here is a `Mod`" and ends at "here is a `PyValue` or an `Error`".

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use rustpython_parser::ast::Stmt;
use rustpython_parser::{parse, Mode};

use crate::env::{CancellationToken, Env};
use crate::error::{Error, Result};
use crate::flow::{Outcome, Signal};
use crate::invoke;
use crate::tool::{Tool, ToolInfo};
use crate::value::{BuiltinData, ModuleData, PyValue, ToolFn};

/// Builder for constructing modules that can be imported from script code
/// (distilled spec §4.3: "a host may register additional named modules").
pub struct ModuleBuilder {
    name: String,
    attrs: Vec<(String, PyValue)>,
}

impl ModuleBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
        }
    }

    /// Register a constant value as a module attribute.
    pub fn constant(&mut self, name: &str, value: PyValue) {
        self.attrs.push((name.to_string(), value));
    }

    /// Register a native function as a module attribute, callable as
    /// `module.function_name(args)`.
    pub fn function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[PyValue]) -> PyValue + Send + Sync + 'static,
    {
        self.attrs.push((
            name.to_string(),
            PyValue::Builtin(Rc::new(BuiltinData {
                name: format!("{}.{}", self.name, name),
                func: Arc::new(f) as ToolFn,
                help: None,
                attrs: HashMap::new(),
            })),
        ));
    }
}

/// A secure, embeddable Python-flavored scripting runtime.
///
/// The sandbox evaluates a restricted Python subset with no access to the
/// file system, network, or other host resources unless the host
/// explicitly exposes them through [`Sandbox::register_fn`],
/// [`Sandbox::register_tool`], or [`Sandbox::module`].
///
/// # Example
///
/// ```
/// use pytwig::{Sandbox, PyValue};
///
/// let mut sandbox = Sandbox::new();
///
/// sandbox.register_fn("add_numbers", |args: &[PyValue]| {
///     let a = args[0].as_int().unwrap_or(0);
///     let b = args[1].as_int().unwrap_or(0);
///     PyValue::Int(a + b)
/// });
///
/// let result = sandbox.run(r#"
/// x = add_numbers(10, 20)
/// x * 2
/// "#).unwrap();
///
/// assert_eq!(result, PyValue::Int(60));
/// ```
pub struct Sandbox {
    globals: Env,
    builtins: HashMap<String, PyValue>,
    modules: HashMap<String, PyValue>,
    tool_infos: Vec<ToolInfo>,
    limits: crate::ctx::Limits,
    token: CancellationToken,
    print_buffer: Rc<RefCell<Vec<u8>>>,
}

impl Sandbox {
    /// Create a new sandbox with the core language built-ins (`len`,
    /// `print`, the type constructors, ...) but no standard-library
    /// modules pre-registered.
    pub fn new() -> Self {
        Self {
            globals: Env::root(),
            builtins: crate::builtins::builtin_table(),
            modules: HashMap::new(),
            tool_infos: Vec::new(),
            limits: crate::ctx::Limits::default(),
            token: CancellationToken::new(),
            print_buffer: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Create a new sandbox with `json`, `math`, and `typing` additionally
    /// importable out of the box.
    ///
    /// ```
    /// use pytwig::Sandbox;
    ///
    /// let mut sandbox = Sandbox::with_builtins();
    /// let result = sandbox.run("import math; math.sqrt(16.0)").unwrap();
    /// assert_eq!(result.as_float(), Some(4.0));
    /// ```
    pub fn with_builtins() -> Self {
        let mut sandbox = Self::new();
        for name in ["math", "typing"] {
            if let Some(module) = crate::modules::resolve_builtin_module(name) {
                sandbox.modules.insert(name.to_string(), module);
            }
        }
        #[cfg(feature = "json")]
        if let Some(module) = crate::modules::resolve_builtin_module("json") {
            sandbox.modules.insert("json".to_string(), module);
        }
        sandbox
    }

    /// Register a module that can be imported from script code.
    ///
    /// ```
    /// use pytwig::{Sandbox, PyValue};
    ///
    /// let mut sandbox = Sandbox::new();
    /// sandbox.module("utils", |m| {
    ///     m.constant("PI", PyValue::Float(3.14));
    ///     m.function("double", |args: &[PyValue]| {
    ///         PyValue::Int(args.get(0).and_then(|v| v.as_int()).unwrap_or(0) * 2)
    ///     });
    /// });
    ///
    /// let result = sandbox.run("import utils; utils.double(5)").unwrap();
    /// assert_eq!(result, PyValue::Int(10));
    /// ```
    pub fn module<F>(&mut self, name: &str, builder_fn: F)
    where
        F: FnOnce(&mut ModuleBuilder),
    {
        let mut builder = ModuleBuilder::new(name);
        builder_fn(&mut builder);
        self.modules.insert(
            name.to_string(),
            PyValue::Module(Rc::new(ModuleData {
                name: name.to_string(),
                attrs: builder.attrs,
            })),
        );
    }

    /// Register a function callable by name from script code.
    ///
    /// ```
    /// use pytwig::{Sandbox, PyValue};
    ///
    /// let mut sandbox = Sandbox::new();
    /// sandbox.register_fn("greet", |args: &[PyValue]| {
    ///     let name = args.get(0).and_then(|v| v.as_str()).unwrap_or("World");
    ///     PyValue::Str(format!("Hello, {}!", name))
    /// });
    ///
    /// let result = sandbox.run("greet('Alice')").unwrap();
    /// assert_eq!(result, PyValue::Str("Hello, Alice!".to_string()));
    /// ```
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[PyValue]) -> PyValue + Send + Sync + 'static,
    {
        let name = name.into();
        self.builtins.insert(
            name.clone(),
            PyValue::Builtin(Rc::new(BuiltinData {
                name,
                func: Arc::new(f) as ToolFn,
                help: None,
                attrs: HashMap::new(),
            })),
        );
    }

    /// Register a tool with metadata, used to generate documentation via
    /// [`Sandbox::describe`] (useful for an LLM's system prompt in a
    /// CodeAct-style agent loop).
    ///
    /// ```
    /// use pytwig::{Sandbox, PyValue, ToolInfo};
    ///
    /// let mut sandbox = Sandbox::new();
    /// let info = ToolInfo::new("fetch_weather", "Get weather for a city")
    ///     .arg("city", "str", "The city name")
    ///     .returns("dict");
    ///
    /// sandbox.register_tool(info, |args: &[PyValue]| {
    ///     let city = args.get(0).and_then(|v| v.as_str()).unwrap_or("Unknown");
    ///     PyValue::dict(vec![(PyValue::Str("city".to_string()), PyValue::Str(city.to_string()))])
    /// });
    ///
    /// let docs = sandbox.describe();
    /// assert!(docs.contains("fetch_weather"));
    /// ```
    pub fn register_tool<F>(&mut self, info: ToolInfo, f: F)
    where
        F: Fn(&[PyValue]) -> PyValue + Send + Sync + 'static,
    {
        self.builtins.insert(
            info.name.clone(),
            PyValue::Builtin(Rc::new(BuiltinData {
                name: info.name.clone(),
                func: Arc::new(f) as ToolFn,
                help: Some(info.doc()),
                attrs: HashMap::new(),
            })),
        );
        self.tool_infos.push(info);
    }

    /// Register a tool using the [`Tool`](crate::Tool) trait, as produced
    /// by the `#[tool]` macro.
    ///
    /// ```ignore
    /// use pytwig::Sandbox;
    /// use pytwig_macros::tool;
    ///
    /// #[tool(description = "Add two numbers.")]
    /// fn add(a: i64, b: i64) -> i64 { a + b }
    ///
    /// let mut sandbox = Sandbox::new();
    /// sandbox.add(add::Tool);
    /// ```
    pub fn add<T: Tool + 'static>(&mut self, _: T) {
        let info = T::info().clone();
        let func: ToolFn = Arc::new(|args: &[PyValue]| T::call(args.to_vec()));
        self.builtins.insert(
            info.name.clone(),
            PyValue::Builtin(Rc::new(BuiltinData {
                name: info.name.clone(),
                func,
                help: Some(info.doc()),
                attrs: HashMap::new(),
            })),
        );
        self.tool_infos.push(info);
    }

    /// Generate Python-style documentation for all registered tools.
    pub fn describe(&self) -> String {
        crate::tool::describe_tools(&self.tool_infos)
    }

    /// The metadata for all registered tools.
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tool_infos
    }

    /// Bind a variable in the sandbox's persistent module-level scope.
    ///
    /// ```
    /// use pytwig::{Sandbox, PyValue};
    ///
    /// let mut sandbox = Sandbox::new();
    /// sandbox.set("x", PyValue::Int(42));
    /// let result = sandbox.run("x * 2").unwrap();
    /// assert_eq!(result, PyValue::Int(84));
    /// ```
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PyValue>) {
        self.globals.bind_here(&name.into(), value.into());
    }

    /// Set resource limits enforced on every subsequent [`Sandbox::run`]
    /// call. The step counter and recursion depth reset at the start of
    /// each call.
    ///
    /// ```
    /// use pytwig::{Sandbox, Limits};
    ///
    /// let mut sandbox = Sandbox::new();
    /// sandbox.limit(Limits { max_steps: Some(1_000), max_recursion_depth: Some(10) });
    ///
    /// let err = sandbox.run("while True: pass").unwrap_err();
    /// assert!(err.to_string().contains("limit"));
    /// ```
    pub fn limit(&mut self, limits: Limits) {
        self.limits = crate::ctx::Limits {
            max_steps: limits.max_steps,
            max_recursion_depth: limits.max_recursion_depth,
        };
    }

    /// The cancellation token checked at every evaluation boundary. A host
    /// tool registered via [`Sandbox::register_fn`] can call
    /// `.cancel()` on its own clone of this token to abort a run in
    /// progress from within a call.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn make_ctx(&self, source: &str) -> crate::ctx::Ctx {
        let modules = self.modules.clone();
        let import_hook: crate::ctx::ImportHook = Rc::new(move |name: &str| {
            modules
                .get(name)
                .cloned()
                .or_else(|| crate::modules::resolve_builtin_module(name))
                .map(crate::ctx::ImportResolution::Found)
                .unwrap_or(crate::ctx::ImportResolution::NotFound)
        });
        crate::ctx::Ctx::new(
            self.token.clone(),
            self.limits.clone(),
            Some(import_hook),
            self.print_buffer.clone(),
        )
        .with_source(source.to_string())
        .with_builtins(self.builtins.clone())
    }

    /// Run script code against the sandbox's persistent global scope.
    ///
    /// Returns the value of the final top-level expression statement, or
    /// `PyValue::None` if the program ends with a non-expression
    /// statement.
    ///
    /// ```
    /// use pytwig::{Sandbox, PyValue};
    ///
    /// let mut sandbox = Sandbox::new();
    /// assert_eq!(sandbox.run("2 + 2").unwrap(), PyValue::Int(4));
    ///
    /// let result = sandbox.run(r#"
    /// total = 0
    /// for i in range(10):
    ///     total = total + i
    /// total
    /// "#).unwrap();
    /// assert_eq!(result, PyValue::Int(45));
    /// ```
    pub fn run(&mut self, code: &str) -> Result<PyValue> {
        let parsed = parse(code, Mode::Module, "<sandbox>").map_err(|e| Error::Parse(e.to_string()))?;
        let module = parsed
            .as_module()
            .ok_or_else(|| Error::Parse("expected a module".to_string()))?;
        let ctx = self.make_ctx(code);
        run_body(&module.body, &self.globals, &ctx).map_err(outcome_to_error)
    }

    /// Run script code and capture any `print()` output alongside the
    /// result value.
    ///
    /// ```
    /// use pytwig::Sandbox;
    ///
    /// let mut sandbox = Sandbox::new();
    /// let output = sandbox.capture(r#"
    /// x = 10
    /// print("x is", x)
    /// x * 2
    /// "#).unwrap();
    ///
    /// assert_eq!(output.output, vec!["x is 10"]);
    /// assert_eq!(output.value.as_int(), Some(20));
    /// ```
    pub fn capture(&mut self, code: &str) -> Result<Output> {
        self.print_buffer.borrow_mut().clear();
        let value = self.run(code)?;
        let output = self.drain_print_buffer();
        Ok(Output { value, output })
    }

    /// Take and clear any print output accumulated since the last flush.
    pub fn flush(&mut self) -> Vec<String> {
        self.drain_print_buffer()
    }

    fn drain_print_buffer(&self) -> Vec<String> {
        let mut buf = self.print_buffer.borrow_mut();
        if buf.is_empty() {
            return Vec::new();
        }
        let text = String::from_utf8_lossy(&buf).into_owned();
        buf.clear();
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if lines.last().map(String::is_empty).unwrap_or(false) {
            lines.pop();
        }
        lines
    }

    /// Call a script-defined function (bound by `def` at module scope, or
    /// registered via [`Sandbox::set`]) by name, without re-parsing or
    /// re-running the script that defined it (distilled spec §6.3: "a host
    /// may invoke a previously-defined script function directly").
    ///
    /// ```
    /// use pytwig::{Sandbox, PyValue};
    ///
    /// let mut sandbox = Sandbox::new();
    /// sandbox.run("def add(a, b):\n    return a + b").unwrap();
    /// let result = sandbox.call("add", vec![PyValue::Int(2), PyValue::Int(3)]).unwrap();
    /// assert_eq!(result, PyValue::Int(5));
    /// ```
    pub fn call(&mut self, name: &str, args: Vec<PyValue>) -> Result<PyValue> {
        let ctx = self.make_ctx("<call>");
        let callee = self
            .globals
            .get(name)
            .or_else(|| ctx.get_builtin(name))
            .ok_or_else(|| Error::NameError(name.to_string()))?;
        invoke::call_value(&callee, args, Vec::new(), &ctx).map_err(outcome_to_error)
    }

    /// Instantiate a script-defined class by name (distilled spec §6.3: "a
    /// host may construct a previously-defined script class directly").
    ///
    /// ```
    /// use pytwig::{Sandbox, PyValue};
    ///
    /// let mut sandbox = Sandbox::new();
    /// sandbox
    ///     .run("class Point:\n    def __init__(self, x, y):\n        self.x = x\n        self.y = y\n    def sum(self):\n        return self.x + self.y")
    ///     .unwrap();
    /// let point = sandbox.instantiate("Point", vec![PyValue::Int(3), PyValue::Int(4)]).unwrap();
    /// let total = sandbox.call_method(&point, "sum", vec![]).unwrap();
    /// assert_eq!(total, PyValue::Int(7));
    /// ```
    pub fn instantiate(&mut self, class_name: &str, args: Vec<PyValue>) -> Result<PyValue> {
        let ctx = self.make_ctx("<instantiate>");
        match self.globals.get(class_name) {
            Some(PyValue::Class(class)) => {
                invoke::instantiate(&class, args, Vec::new(), &ctx).map_err(outcome_to_error)
            }
            Some(other) => Err(Error::Type {
                expected: "class".to_string(),
                got: other.type_name().to_string(),
            }),
            None => Err(Error::NameError(class_name.to_string())),
        }
    }

    /// Call a bound method on a value previously returned by
    /// [`Sandbox::instantiate`] or [`Sandbox::run`].
    pub fn call_method(&mut self, receiver: &PyValue, method: &str, args: Vec<PyValue>) -> Result<PyValue> {
        let ctx = self.make_ctx("<call_method>");
        let bound = invoke::get_attr(receiver, method).map_err(outcome_to_error)?;
        invoke::call_value(&bound, args, Vec::new(), &ctx).map_err(outcome_to_error)
    }
}

/// Execute a module body, returning the value of the final top-level
/// expression statement (or `PyValue::None` if the body is empty or ends
/// with a non-expression statement).
fn run_body(body: &[Stmt], env: &Env, ctx: &crate::ctx::Ctx) -> crate::flow::PyResult<PyValue> {
    let Some((last, rest)) = body.split_last() else {
        return Ok(PyValue::None);
    };
    crate::eval::exec_block(rest, env, ctx)?;
    match last {
        Stmt::Expr(s) => crate::eval::eval_expr(&s.value, env, ctx),
        other => {
            crate::eval::exec_stmt(other, env, ctx)?;
            Ok(PyValue::None)
        }
    }
}

fn outcome_to_error(outcome: Outcome) -> Error {
    match outcome {
        Outcome::Error(e) => e,
        Outcome::Signal(Signal::Raise(exc)) => Error::UncaughtException(exc.to_string()),
        Outcome::Signal(_) => {
            Error::Unsupported("'return'/'break'/'continue' outside a function or loop".to_string())
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of running code with print output capture.
#[derive(Debug, Clone)]
pub struct Output {
    /// The result value of the last expression.
    pub value: PyValue,
    /// Lines printed via `print()` calls.
    pub output: Vec<String>,
}

/// Resource limits for sandbox execution.
///
/// Both limits default to `None` (unlimited). Use [`Sandbox::limit`] to
/// apply limits before calling [`Sandbox::run`].
///
/// ```
/// use pytwig::{Sandbox, Limits};
///
/// let mut sandbox = Sandbox::new();
/// sandbox.limit(Limits { max_steps: Some(10_000), max_recursion_depth: Some(50) });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Limits {
    /// Maximum number of evaluation steps per [`Sandbox::run`] call.
    /// `None` means unlimited.
    pub max_steps: Option<u64>,
    /// Maximum call-stack depth for user-defined function calls. `None`
    /// means unlimited.
    pub max_recursion_depth: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_expression() {
        let mut sandbox = Sandbox::new();
        assert_eq!(sandbox.run("2 + 2").unwrap(), PyValue::Int(4));
    }

    #[test]
    fn persists_globals_across_calls() {
        let mut sandbox = Sandbox::new();
        sandbox.run("x = 10").unwrap();
        assert_eq!(sandbox.run("x * 2").unwrap(), PyValue::Int(20));
    }

    #[test]
    fn register_fn_is_callable() {
        let mut sandbox = Sandbox::new();
        sandbox.register_fn("double", |args: &[PyValue]| {
            PyValue::Int(args[0].as_int().unwrap_or(0) * 2)
        });
        assert_eq!(sandbox.run("double(21)").unwrap(), PyValue::Int(42));
    }

    #[test]
    fn module_attributes_are_importable() {
        let mut sandbox = Sandbox::new();
        sandbox.module("utils", |m| {
            m.constant("VERSION", PyValue::Str("1.0".to_string()));
        });
        let result = sandbox.run("import utils; utils.VERSION").unwrap();
        assert_eq!(result, PyValue::Str("1.0".to_string()));
    }

    #[test]
    fn call_invokes_a_previously_defined_function() {
        let mut sandbox = Sandbox::new();
        sandbox.run("def add(a, b):\n    return a + b").unwrap();
        let result = sandbox.call("add", vec![PyValue::Int(2), PyValue::Int(3)]).unwrap();
        assert_eq!(result, PyValue::Int(5));
    }

    #[test]
    fn instantiate_constructs_a_script_class() {
        let mut sandbox = Sandbox::new();
        sandbox
            .run("class Point:\n    def __init__(self, x):\n        self.x = x")
            .unwrap();
        let point = sandbox.instantiate("Point", vec![PyValue::Int(3)]).unwrap();
        let x = sandbox.call_method(&point, "x", vec![]);
        // `x` is an attribute, not a method; calling it should fail with a
        // TypeError since an `int` is not callable, proving get_attr found it.
        assert!(x.is_err());
    }

    #[test]
    fn uncaught_exception_surfaces_as_an_error() {
        let mut sandbox = Sandbox::new();
        let err = sandbox.run("1 / 0").unwrap_err();
        assert!(err.to_string().contains("ZeroDivisionError"));
    }

    #[test]
    fn step_limit_is_enforced() {
        let mut sandbox = Sandbox::new();
        sandbox.limit(Limits {
            max_steps: Some(50),
            max_recursion_depth: None,
        });
        let err = sandbox.run("while True:\n    pass").unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn capture_collects_print_output() {
        let mut sandbox = Sandbox::new();
        let output = sandbox
            .capture("x = 10\nprint(\"x is\", x)\nx * 2")
            .unwrap();
        assert_eq!(output.output, vec!["x is 10".to_string()]);
        assert_eq!(output.value, PyValue::Int(20));
    }

    #[test]
    fn with_builtins_enables_stdlib_imports() {
        let mut sandbox = Sandbox::with_builtins();
        let result = sandbox.run("import math; math.sqrt(16.0)").unwrap();
        assert_eq!(result, PyValue::Float(4.0));
    }
}
