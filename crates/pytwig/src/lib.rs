//! pytwig - a tree-walking, embeddable Python-flavored scripting runtime
//!
//! pytwig evaluates an already-parsed Python-flavored AST directly, with no
//! bytecode compiler and no virtual machine in between. It is built for
//! embedding a small scripting surface into a host program: think CodeAct-
//! style LLM tool execution, user-scriptable automations, or a plugin
//! language, not a general-purpose CPython replacement.
//!
//! # Quick Start
//!
//! ```
//! use pytwig::{Sandbox, PyValue};
//!
//! let mut sandbox = Sandbox::new();
//!
//! sandbox.register_fn("fetch_data", |args| {
//!     let id = args[0].as_int().unwrap_or(0);
//!     PyValue::dict(vec![
//!         (PyValue::Str("id".to_string()), PyValue::Int(id)),
//!         (PyValue::Str("name".to_string()), PyValue::Str("Example".to_string())),
//!     ])
//! });
//!
//! let result = sandbox.run(r#"
//! data = fetch_data(42)
//! data["name"]
//! "#).unwrap();
//! assert_eq!(result, PyValue::Str("Example".to_string()));
//! ```
//!
//! # Supported language surface
//!
//! ## Types
//! - `None`, `bool`, `int`, `float`, `str`
//! - `list`, `tuple`, `dict` (any hashable key), `set`
//! - `def`/`lambda` functions and closures
//! - `class` definitions with single inheritance, `__init__`, and `super()`
//!
//! ## Operators
//! - Arithmetic: `+ - * / // % **`, unary `- + ~`
//! - Comparison (chained): `== != < <= > >= in not in is is not`
//! - Boolean (short-circuit): `and or not`
//! - Bitwise: `| ^ & << >>`
//!
//! ## Control flow
//! - `if`/`elif`/`else`, `while`, `for` (with starred unpacking of targets)
//! - `break`/`continue`/`return`
//! - `try`/`except`/`else`/`finally` with dotted-type-tail exception matching
//! - `assert`, `raise`
//! - `global`/`nonlocal`
//! - list/dict/set comprehensions
//! - f-strings with a format-spec mini-language
//!
//! ## Functions
//! - positional parameters, defaults (re-evaluated per call), `*args`,
//!   `**kwargs`, recursion, closures, nested `def`
//!
//! ## Resource limits and cancellation
//! - configurable step budget and recursion depth (see [`Limits`])
//! - a cooperative [`CancellationToken`] checked at evaluation boundaries
//!
//! ## Built-in functions
//! - `len str int float bool list tuple set dict range enumerate zip
//!   reversed any all print abs min max sum isinstance type repr bin hex
//!   oct divmod pow hash`
//!
//! ## Imports
//! - `import module [as alias]` / `from module import name [as alias]`
//! - built-in modules: `json`, `math`, `typing`
//! - custom module/tool registration via [`Sandbox::module`]/[`Sandbox::register_fn`]
//!
//! # Not supported
//!
//! - async/await, generators/yield
//! - multiple inheritance, metaclasses, decorators
//! - file system, network, or other host I/O from script code
//! - parsing is delegated to `rustpython-parser`; this crate evaluates ASTs
//!   it is handed, and is not itself a parser

mod builtins;
mod classes;
mod ctx;
mod env;
mod error;
mod eval;
mod flow;
mod fstring;
mod invoke;
mod kwargs;
mod methods;
pub(crate) mod modules;
mod operators;
mod sandbox;
mod slice;
mod tool;
mod value;

pub use env::CancellationToken;
pub use error::{Error, Result};
pub use sandbox::{Limits, ModuleBuilder, Output, Sandbox};
pub use tool::{ArgInfo, Tool, ToolCallError, ToolInfo};
pub use value::{FromPyValue, PyValue, TypeError};

#[cfg(feature = "macros")]
pub use pytwig_macros::tool;
