//! The runtime value model.
//!
//! `PyValue` is a tagged enum covering every value a script can hold.
//! Mutable containers (`List`, `Dict`, `Set`), closures, and
//! classes/instances are shared-ownership handles (`Rc<RefCell<_>>`):
//! this runtime is single-threaded and cooperative (see the crate's
//! concurrency notes), so `Rc`/`RefCell` is the right tool, not
//! `Arc`/`Mutex`. The one exception is host-registered builtins, which
//! carry `Send + Sync` purely so a host can move a `Sandbox` across
//! threads between (never during) calls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rustpython_parser::ast::{Expr, Stmt};

use crate::ctx::Ctx;
use crate::env::Env;
use crate::flow::{raise_result, PyResult};
use crate::kwargs::Kwargs;

/// A host-native callable exposed to scripts.
pub type ToolFn = Arc<dyn Fn(&[PyValue]) -> PyValue + Send + Sync>;

/// A language-level builtin (`len`, `print`, `int`, ...): a plain,
/// non-capturing Rust function rather than a host tool closure, so it can
/// participate fully in the Built-in contract (§6.2) - ambient context,
/// normalised kwargs, and a catchable [`PyResult`] rather than an
/// unconditional [`PyValue`].
pub type NativeFn = fn(&Ctx, Vec<PyValue>, Kwargs) -> PyResult<PyValue>;

pub struct NativeFunctionData {
    pub name: String,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunctionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native function {}>", self.name)
    }
}

/// A function parameter: its name and, if it has one, the (unevaluated)
/// default-value expression. Defaults are re-evaluated on every call that
/// needs them, in the function's defining environment - see the invocation
/// engine.
#[derive(Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// A `def`-bound function's body is a statement block; a `lambda`'s body
/// is a single expression whose value is the call's result with no
/// `return`/`ReturnValue` unwrapping needed. Same [`FunctionData`] shape
/// either way - just this one field differs (distilled spec §3.1: "Lambda
/// ... as Function, body is a single expression").
#[derive(Debug)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    Expr(Box<Expr>),
}

/// A user-defined `def`/`lambda` closure.
pub struct FunctionData {
    /// `None` for a lambda.
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub vararg: Option<String>,
    pub kwarg: Option<String>,
    pub body: FunctionBody,
    /// The frame the function was defined in - captured by handle, which
    /// is how closures see outer-scope mutations and how mutually
    /// recursive closures can form reference cycles (accepted, see
    /// DESIGN.md).
    pub closure: Env,
    /// The class this function was defined as a method of, if any. Set
    /// once, right after the owning [`ClassData`] is built, and consulted
    /// by `super()` to find the anchor base class to resolve from -
    /// resolving `super()` from the instance's *runtime* class would walk
    /// the wrong chain for an inherited method (§4.2 "super() dispatch").
    pub owner: RefCell<Option<Rc<ClassData>>>,
}

impl FunctionData {
    pub fn is_lambda(&self) -> bool {
        matches!(self.body, FunctionBody::Expr(_))
    }
}

impl fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionData")
            .field("name", &self.name)
            .field("params", &self.params.iter().map(|p| &p.name).collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A host-registered builtin value: a name, the callable, optional help
/// text, and an optional attribute map - the Built-in contract.
pub struct BuiltinData {
    pub name: String,
    pub func: ToolFn,
    pub help: Option<String>,
    pub attrs: HashMap<String, PyValue>,
}

impl fmt::Debug for BuiltinData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

#[derive(Debug)]
pub struct ClassData {
    pub name: String,
    pub base: Option<Rc<ClassData>>,
    pub methods: HashMap<String, PyValue>,
    pub class_attrs: RefCell<HashMap<String, PyValue>>,
}

impl ClassData {
    /// Resolve a method/attribute by walking the single-inheritance chain.
    pub fn resolve(&self, name: &str) -> Option<PyValue> {
        if let Some(v) = self.methods.get(name).cloned() {
            return Some(v);
        }
        if let Some(v) = self.class_attrs.borrow().get(name).cloned() {
            return Some(v);
        }
        self.base.as_ref().and_then(|b| b.resolve(name))
    }

    /// True if `self` is `other` or a descendant of it, for `isinstance`.
    pub fn is_or_inherits(&self, other: &Rc<ClassData>) -> bool {
        if std::ptr::eq(self, other.as_ref()) {
            return true;
        }
        match &self.base {
            Some(b) => b.is_or_inherits(other),
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct InstanceData {
    pub class: Rc<ClassData>,
    pub attrs: RefCell<HashMap<String, PyValue>>,
}

#[derive(Debug)]
pub struct BoundMethodData {
    pub receiver: PyValue,
    pub method: PyValue,
}

#[derive(Debug)]
pub struct SuperData {
    /// The class to start method resolution at (the current class's base).
    pub start: Rc<ClassData>,
    pub instance: PyValue,
}

/// A script-catchable fault, raised by `raise`, by an operation that would
/// raise a standard exception in Python, or propagated from a failed
/// builtin call. `type_name` may be dotted (`module.HTTPError`); `except`
/// clauses match on the trailing component.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionData {
    pub type_name: String,
    pub message: String,
    pub line: Option<usize>,
}

impl ExceptionData {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            line: None,
        }
    }

    /// The trailing component of a (possibly dotted) type name, used for
    /// `except module.Err` matching.
    pub fn type_tail(&self) -> &str {
        self.type_name.rsplit('.').next().unwrap_or(&self.type_name)
    }
}

impl fmt::Display for ExceptionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.type_name)
        } else {
            write!(f, "{}: {}", self.type_name, self.message)
        }
    }
}

/// A module value produced by [`crate::Sandbox::module`] or a built-in
/// module (`math`, `json`, `typing`).
#[derive(Debug, Clone)]
pub struct ModuleData {
    pub name: String,
    pub attrs: Vec<(String, PyValue)>,
}

#[derive(Debug, Clone)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<PyValue>>>),
    Tuple(Rc<Vec<PyValue>>),
    Dict(Rc<RefCell<Vec<(PyValue, PyValue)>>>),
    Set(Rc<RefCell<Vec<PyValue>>>),
    Function(Rc<FunctionData>),
    Builtin(Rc<BuiltinData>),
    Class(Rc<ClassData>),
    Instance(Rc<InstanceData>),
    BoundMethod(Rc<BoundMethodData>),
    Super(Rc<SuperData>),
    Exception(Rc<ExceptionData>),
    Module(Rc<ModuleData>),
    NativeFunction(Rc<NativeFunctionData>),
}

impl PyValue {
    pub fn list(items: Vec<PyValue>) -> Self {
        PyValue::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<PyValue>) -> Self {
        PyValue::Tuple(Rc::new(items))
    }

    pub fn dict(pairs: Vec<(PyValue, PyValue)>) -> Self {
        PyValue::Dict(Rc::new(RefCell::new(pairs)))
    }

    pub fn set(items: Vec<PyValue>) -> Self {
        PyValue::Set(Rc::new(RefCell::new(items)))
    }

    pub fn exception(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        PyValue::Exception(Rc::new(ExceptionData::new(type_name, message)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PyValue::None => "NoneType",
            PyValue::Bool(_) => "bool",
            PyValue::Int(_) => "int",
            PyValue::Float(_) => "float",
            PyValue::Str(_) => "str",
            PyValue::List(_) => "list",
            PyValue::Tuple(_) => "tuple",
            PyValue::Dict(_) => "dict",
            PyValue::Set(_) => "set",
            PyValue::Function(_) => "function",
            PyValue::Builtin(_) => "builtin_function_or_method",
            PyValue::Class(_) => "type",
            PyValue::Instance(_) => "object",
            PyValue::BoundMethod(_) => "method",
            PyValue::Super(_) => "super",
            PyValue::Exception(_) => "Exception",
            PyValue::Module(_) => "module",
            PyValue::NativeFunction(_) => "builtin_function_or_method",
        }
    }

    /// Python truthiness. Unknown/compound kinds default to `true`, matching
    /// this runtime's documented default (DESIGN.md Open Questions).
    pub fn is_truthy(&self) -> bool {
        match self {
            PyValue::None => false,
            PyValue::Bool(b) => *b,
            PyValue::Int(i) => *i != 0,
            PyValue::Float(f) => *f != 0.0,
            PyValue::Str(s) => !s.is_empty(),
            PyValue::List(l) => !l.borrow().is_empty(),
            PyValue::Tuple(t) => !t.is_empty(),
            PyValue::Dict(d) => !d.borrow().is_empty(),
            PyValue::Set(s) => !s.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PyValue::Int(i) => Some(*i),
            PyValue::Bool(b) => Some(*b as i64),
            PyValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PyValue::Float(f) => Some(*f),
            PyValue::Int(i) => Some(*i as f64),
            PyValue::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// A value is hashable if it can be used as a dict key / set member.
    /// Mutable containers are not; everything else is (this runtime
    /// resolves hashability by linear equality scan rather than a true
    /// hash table - see DESIGN.md "Canonical key").
    pub fn is_hashable(&self) -> bool {
        !matches!(
            self,
            PyValue::List(_) | PyValue::Dict(_) | PyValue::Set(_) | PyValue::Instance(_)
        )
    }

    /// A stable hash for the `hash()` builtin. Only meaningful for
    /// hashable values; matches Python's `hash(True) == hash(1) == 1`
    /// convention for bool/int/float cross-equality.
    pub fn hash_value(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        match self {
            PyValue::None => 0u8.hash(&mut hasher),
            PyValue::Bool(b) => (*b as i64).hash(&mut hasher),
            PyValue::Int(i) => i.hash(&mut hasher),
            PyValue::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    (*f as i64).hash(&mut hasher)
                } else {
                    f.to_bits().hash(&mut hasher)
                }
            }
            PyValue::Str(s) => s.hash(&mut hasher),
            PyValue::Tuple(items) => {
                for item in items.iter() {
                    item.hash_value().hash(&mut hasher);
                }
            }
            _ => 0u8.hash(&mut hasher),
        }
        hasher.finish()
    }

    /// Reference/value identity for `is`/`is not`. Containers and
    /// closures compare by handle identity. Scalars approximate CPython's
    /// small-int/short-string interning: `None`/`bool` are singletons,
    /// small integers (-5..=256) and short strings (<=20 bytes, any
    /// encoding) compare equal-by-value, everything else never compares
    /// identical across distinct constructions even when equal-by-value.
    /// This is a documented concession (DESIGN.md), not a guarantee
    /// scripts should depend on beyond the cached ranges.
    pub fn is_same(&self, other: &PyValue) -> bool {
        match (self, other) {
            (PyValue::None, PyValue::None) => true,
            (PyValue::Bool(a), PyValue::Bool(b)) => a == b,
            (PyValue::Int(a), PyValue::Int(b)) => {
                *a == *b && (-5..=256).contains(a)
            }
            (PyValue::Str(a), PyValue::Str(b)) => {
                a == b && a.len() <= 20
            }
            (PyValue::List(a), PyValue::List(b)) => Rc::ptr_eq(a, b),
            (PyValue::Dict(a), PyValue::Dict(b)) => Rc::ptr_eq(a, b),
            (PyValue::Set(a), PyValue::Set(b)) => Rc::ptr_eq(a, b),
            (PyValue::Tuple(a), PyValue::Tuple(b)) => Rc::ptr_eq(a, b),
            (PyValue::Function(a), PyValue::Function(b)) => Rc::ptr_eq(a, b),
            (PyValue::Class(a), PyValue::Class(b)) => Rc::ptr_eq(a, b),
            (PyValue::Instance(a), PyValue::Instance(b)) => Rc::ptr_eq(a, b),
            (PyValue::BoundMethod(a), PyValue::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (PyValue::Builtin(a), PyValue::Builtin(b)) => Rc::ptr_eq(a, b),
            (PyValue::NativeFunction(a), PyValue::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (PyValue::Module(a), PyValue::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `str()`-style rendering (no quotes around strings).
    pub fn to_print_string(&self) -> String {
        match self {
            PyValue::Str(s) => s.clone(),
            // `str(exc)` yields just the message, matching CPython
            // (`repr(exc)`/uncaught-propagation display still carries the
            // type name via `Display` on `ExceptionData`).
            PyValue::Exception(e) => e.message.clone(),
            other => format!("{other}"),
        }
    }
}

impl PartialEq for PyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PyValue::None, PyValue::None) => true,
            (PyValue::Bool(a), PyValue::Bool(b)) => a == b,
            (PyValue::Int(a), PyValue::Int(b)) => a == b,
            (PyValue::Float(a), PyValue::Float(b)) => a == b,
            (PyValue::Str(a), PyValue::Str(b)) => a == b,
            // Python: True == 1, False == 0, and int/float compare by value.
            (PyValue::Bool(a), PyValue::Int(b)) | (PyValue::Int(b), PyValue::Bool(a)) => {
                (*a as i64) == *b
            }
            (PyValue::Int(a), PyValue::Float(b)) | (PyValue::Float(b), PyValue::Int(a)) => {
                (*a as f64) == *b
            }
            (PyValue::Bool(a), PyValue::Float(b)) | (PyValue::Float(b), PyValue::Bool(a)) => {
                (*a as i64 as f64) == *b
            }
            (PyValue::List(a), PyValue::List(b)) => *a.borrow() == *b.borrow(),
            (PyValue::Tuple(a), PyValue::Tuple(b)) => a == b,
            (PyValue::Set(a), PyValue::Set(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().all(|x| b.contains(x))
            }
            (PyValue::Dict(a), PyValue::Dict(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            (PyValue::Instance(a), PyValue::Instance(b)) => Rc::ptr_eq(a, b),
            (PyValue::Class(a), PyValue::Class(b)) => Rc::ptr_eq(a, b),
            (PyValue::Function(a), PyValue::Function(b)) => Rc::ptr_eq(a, b),
            (PyValue::Exception(a), PyValue::Exception(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyValue::None => write!(f, "None"),
            PyValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            PyValue::Int(i) => write!(f, "{i}"),
            PyValue::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            PyValue::Str(s) => write!(f, "{s}"),
            PyValue::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", repr(v))?;
                }
                write!(f, "]")
            }
            PyValue::Tuple(items) => {
                write!(f, "(")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", repr(v))?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            PyValue::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", repr(k), repr(v))?;
                }
                write!(f, "}}")
            }
            PyValue::Set(items) => {
                let items = items.borrow();
                if items.is_empty() {
                    return write!(f, "set()");
                }
                write!(f, "{{")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", repr(v))?;
                }
                write!(f, "}}")
            }
            PyValue::Function(func) => write!(
                f,
                "<function {}>",
                func.name.as_deref().unwrap_or("<lambda>")
            ),
            PyValue::Builtin(b) => write!(f, "<built-in function {}>", b.name),
            PyValue::Class(c) => write!(f, "<class '{}'>", c.name),
            PyValue::Instance(i) => write!(f, "<{} object>", i.class.name),
            PyValue::BoundMethod(m) => write!(f, "<bound method {}>", m.method),
            PyValue::Super(_) => write!(f, "<super>"),
            PyValue::Exception(e) => write!(f, "{e}"),
            PyValue::Module(m) => write!(f, "<module '{}'>", m.name),
            PyValue::NativeFunction(n) => write!(f, "<built-in function {}>", n.name),
        }
    }
}

/// `repr()`-style rendering: strings get quotes, containers render their
/// elements with `repr` recursively.
pub fn repr(value: &PyValue) -> String {
    match value {
        PyValue::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        other => format!("{other}"),
    }
}

/// Look up a key in a dict's backing association list by deep equality
/// (the "canonical key" of §3.1/§4 is, in this implementation, just
/// `PartialEq` scanned linearly rather than pre-hashed into a string -
/// see DESIGN.md "Canonical key").
pub fn dict_get(pairs: &[(PyValue, PyValue)], key: &PyValue) -> Option<PyValue> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

/// Insert or overwrite `key -> value` in a dict's backing vector,
/// preserving insertion order for new keys (distilled spec §3.1 Dict
/// notes, §9 "iteration order" resolution).
pub fn dict_set(pairs: &mut Vec<(PyValue, PyValue)>, key: PyValue, value: PyValue) {
    if let Some(slot) = pairs.iter_mut().find(|(k, _)| *k == key) {
        slot.1 = value;
    } else {
        pairs.push((key, value));
    }
}

pub fn dict_remove(pairs: &mut Vec<(PyValue, PyValue)>, key: &PyValue) -> Option<PyValue> {
    let idx = pairs.iter().position(|(k, _)| k == key)?;
    Some(pairs.remove(idx).1)
}

/// Materialize anything iterable (`list`/`tuple`/`set`/`str`/`dict`-by-keys)
/// into a plain `Vec`, for `for`-loops, unpacking, and the container
/// methods that accept an arbitrary iterable (`extend`, `update`, `join`).
pub fn iter_values(value: &PyValue) -> PyResult<Vec<PyValue>> {
    match value {
        PyValue::List(items) => Ok(items.borrow().clone()),
        PyValue::Tuple(items) => Ok((**items).clone()),
        PyValue::Set(items) => Ok(items.borrow().clone()),
        PyValue::Str(s) => Ok(s.chars().map(|c| PyValue::Str(c.to_string())).collect()),
        PyValue::Dict(pairs) => Ok(pairs.borrow().iter().map(|(k, _)| k.clone()).collect()),
        other => raise_result(
            "TypeError",
            format!("'{}' object is not iterable", other.type_name()),
        ),
    }
}

pub fn set_contains(items: &[PyValue], value: &PyValue) -> bool {
    items.iter().any(|v| v == value)
}

/// Insert `value` into a set's backing vector if not already present;
/// returns whether it was newly inserted.
pub fn set_add(items: &mut Vec<PyValue>, value: PyValue) -> bool {
    if set_contains(items, &value) {
        false
    } else {
        items.push(value);
        true
    }
}

/// An argument-type mismatch, surfaced by [`FromPyValue`] conversions and
/// by [`crate::ToolCallError`].
#[derive(Debug, Clone)]
pub struct TypeError {
    pub expected: &'static str,
    pub got: &'static str,
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, got {}", self.expected, self.got)
    }
}

impl std::error::Error for TypeError {}

/// Typed host-side extraction of a [`PyValue`] argument, for ergonomic
/// tool/builtin implementations (mirrors the `#[tool]` macro's codegen).
pub trait FromPyValue: Sized {
    fn from_py_value(value: &PyValue) -> Result<Self, TypeError>;
}

impl FromPyValue for i64 {
    fn from_py_value(value: &PyValue) -> Result<Self, TypeError> {
        value.as_int().ok_or(TypeError {
            expected: "int",
            got: value.type_name(),
        })
    }
}

impl FromPyValue for f64 {
    fn from_py_value(value: &PyValue) -> Result<Self, TypeError> {
        value.as_float().ok_or(TypeError {
            expected: "float",
            got: value.type_name(),
        })
    }
}

impl FromPyValue for bool {
    fn from_py_value(value: &PyValue) -> Result<Self, TypeError> {
        value.as_bool().ok_or(TypeError {
            expected: "bool",
            got: value.type_name(),
        })
    }
}

impl FromPyValue for String {
    fn from_py_value(value: &PyValue) -> Result<Self, TypeError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or(TypeError {
                expected: "str",
                got: value.type_name(),
            })
    }
}

impl<T: FromPyValue> FromPyValue for Vec<T> {
    fn from_py_value(value: &PyValue) -> Result<Self, TypeError> {
        match value {
            PyValue::List(items) => items
                .borrow()
                .iter()
                .map(T::from_py_value)
                .collect(),
            PyValue::Tuple(items) => items.iter().map(T::from_py_value).collect(),
            _ => Err(TypeError {
                expected: "list",
                got: value.type_name(),
            }),
        }
    }
}

impl From<i64> for PyValue {
    fn from(v: i64) -> Self {
        PyValue::Int(v)
    }
}
impl From<f64> for PyValue {
    fn from(v: f64) -> Self {
        PyValue::Float(v)
    }
}
impl From<bool> for PyValue {
    fn from(v: bool) -> Self {
        PyValue::Bool(v)
    }
}
impl From<String> for PyValue {
    fn from(v: String) -> Self {
        PyValue::Str(v)
    }
}
impl From<&str> for PyValue {
    fn from(v: &str) -> Self {
        PyValue::Str(v.to_string())
    }
}
impl<T: Into<PyValue>> From<Vec<T>> for PyValue {
    fn from(v: Vec<T>) -> Self {
        PyValue::list(v.into_iter().map(Into::into).collect())
    }
}
impl From<()> for PyValue {
    fn from(_: ()) -> Self {
        PyValue::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_defaults_true_for_callables() {
        let class = Rc::new(ClassData {
            name: "Foo".into(),
            base: None,
            methods: HashMap::new(),
            class_attrs: RefCell::new(HashMap::new()),
        });
        assert!(PyValue::Class(class).is_truthy());
    }

    #[test]
    fn bool_int_cross_equality() {
        assert_eq!(PyValue::Bool(true), PyValue::Int(1));
        assert_eq!(PyValue::Int(0), PyValue::Bool(false));
        assert_ne!(PyValue::Bool(true), PyValue::Int(2));
    }

    #[test]
    fn small_int_identity_is_value_based() {
        assert!(PyValue::Int(5).is_same(&PyValue::Int(5)));
        assert!(!PyValue::Int(1000).is_same(&PyValue::Int(1000)));
    }

    #[test]
    fn short_string_identity_is_byte_length_based_not_ascii_only() {
        // "café" is 5 bytes in UTF-8 (non-ASCII, but short) and must
        // compare `is`-identical across separate constructions, same as
        // any other short string.
        let a = PyValue::Str("café".to_string());
        let b = PyValue::Str("café".to_string());
        assert!(a.is_same(&b));

        let long_non_ascii = PyValue::Str("é".repeat(21));
        assert!(!long_non_ascii.is_same(&PyValue::Str("é".repeat(21))));
    }

    #[test]
    fn list_identity_is_handle_based() {
        let a = PyValue::list(vec![PyValue::Int(1)]);
        let b = a.clone();
        let c = PyValue::list(vec![PyValue::Int(1)]);
        assert!(a.is_same(&b));
        assert!(!a.is_same(&c));
        assert_eq!(a, c); // equal by value, not by identity
    }

    #[test]
    fn repr_quotes_strings_display_does_not() {
        let s = PyValue::Str("hi".to_string());
        assert_eq!(s.to_string(), "hi");
        assert_eq!(repr(&s), "'hi'");
    }
}
