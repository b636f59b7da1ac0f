//! Built-in modules (`math`, `json`, `typing`) a script can `import`
//! (distilled spec §4.3 "imports resolve through a single host-supplied
//! hook"; supplemented per §9 with the handful of standard-library
//! modules scripts most often reach for).
//!
//! Each module is a plain [`ModuleData`] built once and handed to scripts
//! by value - no lazy loading, no submodules, no `sys.modules` cache,
//! since a sandboxed run only ever needs these tables built once.

use std::rc::Rc;

use crate::ctx::Ctx;
use crate::flow::{raise, raise_result, type_error, PyResult};
use crate::kwargs::Kwargs;
use crate::value::{ModuleData, NativeFunctionData, PyValue};

fn native(name: &str, func: crate::value::NativeFn) -> PyValue {
    PyValue::NativeFunction(Rc::new(NativeFunctionData {
        name: name.to_string(),
        func,
    }))
}

fn arg1(args: &[PyValue]) -> PyResult<f64> {
    if args.len() != 1 {
        return raise_result("TypeError", "expected exactly one argument");
    }
    match args[0].as_float() {
        Some(f) => Ok(f),
        None => type_error("a number", args[0].type_name()),
    }
}

fn math_sqrt(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    let x = arg1(&args)?;
    if x < 0.0 {
        return raise_result("ValueError", "math domain error");
    }
    Ok(PyValue::Float(x.sqrt()))
}
fn math_floor(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Int(arg1(&args)?.floor() as i64))
}
fn math_ceil(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Int(arg1(&args)?.ceil() as i64))
}
fn math_trunc(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Int(arg1(&args)?.trunc() as i64))
}
fn math_fabs(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.abs()))
}
fn math_exp(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.exp()))
}
fn math_log(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    match args.len() {
        1 => {
            let x = arg1(&args)?;
            if x <= 0.0 {
                return raise_result("ValueError", "math domain error");
            }
            Ok(PyValue::Float(x.ln()))
        }
        2 => {
            let x = match args[0].as_float() {
                Some(f) => f,
                None => return type_error("a number", args[0].type_name()),
            };
            let base = match args[1].as_float() {
                Some(f) => f,
                None => return type_error("a number", args[1].type_name()),
            };
            if x <= 0.0 {
                return raise_result("ValueError", "math domain error");
            }
            Ok(PyValue::Float(x.log(base)))
        }
        _ => raise_result("TypeError", "log() takes 1 or 2 arguments"),
    }
}
fn math_log2(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.log2()))
}
fn math_log10(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.log10()))
}
fn math_sin(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.sin()))
}
fn math_cos(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.cos()))
}
fn math_tan(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.tan()))
}
fn math_asin(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.asin()))
}
fn math_acos(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.acos()))
}
fn math_atan(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.atan()))
}
fn math_atan2(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    if args.len() != 2 {
        return raise_result("TypeError", "atan2() takes exactly 2 arguments");
    }
    let y = match args[0].as_float() {
        Some(f) => f,
        None => return type_error("a number", args[0].type_name()),
    };
    let x = match args[1].as_float() {
        Some(f) => f,
        None => return type_error("a number", args[1].type_name()),
    };
    Ok(PyValue::Float(y.atan2(x)))
}
fn math_pow(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    if args.len() != 2 {
        return raise_result("TypeError", "pow() takes exactly 2 arguments");
    }
    let base = match args[0].as_float() {
        Some(f) => f,
        None => return type_error("a number", args[0].type_name()),
    };
    let exp = match args[1].as_float() {
        Some(f) => f,
        None => return type_error("a number", args[1].type_name()),
    };
    Ok(PyValue::Float(base.powf(exp)))
}
fn math_isnan(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Bool(arg1(&args)?.is_nan()))
}
fn math_isinf(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Bool(arg1(&args)?.is_infinite()))
}
fn math_isfinite(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Bool(arg1(&args)?.is_finite()))
}
fn math_degrees(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.to_degrees()))
}
fn math_radians(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    Ok(PyValue::Float(arg1(&args)?.to_radians()))
}
fn math_gcd(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    if args.len() != 2 {
        return raise_result("TypeError", "gcd() takes exactly 2 arguments");
    }
    let mut a = match args[0].as_int() {
        Some(v) => v.abs(),
        None => return type_error("int", args[0].type_name()),
    };
    let mut b = match args[1].as_int() {
        Some(v) => v.abs(),
        None => return type_error("int", args[1].type_name()),
    };
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    Ok(PyValue::Int(a))
}
fn math_factorial(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
    let n = match args.first().and_then(|v| v.as_int()) {
        Some(n) => n,
        None => return raise_result("TypeError", "factorial() takes exactly 1 argument"),
    };
    if n < 0 {
        return raise_result("ValueError", "factorial() not defined for negative values");
    }
    let mut result: i64 = 1;
    for i in 2..=n {
        result = result.wrapping_mul(i);
    }
    Ok(PyValue::Int(result))
}

pub fn math_module() -> PyValue {
    let mut attrs: Vec<(String, PyValue)> = Vec::new();
    macro_rules! constant {
        ($name:literal, $value:expr) => {
            attrs.push(($name.to_string(), PyValue::Float($value)));
        };
    }
    constant!("pi", std::f64::consts::PI);
    constant!("e", std::f64::consts::E);
    constant!("tau", std::f64::consts::TAU);
    constant!("inf", f64::INFINITY);
    constant!("nan", f64::NAN);

    macro_rules! func {
        ($name:literal, $f:expr) => {
            attrs.push((concat!($name).to_string(), native(concat!("math.", $name), $f)));
        };
    }
    func!("sqrt", math_sqrt);
    func!("floor", math_floor);
    func!("ceil", math_ceil);
    func!("trunc", math_trunc);
    func!("fabs", math_fabs);
    func!("exp", math_exp);
    func!("log", math_log);
    func!("log2", math_log2);
    func!("log10", math_log10);
    func!("sin", math_sin);
    func!("cos", math_cos);
    func!("tan", math_tan);
    func!("asin", math_asin);
    func!("acos", math_acos);
    func!("atan", math_atan);
    func!("atan2", math_atan2);
    func!("pow", math_pow);
    func!("isnan", math_isnan);
    func!("isinf", math_isinf);
    func!("isfinite", math_isfinite);
    func!("degrees", math_degrees);
    func!("radians", math_radians);
    func!("gcd", math_gcd);
    func!("factorial", math_factorial);

    PyValue::Module(Rc::new(ModuleData {
        name: "math".to_string(),
        attrs,
    }))
}

/// `json.loads`/`json.dumps`, gated behind the `json` feature since it
/// pulls in `serde_json` (carried as an ambient convenience module, not a
/// core language feature).
#[cfg(feature = "json")]
pub fn json_module() -> PyValue {
    fn json_loads(_c: &Ctx, args: Vec<PyValue>, _k: Kwargs) -> PyResult<PyValue> {
        if args.len() != 1 {
            return raise_result("TypeError", "loads() takes exactly 1 argument");
        }
        let text = match &args[0] {
            PyValue::Str(s) => s,
            other => return type_error("str", other.type_name()),
        };
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| raise("ValueError", format!("{e}")))?;
        Ok(json_to_pyvalue(&value))
    }

    fn json_dumps(_c: &Ctx, args: Vec<PyValue>, kw: Kwargs) -> PyResult<PyValue> {
        if args.len() != 1 {
            return raise_result("TypeError", "dumps() takes exactly 1 argument");
        }
        let value = pyvalue_to_json(&args[0])?;
        let text = if kw.get_int("indent").is_some() {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .map_err(|e| raise("ValueError", format!("{e}")))?;
        Ok(PyValue::Str(text))
    }

    let attrs = vec![
        ("loads".to_string(), native("json.loads", json_loads)),
        ("dumps".to_string(), native("json.dumps", json_dumps)),
    ];
    PyValue::Module(Rc::new(ModuleData {
        name: "json".to_string(),
        attrs,
    }))
}

#[cfg(feature = "json")]
fn json_to_pyvalue(value: &serde_json::Value) -> PyValue {
    match value {
        serde_json::Value::Null => PyValue::None,
        serde_json::Value::Bool(b) => PyValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                PyValue::Int(i)
            } else {
                PyValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => PyValue::Str(s.clone()),
        serde_json::Value::Array(items) => PyValue::list(items.iter().map(json_to_pyvalue).collect()),
        serde_json::Value::Object(map) => PyValue::dict(
            map.iter()
                .map(|(k, v)| (PyValue::Str(k.clone()), json_to_pyvalue(v)))
                .collect(),
        ),
    }
}

#[cfg(feature = "json")]
fn pyvalue_to_json(value: &PyValue) -> PyResult<serde_json::Value> {
    Ok(match value {
        PyValue::None => serde_json::Value::Null,
        PyValue::Bool(b) => serde_json::Value::Bool(*b),
        PyValue::Int(i) => serde_json::Value::from(*i),
        PyValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        PyValue::Str(s) => serde_json::Value::String(s.clone()),
        PyValue::List(items) => {
            let items = items.borrow();
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(pyvalue_to_json(item)?);
            }
            serde_json::Value::Array(out)
        }
        PyValue::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(pyvalue_to_json(item)?);
            }
            serde_json::Value::Array(out)
        }
        PyValue::Dict(pairs) => {
            let mut map = serde_json::Map::new();
            for (k, v) in pairs.borrow().iter() {
                let key = match k {
                    PyValue::Str(s) => s.clone(),
                    other => other.to_print_string(),
                };
                map.insert(key, pyvalue_to_json(v)?);
            }
            serde_json::Value::Object(map)
        }
        other => return type_error("a JSON-serializable value", other.type_name()),
    })
}

/// Binds the handful of `typing` names scripts tend to `import` purely so
/// the import doesn't fail; none carry runtime meaning since this runtime
/// has no static type checker (Non-goal: "static type checking").
pub fn typing_module() -> PyValue {
    const NAMES: &[&str] = &[
        "Any", "Optional", "Union", "List", "Dict", "Tuple", "Set", "FrozenSet", "Callable",
        "Iterable", "Iterator", "Generator", "Sequence", "Mapping", "MutableMapping", "TypeVar",
        "Generic", "ClassVar", "Final", "Literal", "NoReturn", "Never", "Type", "NamedTuple",
        "TypedDict", "Protocol", "Annotated", "TypeAlias", "ParamSpec", "Concatenate",
        "TypeGuard", "Self", "Unpack", "Required", "NotRequired", "TYPE_CHECKING",
    ];
    let attrs = NAMES
        .iter()
        .map(|name| {
            (
                name.to_string(),
                if *name == "TYPE_CHECKING" {
                    PyValue::Bool(false)
                } else {
                    PyValue::None
                },
            )
        })
        .collect();
    PyValue::Module(Rc::new(ModuleData {
        name: "typing".to_string(),
        attrs,
    }))
}

/// The modules this crate ships out of the box, consulted by
/// [`crate::sandbox::Sandbox`]'s default import hook before falling
/// through to any host-registered module.
pub fn resolve_builtin_module(name: &str) -> Option<PyValue> {
    match name {
        "math" => Some(math_module()),
        #[cfg(feature = "json")]
        "json" => Some(json_module()),
        "typing" => Some(typing_module()),
        _ => None,
    }
}
