//! Method dispatch tables for `str`/`list`/`tuple`/`dict`/`set` (distilled
//! spec §4.4 "Method dispatch").
//!
//! Type-indexed, match-based - no virtual dispatch, no trait objects for
//! method lookup - one dispatch function per value type. `list.sort` is
//! the only method that needs to call back into the evaluator (for its
//! `key=` callable), so it alone takes a `&Ctx`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ctx::Ctx;
use crate::flow::{raise_result, type_error, Outcome, PyResult};
use crate::invoke;
use crate::kwargs::Kwargs;
use crate::value::{dict_get, dict_remove, dict_set, repr, set_add, set_contains, PyValue};

fn want(name: &str, args: &[PyValue], n: usize) -> PyResult<()> {
    if args.len() != n {
        raise_result(
            "TypeError",
            format!(
                "{}() takes exactly {} argument(s) ({} given)",
                name,
                n,
                args.len()
            ),
        )
    } else {
        Ok(())
    }
}

fn want_range(name: &str, args: &[PyValue], lo: usize, hi: usize) -> PyResult<()> {
    if args.len() < lo || args.len() > hi {
        raise_result(
            "TypeError",
            format!("{}() takes {} to {} arguments ({} given)", name, lo, hi, args.len()),
        )
    } else {
        Ok(())
    }
}

fn arg_str<'a>(args: &'a [PyValue], i: usize, _name: &str) -> PyResult<&'a str> {
    match args[i].as_str() {
        Some(s) => Ok(s),
        None => type_error("str", args[i].type_name()),
    }
}

fn arg_int(args: &[PyValue], i: usize) -> PyResult<i64> {
    match args[i].as_int() {
        Some(v) => Ok(v),
        None => type_error("int", args[i].type_name()),
    }
}

fn fill_char(args: &[PyValue], i: usize) -> PyResult<char> {
    let s = arg_str(args, i, "fillchar")?;
    if s.chars().count() != 1 {
        return raise_result("TypeError", "the fill character must be exactly one character long");
    }
    Ok(s.chars().next().unwrap())
}

// --- str -----------------------------------------------------------------

pub fn call_str_method(s: &str, method: &str, args: &[PyValue], kw: &Kwargs) -> PyResult<PyValue> {
    let _ = kw;
    match method {
        "lower" => {
            want(method, args, 0)?;
            Ok(PyValue::Str(s.to_lowercase()))
        }
        "upper" => {
            want(method, args, 0)?;
            Ok(PyValue::Str(s.to_uppercase()))
        }
        "casefold" => {
            want(method, args, 0)?;
            Ok(PyValue::Str(s.to_lowercase()))
        }
        "swapcase" => {
            want(method, args, 0)?;
            let out: String = s
                .chars()
                .flat_map(|c| {
                    if c.is_uppercase() {
                        c.to_lowercase().collect::<Vec<_>>()
                    } else if c.is_lowercase() {
                        c.to_uppercase().collect::<Vec<_>>()
                    } else {
                        vec![c]
                    }
                })
                .collect();
            Ok(PyValue::Str(out))
        }
        "strip" | "lstrip" | "rstrip" => {
            want_range(method, args, 0, 1)?;
            let cutset: Option<Vec<char>> = match args.first() {
                Some(_) => Some(arg_str(args, 0, "chars")?.chars().collect()),
                None => None,
            };
            let is_cut = |c: char| match &cutset {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let out = match method {
                "strip" => s.trim_matches(is_cut).to_string(),
                "lstrip" => s.trim_start_matches(is_cut).to_string(),
                _ => s.trim_end_matches(is_cut).to_string(),
            };
            Ok(PyValue::Str(out))
        }
        "split" | "rsplit" => {
            want_range(method, args, 0, 2)?;
            let sep = match args.first() {
                Some(PyValue::None) | None => None,
                Some(_) => Some(arg_str(args, 0, "sep")?),
            };
            let maxsplit = match args.get(1) {
                Some(v) => arg_int(std::slice::from_ref(v), 0)?,
                None => -1,
            };
            let parts = split_impl(s, sep, maxsplit, method == "rsplit");
            Ok(PyValue::list(parts.into_iter().map(PyValue::Str).collect()))
        }
        "join" => {
            want(method, args, 1)?;
            let items = crate::value::iter_values(&args[0])?;
            let mut strings = Vec::with_capacity(items.len());
            for item in &items {
                match item {
                    PyValue::Str(v) => strings.push(v.clone()),
                    other => return type_error("str", other.type_name()),
                }
            }
            Ok(PyValue::Str(strings.join(s)))
        }
        "replace" => {
            want_range(method, args, 2, 3)?;
            let old = arg_str(args, 0, "old")?;
            let new = arg_str(args, 1, "new")?;
            let out = match args.get(2) {
                Some(v) => {
                    let n = arg_int(std::slice::from_ref(v), 0)?;
                    if n < 0 {
                        s.replace(old, new)
                    } else {
                        s.replacen(old, new, n as usize)
                    }
                }
                None => s.replace(old, new),
            };
            Ok(PyValue::Str(out))
        }
        "startswith" => {
            want(method, args, 1)?;
            Ok(PyValue::Bool(s.starts_with(arg_str(args, 0, "prefix")?)))
        }
        "endswith" => {
            want(method, args, 1)?;
            Ok(PyValue::Bool(s.ends_with(arg_str(args, 0, "suffix")?)))
        }
        "find" => {
            want(method, args, 1)?;
            let needle = arg_str(args, 0, "sub")?;
            Ok(PyValue::Int(s.find(needle).map(byte_to_char_idx(s)).unwrap_or(-1)))
        }
        "rfind" => {
            want(method, args, 1)?;
            let needle = arg_str(args, 0, "sub")?;
            Ok(PyValue::Int(s.rfind(needle).map(byte_to_char_idx(s)).unwrap_or(-1)))
        }
        "index" => {
            want(method, args, 1)?;
            let needle = arg_str(args, 0, "sub")?;
            match s.find(needle) {
                Some(b) => Ok(PyValue::Int(byte_to_char_idx(s)(b))),
                None => raise_result("ValueError", "substring not found"),
            }
        }
        "rindex" => {
            want(method, args, 1)?;
            let needle = arg_str(args, 0, "sub")?;
            match s.rfind(needle) {
                Some(b) => Ok(PyValue::Int(byte_to_char_idx(s)(b))),
                None => raise_result("ValueError", "substring not found"),
            }
        }
        "count" => {
            want(method, args, 1)?;
            let needle = arg_str(args, 0, "sub")?;
            if needle.is_empty() {
                Ok(PyValue::Int(s.chars().count() as i64 + 1))
            } else {
                Ok(PyValue::Int(s.matches(needle).count() as i64))
            }
        }
        "isdigit" | "isdecimal" | "isnumeric" => {
            want(method, args, 0)?;
            Ok(PyValue::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())))
        }
        "isalpha" => {
            want(method, args, 0)?;
            Ok(PyValue::Bool(!s.is_empty() && s.chars().all(|c| c.is_alphabetic())))
        }
        "isalnum" => {
            want(method, args, 0)?;
            Ok(PyValue::Bool(!s.is_empty() && s.chars().all(|c| c.is_alphanumeric())))
        }
        "isspace" => {
            want(method, args, 0)?;
            Ok(PyValue::Bool(!s.is_empty() && s.chars().all(|c| c.is_whitespace())))
        }
        "isupper" => {
            want(method, args, 0)?;
            let has_cased = s.chars().any(|c| c.is_alphabetic());
            Ok(PyValue::Bool(has_cased && !s.chars().any(|c| c.is_lowercase())))
        }
        "islower" => {
            want(method, args, 0)?;
            let has_cased = s.chars().any(|c| c.is_alphabetic());
            Ok(PyValue::Bool(has_cased && !s.chars().any(|c| c.is_uppercase())))
        }
        "istitle" => {
            want(method, args, 0)?;
            let mut prev_cased = false;
            let mut any_cased = false;
            let mut ok = true;
            for c in s.chars() {
                if c.is_alphabetic() {
                    any_cased = true;
                    let expect_upper = !prev_cased;
                    if expect_upper && !c.is_uppercase() {
                        ok = false;
                    }
                    if !expect_upper && !c.is_lowercase() {
                        ok = false;
                    }
                    prev_cased = true;
                } else {
                    prev_cased = false;
                }
            }
            Ok(PyValue::Bool(any_cased && ok))
        }
        "isidentifier" => {
            want(method, args, 0)?;
            let mut chars = s.chars();
            let ok = match chars.next() {
                Some(c) => (c.is_alphabetic() || c == '_') && chars.all(|c| c.is_alphanumeric() || c == '_'),
                None => false,
            };
            Ok(PyValue::Bool(ok))
        }
        "isprintable" => {
            want(method, args, 0)?;
            Ok(PyValue::Bool(s.chars().all(|c| !c.is_control())))
        }
        "title" => {
            want(method, args, 0)?;
            let mut out = String::with_capacity(s.len());
            let mut prev_cased = false;
            for c in s.chars() {
                if c.is_alphabetic() {
                    if prev_cased {
                        out.extend(c.to_lowercase());
                    } else {
                        out.extend(c.to_uppercase());
                    }
                    prev_cased = true;
                } else {
                    out.push(c);
                    prev_cased = false;
                }
            }
            Ok(PyValue::Str(out))
        }
        "capitalize" => {
            want(method, args, 0)?;
            let mut chars = s.chars();
            let out = match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
                None => String::new(),
            };
            Ok(PyValue::Str(out))
        }
        "format" => str_format(s, args, kw),
        "removeprefix" => {
            want(method, args, 1)?;
            let prefix = arg_str(args, 0, "prefix")?;
            Ok(PyValue::Str(s.strip_prefix(prefix).unwrap_or(s).to_string()))
        }
        "removesuffix" => {
            want(method, args, 1)?;
            let suffix = arg_str(args, 0, "suffix")?;
            Ok(PyValue::Str(s.strip_suffix(suffix).unwrap_or(s).to_string()))
        }
        "partition" => {
            want(method, args, 1)?;
            let sep = arg_str(args, 0, "sep")?;
            Ok(match s.find(sep) {
                Some(pos) => PyValue::tuple(vec![
                    PyValue::Str(s[..pos].to_string()),
                    PyValue::Str(sep.to_string()),
                    PyValue::Str(s[pos + sep.len()..].to_string()),
                ]),
                None => PyValue::tuple(vec![
                    PyValue::Str(s.to_string()),
                    PyValue::Str(String::new()),
                    PyValue::Str(String::new()),
                ]),
            })
        }
        "rpartition" => {
            want(method, args, 1)?;
            let sep = arg_str(args, 0, "sep")?;
            Ok(match s.rfind(sep) {
                Some(pos) => PyValue::tuple(vec![
                    PyValue::Str(s[..pos].to_string()),
                    PyValue::Str(sep.to_string()),
                    PyValue::Str(s[pos + sep.len()..].to_string()),
                ]),
                None => PyValue::tuple(vec![
                    PyValue::Str(String::new()),
                    PyValue::Str(String::new()),
                    PyValue::Str(s.to_string()),
                ]),
            })
        }
        "splitlines" => {
            want_range(method, args, 0, 1)?;
            let keepends = args.first().map(|v| v.is_truthy()).unwrap_or(false);
            Ok(PyValue::list(
                splitlines_impl(s, keepends).into_iter().map(PyValue::Str).collect(),
            ))
        }
        "center" | "ljust" | "rjust" => {
            want_range(method, args, 1, 2)?;
            let width = arg_int(args, 0)? as usize;
            let fill = if args.len() > 1 { fill_char(args, 1)? } else { ' ' };
            let slen = s.chars().count();
            if slen >= width {
                return Ok(PyValue::Str(s.to_string()));
            }
            let pad = width - slen;
            let out = match method {
                "ljust" => {
                    let mut r = s.to_string();
                    r.extend(std::iter::repeat(fill).take(pad));
                    r
                }
                "rjust" => {
                    let mut r: String = std::iter::repeat(fill).take(pad).collect();
                    r.push_str(s);
                    r
                }
                _ => {
                    let left = pad / 2;
                    let right = pad - left;
                    let mut r: String = std::iter::repeat(fill).take(left).collect();
                    r.push_str(s);
                    r.extend(std::iter::repeat(fill).take(right));
                    r
                }
            };
            Ok(PyValue::Str(out))
        }
        "zfill" => {
            want(method, args, 1)?;
            let width = arg_int(args, 0)? as usize;
            let slen = s.chars().count();
            if slen >= width {
                return Ok(PyValue::Str(s.to_string()));
            }
            let (sign, rest) = if let Some(r) = s.strip_prefix('+') {
                ("+", r)
            } else if let Some(r) = s.strip_prefix('-') {
                ("-", r)
            } else {
                ("", s)
            };
            let pad = width - slen;
            let mut out = String::with_capacity(width);
            out.push_str(sign);
            out.extend(std::iter::repeat('0').take(pad));
            out.push_str(rest);
            Ok(PyValue::Str(out))
        }
        "expandtabs" => {
            want_range(method, args, 0, 1)?;
            let tabsize = match args.first() {
                Some(v) => arg_int(std::slice::from_ref(v), 0)?.max(0) as usize,
                None => 8,
            };
            let mut out = String::with_capacity(s.len());
            let mut col = 0usize;
            for c in s.chars() {
                match c {
                    '\t' => {
                        if tabsize == 0 {
                            continue;
                        }
                        let advance = tabsize - (col % tabsize);
                        out.extend(std::iter::repeat(' ').take(advance));
                        col += advance;
                    }
                    '\n' | '\r' => {
                        out.push(c);
                        col = 0;
                    }
                    other => {
                        out.push(other);
                        col += 1;
                    }
                }
            }
            Ok(PyValue::Str(out))
        }
        "encode" => {
            want_range(method, args, 0, 1)?;
            Ok(PyValue::list(s.as_bytes().iter().map(|b| PyValue::Int(*b as i64)).collect()))
        }
        "maketrans" => {
            want_range(method, args, 1, 2)?;
            let from = arg_str(args, 0, "from")?;
            let to = arg_str(args, 1, "to")?;
            if from.chars().count() != to.chars().count() {
                return raise_result("ValueError", "maketrans arguments must have equal length");
            }
            let pairs = from
                .chars()
                .zip(to.chars())
                .map(|(f, t)| (PyValue::Str(f.to_string()), PyValue::Str(t.to_string())))
                .collect();
            Ok(PyValue::dict(pairs))
        }
        "translate" => {
            want(method, args, 1)?;
            let table = match &args[0] {
                PyValue::Dict(pairs) => pairs.borrow().clone(),
                other => return type_error("dict", other.type_name()),
            };
            let out: String = s
                .chars()
                .map(|c| {
                    let key = PyValue::Str(c.to_string());
                    match dict_get(&table, &key) {
                        Some(PyValue::Str(replacement)) => replacement,
                        Some(PyValue::None) => String::new(),
                        Some(_) | None => c.to_string(),
                    }
                })
                .collect();
            Ok(PyValue::Str(out))
        }
        _ => raise_result(
            "AttributeError",
            format!("'str' object has no attribute '{method}'"),
        ),
    }
}

fn byte_to_char_idx(s: &str) -> impl Fn(usize) -> i64 + '_ {
    move |byte_pos| s[..byte_pos].chars().count() as i64
}

fn split_impl(s: &str, sep: Option<&str>, maxsplit: i64, from_right: bool) -> Vec<String> {
    match sep {
        None => {
            let words: Vec<&str> = s.split_whitespace().collect();
            if maxsplit < 0 || (words.len() as i64) <= maxsplit + 1 {
                words.into_iter().map(str::to_string).collect()
            } else {
                // Whitespace-split maxsplit is rare enough in practice that
                // a full re-split from the chosen end is simplest.
                bounded_whitespace_split(s, maxsplit as usize, from_right)
            }
        }
        Some(sep) => {
            if maxsplit < 0 {
                s.split(sep).map(str::to_string).collect()
            } else if from_right {
                s.rsplitn(maxsplit as usize + 1, sep)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect()
            } else {
                s.splitn(maxsplit as usize + 1, sep).map(str::to_string).collect()
            }
        }
    }
}

fn bounded_whitespace_split(s: &str, maxsplit: usize, from_right: bool) -> Vec<String> {
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= maxsplit + 1 {
        return words.into_iter().map(str::to_string).collect();
    }
    if from_right {
        let keep = words.len() - maxsplit;
        let mut out = vec![words[..keep].join(" ")];
        out.extend(words[keep..].iter().map(|w| w.to_string()));
        out
    } else {
        let mut out: Vec<String> = words[..maxsplit].iter().map(|w| w.to_string()).collect();
        out.push(words[maxsplit..].join(" "));
        out
    }
}

fn splitlines_impl(s: &str, keepends: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    while i < len {
        if bytes[i] == b'\r' && i + 1 < len && bytes[i + 1] == b'\n' {
            lines.push(s[start..if keepends { i + 2 } else { i }].to_string());
            i += 2;
            start = i;
        } else if bytes[i] == b'\n' || bytes[i] == b'\r' {
            lines.push(s[start..if keepends { i + 1 } else { i }].to_string());
            i += 1;
            start = i;
        } else {
            i += 1;
        }
    }
    if start < len {
        lines.push(s[start..].to_string());
    }
    lines
}

/// `str.format(*args, **kwargs)`: positional, auto-indexed, and named
/// substitution, plus `!conversion`/`:spec` via the f-string mini-language.
fn str_format(s: &str, args: &[PyValue], kw: &Kwargs) -> PyResult<PyValue> {
    let mut result = String::new();
    let mut auto_idx = 0usize;
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        if chars[i] == '{' {
            if i + 1 < len && chars[i + 1] == '{' {
                result.push('{');
                i += 2;
                continue;
            }
            let start = i + 1;
            let mut end = start;
            let mut depth = 1;
            while end < len && depth > 0 {
                match chars[end] {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    end += 1;
                }
            }
            if end >= len {
                return raise_result("ValueError", "Single '{' encountered in format string");
            }
            let field: String = chars[start..end].iter().collect();
            let (name_part, rest) = match field.find(['!', ':']) {
                Some(idx) => (&field[..idx], &field[idx..]),
                None => (field.as_str(), ""),
            };
            let value = if name_part.is_empty() {
                let idx = auto_idx;
                auto_idx += 1;
                args.get(idx)
                    .cloned()
                    .ok_or(())
                    .or_else(|_| raise_result("IndexError", "Replacement index out of range"))?
            } else if let Ok(idx) = name_part.parse::<usize>() {
                args.get(idx)
                    .cloned()
                    .ok_or(())
                    .or_else(|_| raise_result("IndexError", "Replacement index out of range"))?
            } else {
                kw.get(name_part)
                    .cloned()
                    .ok_or(())
                    .or_else(|_| raise_result("KeyError", format!("'{name_part}'")))?
            };
            let conversion = rest.strip_prefix('!').and_then(|r| r.chars().next());
            let spec_text = rest.find(':').map(|p| &rest[p + 1..]).unwrap_or("");
            let value = crate::fstring::apply_conversion(&value, conversion);
            result.push_str(&crate::fstring::format_value(&value, spec_text));
            i = end + 1;
        } else if chars[i] == '}' {
            if i + 1 < len && chars[i + 1] == '}' {
                result.push('}');
                i += 2;
            } else {
                return raise_result("ValueError", "Single '}' encountered in format string");
            }
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }
    Ok(PyValue::Str(result))
}

// --- tuple -----------------------------------------------------------------

pub fn call_tuple_method(items: &Rc<Vec<PyValue>>, method: &str, args: &[PyValue]) -> PyResult<PyValue> {
    match method {
        "index" => {
            want(method, args, 1)?;
            match items.iter().position(|v| v == &args[0]) {
                Some(i) => Ok(PyValue::Int(i as i64)),
                None => raise_result("ValueError", "tuple.index(x): x not in tuple"),
            }
        }
        "count" => {
            want(method, args, 1)?;
            Ok(PyValue::Int(items.iter().filter(|v| *v == &args[0]).count() as i64))
        }
        _ => raise_result(
            "AttributeError",
            format!("'tuple' object has no attribute '{method}'"),
        ),
    }
}

// --- list --------------------------------------------------------------------

pub fn call_list_method(
    items: &Rc<RefCell<Vec<PyValue>>>,
    method: &str,
    args: &[PyValue],
    kw: &Kwargs,
    ctx: &Ctx,
) -> PyResult<PyValue> {
    match method {
        "append" => {
            want(method, args, 1)?;
            items.borrow_mut().push(args[0].clone());
            Ok(PyValue::None)
        }
        "extend" => {
            want(method, args, 1)?;
            let extra = crate::value::iter_values(&args[0])?;
            items.borrow_mut().extend(extra);
            Ok(PyValue::None)
        }
        "insert" => {
            want(method, args, 2)?;
            let index = arg_int(args, 0)?;
            let len = items.borrow().len() as i64;
            let idx = if index < 0 {
                (len + index).max(0) as usize
            } else {
                (index as usize).min(items.borrow().len())
            };
            items.borrow_mut().insert(idx, args[1].clone());
            Ok(PyValue::None)
        }
        "remove" => {
            want(method, args, 1)?;
            let pos = items.borrow().iter().position(|v| v == &args[0]);
            match pos {
                Some(idx) => {
                    items.borrow_mut().remove(idx);
                    Ok(PyValue::None)
                }
                None => raise_result("ValueError", "list.remove(x): x not in list"),
            }
        }
        "pop" => {
            want_range(method, args, 0, 1)?;
            let len = items.borrow().len();
            if len == 0 {
                return raise_result("IndexError", "pop from empty list");
            }
            let idx = match args.first() {
                None => len - 1,
                Some(_) => {
                    let i = arg_int(args, 0)?;
                    let resolved = if i < 0 { len as i64 + i } else { i };
                    if resolved < 0 || resolved >= len as i64 {
                        return raise_result("IndexError", "pop index out of range");
                    }
                    resolved as usize
                }
            };
            Ok(items.borrow_mut().remove(idx))
        }
        "clear" => {
            want(method, args, 0)?;
            items.borrow_mut().clear();
            Ok(PyValue::None)
        }
        "index" => {
            want(method, args, 1)?;
            let pos = items.borrow().iter().position(|v| v == &args[0]);
            match pos {
                Some(i) => Ok(PyValue::Int(i as i64)),
                None => raise_result("ValueError", "list.index(x): x not in list"),
            }
        }
        "count" => {
            want(method, args, 1)?;
            Ok(PyValue::Int(items.borrow().iter().filter(|v| *v == &args[0]).count() as i64))
        }
        "copy" => {
            want(method, args, 0)?;
            Ok(PyValue::list(items.borrow().clone()))
        }
        "reverse" => {
            want(method, args, 0)?;
            items.borrow_mut().reverse();
            Ok(PyValue::None)
        }
        "sort" => {
            want(method, args, 0)?;
            sort_list(items, kw, ctx)?;
            Ok(PyValue::None)
        }
        _ => raise_result(
            "AttributeError",
            format!("'list' object has no attribute '{method}'"),
        ),
    }
}

fn sort_list(items: &Rc<RefCell<Vec<PyValue>>>, kw: &Kwargs, ctx: &Ctx) -> PyResult<()> {
    let reverse = kw.get_bool("reverse", false);
    let key = kw.get("key").cloned();
    let mut snapshot = items.borrow().clone();

    let mut keyed: Vec<(PyValue, PyValue)> = Vec::with_capacity(snapshot.len());
    for v in snapshot.drain(..) {
        let k = match &key {
            Some(f) => invoke::call_value(f, vec![v.clone()], Vec::new(), ctx)?,
            None => v.clone(),
        };
        keyed.push((k, v));
    }

    let mut sort_err = None;
    keyed.sort_by(|(a, _), (b, _)| match ordering_key(a, b) {
        Ok(o) => o,
        Err(e) => {
            sort_err.get_or_insert(e);
            std::cmp::Ordering::Equal
        }
    });
    if let Some(e) = sort_err {
        return Err(e);
    }
    if reverse {
        keyed.reverse();
    }
    *items.borrow_mut() = keyed.into_iter().map(|(_, v)| v).collect();
    Ok(())
}

fn ordering_key(a: &PyValue, b: &PyValue) -> Result<std::cmp::Ordering, Outcome> {
    use std::cmp::Ordering;
    match (a, b) {
        (PyValue::Str(x), PyValue::Str(y)) => Ok(x.cmp(y)),
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
            _ => Err(crate::flow::raise("TypeError", format!(
                "'<' not supported between instances of '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

// --- dict --------------------------------------------------------------------

/// `dict.fromkeys(iterable, value=None)`: build a dict mapping every element
/// of `iterable` to the same `value`. Called on the `dict` builtin itself
/// rather than on an existing dict instance, so it lives alongside the
/// dict methods rather than inside `call_dict_method`.
pub fn dict_fromkeys(args: &[PyValue]) -> PyResult<PyValue> {
    want_range("fromkeys", args, 1, 2)?;
    let value = args.get(1).cloned().unwrap_or(PyValue::None);
    let mut pairs = Vec::new();
    for key in crate::value::iter_values(&args[0])? {
        dict_set(&mut pairs, key, value.clone());
    }
    Ok(PyValue::dict(pairs))
}

pub fn call_dict_method(
    pairs: &Rc<RefCell<Vec<(PyValue, PyValue)>>>,
    method: &str,
    args: &[PyValue],
    kw: &Kwargs,
) -> PyResult<PyValue> {
    match method {
        "get" => {
            want_range(method, args, 1, 2)?;
            let default = args.get(1).cloned().unwrap_or(PyValue::None);
            Ok(dict_get(&pairs.borrow(), &args[0]).unwrap_or(default))
        }
        "keys" => {
            want(method, args, 0)?;
            Ok(PyValue::list(pairs.borrow().iter().map(|(k, _)| k.clone()).collect()))
        }
        "values" => {
            want(method, args, 0)?;
            Ok(PyValue::list(pairs.borrow().iter().map(|(_, v)| v.clone()).collect()))
        }
        "items" => {
            want(method, args, 0)?;
            Ok(PyValue::list(
                pairs
                    .borrow()
                    .iter()
                    .map(|(k, v)| PyValue::tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            ))
        }
        "pop" => {
            want_range(method, args, 1, 2)?;
            match dict_remove(&mut pairs.borrow_mut(), &args[0]) {
                Some(v) => Ok(v),
                None => match args.get(1) {
                    Some(d) => Ok(d.clone()),
                    None => raise_result("KeyError", repr(&args[0])),
                },
            }
        }
        "popitem" => {
            want(method, args, 0)?;
            let mut pairs = pairs.borrow_mut();
            match pairs.pop() {
                Some((k, v)) => Ok(PyValue::tuple(vec![k, v])),
                None => raise_result("KeyError", "popitem(): dictionary is empty"),
            }
        }
        "setdefault" => {
            want_range(method, args, 1, 2)?;
            let default = args.get(1).cloned().unwrap_or(PyValue::None);
            let mut pairs = pairs.borrow_mut();
            if let Some(v) = dict_get(&pairs, &args[0]) {
                return Ok(v);
            }
            dict_set(&mut pairs, args[0].clone(), default.clone());
            Ok(default)
        }
        "update" => {
            want_range(method, args, 0, 1)?;
            let mut pairs = pairs.borrow_mut();
            if let Some(arg) = args.first() {
                match arg {
                    PyValue::Dict(other) => {
                        for (k, v) in other.borrow().iter() {
                            dict_set(&mut pairs, k.clone(), v.clone());
                        }
                    }
                    other => {
                        for item in crate::value::iter_values(other)? {
                            match item {
                                PyValue::Tuple(t) if t.len() == 2 => {
                                    dict_set(&mut pairs, t[0].clone(), t[1].clone());
                                }
                                PyValue::List(l) if l.borrow().len() == 2 => {
                                    let l = l.borrow();
                                    dict_set(&mut pairs, l[0].clone(), l[1].clone());
                                }
                                _ => {
                                    return raise_result(
                                        "ValueError",
                                        "dictionary update sequence element has wrong length",
                                    )
                                }
                            }
                        }
                    }
                }
            }
            for (name, value) in kw.clone().into_pairs() {
                dict_set(&mut pairs, PyValue::Str(name), value);
            }
            Ok(PyValue::None)
        }
        "clear" => {
            want(method, args, 0)?;
            pairs.borrow_mut().clear();
            Ok(PyValue::None)
        }
        "copy" => {
            want(method, args, 0)?;
            Ok(PyValue::dict(pairs.borrow().clone()))
        }
        _ => raise_result(
            "AttributeError",
            format!("'dict' object has no attribute '{method}'"),
        ),
    }
}

// --- set --------------------------------------------------------------------

pub fn call_set_method(items: &Rc<RefCell<Vec<PyValue>>>, method: &str, args: &[PyValue]) -> PyResult<PyValue> {
    match method {
        "add" => {
            want(method, args, 1)?;
            if !args[0].is_hashable() {
                return raise_result("TypeError", format!("unhashable type: '{}'", args[0].type_name()));
            }
            set_add(&mut items.borrow_mut(), args[0].clone());
            Ok(PyValue::None)
        }
        "discard" => {
            want(method, args, 1)?;
            let mut items = items.borrow_mut();
            if let Some(pos) = items.iter().position(|v| v == &args[0]) {
                items.remove(pos);
            }
            Ok(PyValue::None)
        }
        "remove" => {
            want(method, args, 1)?;
            let mut items = items.borrow_mut();
            match items.iter().position(|v| v == &args[0]) {
                Some(pos) => {
                    items.remove(pos);
                    Ok(PyValue::None)
                }
                None => raise_result("KeyError", repr(&args[0])),
            }
        }
        "pop" => {
            want(method, args, 0)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                raise_result("KeyError", "pop from an empty set")
            } else {
                Ok(items.remove(0))
            }
        }
        "clear" => {
            want(method, args, 0)?;
            items.borrow_mut().clear();
            Ok(PyValue::None)
        }
        "copy" => {
            want(method, args, 0)?;
            Ok(PyValue::set(items.borrow().clone()))
        }
        "union" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            let mut result = items.borrow().clone();
            for v in other {
                set_add(&mut result, v);
            }
            Ok(PyValue::set(result))
        }
        "intersection" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            let result = items.borrow().iter().filter(|v| set_contains(&other, v)).cloned().collect();
            Ok(PyValue::set(result))
        }
        "difference" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            let result = items.borrow().iter().filter(|v| !set_contains(&other, v)).cloned().collect();
            Ok(PyValue::set(result))
        }
        "symmetric_difference" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            let items = items.borrow();
            let mut result: Vec<PyValue> = items.iter().filter(|v| !set_contains(&other, v)).cloned().collect();
            for v in &other {
                if !set_contains(&items, v) {
                    result.push(v.clone());
                }
            }
            Ok(PyValue::set(result))
        }
        "issubset" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            Ok(PyValue::Bool(items.borrow().iter().all(|v| set_contains(&other, v))))
        }
        "issuperset" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            let items = items.borrow();
            Ok(PyValue::Bool(other.iter().all(|v| set_contains(&items, v))))
        }
        "isdisjoint" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            Ok(PyValue::Bool(!items.borrow().iter().any(|v| set_contains(&other, v))))
        }
        "update" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            let mut items = items.borrow_mut();
            for v in other {
                if !v.is_hashable() {
                    return raise_result("TypeError", format!("unhashable type: '{}'", v.type_name()));
                }
                set_add(&mut items, v);
            }
            Ok(PyValue::None)
        }
        "intersection_update" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            items.borrow_mut().retain(|v| set_contains(&other, v));
            Ok(PyValue::None)
        }
        "difference_update" => {
            want(method, args, 1)?;
            let other = to_set_items(&args[0])?;
            items.borrow_mut().retain(|v| !set_contains(&other, v));
            Ok(PyValue::None)
        }
        _ => raise_result(
            "AttributeError",
            format!("'set' object has no attribute '{method}'"),
        ),
    }
}

fn to_set_items(value: &PyValue) -> PyResult<Vec<PyValue>> {
    crate::value::iter_values(value)
}
