//! The f-string / `str.format` format-spec mini-language (distilled spec
//! §4.1 "F-strings interleave literal fragments with evaluated
//! expressions, each formatted through a per-slot format-spec
//! sub-language").
//!
//! Supports, at minimum, the distilled spec's required subset: bare
//! (`{}`), zero-padded/plain decimal (`{:d}`, `{:05d}`), and default float
//! rendering (whole numbers as `.1f`, otherwise shortest round-trip).
//! SPEC_FULL.md's §4.1 expansion additionally recognizes fill/align, sign,
//! width, precision and a `d/f/x/o/b/%` type char; unknown specs fall
//! back to `inspect` (`repr`/`Display`), never panicking on malformed
//! input.

use crate::value::{repr, PyValue};

#[derive(Default)]
struct Spec {
    fill: char,
    align: Option<char>, // '<' '>' '^' '='
    sign: Option<char>,  // '+' '-' ' '
    alt: bool,           // '#'
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
    ty: Option<char>, // d f x X o b e E g G s %
}

fn parse_spec(spec: &str) -> Spec {
    let mut chars: Vec<char> = spec.chars().collect();
    let mut out = Spec {
        fill: ' ',
        ..Default::default()
    };
    let mut i = 0;

    if chars.len() >= 2 && matches!(chars[1], '<' | '>' | '^' | '=') {
        out.fill = chars[0];
        out.align = Some(chars[1]);
        i = 2;
    } else if !chars.is_empty() && matches!(chars[0], '<' | '>' | '^' | '=') {
        out.align = Some(chars[0]);
        i = 1;
    }

    if i < chars.len() && matches!(chars[i], '+' | '-' | ' ') {
        out.sign = Some(chars[i]);
        i += 1;
    }
    if i < chars.len() && chars[i] == '#' {
        out.alt = true;
        i += 1;
    }
    if i < chars.len() && chars[i] == '0' {
        out.zero_pad = true;
        if out.fill == ' ' {
            out.fill = '0';
        }
        i += 1;
    }
    let width_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i > width_start {
        out.width = chars[width_start..i].iter().collect::<String>().parse().ok();
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        let prec_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        out.precision = chars[prec_start..i].iter().collect::<String>().parse().ok();
    }
    if i < chars.len() {
        out.ty = Some(chars[i]);
        i += 1;
    }
    let _ = chars.drain(..i.min(chars.len()));
    out
}

fn pad(body: String, spec: &Spec, default_align_right: bool) -> String {
    let width = match spec.width {
        Some(w) if w > body.chars().count() => w,
        _ => return body,
    };
    let deficit = width - body.chars().count();
    let align = spec.align.unwrap_or(if default_align_right { '>' } else { '<' });
    match align {
        '<' => format!("{body}{}", spec.fill.to_string().repeat(deficit)),
        '>' => format!("{}{body}", spec.fill.to_string().repeat(deficit)),
        '^' => {
            let left = deficit / 2;
            let right = deficit - left;
            format!(
                "{}{body}{}",
                spec.fill.to_string().repeat(left),
                spec.fill.to_string().repeat(right)
            )
        }
        '=' => {
            // sign-aware zero padding: pad after a leading sign.
            if let Some(rest) = body.strip_prefix('-') {
                format!("-{}{rest}", spec.fill.to_string().repeat(deficit))
            } else {
                format!("{}{body}", spec.fill.to_string().repeat(deficit))
            }
        }
        _ => body,
    }
}

fn apply_sign(body: String, negative: bool, spec: &Spec) -> String {
    if negative {
        return body;
    }
    match spec.sign {
        Some('+') => format!("+{body}"),
        Some(' ') => format!(" {body}"),
        _ => body,
    }
}

fn format_with_spec(value: &PyValue, spec: &Spec) -> String {
    match spec.ty {
        Some('d') => match value.as_int() {
            Some(i) => {
                let body = apply_sign(i.unsigned_abs().to_string(), i < 0, spec);
                let body = if i < 0 { format!("-{body}") } else { body };
                pad(body, spec, true)
            }
            None => default_render(value),
        },
        Some('x') | Some('X') => match value.as_int() {
            Some(i) => {
                let body = if spec.ty == Some('X') {
                    format!("{:X}", i)
                } else {
                    format!("{:x}", i)
                };
                let body = if spec.alt {
                    format!("0x{body}")
                } else {
                    body
                };
                pad(body, spec, true)
            }
            None => default_render(value),
        },
        Some('o') => match value.as_int() {
            Some(i) => pad(format!("{:o}", i), spec, true),
            None => default_render(value),
        },
        Some('b') => match value.as_int() {
            Some(i) => pad(format!("{:b}", i), spec, true),
            None => default_render(value),
        },
        Some('f') | Some('F') => match value.as_float() {
            Some(f) => {
                let prec = spec.precision.unwrap_or(6);
                let body = apply_sign(format!("{:.*}", prec, f.abs()), f < 0.0, spec);
                let body = if f < 0.0 { format!("-{body}") } else { body };
                pad(body, spec, true)
            }
            None => default_render(value),
        },
        Some('e') | Some('E') => match value.as_float() {
            Some(f) => {
                let prec = spec.precision.unwrap_or(6);
                pad(format!("{:.*e}", prec, f), spec, true)
            }
            None => default_render(value),
        },
        Some('%') => match value.as_float() {
            Some(f) => {
                let prec = spec.precision.unwrap_or(6);
                pad(format!("{:.*}%", prec, f * 100.0), spec, true)
            }
            None => default_render(value),
        },
        Some('s') | None => {
            let mut body = match value {
                PyValue::Str(s) => s.clone(),
                other => default_render(other),
            };
            if let Some(prec) = spec.precision {
                body = body.chars().take(prec).collect();
            }
            pad(body, spec, false)
        }
        Some(_) => default_render(value),
    }
}

fn default_render(value: &PyValue) -> String {
    value.to_print_string()
}

/// Format one `{expr:spec}` slot; `spec` is the raw text after the colon
/// (empty string for a bare `{expr}`). Unknown/malformed specs fall back
/// to the value's default (`str()`) rendering rather than erroring.
pub fn format_value(value: &PyValue, spec_text: &str) -> String {
    if spec_text.is_empty() {
        return default_render(value);
    }
    let spec = parse_spec(spec_text);
    format_with_spec(value, &spec)
}

/// `!r`/`!s`/`!a` conversion applied before the format spec.
pub fn apply_conversion(value: &PyValue, conversion: Option<char>) -> PyValue {
    match conversion {
        Some('r') | Some('a') => PyValue::Str(repr(value)),
        Some('s') | None => value.clone(),
        Some(_) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_spec_uses_default_render() {
        assert_eq!(format_value(&PyValue::Int(5), ""), "5");
        assert_eq!(format_value(&PyValue::Float(2.0), ""), "2.0");
    }

    #[test]
    fn zero_padded_decimal() {
        assert_eq!(format_value(&PyValue::Int(7), "03d"), "007");
    }

    #[test]
    fn plain_decimal_width() {
        assert_eq!(format_value(&PyValue::Int(42), "5d"), "   42");
    }

    #[test]
    fn unknown_spec_falls_back_to_inspect() {
        assert_eq!(format_value(&PyValue::Bool(true), "zzz"), "True");
    }
}
