//! Slicing for `list`/`tuple`/`str` (distilled spec §4.1 "Slicing").
//!
//! Grounded on the sibling sandbox crate's `slice.rs` index-resolution
//! algorithm, generalized to also slice `Tuple` and to the signed
//! start/stop/step triple with step-sign-dependent defaults the distilled
//! spec requires. Strings are indexed/sliced by Unicode scalar value
//! (codepoint), not by byte - an explicit Open Question resolution, see
//! DESIGN.md.

use crate::flow::{raise_result, PyResult};
use crate::value::PyValue;

/// Resolve the effective `(start, stop)` bounds for a slice of `len`
/// elements given optional, possibly-negative `start`/`stop` and a
/// nonzero `step`. Mirrors CPython's `slice.indices()`.
fn resolve_bounds(len: i64, start: Option<i64>, stop: Option<i64>, step: i64) -> (i64, i64) {
    let clamp = |i: i64, lo: i64, hi: i64| i.max(lo).min(hi);
    let wrap = |i: i64| if i < 0 { i + len } else { i };

    if step > 0 {
        let start = match start {
            Some(i) => clamp(wrap(i), 0, len),
            None => 0,
        };
        let stop = match stop {
            Some(i) => clamp(wrap(i), 0, len),
            None => len,
        };
        (start, stop)
    } else {
        let start = match start {
            Some(i) => clamp(wrap(i), -1, len - 1),
            None => len - 1,
        };
        let stop = match stop {
            Some(i) => clamp(wrap(i), -1, len - 1),
            None => -1,
        };
        (start, stop)
    }
}

pub(crate) fn indices(len: i64, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> PyResult<Vec<usize>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return raise_result("ValueError", "slice step cannot be zero");
    }
    let (start, stop) = resolve_bounds(len, start, stop, step);
    let mut out = Vec::new();
    if step > 0 {
        let mut i = start;
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        let mut i = start;
        while i > stop {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

pub fn slice_list(items: &[PyValue], start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> PyResult<PyValue> {
    let idx = indices(items.len() as i64, start, stop, step)?;
    Ok(PyValue::list(idx.into_iter().map(|i| items[i].clone()).collect()))
}

pub fn slice_tuple(items: &[PyValue], start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> PyResult<PyValue> {
    let idx = indices(items.len() as i64, start, stop, step)?;
    Ok(PyValue::tuple(idx.into_iter().map(|i| items[i].clone()).collect()))
}

pub fn slice_str(s: &str, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> PyResult<PyValue> {
    let chars: Vec<char> = s.chars().collect();
    let idx = indices(chars.len() as i64, start, stop, step)?;
    Ok(PyValue::Str(idx.into_iter().map(|i| chars[i]).collect()))
}

/// Resolve a single (possibly negative) index into `len` elements;
/// out-of-range returns `None` rather than raising - callers decide
/// whether that is an `IndexError` (indexing) or a probe (`in`).
pub fn resolve_index(len: usize, idx: i64) -> Option<usize> {
    let len = len as i64;
    let actual = if idx < 0 { idx + len } else { idx };
    if actual >= 0 && actual < len {
        Some(actual as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(xs: &[i64]) -> Vec<PyValue> {
        xs.iter().map(|i| PyValue::Int(*i)).collect()
    }

    #[test]
    fn step_two_slice() {
        let items = ints(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let result = slice_list(&items, Some(1), Some(8), Some(2)).unwrap();
        assert_eq!(result, PyValue::list(ints(&[1, 3, 5, 7])));
    }

    #[test]
    fn negative_step_reverse() {
        let items = ints(&[0, 1, 2, 3, 4, 5]);
        let result = slice_list(&items, None, None, Some(-1)).unwrap();
        assert_eq!(result, PyValue::list(ints(&[5, 4, 3, 2, 1, 0])));
    }

    #[test]
    fn string_step_negative_two() {
        let result = slice_str("abcdefgh", None, None, Some(-2)).unwrap();
        assert_eq!(result, PyValue::Str("hfdb".to_string()));
    }

    #[test]
    fn zero_step_is_error() {
        let items = ints(&[1, 2, 3]);
        assert!(slice_list(&items, None, None, Some(0)).is_err());
    }

    #[test]
    fn full_slice_round_trips() {
        let items = ints(&[1, 2, 3]);
        let result = slice_list(&items, None, None, None).unwrap();
        assert_eq!(result, PyValue::list(ints(&[1, 2, 3])));
    }
}
