//! Control signals and the combined evaluation outcome.
//!
//! The distilled data model lists `ReturnValue`/`Break`/`Continue`/`Error`/
//! `Exception` as value tags, but they are never observable as ordinary
//! script values - they are what a statement-walking function returns to
//! signal non-local control transfer. Modeling them as Rust enum variants
//! of a result-sum-type (rather than as `PyValue` tags, and rather than as
//! Rust panics or `std::error::Error`-based unwinding) is the idiomatic
//! systems-language rendering of that design: a `match` at every call site
//! that needs to intercept `return`/`break`/`continue`/an exception, and a
//! plain `?` everywhere else.

use crate::error::Error;
use crate::value::PyValue;

/// A non-local control transfer produced by evaluating a statement or
/// expression.
#[derive(Debug, Clone)]
pub enum Signal {
    Return(PyValue),
    Break,
    Continue,
    /// A script-catchable fault in flight; always wraps `PyValue::Exception`.
    Raise(PyValue),
}

/// Everything that can interrupt ordinary evaluation: a control signal
/// (catchable by the right enclosing construct) or an uncatchable
/// [`Error`] (never caught by script-level `try`/`except`).
#[derive(Debug, Clone)]
pub enum Outcome {
    Signal(Signal),
    Error(Error),
}

impl From<Error> for Outcome {
    fn from(e: Error) -> Self {
        Outcome::Error(e)
    }
}

impl From<Signal> for Outcome {
    fn from(s: Signal) -> Self {
        Outcome::Signal(s)
    }
}

pub type PyResult<T> = std::result::Result<T, Outcome>;

/// Build a `Raise` signal for a script-catchable fault.
pub fn raise(type_name: impl Into<String>, message: impl Into<String>) -> Outcome {
    Outcome::Signal(Signal::Raise(PyValue::exception(type_name, message)))
}

pub fn raise_result<T>(type_name: impl Into<String>, message: impl Into<String>) -> PyResult<T> {
    Err(raise(type_name, message))
}

/// Helper for the common "wrong type passed" fault.
pub fn type_error<T>(expected: &str, got: &str) -> PyResult<T> {
    raise_result("TypeError", format!("expected {expected}, got {got}"))
}
