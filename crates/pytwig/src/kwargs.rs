//! The normalised keyword-argument container passed to every builtin
//! (distilled spec §6.2: "Kwargs container: normalised keyword arguments
//! available via typed accessors with default fallback").
//!
//! The evaluator never validates a call's kwargs against a builtin's
//! expected names before invoking it (§6.2: "the evaluator doesn't
//! pre-validate kwargs") - an unrecognized name is simply never looked up
//! by the builtin that receives it. Order is preserved mostly for
//! `repr`-stability in diagnostics; lookups are by name, not position.

use crate::value::PyValue;

#[derive(Debug, Clone, Default)]
pub struct Kwargs(Vec<(String, PyValue)>);

impl Kwargs {
    pub fn new(pairs: Vec<(String, PyValue)>) -> Self {
        Kwargs(pairs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PyValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_or(&self, name: &str, default: PyValue) -> PyValue {
        self.get(name).cloned().unwrap_or(default)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).map(|v| v.is_truthy()).unwrap_or(default)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_int())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn into_pairs(self) -> Vec<(String, PyValue)> {
        self.0
    }
}
