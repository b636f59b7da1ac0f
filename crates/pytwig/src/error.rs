//! The uncatchable error channel.
//!
//! Script-catchable faults (`ZeroDivisionError`, `KeyError`, a user `raise`,
//! cancellation, a blown step/recursion budget, ...) are never represented
//! here - they travel as `PyValue::Exception` wrapped in
//! [`crate::flow::Signal::Raise`] and can be caught by `try`/`except`, per
//! spec.md §7 ("Errors carry ... and are catchable by `except` ... e.g.
//! `CancelledError`, `TimeoutError`"). `Error` is reserved for failures
//! that never reach a script's own `try` at all: malformed input the
//! parser rejected, unsupported syntax, or a host-API misuse
//! (`Sandbox::call`/`instantiate` naming something that was never
//! defined). It always propagates straight out of [`crate::Sandbox::run`].

use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError)]
pub enum Error {
    #[error("syntax error: {0}")]
    Parse(String),

    #[error("unsupported syntax: {0}")]
    Unsupported(String),

    #[error("name '{0}' is not defined")]
    NameError(String),

    #[error("expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("an uncaught exception escaped evaluation: {0}")]
    UncaughtException(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
