//! Typed errors carried on result payloads and change events.
//!
//! Failures never cross an action boundary as panics or `Err` returns from
//! handlers. They travel as values: a result payload holds
//! `Result<T, ActionError>` and the change event published for it carries the
//! same `ActionError` unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an action failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A precondition was not met, e.g. the operation is unsupported for this owner.
    NotAvailable,
    /// The remote service rejected the credentials.
    Unauthorized,
    /// The referenced record does not exist locally or remotely.
    NotFound,
    /// Anything else, including local persistence failures.
    Generic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAvailable => "not available",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not found",
            Self::Generic => "generic error",
        };
        f.write_str(s)
    }
}

/// An error attached to a result payload or a change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ActionError {
    pub kind: ErrorKind,
    #[serde(default)]
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_available(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAvailable, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }
}
