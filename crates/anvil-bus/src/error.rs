// ── Bus error types ──

use thiserror::Error;

/// Errors surfaced by a [`MessageBus`](crate::MessageBus) implementation.
///
/// Transport crates map their native failures onto these variants; the
/// client layer above decides which ones are fatal to construction and
/// which are local to a single call.
#[derive(Debug, Error)]
pub enum BusError {
    // ── Connection-level ──
    /// The bus endpoint cannot be reached at all.
    #[error("bus unreachable: {reason}")]
    Unreachable { reason: String },

    /// The bus connection existed once but has been shut down.
    #[error("bus connection closed")]
    Closed,

    // ── Call-level ──
    /// No service answers to the requested method.
    #[error("no handler for method `{method}`")]
    UnknownMethod { method: String },

    /// The remote service answered the call with an error.
    #[error("method `{method}` failed remotely: {reason}")]
    Remote { method: String, reason: String },

    /// The call did not complete within the transport's deadline.
    #[error("method `{method}` timed out")]
    Timeout { method: String },
}

impl BusError {
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            method: method.into(),
        }
    }

    pub fn remote(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Remote {
            method: method.into(),
            reason: reason.into(),
        }
    }
}
