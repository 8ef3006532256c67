// ── Client error types ──

use thiserror::Error;

/// Errors surfaced by the synchronization layer.
///
/// Construction-time failures abort composition; per-call failures stay
/// local to the failed call and never touch the in-memory model. Stale
/// events (ids or names that are already gone) are not errors at all --
/// reducers log them at most and move on.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required signal subscription or initial snapshot fetch could
    /// not be established. Fatal to whatever was being constructed.
    #[error("transport unavailable: {reason}")]
    TransportUnavailable { reason: String },

    /// One request/response call failed; the model is left as it was.
    #[error("request `{method}` failed: {reason}")]
    RequestFailed { method: String, reason: String },
}

impl ClientError {
    pub fn transport_unavailable(reason: impl std::fmt::Display) -> Self {
        Self::TransportUnavailable {
            reason: reason.to_string(),
        }
    }

    pub fn request_failed(method: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::RequestFailed {
            method: method.into(),
            reason: reason.to_string(),
        }
    }
}
