use thiserror::Error;

/// HTTP status codes treated as transient for retry classification.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Unified error type for the batching layer.
///
/// The enum is `Clone` because results (success or failure) flow through
/// shared futures to every deduplicated waiter of the same fingerprint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Transport-level failure carrying the HTTP status for classification.
    /// A status of 0 means no HTTP response was received (connect failure).
    #[error("transport error: HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    /// Retries exhausted; wraps the last transient failure's message.
    #[error("retries exhausted after {attempts} attempts: {message}")]
    MaxRetriesExceeded { attempts: u32, message: String },

    /// The per-item deadline elapsed before a result arrived. The underlying
    /// dispatch is not cancelled, only abandoned from the caller's view.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Queue depth bound hit; surfaced on enqueue before any queuing occurs.
    #[error("queue overloaded: depth {depth} at limit {limit}")]
    Overloaded { depth: usize, limit: usize },

    /// Aggregate batch dispatch failed (transport error, malformed response,
    /// or missing correlation). Never surfaced to callers; always absorbed
    /// by the per-item fallback path.
    #[error("batch endpoint error: {0}")]
    BatchEndpoint(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The worker dropped the result channel without resolving it.
    #[error("result channel dropped before resolution")]
    ResultDropped,
}

impl Error {
    /// True iff this failure may succeed on a later attempt.
    ///
    /// Only transport errors with a transient status qualify; everything
    /// else (4xx client errors, local failures) is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses_are_retryable() {
        for status in RETRYABLE_STATUSES {
            let err = Error::Transport {
                status,
                message: "boom".into(),
            };
            assert!(err.is_retryable(), "status {status} should be retryable");
        }
    }

    #[test]
    fn test_client_errors_are_terminal() {
        for status in [400, 401, 403, 404, 422] {
            let err = Error::Transport {
                status,
                message: "nope".into(),
            };
            assert!(!err.is_retryable(), "status {status} should be terminal");
        }
    }

    #[test]
    fn test_local_errors_are_terminal() {
        assert!(!Error::Timeout { timeout_ms: 100 }.is_retryable());
        assert!(!Error::Overloaded { depth: 10, limit: 10 }.is_retryable());
        assert!(!Error::ResultDropped.is_retryable());
    }
}
