//! Error taxonomy shared by every layer of the pipeline.
//!
//! The variants mirror the stable error codes surfaced to MCP clients.
//! Retryability is a property of the variant, not of the call site: adapters
//! retry `Unavailable` and `ResourceExhausted` locally with backoff, the
//! orchestrator treats them as partial-evidence signals, and the protocol
//! layer maps them onto JSON-RPC error codes.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy of the answering pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Tool-argument schema or enum violation. Non-retryable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Document, article, or pattern absent from the store and fetch
    /// impossible. Non-retryable at this call.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream quota exhausted or an adapter rate budget repeatedly blown.
    /// Retryable with backoff at the caller level.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Citation validation rejected the answer, or the sectionizer produced
    /// no sections on required input. Never downgraded.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// A tool deadline fired. May carry a partial result alongside.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Transient upstream failure. Retried internally; surfaced only when
    /// retries exhaust.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Dimension mismatch, non-unique current article version, overlapping
    /// sections after finalization. Fatal; the operation aborts.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// Anything that escaped classification at a lower layer.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::ResourceExhausted(_) => "RESOURCE_EXHAUSTED",
            Error::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Error::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            Error::Unavailable(_) => "UNAVAILABLE",
            Error::InvariantViolated(_) => "INVARIANT_VIOLATED",
            Error::Internal(_) => "INTERNAL",
        }
    }

    /// Whether a client may usefully retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ResourceExhausted(_) | Error::Unavailable(_))
    }

    /// JSON-RPC error code for the MCP surface: `-32002` for retryable tool
    /// errors, `-32001` for non-retryable ones.
    pub fn jsonrpc_code(&self) -> i32 {
        if self.is_retryable() { -32002 } else { -32001 }
    }

    /// Convenience constructor for invalid tool arguments.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Convenience constructor for missing entities.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Unavailable("timeout".into()).is_retryable());
        assert!(Error::ResourceExhausted("quota".into()).is_retryable());
        assert!(!Error::InvalidArgument("bad enum".into()).is_retryable());
        assert!(!Error::PreconditionFailed("no sources".into()).is_retryable());
    }

    #[test]
    fn test_jsonrpc_codes() {
        assert_eq!(Error::Unavailable("x".into()).jsonrpc_code(), -32002);
        assert_eq!(Error::NotFound("x".into()).jsonrpc_code(), -32001);
    }

    #[test]
    fn test_stable_codes() {
        assert_eq!(
            Error::InvariantViolated("dim".into()).code(),
            "INVARIANT_VIOLATED"
        );
        assert_eq!(
            Error::DeadlineExceeded("30s".into()).code(),
            "DEADLINE_EXCEEDED"
        );
    }
}
