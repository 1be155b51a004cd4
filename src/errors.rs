use thiserror::Error;

/// Errors the Store Gateway (`store::DocumentStore`) can surface. The
/// gateway categorizes every failure from the underlying document store
/// into one of these four buckets so callers can decide whether a retry
/// or a surfaced failure is appropriate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient store error: {0}")]
    Transient(String),

    #[error("permanent store error: {0}")]
    Permanent(String),
}

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("transient error, caller may retry: {0}")]
    Transient(String),

    #[error("permanent error: {0}")]
    Permanent(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => EngineError::NotFound(msg),
            StoreError::Conflict(msg) => EngineError::Transient(format!("conflict: {msg}")),
            StoreError::Transient(msg) => EngineError::Transient(msg),
            StoreError::Permanent(msg) => EngineError::Permanent(msg),
        }
    }
}

impl EngineError {
    /// Whether the transport layer may legitimately redeliver the event
    /// that produced this error (`Transient` kind only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }
}
