//! Errors raised while deriving observation metadata.

use thiserror::Error;

/// Errors that can occur when a convention reads an observation context.
///
/// Neither variant is recoverable by the convention itself. The middleware
/// logs them and degrades: the trace name falls back to a default and the
/// observation is not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    /// A field required to build the contextual name is missing.
    #[error("invalid observation context: {field} is not set")]
    InvalidContext { field: &'static str },

    /// Labels were requested before the request completed.
    #[error("incomplete observation context: {field} is not known yet")]
    IncompleteContext { field: &'static str },
}

/// Result type for convention operations.
pub type ObservationResult<T> = Result<T, ObservationError>;
