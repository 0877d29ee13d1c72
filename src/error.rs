//! Error types for domwire.

use thiserror::Error;

/// Boxed error produced by handler code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all dispatch operations.
#[derive(Debug, Error)]
pub enum DomwireError {
    /// A registration option or command argument has the wrong shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Dispatch was attempted on request data missing a reserved key.
    #[error("Not a dispatch request")]
    NotADispatchRequest,

    /// A required setting was never configured.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    /// A regular (non-streaming) context received a suspending handler.
    #[error("Streaming is not supported for regular handlers")]
    StreamingNotSupported,

    /// The handler itself failed. The inner error is passed through as-is.
    #[error("Handler error: {0}")]
    Handler(#[source] BoxError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while writing output to a transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using DomwireError.
pub type Result<T> = std::result::Result<T, DomwireError>;
