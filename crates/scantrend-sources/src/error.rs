//! Source error types.

use thiserror::Error;

/// Errors that can occur when reading from a score source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The requested window (or its data) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The API rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },
}
