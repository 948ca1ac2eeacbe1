//! Error types for the conifer client.

use conifer_query::QueryError;

/// Top-level error type for client setup and control-plane calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A control-plane request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The control plane answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The data-plane host of an index could not be determined.
    #[error("index host error: {0}")]
    IndexHost(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data-plane query or aggregation error.
    #[error("query error: {0}")]
    Query(#[from] QueryError),
}

impl ClientError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Query(e) => e.is_retryable(),
            Self::Config(_) | Self::IndexHost(_) | Self::Io(_) => false,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ClientError>;
