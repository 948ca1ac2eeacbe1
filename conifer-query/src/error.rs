//! Error types for the conifer-query crate.
//!
//! Every variant carries a stable error code (SCREAMING_SNAKE_CASE) accessible
//! via [`QueryError::code()`], and a coarse [`ErrorKind`] that tells callers
//! whether to fix their input, retry, or fix their code. No API keys or query
//! vectors appear in error messages.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
pub mod error_codes {
    /// Requested top-k is too small to aggregate.
    pub const INVALID_TOP_K: &str = "INVALID_TOP_K";

    /// The similarity metric could not be inferred from the scores seen so far.
    pub const METRIC_NOT_INFERRED: &str = "METRIC_NOT_INFERRED";

    /// Aggregated results were already drained.
    pub const RESULTS_ALREADY_READ: &str = "RESULTS_ALREADY_READ";

    /// No namespaces were supplied.
    pub const EMPTY_NAMESPACES: &str = "EMPTY_NAMESPACES";

    /// The query carries no search criterion.
    pub const EMPTY_QUERY: &str = "EMPTY_QUERY";

    /// The query is malformed.
    pub const INVALID_QUERY: &str = "INVALID_QUERY";

    /// A result field lookup used an unknown key.
    pub const UNKNOWN_FIELD: &str = "UNKNOWN_FIELD";

    /// The HTTP request could not be completed.
    pub const HTTP_ERROR: &str = "HTTP_ERROR";

    /// The service answered with a non-success status.
    pub const API_ERROR: &str = "API_ERROR";

    /// A namespace query timed out.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// The service response could not be decoded.
    pub const PARSE_ERROR: &str = "PARSE_ERROR";

    /// Invalid configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
}

/// Broad classification of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied something unusable. Fix the input and try again.
    Configuration,
    /// A network or service failure. Retrying may succeed.
    Transient,
    /// The API was used in an unsupported order (e.g. reading results twice).
    Misuse,
}

/// Errors that can occur while querying and aggregating namespace results.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The aggregator was asked to keep fewer than two results.
    #[error("invalid top_k value {0}: aggregating results across namespaces requires top_k of at least 2")]
    InvalidTopK(usize),

    /// A single-match result arrived while the score ordering was still unknown.
    #[error(
        "cannot infer the similarity metric from namespace '{namespace}': at least two matches \
         in a single namespace result are needed to tell whether higher or lower scores are better"
    )]
    NotEnoughMatchesToInferMetric {
        /// Namespace whose result could not be interpreted.
        namespace: String,
    },

    /// Results were drained already; the aggregator accepts no further calls.
    #[error("results have already been read")]
    ResultsAlreadyRead,

    /// No namespaces were given to query.
    #[error("at least one namespace must be specified")]
    EmptyNamespaces,

    /// The query has no vector, sparse vector, or id to search with.
    #[error("query must include a non-empty vector, a non-empty sparse vector, or an id")]
    EmptyQuery,

    /// The query is malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A result field lookup used a key outside the known field set.
    #[error("'{0}' is not a known result field")]
    UnknownField(String),

    /// The HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service responded with a non-success status code.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// A namespace query exceeded its timeout.
    #[error("query timed out: {0}")]
    Timeout(String),

    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid query configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl QueryError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTopK(_) => error_codes::INVALID_TOP_K,
            Self::NotEnoughMatchesToInferMetric { .. } => error_codes::METRIC_NOT_INFERRED,
            Self::ResultsAlreadyRead => error_codes::RESULTS_ALREADY_READ,
            Self::EmptyNamespaces => error_codes::EMPTY_NAMESPACES,
            Self::EmptyQuery => error_codes::EMPTY_QUERY,
            Self::InvalidQuery(_) => error_codes::INVALID_QUERY,
            Self::UnknownField(_) => error_codes::UNKNOWN_FIELD,
            Self::Http(_) => error_codes::HTTP_ERROR,
            Self::Api { .. } => error_codes::API_ERROR,
            Self::Timeout(_) => error_codes::TIMEOUT_ERROR,
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::Config(_) => error_codes::CONFIG_INVALID,
        }
    }

    /// Classifies this error.
    ///
    /// API errors are transient for rate limiting (429) and server errors
    /// (5xx); any other status means the request itself was rejected.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTopK(_)
            | Self::NotEnoughMatchesToInferMetric { .. }
            | Self::EmptyNamespaces
            | Self::EmptyQuery
            | Self::InvalidQuery(_)
            | Self::Config(_) => ErrorKind::Configuration,
            Self::ResultsAlreadyRead | Self::UnknownField(_) => ErrorKind::Misuse,
            Self::Http(_) | Self::Timeout(_) | Self::Parse(_) => ErrorKind::Transient,
            Self::Api { status, .. } => {
                if *status == 429 || *status >= 500 {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Configuration
                }
            }
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Convenience type alias for conifer-query results.
pub type Result<T> = std::result::Result<T, QueryError>;
