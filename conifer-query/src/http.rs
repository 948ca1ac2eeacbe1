//! HTTP transport for data-plane namespace queries.
//!
//! Provides a configured [`reqwest::Client`] and [`HttpTransport`], which
//! posts one [`QueryRequest`] to an index host's `/query` endpoint.

use std::time::Duration;

use crate::error::QueryError;
use crate::query::QueryRequest;
use crate::transport::NamespaceTransport;
use crate::types::QueryResponse;

/// API version sent with every data-plane request.
pub const API_VERSION: &str = "2025-04";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "Api-Key";

/// Header carrying the API version.
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";

/// Longest body prefix quoted in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Build a [`reqwest::Client`] for data-plane requests.
///
/// The client has:
/// - The given request timeout
/// - A `conifer-query/<version>` User-Agent
/// - gzip decompression
///
/// # Errors
///
/// Returns [`QueryError::Http`] if the client cannot be constructed.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, QueryError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("conifer-query/", env!("CARGO_PKG_VERSION")))
        .gzip(true)
        .build()
        .map_err(|e| QueryError::Http(format!("failed to build HTTP client: {e}")))
}

/// Queries namespaces of one index over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    host: String,
    api_key: String,
    api_version: String,
    additional_headers: Vec<(String, String)>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport for the index served at `host`.
    ///
    /// `host` must include a scheme; trailing slashes are ignored.
    pub fn new(client: reqwest::Client, host: impl Into<String>, api_key: impl Into<String>) -> Self {
        let host: String = host.into();
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: API_VERSION.to_string(),
            additional_headers: Vec::new(),
        }
    }

    /// Override the API version header.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Send an extra header with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// The index host this transport talks to.
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl NamespaceTransport for HttpTransport {
    async fn query_namespace(&self, request: &QueryRequest) -> Result<QueryResponse, QueryError> {
        let url = format!("{}/query", self.host);
        tracing::trace!(namespace = %request.namespace, top_k = request.top_k, "sending namespace query");

        let mut builder = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, &self.api_version)
            .header("accept", "application/json")
            .json(request);
        for (name, value) in &self.additional_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".into());
            tracing::debug!(namespace = %request.namespace, %status, "namespace query rejected");
            return Err(map_http_error(status, &body));
        }

        let bytes = response.bytes().await.map_err(map_send_error)?;
        let mut parsed: QueryResponse = serde_json::from_slice(&bytes)
            .map_err(|e| QueryError::Parse(format!("invalid query response: {e}")))?;
        if parsed.namespace.is_empty() {
            parsed.namespace.clone_from(&request.namespace);
        }
        Ok(parsed)
    }
}

/// Map a failed send or body read to a typed error.
fn map_send_error(e: reqwest::Error) -> QueryError {
    if e.is_timeout() {
        QueryError::Timeout(format!("request timed out: {e}"))
    } else {
        QueryError::Http(format!("connection error: {e}"))
    }
}

/// Map a non-success HTTP response to a typed error.
pub fn map_http_error(status: reqwest::StatusCode, body: &str) -> QueryError {
    QueryError::Api {
        status: status.as_u16(),
        message: extract_error_message(body),
    }
}

/// Extract a human-readable message from an error response body.
///
/// Uses the `error.message` or `message` field of a JSON body, else a
/// bounded prefix of the raw body.
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.pointer("/message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        })
}
