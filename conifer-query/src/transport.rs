//! Trait definition for the namespace query transport.
//!
//! The orchestrator never talks HTTP itself; it issues one
//! [`NamespaceTransport::query_namespace`] call per namespace. The crate ships
//! [`crate::http::HttpTransport`]; tests substitute in-process fakes.

use crate::error::QueryError;
use crate::query::QueryRequest;
use crate::types::QueryResponse;

/// Issues a similarity query against a single namespace.
///
/// Implementations handle their own request construction, authentication and
/// response decoding. They must return matches best-first, as the service
/// orders them, and report the query cost.
///
/// All implementations must be `Send + Sync` for concurrent namespace queries.
pub trait NamespaceTransport: Send + Sync {
    /// Query one namespace.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the request fails or the response cannot be
    /// decoded. Errors are scoped to this namespace only.
    fn query_namespace(
        &self,
        request: &QueryRequest,
    ) -> impl std::future::Future<Output = Result<QueryResponse, QueryError>> + Send;
}

impl<T: NamespaceTransport> NamespaceTransport for &T {
    fn query_namespace(
        &self,
        request: &QueryRequest,
    ) -> impl std::future::Future<Output = Result<QueryResponse, QueryError>> + Send {
        (**self).query_namespace(request)
    }
}
