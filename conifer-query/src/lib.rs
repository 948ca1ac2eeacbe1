//! # conifer-query
//!
//! Cross-namespace similarity queries for the Pinecone vector database.
//!
//! An index is split into namespaces and the service searches one namespace
//! per request. This crate queries several namespaces concurrently and merges
//! their independently ranked results into a single top-k result set.
//!
//! ## Design
//!
//! - One request per distinct namespace, with bounded concurrency and a
//!   per-namespace timeout
//! - Results are merged as they arrive into a heap bounded by `top_k`
//! - Whether higher or lower scores are better is inferred from the data
//!   unless the index metric is declared
//! - Equal scores keep arrival order
//! - A failed namespace is reported and skipped; the others still count
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> conifer_query::Result<()> {
//! use conifer_query::{http, HttpTransport, QueryConfig, QueryCriteria};
//!
//! let config = QueryConfig::default();
//! let client = http::build_client(config.timeout())?;
//! let transport = HttpTransport::new(client, "https://my-index.svc.pinecone.io", "api-key");
//! let criteria = QueryCriteria::vector(vec![0.1, 0.2, 0.3]).with_top_k(5);
//! let results =
//!     conifer_query::query_namespaces(&transport, &["docs", "faq"], &criteria, &config).await?;
//! for m in &results {
//!     println!("{} {} {}", m.namespace, m.id, m.score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! - API keys are sent only as request headers and never logged
//! - Query vectors are never logged

pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod query;
pub mod results;
pub mod transport;
pub mod types;

pub use config::QueryConfig;
pub use error::{ErrorKind, QueryError, Result};
pub use http::HttpTransport;
pub use orchestrator::{query_namespaces, QueryResultsAggregator};
pub use query::{QueryCriteria, QueryRequest};
pub use results::{MatchField, NamespaceFailure, QueryNamespacesResults, ResultsField, ScoredVectorWithNamespace};
pub use transport::NamespaceTransport;
pub use types::{Metric, Polarity, QueryResponse, ScoredVector, SparseValues, Usage};
