//! # conifer
//!
//! Client SDK for the Pinecone vector database.
//!
//! The data-plane query core lives in [`conifer_query`]; this crate adds what
//! a complete client needs around it:
//! - **Configuration**: TOML config file plus `PINECONE_*` environment variables
//! - **Index hosts**: control-plane lookup with a process-wide cache
//! - **Handles**: [`Client`] and [`Index`], including multi-namespace queries
//! - **Jobs**: [`QueryJob`], a JSON-described query run by the `conifer-query` binary
//!
//! ```no_run
//! # async fn example() -> conifer::Result<()> {
//! use conifer::{Client, QueryCriteria};
//!
//! let client = Client::from_env()?;
//! let index = client.index("movies").await?;
//! let criteria = QueryCriteria::vector(vec![0.1, 0.2, 0.3]).with_top_k(5);
//! let results = index.query_namespaces(&["drama", "comedy"], &criteria).await?;
//! println!("{results}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod index_host;
pub mod job;

pub use client::{Client, Index};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use index_host::{IndexDescription, IndexHostStore, IndexTarget};
pub use job::QueryJob;

pub use conifer_query::{
    Metric, QueryConfig, QueryCriteria, QueryNamespacesResults, QueryResponse, ScoredVector,
    ScoredVectorWithNamespace, SparseValues,
};
