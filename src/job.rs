//! One-shot multi-namespace query jobs.
//!
//! A job is a JSON object naming an index (or its host), the namespaces to
//! search and the query criteria, for example:
//!
//! ```json
//! {"index": "movies", "namespaces": ["drama", "comedy"], "topK": 5, "vector": [0.1, 0.2]}
//! ```

use conifer_query::{QueryCriteria, QueryNamespacesResults};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{ClientError, Result};

/// A multi-namespace query request read from outside the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryJob {
    /// Index to resolve through the control plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Data-plane host to query directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Namespaces to search.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// What to search for.
    #[serde(flatten)]
    pub criteria: QueryCriteria,
}

impl QueryJob {
    /// Parse a job from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the text is not a valid job.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ClientError::Config(format!("invalid query job: {e}")))
    }

    /// Run the job with `client`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Config`] unless exactly one of `index` and `host` is set
    /// - any error from [`Client::index`] or [`crate::Index::query_namespaces`]
    pub async fn run(&self, client: &Client) -> Result<QueryNamespacesResults> {
        let index = match (self.index.as_deref(), self.host.as_deref()) {
            (Some(name), None) => client.index(name).await?,
            (None, Some(host)) => client.index_for_host(host)?,
            (Some(_), Some(_)) => {
                return Err(ClientError::Config(
                    "query job must set `index` or `host`, not both".into(),
                ));
            }
            (None, None) => {
                return Err(ClientError::Config(
                    "query job must set `index` or `host`".into(),
                ));
            }
        };

        tracing::info!(
            index = index.name().unwrap_or("-"),
            namespaces = self.namespaces.len(),
            top_k = self.criteria.top_k,
            "running query job"
        );
        index.query_namespaces(&self.namespaces, &self.criteria).await
    }
}
