//! Index host resolution via the control plane.
//!
//! Data-plane requests go to a per-index host that only the control plane
//! knows. [`IndexHostStore`] asks `GET {controller}/indexes/{name}` once and
//! keeps the answer in a process-wide [`moka`] cache keyed by controller host,
//! API key and index name.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use conifer_query::Metric;
use moka::future::Cache;
use serde::Deserialize;
use url::Url;

use crate::config::{ClientConfig, normalize_host};
use crate::error::{ClientError, Result};

/// Maximum number of cached index hosts.
const MAX_CACHED_HOSTS: u64 = 1_000;

/// How long a resolved host is trusted before asking again.
const HOST_TTL: Duration = Duration::from_secs(60 * 60);

/// Global process-wide host cache.
static HOSTS: OnceLock<Cache<HostKey, IndexTarget>> = OnceLock::new();

fn hosts() -> &'static Cache<HostKey, IndexTarget> {
    HOSTS.get_or_init(|| {
        Cache::builder()
            .max_capacity(MAX_CACHED_HOSTS)
            .time_to_live(HOST_TTL)
            .build()
    })
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct HostKey {
    controller_host: String,
    api_key: String,
    index_name: String,
}

/// Where an index is served and how it scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    /// Normalised data-plane base URL.
    pub host: String,
    /// Similarity metric, if the control plane reported one.
    pub metric: Option<Metric>,
}

/// The subset of the control-plane index description used by the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexDescription {
    /// Index name.
    pub name: String,
    /// Data-plane host, without scheme. Empty while the index is provisioning.
    #[serde(default)]
    pub host: String,
    /// Similarity metric.
    #[serde(default)]
    pub metric: Option<Metric>,
    /// Vector dimension.
    #[serde(default)]
    pub dimension: Option<u32>,
}

/// Resolves and caches index hosts for one set of credentials.
#[derive(Clone)]
pub struct IndexHostStore {
    client: reqwest::Client,
    controller_host: String,
    api_key: String,
    api_version: String,
    additional_headers: BTreeMap<String, String>,
}

impl std::fmt::Debug for IndexHostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHostStore")
            .field("controller_host", &self.controller_host)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl IndexHostStore {
    /// Create a store that talks to the control plane named in `config`.
    pub fn new(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            controller_host: config.controller_host(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            additional_headers: config.additional_headers.clone(),
        }
    }

    /// Return the data-plane target of `index_name`, asking the control plane
    /// on a cache miss.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Config`] for an empty index name
    /// - [`ClientError::Http`] / [`ClientError::Api`] if the lookup fails
    /// - [`ClientError::IndexHost`] if the index has no host yet
    pub async fn resolve(&self, index_name: &str) -> Result<IndexTarget> {
        if index_name.trim().is_empty() {
            return Err(ClientError::Config("index name must not be empty".into()));
        }

        let key = self.key(index_name);
        if let Some(target) = hosts().get(&key).await {
            tracing::trace!(index = %index_name, "index host cache hit");
            return Ok(target);
        }

        let description = self.describe_index(index_name).await?;
        let host = normalize_host(&description.host);
        if host.is_empty() {
            return Err(ClientError::IndexHost(format!(
                "could not get host for index '{index_name}'; check that the index is ready"
            )));
        }

        let target = IndexTarget {
            host,
            metric: description.metric,
        };
        hosts().insert(key, target.clone()).await;
        tracing::debug!(index = %index_name, host = %target.host, "resolved index host");
        Ok(target)
    }

    /// Record a known host for `index_name`. Empty hosts are ignored.
    pub async fn remember(&self, index_name: &str, host: &str, metric: Option<Metric>) {
        let host = normalize_host(host);
        if host.is_empty() {
            return;
        }
        hosts()
            .insert(self.key(index_name), IndexTarget { host, metric })
            .await;
    }

    /// Drop the cached host of `index_name`, e.g. after the index was deleted.
    pub async fn forget(&self, index_name: &str) {
        hosts().invalidate(&self.key(index_name)).await;
    }

    /// Fetch the control-plane description of `index_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the request fails,
    /// [`ClientError::Api`] for a non-success status, and
    /// [`ClientError::IndexHost`] if the body cannot be decoded.
    pub async fn describe_index(&self, index_name: &str) -> Result<IndexDescription> {
        let url = self.index_url(index_name)?;

        let mut builder = self
            .client
            .get(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .header("accept", "application/json");
        for (name, value) in &self.additional_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Http(format!("describe_index request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".into());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: conifer_query::http::extract_error_message(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Http(format!("failed to read index description: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::IndexHost(format!("invalid index description: {e}")))
    }

    fn index_url(&self, index_name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.controller_host).map_err(|e| {
            ClientError::Config(format!("invalid controller_host '{}': {e}", self.controller_host))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Config(format!("controller_host '{}' cannot be a base URL", self.controller_host))
            })?
            .pop_if_empty()
            .push("indexes")
            .push(index_name);
        Ok(url)
    }

    fn key(&self, index_name: &str) -> HostKey {
        HostKey {
            controller_host: self.controller_host.clone(),
            api_key: self.api_key.clone(),
            index_name: index_name.to_string(),
        }
    }
}
