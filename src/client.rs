//! Client and index handles.
//!
//! A [`Client`] holds credentials, one shared HTTP connection pool and the
//! index host store. [`Client::index`] turns an index name into an [`Index`]
//! that queries that index's data plane.

use conifer_query::http::{HttpTransport, build_client};
use conifer_query::{
    NamespaceTransport, QueryConfig, QueryCriteria, QueryNamespacesResults, QueryRequest,
    QueryResponse,
};

use crate::config::{ClientConfig, normalize_host};
use crate::error::{ClientError, Result};
use crate::index_host::IndexHostStore;

/// Entry point for talking to the service.
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
    hosts: IndexHostStore,
}

impl Client {
    /// Create a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the configuration is invalid, or
    /// [`ClientError::Query`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = build_client(config.timeout())?;
        let hosts = IndexHostStore::new(http.clone(), &config);
        tracing::debug!(controller_host = %config.controller_host(), "client created");
        Ok(Self {
            config,
            http,
            hosts,
        })
    }

    /// Create a client configured from the process environment only.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new); fails if no API key is set.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The index host store used by this client.
    pub fn hosts(&self) -> &IndexHostStore {
        &self.hosts
    }

    /// Open the index called `name`, resolving its host if not cached.
    ///
    /// If the configuration declares no metric, the metric reported by the
    /// control plane is used for merging multi-namespace results.
    ///
    /// # Errors
    ///
    /// Any error from [`IndexHostStore::resolve`].
    pub async fn index(&self, name: &str) -> Result<Index> {
        let target = self.hosts.resolve(name).await?;
        let mut query = self.config.query.clone();
        if query.metric.is_none() {
            query.metric = target.metric;
        }
        Ok(Index {
            name: Some(name.to_string()),
            transport: self.transport(&target.host),
            query,
        })
    }

    /// Open an index by its data-plane host, skipping the control plane.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `host` is empty.
    pub fn index_for_host(&self, host: &str) -> Result<Index> {
        let host = normalize_host(host);
        if host.is_empty() {
            return Err(ClientError::Config("index host must not be empty".into()));
        }
        Ok(Index {
            name: None,
            transport: self.transport(&host),
            query: self.config.query.clone(),
        })
    }

    fn transport(&self, host: &str) -> HttpTransport {
        self.config.additional_headers.iter().fold(
            HttpTransport::new(self.http.clone(), host, self.config.api_key.clone())
                .with_api_version(self.config.api_version.clone()),
            |transport, (name, value)| transport.with_header(name.clone(), value.clone()),
        )
    }
}

/// A handle to one index's data plane.
#[derive(Debug, Clone)]
pub struct Index {
    name: Option<String>,
    transport: HttpTransport,
    query: QueryConfig,
}

impl Index {
    /// Index name, if opened by name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Data-plane host.
    pub fn host(&self) -> &str {
        self.transport.host()
    }

    /// Query settings used by [`query_namespaces`](Self::query_namespaces).
    pub fn query_config(&self) -> &QueryConfig {
        &self.query
    }

    /// Replace the query settings.
    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    /// Query a single namespace and return the service's answer as is.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Query`] if the criteria are invalid or the
    /// request fails.
    pub async fn query(&self, namespace: &str, criteria: &QueryCriteria) -> Result<QueryResponse> {
        criteria.validate()?;
        let request = QueryRequest::for_namespace(criteria, namespace, criteria.top_k);
        let response = self.transport.query_namespace(&request).await?;
        tracing::debug!(
            %namespace,
            count = response.matches.len(),
            read_units = response.usage.read_units,
            "namespace query completed"
        );
        Ok(response)
    }

    /// Query several namespaces and merge the results into one top-k list.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Query`] for invalid input or if the score
    /// ordering cannot be established. Per-namespace failures are reported
    /// in [`QueryNamespacesResults::failures`] instead.
    pub async fn query_namespaces<S: AsRef<str>>(
        &self,
        namespaces: &[S],
        criteria: &QueryCriteria,
    ) -> Result<QueryNamespacesResults> {
        Ok(conifer_query::query_namespaces(&self.transport, namespaces, criteria, &self.query).await?)
    }
}
