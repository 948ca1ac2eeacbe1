//! Query criteria supplied by callers and the per-namespace request body.

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::types::SparseValues;

/// Number of results requested when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 10;

/// Largest `top_k` the service accepts for one query.
pub const MAX_TOP_K: usize = 10_000;

/// What to search for, independent of which namespace is searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryCriteria {
    /// Number of results to return.
    pub top_k: usize,
    /// Dense query vector.
    pub vector: Option<Vec<f32>>,
    /// Sparse query vector (hybrid search).
    pub sparse_vector: Option<SparseValues>,
    /// Query by the stored vector with this id instead of a literal vector.
    pub id: Option<String>,
    /// Metadata filter expression.
    pub filter: Option<serde_json::Value>,
    /// Ask the service to return dense values.
    pub include_values: Option<bool>,
    /// Ask the service to return metadata.
    pub include_metadata: Option<bool>,
}

impl Default for QueryCriteria {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            vector: None,
            sparse_vector: None,
            id: None,
            filter: None,
            include_values: None,
            include_metadata: None,
        }
    }
}

impl QueryCriteria {
    /// Search by a dense vector.
    pub fn vector(values: Vec<f32>) -> Self {
        Self {
            vector: Some(values),
            ..Default::default()
        }
    }

    /// Search by a sparse vector.
    pub fn sparse(sparse: SparseValues) -> Self {
        Self {
            sparse_vector: Some(sparse),
            ..Default::default()
        }
    }

    /// Search by the stored vector with `id`.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Set the number of results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Add a sparse component to a dense query.
    pub fn with_sparse_vector(mut self, sparse: SparseValues) -> Self {
        self.sparse_vector = Some(sparse);
        self
    }

    /// Restrict matches with a metadata filter.
    pub fn with_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Ask for dense values in the results.
    pub fn with_values(mut self, include: bool) -> Self {
        self.include_values = Some(include);
        self
    }

    /// Ask for metadata in the results.
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = Some(include);
        self
    }

    /// Validates this query.
    ///
    /// Checks:
    /// - `top_k` must be between 1 and [`MAX_TOP_K`]
    /// - `vector` and `id` are mutually exclusive
    /// - sparse `indices` and `values` have equal length
    /// - at least one of a non-empty `vector`, a non-empty `sparse_vector`,
    ///   or an `id` is present
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.top_k == 0 {
            return Err(QueryError::InvalidTopK(0));
        }
        if self.top_k > MAX_TOP_K {
            return Err(QueryError::InvalidQuery(format!(
                "top_k {} exceeds the maximum of {MAX_TOP_K}",
                self.top_k
            )));
        }
        if self.vector.is_some() && self.id.is_some() {
            return Err(QueryError::InvalidQuery(
                "cannot specify both `id` and `vector`".into(),
            ));
        }
        if let Some(sparse) = &self.sparse_vector {
            if sparse.indices.len() != sparse.values.len() {
                return Err(QueryError::InvalidQuery(format!(
                    "sparse vector has {} indices but {} values",
                    sparse.indices.len(),
                    sparse.values.len()
                )));
            }
        }

        let has_vector = self.vector.as_ref().is_some_and(|v| !v.is_empty());
        let has_sparse = self.sparse_vector.as_ref().is_some_and(|s| !s.is_empty());
        if !has_vector && !has_sparse && self.id.is_none() {
            return Err(QueryError::EmptyQuery);
        }
        Ok(())
    }
}

/// Request body for querying one namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Namespace to search.
    pub namespace: String,
    /// Number of matches to return.
    pub top_k: usize,
    /// Dense query vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Sparse query vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_vector: Option<SparseValues>,
    /// Stored vector id to query by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Metadata filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
    /// Return dense values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_values: Option<bool>,
    /// Return metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_metadata: Option<bool>,
}

impl QueryRequest {
    /// Build the request for `namespace`, asking for `top_k` matches.
    ///
    /// `top_k` is passed separately because the dispatcher may ask each
    /// namespace for more matches than the caller wants overall.
    pub fn for_namespace(criteria: &QueryCriteria, namespace: impl Into<String>, top_k: usize) -> Self {
        Self {
            namespace: namespace.into(),
            top_k,
            vector: criteria.vector.clone(),
            sparse_vector: criteria.sparse_vector.clone(),
            id: criteria.id.clone(),
            filter: criteria.filter.clone(),
            include_values: criteria.include_values,
            include_metadata: criteria.include_metadata,
        }
    }
}
