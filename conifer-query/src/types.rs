//! Wire types for namespace queries and the score-ordering enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form vector metadata as returned by the service.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Sparse vector representation: parallel `indices` and `values` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseValues {
    /// Dimension indices with non-zero weight.
    pub indices: Vec<u32>,
    /// Weights, one per index.
    pub values: Vec<f32>,
}

impl SparseValues {
    /// Create a sparse vector from parallel index and value arrays.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Self {
        Self { indices, values }
    }

    /// Returns true if the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() && self.values.is_empty()
    }
}

/// A single scored match as returned by a namespace query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredVector {
    /// Vector identifier.
    pub id: String,
    /// Similarity score. Whether higher or lower is better depends on the index metric.
    pub score: f64,
    /// Dense values, present when the query asked for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
    /// Sparse values, present for hybrid indexes when asked for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_values: Option<SparseValues>,
    /// Metadata, present when the query asked for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ScoredVector {
    /// Create a match carrying only an id and a score.
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
            values: None,
            sparse_values: None,
            metadata: None,
        }
    }
}

/// Query cost as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Read units consumed.
    #[serde(rename = "readUnits", default)]
    pub read_units: u64,
}

impl Usage {
    /// Create a usage record.
    pub fn new(read_units: u64) -> Self {
        Self { read_units }
    }
}

/// The result of querying one namespace: best-first matches plus cost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Matches ordered best-first by the service.
    #[serde(default)]
    pub matches: Vec<ScoredVector>,
    /// Namespace the matches came from.
    #[serde(default)]
    pub namespace: String,
    /// Cost of the query.
    #[serde(default)]
    pub usage: Usage,
}

impl QueryResponse {
    /// Create a response for `namespace`.
    pub fn new(namespace: impl Into<String>, matches: Vec<ScoredVector>, read_units: u64) -> Self {
        Self {
            matches,
            namespace: namespace.into(),
            usage: Usage::new(read_units),
        }
    }
}

/// Similarity metric an index was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity; higher is better.
    Cosine,
    /// Dot product; higher is better.
    DotProduct,
    /// Euclidean distance; lower is better.
    Euclidean,
}

impl Metric {
    /// Returns the name used by the service API.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::DotProduct => "dotproduct",
            Self::Euclidean => "euclidean",
        }
    }

    /// Score ordering implied by this metric.
    pub fn polarity(&self) -> Polarity {
        match self {
            Self::Cosine | Self::DotProduct => Polarity::HigherIsBetter,
            Self::Euclidean => Polarity::LowerIsBetter,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether larger or smaller scores mean a closer match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Not yet established.
    #[default]
    Unknown,
    /// Larger scores are better (cosine, dot product).
    HigherIsBetter,
    /// Smaller scores are better (euclidean distance).
    LowerIsBetter,
}

impl Polarity {
    /// Returns true once the ordering has been established.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::HigherIsBetter => "higher-is-better",
            Self::LowerIsBetter => "lower-is-better",
        })
    }
}
