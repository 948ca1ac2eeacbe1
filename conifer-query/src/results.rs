//! Merged multi-namespace results.
//!
//! [`QueryNamespacesResults`] is produced once, by draining the aggregator,
//! and never changes afterwards. Fields are public for direct access; the
//! `get`/`field` methods offer lookup by name over the fixed field set.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;
use crate::types::{Metadata, ScoredVector, SparseValues, Usage};

/// Lists longer than this are shortened when rendered.
const DISPLAY_MAX_ITEMS: usize = 2;

/// A match annotated with the namespace it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredVectorWithNamespace {
    /// Namespace the match was found in.
    pub namespace: String,
    /// Vector identifier.
    pub id: String,
    /// Similarity score.
    pub score: f64,
    /// Dense values, if requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
    /// Sparse values, if requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_values: Option<SparseValues>,
    /// Metadata, if requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A borrowed view of one [`ScoredVectorWithNamespace`] field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchField<'a> {
    /// `namespace` or `id`.
    Text(&'a str),
    /// `score`.
    Score(f64),
    /// `values`.
    Values(&'a [f32]),
    /// `sparse_values`.
    SparseValues(&'a SparseValues),
    /// `metadata`.
    Metadata(&'a Metadata),
}

impl ScoredVectorWithNamespace {
    /// Names accepted by [`get`](Self::get) and [`field`](Self::field).
    pub const FIELDS: &'static [&'static str] =
        &["namespace", "id", "score", "values", "sparse_values", "metadata"];

    /// Attach a namespace to a match.
    pub fn new(namespace: impl Into<String>, vector: ScoredVector) -> Self {
        Self {
            namespace: namespace.into(),
            id: vector.id,
            score: vector.score,
            values: vector.values,
            sparse_values: vector.sparse_values,
            metadata: vector.metadata,
        }
    }

    /// Look up a field by name.
    ///
    /// Returns `Ok(None)` for a known field that is absent on this match.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownField`] if `key` is not one of [`Self::FIELDS`].
    pub fn field(&self, key: &str) -> Result<Option<MatchField<'_>>, QueryError> {
        Ok(match key {
            "namespace" => Some(MatchField::Text(&self.namespace)),
            "id" => Some(MatchField::Text(&self.id)),
            "score" => Some(MatchField::Score(self.score)),
            "values" => self.values.as_deref().map(MatchField::Values),
            "sparse_values" => self.sparse_values.as_ref().map(MatchField::SparseValues),
            "metadata" => self.metadata.as_ref().map(MatchField::Metadata),
            other => return Err(QueryError::UnknownField(other.to_string())),
        })
    }

    /// Look up a field by name, treating unknown and absent fields alike.
    pub fn get(&self, key: &str) -> Option<MatchField<'_>> {
        self.field(key).ok().flatten()
    }
}

impl fmt::Display for ScoredVectorWithNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        write_pretty(f, &truncate_lists(value, DISPLAY_MAX_ITEMS))
    }
}

/// A namespace whose query failed and contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFailure {
    /// The namespace.
    pub namespace: String,
    /// Stable error code, see [`QueryError::code`].
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl NamespaceFailure {
    /// Record a failure of `namespace`.
    pub fn new(namespace: impl Into<String>, error: &QueryError) -> Self {
        Self {
            namespace: namespace.into(),
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// The combined, best-first results of a multi-namespace query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryNamespacesResults {
    /// Read units consumed by every namespace query, including matches that
    /// did not make the final cut.
    pub usage: Usage,
    /// Best matches across all namespaces, best first.
    pub matches: Vec<ScoredVectorWithNamespace>,
    /// Namespaces that failed and were left out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<NamespaceFailure>,
}

/// A borrowed view of one [`QueryNamespacesResults`] field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultsField<'a> {
    /// `matches`.
    Matches(&'a [ScoredVectorWithNamespace]),
    /// `usage`.
    Usage(&'a Usage),
    /// `failures`.
    Failures(&'a [NamespaceFailure]),
}

impl QueryNamespacesResults {
    /// Names accepted by [`get`](Self::get) and [`field`](Self::field).
    pub const FIELDS: &'static [&'static str] = &["usage", "matches", "failures"];

    /// Look up a field by name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownField`] if `key` is not one of [`Self::FIELDS`].
    pub fn field(&self, key: &str) -> Result<ResultsField<'_>, QueryError> {
        match key {
            "matches" => Ok(ResultsField::Matches(&self.matches)),
            "usage" => Ok(ResultsField::Usage(&self.usage)),
            "failures" => Ok(ResultsField::Failures(&self.failures)),
            other => Err(QueryError::UnknownField(other.to_string())),
        }
    }

    /// Look up a field by name, returning `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<ResultsField<'_>> {
        self.field(key).ok()
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns true if there are no matches.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Iterate over matches, best first.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredVectorWithNamespace> {
        self.matches.iter()
    }
}

impl<'a> IntoIterator for &'a QueryNamespacesResults {
    type Item = &'a ScoredVectorWithNamespace;
    type IntoIter = std::slice::Iter<'a, ScoredVectorWithNamespace>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

impl fmt::Display for QueryNamespacesResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usage = serde_json::to_value(self.usage).map_err(|_| fmt::Error)?;
        let mut matches = Vec::with_capacity(self.matches.len());
        for m in &self.matches {
            let value = serde_json::to_value(m).map_err(|_| fmt::Error)?;
            matches.push(truncate_lists(value, DISPLAY_MAX_ITEMS));
        }

        let mut root = serde_json::Map::new();
        root.insert("usage".into(), usage);
        root.insert("matches".into(), Value::Array(matches));
        if !self.failures.is_empty() {
            let failures = serde_json::to_value(&self.failures).map_err(|_| fmt::Error)?;
            root.insert("failures".into(), failures);
        }
        write_pretty(f, &Value::Object(root))
    }
}

fn write_pretty(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    let text = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
    f.write_str(&text)
}

/// Shorten long lists for display and drop null entries.
///
/// A list keeps its first `max_items` entries plus a `"... N more"` marker,
/// but only when at least two entries would be hidden; hiding a single entry
/// saves nothing, so such lists are shown whole.
fn truncate_lists(value: Value, max_items: usize) -> Value {
    match value {
        Value::Array(items) => {
            let mut kept: Vec<Value> = items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| truncate_lists(v, max_items))
                .collect();
            let hidden = kept.len().saturating_sub(max_items);
            if hidden > 1 {
                kept.truncate(max_items);
                kept.push(Value::String(format!("... {hidden} more")));
            }
            Value::Array(kept)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, truncate_lists(v, max_items)))
                .collect(),
        ),
        other => other,
    }
}
