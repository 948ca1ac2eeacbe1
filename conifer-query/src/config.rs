//! Fan-out configuration with sensible defaults.
//!
//! [`QueryConfig`] controls how many namespace queries run at once, how long
//! each may take, and whether the index metric is known up front.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::types::Metric;

/// Configuration for a multi-namespace query.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Per-namespace query timeout in seconds. A namespace that exceeds it
    /// is reported as failed and contributes nothing.
    pub timeout_seconds: u64,
    /// Maximum number of namespace queries in flight at once.
    pub max_concurrency: usize,
    /// Index metric, if known. When `None` the score ordering is inferred
    /// from the first result with at least two matches.
    pub metric: Option<Metric>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_concurrency: 16,
            metric: None,
        }
    }
}

impl QueryConfig {
    /// Per-namespace timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` must be greater than 0
    /// - `max_concurrency` must be greater than 0
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.timeout_seconds == 0 {
            return Err(QueryError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(QueryError::Config(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
