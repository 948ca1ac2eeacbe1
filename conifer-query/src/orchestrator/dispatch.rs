//! Concurrent namespace fan-out feeding the aggregator.
//!
//! Queries every distinct namespace concurrently, merges each result into a
//! single [`QueryResultsAggregator`] as it completes, and drains the
//! aggregator once all namespaces have answered or failed.

use futures::StreamExt;

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::query::{QueryCriteria, QueryRequest};
use crate::results::{NamespaceFailure, QueryNamespacesResults};
use crate::transport::NamespaceTransport;

use super::aggregator::{QueryResultsAggregator, MIN_AGGREGATE_TOP_K};

/// Query several namespaces of one index and merge the results.
///
/// # Pipeline
///
/// 1. Deduplicate `namespaces`, keeping first appearance
/// 2. Validate the namespace set, `criteria` and `config`
/// 3. Request `max(top_k, 2)` matches per namespace so the score ordering
///    can be inferred
/// 4. Run up to `config.max_concurrency` namespace queries at once, each
///    bounded by `config.timeout()`
/// 5. Merge each result as it completes, in completion order
/// 6. Drain the aggregator and truncate to `criteria.top_k`
///
/// A namespace that fails or times out is logged at warn level, reported in
/// [`QueryNamespacesResults::failures`], and contributes no matches and no
/// read units. If every namespace fails the result is empty, not an error.
///
/// # Errors
///
/// - [`QueryError::EmptyNamespaces`] if no namespace is given
/// - any error from [`QueryCriteria::validate`] or [`QueryConfig::validate`]
/// - [`QueryError::NotEnoughMatchesToInferMetric`] if the score ordering
///   cannot be established; remaining namespace queries are cancelled
pub async fn query_namespaces<T, S>(
    transport: &T,
    namespaces: &[S],
    criteria: &QueryCriteria,
    config: &QueryConfig,
) -> Result<QueryNamespacesResults, QueryError>
where
    T: NamespaceTransport,
    S: AsRef<str>,
{
    let targets = dedup_namespaces(namespaces);
    if targets.is_empty() {
        return Err(QueryError::EmptyNamespaces);
    }
    criteria.validate()?;
    config.validate()?;

    let per_namespace_top_k = criteria.top_k.max(MIN_AGGREGATE_TOP_K);
    let mut aggregator = match config.metric {
        Some(metric) => QueryResultsAggregator::with_metric(per_namespace_top_k, metric)?,
        None => QueryResultsAggregator::new(per_namespace_top_k)?,
    };

    tracing::debug!(
        namespaces = targets.len(),
        top_k = criteria.top_k,
        per_namespace_top_k,
        "querying namespaces"
    );

    let timeout = config.timeout();
    let requests: Vec<QueryRequest> = targets
        .iter()
        .map(|namespace| QueryRequest::for_namespace(criteria, namespace, per_namespace_top_k))
        .collect();

    let mut completions = futures::stream::iter(requests)
        .map(move |request| async move {
            let outcome = match tokio::time::timeout(timeout, transport.query_namespace(&request)).await {
                Ok(result) => result,
                Err(_) => Err(QueryError::Timeout(format!(
                    "namespace query exceeded {}s",
                    timeout.as_secs()
                ))),
            };
            (request.namespace, outcome)
        })
        .buffer_unordered(config.max_concurrency);

    let mut failures = Vec::new();
    while let Some((namespace, outcome)) = completions.next().await {
        match outcome {
            Ok(mut response) => {
                if response.namespace.is_empty() {
                    response.namespace.clone_from(&namespace);
                }
                tracing::debug!(
                    %namespace,
                    count = response.matches.len(),
                    read_units = response.usage.read_units,
                    "namespace query completed"
                );
                aggregator.add_results(response)?;
            }
            Err(err) => {
                tracing::warn!(%namespace, error = %err, "namespace query failed");
                failures.push(NamespaceFailure::new(namespace, &err));
            }
        }
    }
    drop(completions);

    let mut results = aggregator.get_results()?;
    results.matches.truncate(criteria.top_k);
    results.failures = failures;

    tracing::info!(
        namespaces = targets.len(),
        failed = results.failures.len(),
        count = results.matches.len(),
        read_units = results.usage.read_units,
        "namespace query merge complete"
    );

    Ok(results)
}

/// Remove repeated namespace names, keeping the first occurrence of each.
fn dedup_namespaces<S: AsRef<str>>(namespaces: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    namespaces
        .iter()
        .map(AsRef::as_ref)
        .filter(|namespace| seen.insert(*namespace))
        .map(str::to_string)
        .collect()
}
