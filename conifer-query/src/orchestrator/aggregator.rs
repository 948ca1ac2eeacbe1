//! Bounded streaming top-k merge over namespace results.
//!
//! Each namespace result arrives already ranked best-first. The aggregator
//! keeps at most `top_k` entries in a heap whose root is the worst accepted
//! match, so a new candidate only has to beat the root. Because a batch is
//! best-first, the first candidate that fails to beat the root ends the scan
//! of that batch.
//!
//! Ties are broken by insertion order: every accepted match takes the next
//! sequence number, and among equal scores the lower sequence ranks first.
//! This is deterministic only for a fixed order of [`add_results`] calls.
//!
//! [`add_results`]: QueryResultsAggregator::add_results

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::QueryError;
use crate::results::{QueryNamespacesResults, ScoredVectorWithNamespace};
use crate::types::{Metric, Polarity, QueryResponse, ScoredVector, Usage};

use super::polarity::{badness_for, infer_polarity, Badness};

/// Smallest `top_k` the aggregator accepts.
pub const MIN_AGGREGATE_TOP_K: usize = 2;

/// Heap slots reserved up front; larger `top_k` values grow on demand.
const PREALLOCATED_ENTRIES: usize = 256;

/// One accepted match. Ordered worst-last: higher badness, then later insertion.
#[derive(Debug)]
struct HeapEntry {
    badness: f64,
    sequence: u64,
    namespace: String,
    vector: ScoredVector,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.badness
            .total_cmp(&other.badness)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// A single match held back until the score ordering is known.
#[derive(Debug)]
struct PendingMatch {
    sequence: u64,
    namespace: String,
    vector: ScoredVector,
}

/// Merges best-first namespace results into one bounded, ordered result set.
///
/// Not safe for concurrent mutation: callers feed it from a single task.
/// Results can be read exactly once; after [`get_results`](Self::get_results)
/// every further call fails with [`QueryError::ResultsAlreadyRead`].
#[derive(Debug)]
pub struct QueryResultsAggregator {
    top_k: usize,
    polarity: Polarity,
    next_sequence: u64,
    heap: BinaryHeap<HeapEntry>,
    pending: Option<PendingMatch>,
    read_units: u64,
    read: bool,
}

impl QueryResultsAggregator {
    /// Create an aggregator that infers the score ordering from the results.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidTopK`] if `top_k` is below
    /// [`MIN_AGGREGATE_TOP_K`]: with fewer than two matches per namespace the
    /// ordering cannot be inferred.
    pub fn new(top_k: usize) -> Result<Self, QueryError> {
        if top_k < MIN_AGGREGATE_TOP_K {
            return Err(QueryError::InvalidTopK(top_k));
        }
        Ok(Self {
            top_k,
            polarity: Polarity::Unknown,
            next_sequence: 0,
            heap: BinaryHeap::with_capacity(top_k.min(PREALLOCATED_ENTRIES)),
            pending: None,
            read_units: 0,
            read: false,
        })
    }

    /// Create an aggregator for an index whose metric is known.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_metric(top_k: usize, metric: Metric) -> Result<Self, QueryError> {
        let mut aggregator = Self::new(top_k)?;
        aggregator.polarity = metric.polarity();
        Ok(aggregator)
    }

    /// Maximum number of matches kept.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Score ordering in use, [`Polarity::Unknown`] until established.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Read units accumulated so far.
    pub fn read_units(&self) -> u64 {
        self.read_units
    }

    /// Number of matches currently held.
    pub fn len(&self) -> usize {
        self.heap.len() + usize::from(self.pending.is_some())
    }

    /// Returns true if no match is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once results have been read.
    pub fn is_read(&self) -> bool {
        self.read
    }

    /// Merge one namespace result.
    ///
    /// The result's read units are always counted, even when it has no
    /// matches or none of its matches are kept.
    ///
    /// While the ordering is unknown, the first result with at least two
    /// matches establishes it. A lone single-match result is held back until
    /// then; a second one arriving before the ordering is known is an error.
    ///
    /// # Errors
    ///
    /// - [`QueryError::ResultsAlreadyRead`] after [`get_results`](Self::get_results)
    /// - [`QueryError::NotEnoughMatchesToInferMetric`] for a second
    ///   single-match result while the ordering is still unknown
    pub fn add_results(&mut self, response: QueryResponse) -> Result<(), QueryError> {
        if self.read {
            return Err(QueryError::ResultsAlreadyRead);
        }

        let QueryResponse {
            mut matches,
            namespace,
            usage,
        } = response;
        self.read_units = self.read_units.saturating_add(usage.read_units);

        if matches.is_empty() {
            return Ok(());
        }

        if !self.polarity.is_known() {
            if matches.len() == 1 {
                if self.pending.is_some() {
                    return Err(QueryError::NotEnoughMatchesToInferMetric { namespace });
                }
                let sequence = self.take_sequence();
                if let Some(vector) = matches.pop() {
                    tracing::trace!(%namespace, "holding single match until score ordering is known");
                    self.pending = Some(PendingMatch {
                        sequence,
                        namespace,
                        vector,
                    });
                }
                return Ok(());
            }

            self.polarity = infer_polarity(matches.iter().map(|m| m.score));
            tracing::debug!(%namespace, polarity = %self.polarity, "inferred score ordering");
        }

        // Two or more best-first scores always settle the ordering.
        let Some(badness) = badness_for(self.polarity) else {
            return Err(QueryError::NotEnoughMatchesToInferMetric { namespace });
        };

        if let Some(pending) = self.pending.take() {
            let candidate = badness(pending.vector.score);
            self.heap.push(HeapEntry {
                badness: candidate,
                sequence: pending.sequence,
                namespace: pending.namespace,
                vector: pending.vector,
            });
        }

        self.merge(&namespace, matches, badness);
        Ok(())
    }

    /// Drain the merged results, best first.
    ///
    /// This empties the aggregator and may only be called once.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::ResultsAlreadyRead`] on a second call.
    pub fn get_results(&mut self) -> Result<QueryNamespacesResults, QueryError> {
        if self.read {
            return Err(QueryError::ResultsAlreadyRead);
        }
        self.read = true;

        let heap = std::mem::take(&mut self.heap);
        let mut matches: Vec<ScoredVectorWithNamespace> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| ScoredVectorWithNamespace::new(entry.namespace, entry.vector))
            .collect();

        // A held match survives only when nothing else was ever merged.
        if let Some(pending) = self.pending.take() {
            matches.push(ScoredVectorWithNamespace::new(pending.namespace, pending.vector));
        }

        Ok(QueryNamespacesResults {
            usage: Usage::new(self.read_units),
            matches,
            failures: Vec::new(),
        })
    }

    fn merge(&mut self, namespace: &str, matches: Vec<ScoredVector>, badness: Badness) {
        let total = matches.len();
        for (position, vector) in matches.into_iter().enumerate() {
            let candidate = badness(vector.score);

            if self.heap.len() >= self.top_k {
                let Some(worst) = self.heap.peek() else {
                    break;
                };
                if candidate.total_cmp(&worst.badness) != Ordering::Less {
                    tracing::trace!(
                        namespace,
                        skipped = total - position,
                        "remaining matches cannot improve the result"
                    );
                    break;
                }
                self.heap.pop();
            }

            let sequence = self.take_sequence();
            self.heap.push(HeapEntry {
                badness: candidate,
                sequence,
                namespace: namespace.to_string(),
                vector,
            });
        }
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(namespace: &str, scores: &[(&str, f64)], read_units: u64) -> QueryResponse {
        QueryResponse::new(
            namespace,
            scores
                .iter()
                .map(|(id, score)| ScoredVector::new(*id, *score))
                .collect(),
            read_units,
        )
    }

    fn ids(results: &QueryNamespacesResults) -> Vec<&str> {
        results.matches.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn top_k_below_two_rejected() {
        assert!(matches!(
            QueryResultsAggregator::new(0),
            Err(QueryError::InvalidTopK(0))
        ));
        assert!(matches!(
            QueryResultsAggregator::new(1),
            Err(QueryError::InvalidTopK(1))
        ));
        assert!(QueryResultsAggregator::new(2).is_ok());
    }

    #[test]
    fn empty_aggregator_reads_empty() {
        let mut aggregator = QueryResultsAggregator::new(3).expect("aggregator");
        let results = aggregator.get_results().expect("results");
        assert!(results.is_empty());
        assert_eq!(results.usage.read_units, 0);
    }

    #[test]
    fn keeps_running_usage_total() {
        let mut aggregator = QueryResultsAggregator::new(3).expect("aggregator");
        aggregator
            .add_results(response("ns1", &[("1", 0.9), ("2", 0.8)], 5))
            .expect("add");
        aggregator.add_results(response("ns2", &[], 7)).expect("add");
        aggregator
            .add_results(response("ns3", &[("3", 0.1), ("4", 0.05)], 11))
            .expect("add");
        assert_eq!(aggregator.read_units(), 23);
        assert_eq!(aggregator.get_results().expect("results").usage.read_units, 23);
    }

    #[test]
    fn lower_is_better_results_ascend() {
        let mut aggregator = QueryResultsAggregator::new(3).expect("aggregator");
        aggregator
            .add_results(response("ns2", &[("2", 0.01), ("3", 0.2)], 5))
            .expect("add");
        aggregator
            .add_results(response("ns1", &[("1", 0.1)], 5))
            .expect("add");
        let results = aggregator.get_results().expect("results");
        assert_eq!(aggregator.polarity(), Polarity::LowerIsBetter);
        assert_eq!(ids(&results), vec!["2", "1", "3"]);
        assert_eq!(results.matches[1].namespace, "ns1");
        assert_eq!(results.usage.read_units, 10);
    }

    #[test]
    fn declared_metric_skips_inference() {
        let mut aggregator =
            QueryResultsAggregator::with_metric(2, Metric::Euclidean).expect("aggregator");
        assert_eq!(aggregator.polarity(), Polarity::LowerIsBetter);
        aggregator
            .add_results(response("a", &[("1", 0.3)], 1))
            .expect("single match accepted");
        aggregator
            .add_results(response("b", &[("2", 0.2)], 1))
            .expect("single match accepted");
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["2", "1"]);
    }

    #[test]
    fn declared_metric_overrides_data() {
        let mut aggregator =
            QueryResultsAggregator::with_metric(2, Metric::DotProduct).expect("aggregator");
        aggregator
            .add_results(response("a", &[("1", 0.9), ("2", 0.5)], 1))
            .expect("add");
        assert_eq!(aggregator.polarity(), Polarity::HigherIsBetter);
    }

    #[test]
    fn held_single_match_merged_once_ordering_known() {
        let mut aggregator = QueryResultsAggregator::new(3).expect("aggregator");
        aggregator
            .add_results(response("solo", &[("s", 0.85)], 2))
            .expect("first single match is held");
        assert_eq!(aggregator.polarity(), Polarity::Unknown);
        assert_eq!(aggregator.len(), 1);

        aggregator
            .add_results(response("pair", &[("a", 0.9), ("b", 0.8)], 3))
            .expect("add");
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["a", "s", "b"]);
        assert_eq!(results.usage.read_units, 5);
    }

    #[test]
    fn held_single_match_wins_ties_by_arrival() {
        let mut aggregator = QueryResultsAggregator::new(3).expect("aggregator");
        aggregator
            .add_results(response("solo", &[("s", 0.8)], 0))
            .expect("held");
        aggregator
            .add_results(response("pair", &[("a", 0.9), ("b", 0.8)], 0))
            .expect("add");
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["a", "s", "b"]);
    }

    #[test]
    fn second_single_match_before_ordering_known_fails() {
        let mut aggregator = QueryResultsAggregator::new(2).expect("aggregator");
        aggregator
            .add_results(response("ns1", &[("1", 0.1)], 5))
            .expect("held");
        let err = aggregator
            .add_results(response("ns2", &[("2", 0.01)], 5))
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::NotEnoughMatchesToInferMetric { ref namespace } if namespace == "ns2"
        ));
        assert_eq!(aggregator.read_units(), 10);
    }

    #[test]
    fn lone_single_match_is_returned() {
        let mut aggregator = QueryResultsAggregator::new(2).expect("aggregator");
        aggregator
            .add_results(response("ns1", &[("only", 0.4)], 1))
            .expect("held");
        aggregator.add_results(response("ns2", &[], 1)).expect("add");
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["only"]);
        assert_eq!(results.matches[0].namespace, "ns1");
        assert_eq!(results.usage.read_units, 2);
    }

    #[test]
    fn single_match_after_ordering_known_is_merged() {
        let mut aggregator = QueryResultsAggregator::new(3).expect("aggregator");
        aggregator
            .add_results(response("ns3", &[("2", 0.01), ("3", 0.2)], 5))
            .expect("add");
        aggregator
            .add_results(response("ns1", &[("1", 0.1)], 5))
            .expect("add");
        aggregator.add_results(response("ns2", &[], 5)).expect("add");
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["2", "1", "3"]);
        assert_eq!(results.usage.read_units, 15);
    }

    #[test]
    fn heap_never_exceeds_top_k() {
        let mut aggregator = QueryResultsAggregator::new(2).expect("aggregator");
        aggregator
            .add_results(response("a", &[("1", 0.9), ("2", 0.8), ("3", 0.7)], 0))
            .expect("add");
        assert_eq!(aggregator.len(), 2);
        aggregator
            .add_results(response("b", &[("4", 0.95), ("5", 0.91), ("6", 0.6)], 0))
            .expect("add");
        assert_eq!(aggregator.len(), 2);
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["4", "5"]);
    }

    #[test]
    fn second_read_fails() {
        let mut aggregator = QueryResultsAggregator::new(2).expect("aggregator");
        aggregator.get_results().expect("first read");
        assert!(aggregator.is_read());
        assert!(matches!(
            aggregator.get_results(),
            Err(QueryError::ResultsAlreadyRead)
        ));
    }

    #[test]
    fn add_after_read_fails_and_counts_nothing() {
        let mut aggregator = QueryResultsAggregator::new(2).expect("aggregator");
        aggregator.get_results().expect("first read");
        let err = aggregator
            .add_results(response("late", &[("1", 0.5), ("2", 0.4)], 9))
            .unwrap_err();
        assert!(matches!(err, QueryError::ResultsAlreadyRead));
        assert_eq!(aggregator.read_units(), 0);
    }

    #[test]
    fn huge_top_k_does_not_reserve_up_front() {
        let mut aggregator = QueryResultsAggregator::new(usize::MAX).expect("aggregator");
        assert!(aggregator.heap.capacity() <= PREALLOCATED_ENTRIES);
        aggregator
            .add_results(response("a", &[("1", 0.9), ("2", 0.8)], 1))
            .expect("add");
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["1", "2"]);
    }

    #[test]
    fn any_two_match_batch_settles_ordering() {
        let batches: [&[(&str, f64)]; 4] = [
            &[("1", 0.5), ("2", 0.5)],
            &[("1", 0.0), ("2", -0.0)],
            &[("1", f64::NAN), ("2", 0.3)],
            &[("1", 0.3), ("2", f64::NAN)],
        ];
        for batch in batches {
            let mut aggregator = QueryResultsAggregator::new(2).expect("aggregator");
            aggregator.add_results(response("ns", batch, 0)).expect("add");
            assert!(aggregator.polarity().is_known());
            assert_eq!(aggregator.len(), 2);
        }
    }

    #[test]
    fn signed_zero_scores_tie_by_arrival() {
        let mut aggregator = QueryResultsAggregator::new(2).expect("aggregator");
        aggregator
            .add_results(response("x", &[("x1", 0.9), ("x2", -0.0)], 0))
            .expect("add");
        aggregator
            .add_results(response("y", &[("y1", 0.0), ("y2", -0.5)], 0))
            .expect("add");
        let results = aggregator.get_results().expect("results");
        assert_eq!(ids(&results), vec!["x1", "x2"]);
    }

    #[test]
    fn heap_entry_orders_by_badness_then_sequence() {
        let entry = |badness: f64, sequence: u64| HeapEntry {
            badness,
            sequence,
            namespace: String::new(),
            vector: ScoredVector::new("x", 0.0),
        };
        assert!(entry(0.1, 5) < entry(0.2, 0));
        assert!(entry(0.1, 0) < entry(0.1, 1));
        assert_eq!(entry(0.3, 2), entry(0.3, 2));
    }
}
