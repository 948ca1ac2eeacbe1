//! Query orchestrator: concurrent namespace fan-out and top-k merge.
//!
//! [`dispatch::query_namespaces`] queries each namespace once and feeds the
//! results, in completion order, into a [`QueryResultsAggregator`], which
//! keeps the best `top_k` matches across all namespaces.

pub mod aggregator;
pub mod dispatch;
pub mod polarity;

pub use aggregator::{QueryResultsAggregator, MIN_AGGREGATE_TOP_K};
pub use dispatch::query_namespaces;
pub use polarity::infer_polarity;
