//! Latency histograms and per-worker outcome aggregation.
mod aggregator;
mod histogram;
mod types;


pub use aggregator::OutcomeAggregator;
pub use histogram::LatencyHistogram;
pub use types::{AggregateSnapshot, CALL_ERROR, RetCode};
