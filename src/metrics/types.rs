use std::collections::BTreeMap;

use serde::Serialize;

/// Outcome classification of one call. Non-negative values are protocol
/// status codes; [`CALL_ERROR`] marks a call that failed before producing
/// one.
pub type RetCode = i32;

/// Outcome recorded for any transport or call-level failure.
pub const CALL_ERROR: RetCode = -1;

/// Read-only view of an aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub count: u64,
    /// Average latency in seconds.
    pub avg: f64,
    pub ret_codes: BTreeMap<RetCode, u64>,
}

impl AggregateSnapshot {
    #[must_use]
    pub fn outcome_total(&self) -> u64 {
        self.ret_codes
            .values()
            .fold(0_u64, |total, count| total.saturating_add(*count))
    }
}
