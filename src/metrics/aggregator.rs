use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::MetricsError;

use super::histogram::LatencyHistogram;
use super::types::{AggregateSnapshot, RetCode};

/// Per-worker accumulator: latency distribution plus outcome counts.
///
/// Owned by exactly one worker while the run is active and merged only
/// after that worker stopped, so recording never synchronizes.
#[derive(Debug, Clone)]
pub struct OutcomeAggregator {
    histogram: LatencyHistogram,
    ret_codes: BTreeMap<RetCode, u64>,
}

impl OutcomeAggregator {
    /// # Errors
    ///
    /// Returns an error if the latency histogram cannot be created.
    pub fn new(resolution: f64) -> Result<Self, MetricsError> {
        Ok(Self {
            histogram: LatencyHistogram::new(resolution)?,
            ret_codes: BTreeMap::new(),
        })
    }

    pub fn record(&mut self, latency: Duration, code: RetCode) {
        self.histogram.record(latency);
        let entry = self.ret_codes.entry(code).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    /// Fold `other` into `self`. Order independent.
    ///
    /// # Errors
    ///
    /// Returns an error if the histograms cannot be merged.
    pub fn merge(&mut self, other: &OutcomeAggregator) -> Result<(), MetricsError> {
        self.histogram.merge(&other.histogram)?;
        for (code, count) in &other.ret_codes {
            let entry = self.ret_codes.entry(*code).or_insert(0);
            *entry = entry.saturating_add(*count);
        }
        Ok(())
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    #[must_use]
    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            count: self.histogram.count(),
            avg: self.histogram.avg(),
            ret_codes: self.ret_codes.clone(),
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (LatencyHistogram, BTreeMap<RetCode, u64>) {
        (self.histogram, self.ret_codes)
    }
}
