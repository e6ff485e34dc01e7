use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::metrics::{CALL_ERROR, LatencyHistogram, RetCode};

use super::options::StopCondition;

/// Percentiles reported in summaries.
pub const SUMMARY_PERCENTILES: [f64; 5] = [50.0, 75.0, 90.0, 99.0, 99.9];

/// Merged outcome of one run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub duration_histogram: LatencyHistogram,
    pub ret_codes: BTreeMap<RetCode, u64>,
    pub actual_qps: f64,
    pub actual_duration: Duration,
    pub requested_qps: f64,
    pub num_threads: usize,
    pub stop: StopCondition,
    pub label: Option<String>,
}

impl RunResult {
    #[must_use]
    pub fn ret_code_count(&self, code: RetCode) -> u64 {
        self.ret_codes.get(&code).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.ret_code_count(CALL_ERROR)
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let histogram = &self.duration_histogram;
        let (duration_secs, exactly) = match self.stop {
            StopCondition::Duration(duration) => (Some(duration.as_secs_f64()), None),
            StopCondition::Count(count) => (None, Some(count)),
        };
        RunSummary {
            label: self.label.clone(),
            requested_qps: self.requested_qps,
            actual_qps: self.actual_qps,
            num_threads: self.num_threads,
            duration_secs,
            exactly,
            actual_duration_secs: self.actual_duration.as_secs_f64(),
            count: histogram.count(),
            avg_secs: histogram.avg(),
            min_secs: histogram.min().as_secs_f64(),
            max_secs: histogram.max().as_secs_f64(),
            resolution_secs: histogram.resolution(),
            percentiles: SUMMARY_PERCENTILES
                .iter()
                .map(|percentile| PercentileValue {
                    percentile: *percentile,
                    secs: histogram.percentile(*percentile).as_secs_f64(),
                })
                .collect(),
            ret_codes: self.ret_codes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub secs: f64,
}

/// Serializable view of a [`RunResult`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub label: Option<String>,
    pub requested_qps: f64,
    pub actual_qps: f64,
    pub num_threads: usize,
    pub duration_secs: Option<f64>,
    pub exactly: Option<u64>,
    pub actual_duration_secs: f64,
    pub count: u64,
    pub avg_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
    pub resolution_secs: f64,
    pub percentiles: Vec<PercentileValue>,
    pub ret_codes: BTreeMap<RetCode, u64>,
}
