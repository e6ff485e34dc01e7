use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::error::MetricsError;

use super::result::RunSummary;
use super::worker::WorkerStats;

/// Per-run profile written when a profiling sink is configured.
#[derive(Debug, Clone, Serialize)]
pub struct RunProfile {
    pub summary: RunSummary,
    pub workers: Vec<WorkerProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerProfile {
    pub worker: usize,
    pub calls: u64,
    pub errors: u64,
    pub sleep_ms: f64,
    pub busy_ms: f64,
    pub max_lag_ms: f64,
}

impl From<&WorkerStats> for WorkerProfile {
    fn from(stats: &WorkerStats) -> Self {
        Self {
            worker: stats.worker,
            calls: stats.calls,
            errors: stats.errors,
            sleep_ms: fractional_millis(stats.sleep),
            busy_ms: fractional_millis(stats.busy),
            max_lag_ms: fractional_millis(stats.max_lag),
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "Profile times keep sub-millisecond precision."
)]
fn fractional_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl RunProfile {
    #[must_use]
    pub fn new(summary: RunSummary, workers: &[WorkerStats]) -> Self {
        Self {
            summary,
            workers: workers.iter().map(WorkerProfile::from).collect(),
        }
    }
}

/// Writes `profile` as pretty JSON to `path`.
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
pub async fn write_profile(path: &Path, profile: &RunProfile) -> Result<(), MetricsError> {
    let body = serde_json::to_vec_pretty(profile).map_err(|err| MetricsError::External {
        context: "serialize run profile",
        source: Box::new(err),
    })?;
    tokio::fs::write(path, body)
        .await
        .map_err(|source| MetricsError::Io {
            context: "write run profile",
            source,
        })
}
