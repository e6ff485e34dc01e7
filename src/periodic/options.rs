use std::path::PathBuf;
use std::time::Duration;

use crate::error::ValidationError;

pub const DEFAULT_QPS: f64 = 8.0;
pub const DEFAULT_NUM_THREADS: usize = 4;
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(5);
/// Histogram bucket width in seconds.
pub const DEFAULT_RESOLUTION: f64 = 0.001;

/// When a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Every worker runs until this much wall time elapsed since the start.
    Duration(Duration),
    /// Exactly this many calls in total, spread over the workers.
    Count(u64),
}

impl Default for StopCondition {
    fn default() -> Self {
        StopCondition::Duration(DEFAULT_RUN_DURATION)
    }
}

/// Configuration of one paced run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Target aggregate calls per second; fractional values are honored.
    pub qps: f64,
    pub num_threads: usize,
    pub stop: StopCondition,
    /// Histogram bucket width in seconds.
    pub resolution: f64,
    /// Where to write the JSON run profile, if anywhere.
    pub profiler: Option<PathBuf>,
    /// Attached to the run's tracing span.
    pub label: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            qps: DEFAULT_QPS,
            num_threads: DEFAULT_NUM_THREADS,
            stop: StopCondition::default(),
            resolution: DEFAULT_RESOLUTION,
            profiler: None,
            label: None,
        }
    }
}

impl RunOptions {
    /// Checks the invariants a run relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.qps.is_finite() || self.qps <= 0.0 {
            return Err(ValidationError::InvalidQps { value: self.qps });
        }
        if self.num_threads == 0 {
            return Err(ValidationError::NumThreadsZero);
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(ValidationError::InvalidResolution {
                value: self.resolution,
            });
        }
        match self.stop {
            StopCondition::Duration(duration) if duration.is_zero() => {
                Err(ValidationError::RunDurationZero)
            }
            StopCondition::Count(0) => Err(ValidationError::CallCountZero),
            StopCondition::Duration(_) | StopCondition::Count(_) => Ok(()),
        }
    }

    /// Per-worker target rate.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "Fractional QPS is split evenly over the workers."
    )]
    pub fn worker_qps(&self) -> f64 {
        self.qps / self.num_threads.max(1) as f64
    }

    /// Time between two consecutive call starts of one worker.
    #[must_use]
    pub fn worker_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.worker_qps().recip()).unwrap_or(Duration::MAX)
    }

    /// Calls assigned to `worker` under a count stop condition, `None` when
    /// the run is time bound.
    #[must_use]
    pub fn calls_for_worker(&self, worker: usize) -> Option<u64> {
        match self.stop {
            StopCondition::Count(total) => Some(split_count(total, self.num_threads, worker)),
            StopCondition::Duration(_) => None,
        }
    }
}

/// Even share of `total` for `worker`; the remainder goes to the first
/// workers.
pub(crate) fn split_count(total: u64, workers: usize, worker: usize) -> u64 {
    let workers = u64::try_from(workers.max(1)).unwrap_or(u64::MAX);
    let worker = u64::try_from(worker).unwrap_or(u64::MAX);
    let base = total.checked_div(workers).unwrap_or(0);
    let remainder = total.checked_rem(workers).unwrap_or(0);
    if worker < remainder {
        base.saturating_add(1)
    } else {
        base
    }
}
