use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{AppError, AppResult, CallError, RunError};
use crate::metrics::{OutcomeAggregator, RetCode};
use crate::shutdown::ShutdownReceiver;

use super::options::{RunOptions, StopCondition};
use super::profile::{RunProfile, write_profile};
use super::result::RunResult;
use super::worker::{WorkerOutcome, WorkerPlan, run_worker};

pub type TaskFuture = BoxFuture<'static, Result<RetCode, CallError>>;
/// One unit of work; receives the index of the worker calling it.
pub type PeriodicTask = dyn Fn(usize) -> TaskFuture + Send + Sync;

/// Drives a task at a target aggregate rate over a fixed set of workers.
#[derive(Debug, Clone)]
pub struct PeriodicRunner {
    options: RunOptions,
}

impl PeriodicRunner {
    /// # Errors
    ///
    /// Returns a validation error when the options cannot describe a run.
    pub fn new(options: RunOptions) -> AppResult<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs `task` until the stop condition is met or `shutdown_rx` fires,
    /// then merges every worker's outcomes.
    ///
    /// # Errors
    ///
    /// Returns an error when a worker cannot be started, does not complete,
    /// or its outcomes cannot be merged.
    pub async fn run(
        &self,
        task: Arc<PeriodicTask>,
        shutdown_rx: ShutdownReceiver,
    ) -> AppResult<RunResult> {
        let finished = self.execute(task, shutdown_rx).await?;
        self.merge(finished).await
    }

    /// Runs every worker to completion without merging their outcomes.
    ///
    /// # Errors
    ///
    /// Returns an error when an aggregator cannot be created or a worker
    /// does not complete.
    pub async fn execute(
        &self,
        task: Arc<PeriodicTask>,
        shutdown_rx: ShutdownReceiver,
    ) -> AppResult<FinishedRun> {
        self.execute_inner(task, shutdown_rx)
            .instrument(self.span())
            .await
    }

    /// Merges the outcomes of a finished run into its result and writes the
    /// run profile when one was requested.
    ///
    /// # Errors
    ///
    /// Returns an error when two workers' outcomes cannot be merged.
    pub async fn merge(&self, finished: FinishedRun) -> AppResult<RunResult> {
        self.merge_inner(finished).instrument(self.span()).await
    }

    fn span(&self) -> tracing::Span {
        info_span!(
            "periodic_run",
            label = self.options.label.as_deref().unwrap_or("")
        )
    }

    async fn execute_inner(
        &self,
        task: Arc<PeriodicTask>,
        shutdown_rx: ShutdownReceiver,
    ) -> AppResult<FinishedRun> {
        let options = &self.options;
        let interval = options.worker_interval();

        let mut aggregators = Vec::with_capacity(options.num_threads);
        for _ in 0..options.num_threads {
            aggregators.push(OutcomeAggregator::new(options.resolution)?);
        }

        info!(
            qps = options.qps,
            num_threads = options.num_threads,
            per_worker_qps = options.worker_qps(),
            interval = ?interval,
            stop = ?options.stop,
            "Starting periodic run"
        );

        let start = Instant::now();
        let deadline = match options.stop {
            StopCondition::Duration(duration) => start.checked_add(duration),
            StopCondition::Count(_) => None,
        };

        let handles: Vec<JoinHandle<WorkerOutcome>> = aggregators
            .into_iter()
            .enumerate()
            .map(|(worker, aggregator)| {
                let plan = WorkerPlan {
                    worker,
                    start,
                    interval,
                    deadline,
                    calls: options.calls_for_worker(worker),
                };
                tokio::spawn(run_worker(
                    plan,
                    aggregator,
                    Arc::clone(&task),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter().enumerate();
        while let Some((worker, handle)) = pending.next() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(source) => {
                    for (_, rest) in pending {
                        rest.abort();
                    }
                    return Err(AppError::run(RunError::WorkerFailed { worker, source }));
                }
            };
            debug!(
                worker,
                calls = outcome.stats.calls,
                errors = outcome.stats.errors,
                "Worker finished"
            );
            outcomes.push(outcome);
        }

        Ok(FinishedRun {
            actual_duration: start.elapsed(),
            outcomes,
        })
    }

    async fn merge_inner(&self, finished: FinishedRun) -> AppResult<RunResult> {
        let options = &self.options;
        let FinishedRun {
            actual_duration,
            outcomes,
        } = finished;

        let mut merged = OutcomeAggregator::new(options.resolution)?;
        let mut stats = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            merged.merge(&outcome.aggregator)?;
            stats.push(outcome.stats);
        }

        let total = merged.count();
        let actual_qps = observed_rate(total, actual_duration);
        let (duration_histogram, ret_codes) = merged.into_parts();
        let result = RunResult {
            duration_histogram,
            ret_codes,
            actual_qps,
            actual_duration,
            requested_qps: options.qps,
            num_threads: options.num_threads,
            stop: options.stop,
            label: options.label.clone(),
        };

        info!(
            calls = total,
            errors = result.error_count(),
            actual_qps,
            elapsed = ?actual_duration,
            "Periodic run finished"
        );

        if let Some(path) = options.profiler.as_deref() {
            let profile = RunProfile::new(result.summary(), &stats);
            match write_profile(path, &profile).await {
                Ok(()) => debug!(path = %path.display(), "Run profile written"),
                Err(err) => warn!(path = %path.display(), error = %err, "Failed to write run profile"),
            }
        }

        Ok(result)
    }
}

/// Workers' unmerged outcomes, in worker order.
pub struct FinishedRun {
    actual_duration: Duration,
    outcomes: Vec<WorkerOutcome>,
}

impl FinishedRun {
    /// Calls made across all workers.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.outcomes
            .iter()
            .fold(0_u64, |total, outcome| total.saturating_add(outcome.stats.calls))
    }

    #[must_use]
    pub const fn actual_duration(&self) -> Duration {
        self.actual_duration
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "Observed rate is reported as a fractional QPS."
)]
fn observed_rate(calls: u64, elapsed: Duration) -> f64 {
    let elapsed_secs = elapsed.as_secs_f64();
    if elapsed_secs > 0.0 {
        calls as f64 / elapsed_secs
    } else {
        0.0
    }
}
