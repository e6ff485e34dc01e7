use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::metrics::{CALL_ERROR, OutcomeAggregator};
use crate::shutdown::{ShutdownReceiver, is_shutdown, wait_for_shutdown};

use super::runner::PeriodicTask;

/// Schedule of one worker, fixed before any worker starts.
#[derive(Debug, Clone, Copy)]
pub(super) struct WorkerPlan {
    pub(super) worker: usize,
    pub(super) start: Instant,
    pub(super) interval: Duration,
    pub(super) deadline: Option<Instant>,
    pub(super) calls: Option<u64>,
}

/// What one worker did, for the run profile.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    pub worker: usize,
    pub calls: u64,
    pub errors: u64,
    pub sleep: Duration,
    pub busy: Duration,
    pub max_lag: Duration,
}

pub(super) struct WorkerOutcome {
    pub(super) aggregator: OutcomeAggregator,
    pub(super) stats: WorkerStats,
}

pub(super) async fn run_worker(
    plan: WorkerPlan,
    mut aggregator: OutcomeAggregator,
    task: Arc<PeriodicTask>,
    mut shutdown_rx: ShutdownReceiver,
) -> WorkerOutcome {
    let mut stats = WorkerStats {
        worker: plan.worker,
        ..WorkerStats::default()
    };
    let mut next_due = plan.start;

    loop {
        if is_shutdown(&shutdown_rx) {
            debug!(worker = plan.worker, calls = stats.calls, "Worker cancelled");
            break;
        }
        if let Some(limit) = plan.calls
            && stats.calls >= limit
        {
            break;
        }
        let now = Instant::now();
        if let Some(deadline) = plan.deadline
            && (next_due >= deadline || now >= deadline)
        {
            break;
        }

        if next_due > now {
            stats.sleep = stats.sleep.saturating_add(next_due.saturating_duration_since(now));
            let cancelled = tokio::select! {
                () = sleep_until(next_due) => false,
                () = wait_for_shutdown(&mut shutdown_rx) => true,
            };
            if cancelled {
                debug!(worker = plan.worker, calls = stats.calls, "Worker cancelled while paced");
                break;
            }
        } else {
            stats.max_lag = stats.max_lag.max(now.saturating_duration_since(next_due));
        }

        let call_start = Instant::now();
        let result = task(plan.worker).await;
        let latency = call_start.elapsed();
        match result {
            Ok(code) => aggregator.record(latency, code),
            Err(err) => {
                debug!(worker = plan.worker, error = %err, "Call failed");
                stats.errors = stats.errors.saturating_add(1);
                aggregator.record(latency, CALL_ERROR);
            }
        }
        stats.calls = stats.calls.saturating_add(1);
        stats.busy = stats.busy.saturating_add(latency);

        next_due = match next_due.checked_add(plan.interval) {
            Some(due) => due,
            None => break,
        };
    }

    WorkerOutcome { aggregator, stats }
}
