//! Rate-paced scheduler: runs a unit of work at a target aggregate QPS over
//! a fixed set of workers and merges what each of them observed.
mod options;
mod profile;
mod result;
mod runner;
mod worker;


pub use options::{
    DEFAULT_NUM_THREADS, DEFAULT_QPS, DEFAULT_RESOLUTION, DEFAULT_RUN_DURATION, RunOptions,
    StopCondition,
};
pub use profile::{RunProfile, WorkerProfile};
pub use result::{PercentileValue, RunResult, RunSummary, SUMMARY_PERCENTILES};
pub use runner::{FinishedRun, PeriodicRunner, PeriodicTask, TaskFuture};
pub use worker::WorkerStats;
