use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{AppError, AppResult, CallError, ConnectionError, ValidationError};
use crate::periodic::{PeriodicRunner, PeriodicTask, RunOptions, RunResult};
use crate::shutdown::{ShutdownReceiver, shutdown_channel, wait_for_shutdown};

use super::connection::{CallKind, Connection};
use super::destination::parse_destination;
use super::outcome::with_deadline;
use super::tls::TransportSecurity;

pub const DEFAULT_STREAMS: usize = 1;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Options of a gRPC load run on top of the scheduler options.
#[derive(Debug, Clone)]
pub struct GrpcRunnerOptions {
    pub run: RunOptions,
    /// Raw destination; normalized before dialling.
    pub destination: String,
    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    /// Name the server certificate must carry instead of the host.
    pub cert_override: Option<String>,
    /// Health service to check; empty checks the whole server.
    pub service: String,
    /// Concurrent streams per connection.
    pub streams: usize,
    /// Server side pause of every ping.
    pub delay: Duration,
    pub allow_initial_errors: bool,
    pub use_ping: bool,
    pub payload: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for GrpcRunnerOptions {
    fn default() -> Self {
        Self {
            run: RunOptions::default(),
            destination: String::new(),
            ca_cert: None,
            cert: None,
            cert_override: None,
            service: String::new(),
            streams: DEFAULT_STREAMS,
            delay: Duration::ZERO,
            allow_initial_errors: false,
            use_ping: false,
            payload: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl GrpcRunnerOptions {
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.run.validate()?;
        if self.streams == 0 {
            return Err(ValidationError::StreamsZero);
        }
        if self.destination.trim().is_empty() {
            return Err(ValidationError::DestinationEmpty);
        }
        Ok(())
    }

    /// Scheduler workers: one per stream of every connection.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.run.num_threads.saturating_mul(self.streams)
    }

    fn call_kind(&self) -> CallKind {
        if self.use_ping {
            CallKind::Ping {
                delay: self.delay,
                payload: self.payload.clone(),
            }
        } else {
            CallKind::Health {
                service: self.service.clone(),
            }
        }
    }
}

/// Stages of a gRPC run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Configuring,
    Resolving,
    Connecting,
    Probing,
    Aborted,
    Running,
    Merging,
    Done,
}

impl RunPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunPhase::Configuring => "configuring",
            RunPhase::Resolving => "resolving",
            RunPhase::Connecting => "connecting",
            RunPhase::Probing => "probing",
            RunPhase::Aborted => "aborted",
            RunPhase::Running => "running",
            RunPhase::Merging => "merging",
            RunPhase::Done => "done",
        }
    }
}

fn enter(phase: RunPhase) {
    debug!(phase = phase.as_str(), "gRPC run phase");
}

/// Runs a gRPC load test that stops on its own stop condition only.
///
/// # Errors
///
/// See [`run_grpc_test`].
pub async fn run_grpc_load(options: &GrpcRunnerOptions) -> AppResult<RunResult> {
    let (_shutdown_tx, shutdown_rx) = shutdown_channel();
    run_grpc_test(options, shutdown_rx).await
}

/// Opens the connections, checks each once, then drives paced calls until
/// the stop condition or `shutdown_rx`.
///
/// # Errors
///
/// Returns a validation error for bad options, a connection error when
/// bring-up fails and initial errors are not allowed, or a run error when
/// the scheduler fails.
pub async fn run_grpc_test(
    options: &GrpcRunnerOptions,
    shutdown_rx: ShutdownReceiver,
) -> AppResult<RunResult> {
    let span = info_span!(
        "grpc_run",
        destination = %options.destination,
        label = options.run.label.as_deref().unwrap_or("")
    );
    run_inner(options, shutdown_rx).instrument(span).await
}

async fn run_inner(
    options: &GrpcRunnerOptions,
    shutdown_rx: ShutdownReceiver,
) -> AppResult<RunResult> {
    enter(RunPhase::Configuring);
    options.validate()?;
    let streams = options.streams;
    let scheduler = PeriodicRunner::new(RunOptions {
        num_threads: options.workers(),
        ..options.run.clone()
    })?;

    enter(RunPhase::Resolving);
    let destination = parse_destination(&options.destination);
    let security = TransportSecurity::resolve(
        options.ca_cert.as_deref(),
        options.cert.as_deref(),
        destination.scheme_tls,
    );
    let server_name = options
        .cert_override
        .clone()
        .unwrap_or_else(|| destination.host().to_owned());
    let tls = security.client_config(&server_name).await?;
    info!(
        authority = %destination.authority,
        tls = security.is_tls(),
        server_name = %server_name,
        connections = options.run.num_threads,
        streams,
        "Resolved gRPC destination"
    );

    enter(RunPhase::Connecting);
    let connections = (0..options.run.num_threads)
        .map(|index| {
            Connection::open(
                index,
                &destination,
                tls.clone(),
                options.connect_timeout,
                streams,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    enter(RunPhase::Probing);
    let kind = Arc::new(options.call_kind());
    let request_timeout = options.request_timeout;
    let mut bring_up_shutdown = shutdown_rx.clone();
    for connection in &connections {
        let initial = tokio::select! {
            biased;
            () = wait_for_shutdown(&mut bring_up_shutdown) => {
                info!(connection = connection.index(), "Shutdown requested during bring-up");
                break;
            }
            initial = with_deadline(request_timeout, connection.call(&kind, -1)) => initial,
        };
        match initial {
            Ok(code) => debug!(connection = connection.index(), code, "Initial call succeeded"),
            Err(source) if options.allow_initial_errors => {
                warn!(
                    connection = connection.index(),
                    error = %source,
                    "Initial call failed, continuing"
                );
            }
            Err(source) => {
                enter(RunPhase::Aborted);
                return Err(AppError::connection(ConnectionError::ProbeFailed {
                    destination: destination.authority.clone(),
                    connection: connection.index(),
                    source,
                }));
            }
        }
    }

    enter(RunPhase::Running);
    let connections = Arc::new(connections);
    let sequence = Arc::new(CallSequence::new(scheduler.options().num_threads));
    let task: Arc<PeriodicTask> = Arc::new(move |worker: usize| {
        let connections = Arc::clone(&connections);
        let kind = Arc::clone(&kind);
        let seq = sequence.next_seq(worker);
        async move {
            let index = worker.checked_div(streams).unwrap_or(0);
            let connection = connections.get(index).ok_or_else(|| CallError::Other {
                message: format!("No connection for worker {}", worker),
            })?;
            with_deadline(request_timeout, connection.call(&kind, seq)).await
        }
        .boxed()
    });
    let finished = scheduler.execute(task, shutdown_rx).await?;

    enter(RunPhase::Merging);
    debug!(
        calls = finished.calls(),
        elapsed = ?finished.actual_duration(),
        "Merging worker outcomes"
    );
    let result = scheduler.merge(finished).await?;
    enter(RunPhase::Done);
    Ok(result)
}

/// Per-worker call counters feeding the `seq` of each ping.
#[derive(Debug)]
pub(super) struct CallSequence {
    next: Vec<AtomicI64>,
}

impl CallSequence {
    pub(super) fn new(workers: usize) -> Self {
        Self {
            next: (0..workers).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    /// Sequence number of the worker's next call, starting at `0`.
    pub(super) fn next_seq(&self, worker: usize) -> i64 {
        self.next
            .get(worker)
            .map_or(0, |counter| counter.fetch_add(1, Ordering::Relaxed))
    }
}
