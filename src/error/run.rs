use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Worker {worker} did not complete: {source}")]
    WorkerFailed {
        worker: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}
