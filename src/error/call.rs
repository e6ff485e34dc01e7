use std::time::Duration;

use thiserror::Error;

/// Failure of a single steady-state call. Never surfaced to callers of a
/// run; the scheduler records it as the `-1` outcome.
#[derive(Debug, Error, Clone)]
pub enum CallError {
    #[error("RPC failed ({code}): {message}")]
    Status { code: tonic::Code, message: String },
    #[error("RPC timed out after {timeout:?}.")]
    Timeout { timeout: Duration },
    #[error("Stream pool closed.")]
    StreamPoolClosed,
    #[error("{message}")]
    Other { message: String },
}

impl From<tonic::Status> for CallError {
    fn from(status: tonic::Status) -> Self {
        CallError::Status {
            code: status.code(),
            message: status.message().to_owned(),
        }
    }
}
