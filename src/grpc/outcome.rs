use std::future::Future;
use std::time::Duration;

use tonic_health::pb::health_check_response::ServingStatus;

use crate::error::CallError;
use crate::metrics::RetCode;

/// Outcome code of a healthy call.
pub const SERVING: RetCode = ServingStatus::Serving as RetCode;

/// Awaits `call` for at most `timeout`, folding an expired deadline into
/// the call's error.
///
/// # Errors
///
/// Returns the call's own error or [`CallError::Timeout`].
pub async fn with_deadline<F, T>(timeout: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(CallError::Timeout { timeout }),
    }
}

/// Name of a serving status for summaries, `None` for codes outside the
/// health protocol.
#[must_use]
pub fn status_name(code: RetCode) -> Option<&'static str> {
    ServingStatus::try_from(code)
        .ok()
        .map(|status| status.as_str_name())
}
