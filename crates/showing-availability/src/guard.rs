//! Deadline and cancellation wrapper for collaborator calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{AvailabilityError, Result, StoreError};

/// Run a collaborator future under the caller's cancellation token and a
/// per-call deadline.
///
/// Cancellation wins over a result that becomes ready at the same time, so a
/// cancelled caller never observes a partial answer.
pub(crate) async fn guarded<T, F>(
    operation: &'static str,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, StoreError>>,
{
    if cancel.is_cancelled() {
        return Err(AvailabilityError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AvailabilityError::Cancelled),
        outcome = tokio::time::timeout(timeout, fut) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(AvailabilityError::Store { operation, source }),
            Err(_) => Err(AvailabilityError::Timeout { operation, after: timeout }),
        },
    }
}
