//! Periodic removal of expired one-time blackouts.
//!
//! Runs [`BlackoutAdministration::cleanup_expired`] on a fixed interval using
//! `tokio::time::interval` until the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::admin::BlackoutAdministration;

/// Shortest period the loop will tick at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Run the expiry sweep loop. The first sweep happens immediately.
///
/// Periods shorter than [`MIN_SWEEP_INTERVAL`] are raised to it.
pub async fn run(admin: Arc<BlackoutAdministration>, every: Duration, cancel: CancellationToken) {
    if every < MIN_SWEEP_INTERVAL {
        tracing::warn!(
            requested_ms = every.as_millis() as u64,
            "Blackout expiry sweep interval too short, using minimum"
        );
    }
    let every = every.max(MIN_SWEEP_INTERVAL);
    tracing::info!(
        interval_secs = every.as_secs(),
        "Blackout expiry sweep started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Blackout expiry sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match admin.cleanup_expired(&cancel).await {
                    Ok(0) => tracing::debug!("Blackout expiry sweep: nothing expired"),
                    Ok(removed) => {
                        tracing::info!(removed, "Blackout expiry sweep: purged expired rules")
                    }
                    Err(e) => tracing::error!(error = %e, "Blackout expiry sweep failed"),
                }
            }
        }
    }
}
