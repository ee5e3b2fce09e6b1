//! Same-day booking capacity check.

use std::sync::Arc;

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{AvailabilityError, Result};
use crate::guard::guarded;
use crate::ports::BookingCounter;

/// Classification of one day's booking load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityOutcome {
    /// Set when the day is full; holds the blocking reason.
    pub blocked: Option<String>,
    pub warning: Option<String>,
    pub count: u32,
}

impl CapacityOutcome {
    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }
}

pub struct CapacityGuard {
    bookings: Arc<dyn BookingCounter>,
    config: EngineConfig,
}

impl CapacityGuard {
    pub fn new(bookings: Arc<dyn BookingCounter>, config: EngineConfig) -> Self {
        Self { bookings, config }
    }

    /// Count active bookings on `date` (a calendar day in the business
    /// timezone) and classify the load.
    ///
    /// A failing or slow booking counter degrades to a warning with a count
    /// of zero. Cancellation is still reported as an error.
    pub async fn check_capacity(
        &self,
        resource_ref: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<CapacityOutcome> {
        let (day_start, day_end) = day_bounds(self.config.timezone, date);
        let counted = guarded(
            "count_active",
            self.config.store_timeout,
            cancel,
            self.bookings.count_active(resource_ref, day_start, day_end),
        )
        .await;

        let count = match counted {
            Ok(count) => count,
            Err(AvailabilityError::Cancelled) => return Err(AvailabilityError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    resource = %resource_ref,
                    %date,
                    error = %e,
                    "Could not verify existing bookings"
                );
                return Ok(CapacityOutcome {
                    blocked: None,
                    warning: Some("Could not verify existing bookings".to_string()),
                    count: 0,
                });
            }
        };

        Ok(self.classify(count))
    }

    fn classify(&self, count: u32) -> CapacityOutcome {
        if count >= self.config.max_daily_bookings {
            CapacityOutcome {
                blocked: Some(format!("Maximum daily bookings reached ({count})")),
                warning: None,
                count,
            }
        } else if count >= self.config.warn_daily_bookings {
            CapacityOutcome {
                blocked: None,
                warning: Some(format!("High booking volume for this date ({count} existing)")),
                count,
            }
        } else {
            CapacityOutcome {
                blocked: None,
                warning: None,
                count,
            }
        }
    }
}

/// UTC bounds of the local calendar day `date` in `tz`: local midnight up to
/// the next local midnight. The last representable date ends at
/// [`DateTime::<Utc>::MAX_UTC`].
pub fn day_bounds(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(tz, date);
    let end = date
        .checked_add_days(Days::new(1))
        .map_or(DateTime::<Utc>::MAX_UTC, |next| local_midnight(tz, next));
    (start, end)
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    // Zones that skip midnight on a DST change start the day at the first
    // instant that exists.
    (0..=3)
        .filter_map(|h| midnight.checked_add_signed(Duration::hours(h)))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
