//! Collaborator interfaces the engine depends on.
//!
//! Persistence of rules and bookings lives outside this crate. The engine only
//! sees these traits, so any backing store (SQL, key-value, in-memory) can be
//! plugged in behind an `Arc<dyn ...>`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::rule::{BlackoutDraft, BlackoutRule, RuleFilter, RuleId};

/// Read/write access to blackout rule records.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Return every rule matching `filter`, in any order.
    async fn find_rules(&self, filter: &RuleFilter) -> Result<Vec<BlackoutRule>, StoreError>;

    /// Persist a new rule and return it with its assigned id.
    async fn create(&self, draft: BlackoutDraft) -> Result<BlackoutRule, StoreError>;

    /// Delete a rule by id, returning the number of rows removed.
    async fn delete_by_id(&self, id: RuleId) -> Result<u64, StoreError>;

    /// Delete every fixed-range rule whose end date is before `cutoff`,
    /// returning the number removed. Recurring rules are never touched.
    async fn delete_ended_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Only confirmed and pending bookings take up capacity.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Confirmed | Self::Pending)
    }
}

/// The slice of a booking the capacity check cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub resource_ref: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
}

/// Counts active bookings for a resource.
#[async_trait]
pub trait BookingCounter: Send + Sync {
    /// Count active bookings scheduled in `[day_start, day_end)`.
    async fn count_active(
        &self,
        resource_ref: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<u32, StoreError>;
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for deterministic tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
