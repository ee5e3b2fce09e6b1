//! In-process implementations of the collaborator traits.
//!
//! Backed by `tokio::sync::RwLock`, so concurrent evaluations share a read
//! lock and administration writes are single-row and atomic.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::ports::{Booking, BookingCounter, RuleStore};
use crate::rule::{BlackoutDraft, BlackoutRule, RuleFilter, RuleId};

#[derive(Debug)]
pub struct InMemoryRuleStore {
    rules: RwLock<Vec<BlackoutRule>>,
    next_id: AtomicU64,
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }

    /// Snapshot of every stored rule, in insertion order.
    pub async fn snapshot(&self) -> Vec<BlackoutRule> {
        self.rules.read().await.clone()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_rules(&self, filter: &RuleFilter) -> Result<Vec<BlackoutRule>, StoreError> {
        let rules = self.rules.read().await;
        Ok(rules
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn create(&self, draft: BlackoutDraft) -> Result<BlackoutRule, StoreError> {
        let id = RuleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let rule = draft.into_rule(id);
        self.rules.write().await.push(rule.clone());
        Ok(rule)
    }

    async fn delete_by_id(&self, id: RuleId) -> Result<u64, StoreError> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|r| r.id != id);
        Ok((before - rules.len()) as u64)
    }

    async fn delete_ended_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|r| r.end_date().is_none_or(|end| end >= cutoff));
        Ok((before - rules.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBookings {
    bookings: RwLock<Vec<Booking>>,
}

impl InMemoryBookings {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, booking: Booking) {
        self.bookings.write().await.push(booking);
    }
}

#[async_trait]
impl BookingCounter for InMemoryBookings {
    async fn count_active(
        &self,
        resource_ref: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let bookings = self.bookings.read().await;
        let count = bookings
            .iter()
            .filter(|b| b.resource_ref == resource_ref && b.status.is_active())
            .filter(|b| day_start <= b.scheduled_at && b.scheduled_at < day_end)
            .count();
        u32::try_from(count).map_err(|_| StoreError::new("booking count overflow"))
    }
}
