//! Layered availability evaluation.
//!
//! A check consults five rule queries (global one-time, global recurring,
//! resource one-time, resource recurring, vacation) plus the same-day capacity
//! guard. Every layer is evaluated and merged; a date can collect several
//! blocking reasons. "Not available" is a normal result, never an error.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::alternatives::AlternativeSlotFinder;
use crate::capacity::CapacityGuard;
use crate::config::EngineConfig;
use crate::error::{AvailabilityError, Result};
use crate::guard::guarded;
use crate::ports::{BookingCounter, RuleStore};
use crate::rule::{BlackoutRule, RuleFilter};

/// Outcome of checking one resource on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub resource_ref: String,
    pub date: NaiveDate,
    pub is_available: bool,
    /// Reasons in layer order: global, resource, resource recurring,
    /// vacation, capacity.
    pub blocking_reasons: Vec<String>,
    pub matched_rules: Vec<BlackoutRule>,
    pub warnings: Vec<String>,
    /// Populated only when `is_available` is false.
    pub alternative_slots: Vec<NaiveDate>,
}

impl AvailabilityCheck {
    fn new(resource_ref: &str, date: NaiveDate) -> Self {
        Self {
            resource_ref: resource_ref.to_string(),
            date,
            is_available: true,
            blocking_reasons: Vec::new(),
            matched_rules: Vec::new(),
            warnings: Vec::new(),
            alternative_slots: Vec::new(),
        }
    }

    fn block(&mut self, reason: String, rule: BlackoutRule) {
        self.blocking_reasons.push(reason);
        self.matched_rules.push(rule);
    }
}

pub struct AvailabilityEvaluator {
    store: Arc<dyn RuleStore>,
    capacity: CapacityGuard,
    config: EngineConfig,
}

impl AvailabilityEvaluator {
    pub fn new(
        store: Arc<dyn RuleStore>,
        bookings: Arc<dyn BookingCounter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            capacity: CapacityGuard::new(bookings, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check whether `resource_ref` can be booked on `date`, proposing
    /// alternative dates when it cannot.
    ///
    /// # Errors
    /// Returns `Store` or `Timeout` when a rule query fails, and `Cancelled`
    /// when `cancel` fires before every layer has been checked. A booking
    /// counter failure only adds a warning.
    pub async fn check_availability(
        &self,
        resource_ref: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<AvailabilityCheck> {
        let mut check = self.evaluate(resource_ref, date, cancel).await?;
        if !check.is_available {
            check.alternative_slots = AlternativeSlotFinder::new(self)
                .find_alternatives(resource_ref, date, cancel)
                .await?;
        }
        tracing::debug!(
            resource = %resource_ref,
            %date,
            available = check.is_available,
            reasons = check.blocking_reasons.len(),
            alternatives = check.alternative_slots.len(),
            "Availability checked"
        );
        Ok(check)
    }

    /// [`check_availability`](Self::check_availability), retrying store
    /// failures and timeouts up to `retry_attempts` times in total.
    pub async fn check_availability_with_retry(
        &self,
        resource_ref: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<AvailabilityCheck> {
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.check_availability(resource_ref, date, cancel).await {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        resource = %resource_ref,
                        %date,
                        attempt,
                        error = %e,
                        "Availability check failed, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(AvailabilityError::Cancelled),
                        _ = tokio::time::sleep(self.config.retry_backoff) => {}
                    }
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Turn an unavailable date into an error.
    ///
    /// The error message carries the first blocking reason; the full list is
    /// kept in [`AvailabilityError::Unavailable::reasons`].
    pub async fn validate_booking_date(
        &self,
        resource_ref: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let check = self.evaluate(resource_ref, date, cancel).await?;
        if check.is_available {
            return Ok(());
        }
        let reasons = check.blocking_reasons;
        let reason = reasons
            .first()
            .cloned()
            .unwrap_or_else(|| "date unavailable".to_string());
        Err(AvailabilityError::Unavailable { reason, reasons })
    }

    /// Evaluate every layer for one date without searching for alternatives.
    pub(crate) async fn evaluate(
        &self,
        resource_ref: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<AvailabilityCheck> {
        let (global_one_time, global_recurring, resource_one_time, resource_recurring, vacation) =
            tokio::try_join!(
                self.query(
                    "find_global_blackouts",
                    RuleFilter::global()
                        .recurring(false)
                        .vacation(false)
                        .active_on(date),
                    cancel,
                ),
                self.query(
                    "find_global_recurring",
                    RuleFilter::global().recurring(true),
                    cancel,
                ),
                self.query(
                    "find_resource_blackouts",
                    RuleFilter::for_resource(resource_ref)
                        .recurring(false)
                        .active_on(date),
                    cancel,
                ),
                self.query(
                    "find_resource_recurring",
                    RuleFilter::for_resource(resource_ref).recurring(true),
                    cancel,
                ),
                self.query(
                    "find_vacation_blackouts",
                    RuleFilter::all().vacation(true).active_on(date),
                    cancel,
                ),
            )?;

        let mut check = AvailabilityCheck::new(resource_ref, date);

        let global = global_one_time
            .into_iter()
            .chain(global_recurring.into_iter().filter(|r| recurs_on(r, date)));
        for rule in global {
            check.block(format!("Global blackout: {}", rule.reason), rule);
        }
        for rule in resource_one_time {
            check.block(format!("Property blackout: {}", rule.reason), rule);
        }
        for rule in resource_recurring {
            if recurs_on(&rule, date) {
                check.block(format!("Recurring restriction: {}", rule.reason), rule);
            }
        }
        for rule in vacation {
            let owner = rule.vacation_owner.as_deref().unwrap_or_default();
            check.block(
                format!("Vacation blackout: {owner} unavailable ({})", rule.reason),
                rule,
            );
        }

        let capacity = self
            .capacity
            .check_capacity(resource_ref, date, cancel)
            .await?;
        if let Some(reason) = capacity.blocked {
            check.blocking_reasons.push(reason);
        }
        check.warnings.extend(capacity.warning);

        check.is_available = check.blocking_reasons.is_empty();
        Ok(check)
    }

    async fn query(
        &self,
        operation: &'static str,
        filter: RuleFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<BlackoutRule>> {
        let mut rules = guarded(
            operation,
            self.config.store_timeout,
            cancel,
            self.store.find_rules(&filter),
        )
        .await?;
        rules.sort_by_key(|r| r.id);
        Ok(rules)
    }
}

fn recurs_on(rule: &BlackoutRule, date: NaiveDate) -> bool {
    rule.recurrence().is_some_and(|token| token.matches(date))
}
