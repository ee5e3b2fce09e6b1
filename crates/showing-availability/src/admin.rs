//! Blackout rule administration: create, remove, list, summarize, expire.
//!
//! Validation happens here, at write time. The evaluator trusts whatever the
//! store returns and never raises validation errors.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{AvailabilityError, Result};
use crate::guard::guarded;
use crate::ports::{Clock, RuleStore};
use crate::recurrence::RecurrenceToken;
use crate::rule::{
    BlackoutDraft, BlackoutRule, BlackoutType, RuleFilter, RuleId, RuleSchedule, RuleScope,
    PRIORITY_DEFAULT, PRIORITY_HIGHEST, PRIORITY_LOWEST,
};

/// Rules partitioned by the layer they are evaluated in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayeredBlackouts {
    pub global_one_time: Vec<BlackoutRule>,
    pub global_recurring: Vec<BlackoutRule>,
    pub vacation: Vec<BlackoutRule>,
    pub resource_one_time: Vec<BlackoutRule>,
    pub resource_recurring: Vec<BlackoutRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutSummary {
    pub global_rules: usize,
    pub vacation_periods: usize,
    pub resource_rules: usize,
    pub one_time_blackouts: usize,
    /// e.g. `Global: SUNDAY (Church)`, `Property: FIRST_MONDAY (Inspection)`.
    pub active_rules: Vec<String>,
    /// e.g. `Agent A: Jul 1 to Jul 10`, for vacations that have not started.
    pub upcoming_vacations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutStats {
    pub total: usize,
    pub global: usize,
    pub resource: usize,
    /// Fixed-range rules covering today.
    pub active: usize,
    /// Fixed-range rules starting within the next seven days.
    pub upcoming: usize,
}

pub struct BlackoutAdministration {
    store: Arc<dyn RuleStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl BlackoutAdministration {
    pub fn new(store: Arc<dyn RuleStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Today's date in the business timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock
            .now()
            .with_timezone(&self.config.timezone)
            .date_naive()
    }

    /// Create a one-time blackout covering `start..=end`.
    ///
    /// A non-global rule needs a resource reference; a global rule ignores it.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_blackout(
        &self,
        resource_ref: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
        reason: &str,
        created_by: &str,
        is_global: bool,
        cancel: &CancellationToken,
    ) -> Result<BlackoutRule> {
        let scope = scope_for(resource_ref, is_global)?;
        let schedule = range(start, end)?;
        let draft = self.draft(
            scope,
            schedule,
            BlackoutType::OneTime,
            PRIORITY_DEFAULT,
            None,
            reason,
            created_by,
        );
        let rule = self.persist("create_blackout", draft, cancel).await?;
        tracing::info!(
            id = %rule.id,
            resource = resource_ref.unwrap_or_default(),
            is_global,
            %start,
            %end,
            reason,
            "Created blackout"
        );
        Ok(rule)
    }

    pub async fn create_global_blackout(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        reason: &str,
        created_by: &str,
        cancel: &CancellationToken,
    ) -> Result<BlackoutRule> {
        self.create_blackout(None, start, end, reason, created_by, true, cancel)
            .await
    }

    /// Create a rule that repeats on `token` with no end date.
    ///
    /// `token` is parsed against the recognized vocabulary; `priority` must be
    /// within 1..=3.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_recurring_blackout(
        &self,
        resource_ref: Option<&str>,
        token: &str,
        reason: &str,
        created_by: &str,
        is_global: bool,
        priority: u8,
        cancel: &CancellationToken,
    ) -> Result<BlackoutRule> {
        let scope = scope_for(resource_ref, is_global)?;
        let token: RecurrenceToken = token.parse()?;
        if !(PRIORITY_HIGHEST..=PRIORITY_LOWEST).contains(&priority) {
            return Err(AvailabilityError::validation(
                "priority",
                format!("must be between {PRIORITY_HIGHEST} and {PRIORITY_LOWEST}, got {priority}"),
            ));
        }
        let blackout_type = if token.is_monthly() {
            BlackoutType::RecurringMonthly
        } else {
            BlackoutType::RecurringWeekly
        };
        let draft = self.draft(
            scope,
            RuleSchedule::Recurring { token },
            blackout_type,
            priority,
            None,
            reason,
            created_by,
        );
        let rule = self
            .persist("create_recurring_blackout", draft, cancel)
            .await?;
        tracing::info!(
            id = %rule.id,
            %token,
            resource = resource_ref.unwrap_or_default(),
            is_global,
            reason,
            "Created recurring blackout"
        );
        Ok(rule)
    }

    /// Record personal time off. Vacations apply to every resource.
    pub async fn create_vacation_blackout(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        owner: &str,
        reason: &str,
        created_by: &str,
        cancel: &CancellationToken,
    ) -> Result<BlackoutRule> {
        if owner.trim().is_empty() {
            return Err(AvailabilityError::validation(
                "vacation_owner",
                "a vacation needs an owner",
            ));
        }
        let schedule = range(start, end)?;
        let draft = self.draft(
            RuleScope::Global,
            schedule,
            BlackoutType::Vacation,
            PRIORITY_HIGHEST,
            Some(owner.to_string()),
            reason,
            created_by,
        );
        let rule = self
            .persist("create_vacation_blackout", draft, cancel)
            .await?;
        tracing::info!(id = %rule.id, owner, %start, %end, reason, "Created vacation blackout");
        Ok(rule)
    }

    /// Delete a rule by id.
    ///
    /// # Errors
    /// `NotFound` when no rule has this id.
    pub async fn remove_blackout(&self, id: RuleId, cancel: &CancellationToken) -> Result<()> {
        let removed = guarded(
            "remove_blackout",
            self.config.store_timeout,
            cancel,
            self.store.delete_by_id(id),
        )
        .await?;
        if removed == 0 {
            return Err(AvailabilityError::NotFound { id });
        }
        tracing::info!(%id, "Removed blackout");
        Ok(())
    }

    /// Every global rule plus, when given, the rules scoped to `resource_ref`,
    /// ordered by start date. Recurring rules have no start date and sort first.
    pub async fn list_blackouts(
        &self,
        resource_ref: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BlackoutRule>> {
        let mut rules = self
            .find("list_global", RuleFilter::global(), cancel)
            .await?;
        if let Some(resource) = resource_ref {
            rules.extend(
                self.find("list_resource", RuleFilter::for_resource(resource), cancel)
                    .await?,
            );
        }
        rules.sort_by_key(|r| (r.start_date(), r.id));
        rules.dedup_by_key(|r| r.id);
        Ok(rules)
    }

    /// The rules [`list_blackouts`](Self::list_blackouts) returns, split by
    /// evaluation layer. Resource layers stay empty without a resource.
    pub async fn list_layered(
        &self,
        resource_ref: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<LayeredBlackouts> {
        let mut layers = LayeredBlackouts {
            global_one_time: self
                .find(
                    "list_global_one_time",
                    RuleFilter::global().recurring(false).vacation(false),
                    cancel,
                )
                .await?,
            global_recurring: self
                .find(
                    "list_global_recurring",
                    RuleFilter::global().recurring(true),
                    cancel,
                )
                .await?,
            vacation: self
                .find("list_vacation", RuleFilter::all().vacation(true), cancel)
                .await?,
            ..LayeredBlackouts::default()
        };
        if let Some(resource) = resource_ref {
            layers.resource_one_time = self
                .find(
                    "list_resource_one_time",
                    RuleFilter::for_resource(resource).recurring(false),
                    cancel,
                )
                .await?;
            layers.resource_recurring = self
                .find(
                    "list_resource_recurring",
                    RuleFilter::for_resource(resource).recurring(true),
                    cancel,
                )
                .await?;
        }
        Ok(layers)
    }

    pub async fn summarize(
        &self,
        resource_ref: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<BlackoutSummary> {
        let layers = self.list_layered(resource_ref, cancel).await?;
        let today = self.today();

        let active_rules = layers
            .global_recurring
            .iter()
            .map(|r| ("Global", r))
            .chain(layers.resource_recurring.iter().map(|r| ("Property", r)))
            .filter_map(|(label, r)| {
                r.recurrence()
                    .map(|token| format!("{label}: {token} ({})", r.reason))
            })
            .collect();

        let upcoming_vacations = layers
            .vacation
            .iter()
            .filter_map(|r| match r.schedule {
                RuleSchedule::Range { start, end } if start > today => Some(format!(
                    "{}: {} to {}",
                    r.vacation_owner.as_deref().unwrap_or_default(),
                    start.format("%b %-d"),
                    end.format("%b %-d"),
                )),
                _ => None,
            })
            .collect();

        Ok(BlackoutSummary {
            global_rules: layers.global_recurring.len(),
            vacation_periods: layers.vacation.len(),
            resource_rules: layers.resource_recurring.len(),
            one_time_blackouts: layers.global_one_time.len() + layers.resource_one_time.len(),
            active_rules,
            upcoming_vacations,
        })
    }

    /// Counts across every stored rule.
    pub async fn stats(&self, cancel: &CancellationToken) -> Result<BlackoutStats> {
        let rules = self.find("stats", RuleFilter::all(), cancel).await?;
        let today = self.today();
        let week_out = today
            .checked_add_days(Days::new(7))
            .unwrap_or(NaiveDate::MAX);
        let global = rules.iter().filter(|r| r.is_global()).count();
        Ok(BlackoutStats {
            total: rules.len(),
            global,
            resource: rules.len() - global,
            active: rules.iter().filter(|r| r.range_contains(today)).count(),
            upcoming: rules
                .iter()
                .filter(|r| r.start_date().is_some_and(|s| today <= s && s <= week_out))
                .count(),
        })
    }

    /// Delete fixed-range rules whose end date is before today. Recurring
    /// rules never expire. Returns the number of rules removed.
    pub async fn cleanup_expired(&self, cancel: &CancellationToken) -> Result<u64> {
        let today = self.today();
        let removed = guarded(
            "cleanup_expired",
            self.config.store_timeout,
            cancel,
            self.store.delete_ended_before(today),
        )
        .await?;
        tracing::info!(removed, cutoff = %today, "Cleaned up expired blackouts");
        Ok(removed)
    }

    /// Rules starting between today and `within_days` from now, inclusive,
    /// ordered by start date.
    pub async fn upcoming(
        &self,
        within_days: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<BlackoutRule>> {
        let today = self.today();
        let until = today
            .checked_add_days(Days::new(u64::from(within_days)))
            .unwrap_or(NaiveDate::MAX);
        let mut rules = self
            .find(
                "upcoming",
                RuleFilter::all().starts_between(today, until),
                cancel,
            )
            .await?;
        rules.sort_by_key(|r| (r.start_date(), r.id));
        Ok(rules)
    }

    /// [`upcoming`](Self::upcoming) over the configured window.
    pub async fn upcoming_default(&self, cancel: &CancellationToken) -> Result<Vec<BlackoutRule>> {
        self.upcoming(self.config.upcoming_window_days, cancel)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    fn draft(
        &self,
        scope: RuleScope,
        schedule: RuleSchedule,
        blackout_type: BlackoutType,
        priority: u8,
        vacation_owner: Option<String>,
        reason: &str,
        created_by: &str,
    ) -> BlackoutDraft {
        let now = self.clock.now();
        BlackoutDraft {
            scope,
            schedule,
            blackout_type,
            priority,
            vacation_owner,
            reason: reason.to_string(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn persist(
        &self,
        operation: &'static str,
        draft: BlackoutDraft,
        cancel: &CancellationToken,
    ) -> Result<BlackoutRule> {
        guarded(
            operation,
            self.config.store_timeout,
            cancel,
            self.store.create(draft),
        )
        .await
    }

    async fn find(
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

fn scope_for(resource_ref: Option<&str>, is_global: bool) -> Result<RuleScope> {
    if is_global {
        return Ok(RuleScope::Global);
    }
    match resource_ref.map(str::trim) {
        Some(resource) if !resource.is_empty() => Ok(RuleScope::Resource(resource.to_string())),
        _ => Err(AvailabilityError::validation(
            "resource_ref",
            "required for a non-global blackout",
        )),
    }
}

fn range(start: NaiveDate, end: NaiveDate) -> Result<RuleSchedule> {
    if end < start {
        return Err(AvailabilityError::validation(
            "end_date",
            format!("{end} is before start date {start}"),
        ));
    }
    Ok(RuleSchedule::Range { start, end })
}
