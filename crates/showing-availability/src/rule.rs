//! Blackout rule records and the filter shape used to query them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceToken;

/// Store-assigned identifier of a blackout rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which resources a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "resource_ref")]
pub enum RuleScope {
    /// Every resource.
    Global,
    /// A single resource, by reference.
    Resource(String),
}

/// When a rule applies: a fixed inclusive date range or a recurring pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RuleSchedule {
    Range { start: NaiveDate, end: NaiveDate },
    Recurring { token: RecurrenceToken },
}

/// Reporting label for a rule. Has no effect on evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackoutType {
    OneTime,
    RecurringWeekly,
    RecurringMonthly,
    Vacation,
    Maintenance,
}

/// Priority 1 is the highest. Used for reporting and ordering only.
pub const PRIORITY_HIGHEST: u8 = 1;
pub const PRIORITY_DEFAULT: u8 = 2;
pub const PRIORITY_LOWEST: u8 = 3;

/// A rule as submitted to the store, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackoutDraft {
    pub scope: RuleScope,
    pub schedule: RuleSchedule,
    pub blackout_type: BlackoutType,
    pub priority: u8,
    /// Set for personal time off; names whose time off it is.
    pub vacation_owner: Option<String>,
    pub reason: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlackoutDraft {
    pub fn into_rule(self, id: RuleId) -> BlackoutRule {
        BlackoutRule {
            id,
            scope: self.scope,
            schedule: self.schedule,
            blackout_type: self.blackout_type,
            priority: self.priority,
            vacation_owner: self.vacation_owner,
            reason: self.reason,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A persisted blackout rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackoutRule {
    pub id: RuleId,
    pub scope: RuleScope,
    pub schedule: RuleSchedule,
    pub blackout_type: BlackoutType,
    pub priority: u8,
    pub vacation_owner: Option<String>,
    pub reason: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlackoutRule {
    pub fn is_global(&self) -> bool {
        matches!(self.scope, RuleScope::Global)
    }

    pub fn resource_ref(&self) -> Option<&str> {
        match &self.scope {
            RuleScope::Resource(resource) => Some(resource),
            RuleScope::Global => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.schedule, RuleSchedule::Recurring { .. })
    }

    pub fn is_vacation(&self) -> bool {
        self.vacation_owner.is_some()
    }

    pub fn recurrence(&self) -> Option<RecurrenceToken> {
        match self.schedule {
            RuleSchedule::Recurring { token } => Some(token),
            RuleSchedule::Range { .. } => None,
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        match self.schedule {
            RuleSchedule::Range { start, .. } => Some(start),
            RuleSchedule::Recurring { .. } => None,
        }
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        match self.schedule {
            RuleSchedule::Range { end, .. } => Some(end),
            RuleSchedule::Recurring { .. } => None,
        }
    }

    /// Whether the rule's fixed range contains `date`, both ends inclusive.
    /// Recurring rules have no range and never contain a date.
    pub fn range_contains(&self, date: NaiveDate) -> bool {
        match self.schedule {
            RuleSchedule::Range { start, end } => start <= date && date <= end,
            RuleSchedule::Recurring { .. } => false,
        }
    }
}

/// Conjunctive query over blackout rules. `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    pub global: Option<bool>,
    pub resource_ref: Option<String>,
    pub recurring: Option<bool>,
    pub vacation: Option<bool>,
    /// Only fixed-range rules whose range contains this date.
    pub active_on: Option<NaiveDate>,
    /// Only fixed-range rules starting within this inclusive window.
    pub starts_between: Option<(NaiveDate, NaiveDate)>,
}

impl RuleFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn global() -> Self {
        Self {
            global: Some(true),
            ..Self::default()
        }
    }

    pub fn for_resource(resource_ref: impl Into<String>) -> Self {
        Self {
            resource_ref: Some(resource_ref.into()),
            ..Self::default()
        }
    }

    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = Some(recurring);
        self
    }

    pub fn vacation(mut self, vacation: bool) -> Self {
        self.vacation = Some(vacation);
        self
    }

    pub fn active_on(mut self, date: NaiveDate) -> Self {
        self.active_on = Some(date);
        self
    }

    pub fn starts_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.starts_between = Some((from, to));
        self
    }

    /// Evaluate the filter against a single rule.
    pub fn matches(&self, rule: &BlackoutRule) -> bool {
        if self.global.is_some_and(|g| g != rule.is_global()) {
            return false;
        }
        if let Some(resource) = &self.resource_ref {
            if rule.resource_ref() != Some(resource.as_str()) {
                return false;
            }
        }
        if self
            .recurring
            .is_some_and(|recurring| rule.is_recurring() != recurring)
        {
            return false;
        }
        if self
            .vacation
            .is_some_and(|vacation| rule.is_vacation() != vacation)
        {
            return false;
        }
        if let Some(date) = self.active_on {
            if !rule.range_contains(date) {
                return false;
            }
        }
        if let Some((from, to)) = self.starts_between {
            match rule.start_date() {
                Some(start) if from <= start && start <= to => {}
                _ => return false,
            }
        }
        true
    }
}
