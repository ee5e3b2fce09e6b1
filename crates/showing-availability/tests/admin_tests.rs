//! Tests for blackout administration and the expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use showing_availability::memory::InMemoryRuleStore;
use showing_availability::{
    sweep, AvailabilityError, BlackoutAdministration, BlackoutType, EngineConfig, FixedClock,
    RecurrenceToken, RuleId, RuleSchedule, RuleScope,
};
use tokio_util::sync::CancellationToken;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Administration over a fresh store with "now" at 2025-06-15 10:00 UTC.
fn setup() -> (Arc<InMemoryRuleStore>, BlackoutAdministration) {
    let store = Arc::new(InMemoryRuleStore::new());
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap()));
    let admin = BlackoutAdministration::new(
        store.clone(),
        clock,
        EngineConfig::new(chrono_tz::UTC),
    );
    (store, admin)
}

fn validation_field(err: AvailabilityError) -> &'static str {
    match err {
        AvailabilityError::Validation { field, .. } => field,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// ── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_blackout_records_scope_and_range() {
    let (_, admin) = setup();
    let cancel = CancellationToken::new();

    let rule = admin
        .create_blackout(
            Some("MLS-42"),
            date(2025, 7, 1),
            date(2025, 7, 3),
            "Floors",
            "ops",
            false,
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(rule.scope, RuleScope::Resource("MLS-42".into()));
    assert_eq!(
        rule.schedule,
        RuleSchedule::Range {
            start: date(2025, 7, 1),
            end: date(2025, 7, 3)
        }
    );
    assert_eq!(rule.blackout_type, BlackoutType::OneTime);
    assert_eq!(rule.created_by, "ops");
    assert_eq!(
        rule.created_at,
        Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap()
    );
    assert!(!rule.is_vacation());
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let (store, admin) = setup();
    let err = admin
        .create_blackout(
            Some("P"),
            date(2025, 7, 3),
            date(2025, 7, 1),
            "Oops",
            "ops",
            false,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(validation_field(err), "end_date");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn non_global_rule_needs_a_resource() {
    let (_, admin) = setup();
    let cancel = CancellationToken::new();
    for resource in [None, Some(""), Some("   ")] {
        let err = admin
            .create_blackout(
                resource,
                date(2025, 7, 1),
                date(2025, 7, 1),
                "x",
                "ops",
                false,
                &cancel,
            )
            .await
            .unwrap_err();
        assert_eq!(validation_field(err), "resource_ref");
    }
}

#[tokio::test]
async fn global_blackout_ignores_resource() {
    let (_, admin) = setup();
    let rule = admin
        .create_global_blackout(
            date(2025, 12, 24),
            date(2025, 12, 26),
            "Holiday",
            "ops",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(rule.is_global());
    assert_eq!(rule.resource_ref(), None);
}

#[tokio::test]
async fn recurring_blackout_validates_token_and_priority() {
    let (store, admin) = setup();
    let cancel = CancellationToken::new();

    let err = admin
        .create_recurring_blackout(Some("P"), "EVERY_FULL_MOON", "x", "ops", false, 2, &cancel)
        .await
        .unwrap_err();
    assert_eq!(validation_field(err), "recurrence_token");

    let err = admin
        .create_recurring_blackout(Some("P"), "SUNDAY", "x", "ops", false, 7, &cancel)
        .await
        .unwrap_err();
    assert_eq!(validation_field(err), "priority");
    assert!(store.is_empty().await);

    let err = admin
        .create_recurring_blackout(Some("P"), "sunday", "Church", "ops", false, 2, &cancel)
        .await
        .unwrap_err();
    assert_eq!(validation_field(err), "recurrence_token");

    let weekly = admin
        .create_recurring_blackout(Some("P"), "SUNDAY", "Church", "ops", false, 2, &cancel)
        .await
        .unwrap();
    assert_eq!(weekly.recurrence(), Some(RecurrenceToken::Sunday));
    assert_eq!(weekly.blackout_type, BlackoutType::RecurringWeekly);
    assert_eq!(weekly.start_date(), None);

    let monthly = admin
        .create_recurring_blackout(
            None,
            "FIRST_MONDAY",
            "Board meeting",
            "ops",
            true,
            1,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(monthly.blackout_type, BlackoutType::RecurringMonthly);
    assert!(monthly.is_global());
}

#[tokio::test]
async fn vacation_is_global_and_highest_priority() {
    let (_, admin) = setup();
    let rule = admin
        .create_vacation_blackout(
            date(2025, 7, 1),
            date(2025, 7, 10),
            "Agent A",
            "PTO",
            "admin",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(rule.is_global());
    assert!(rule.is_vacation());
    assert_eq!(rule.priority, 1);
    assert_eq!(rule.blackout_type, BlackoutType::Vacation);
    assert_eq!(rule.vacation_owner.as_deref(), Some("Agent A"));
}

// ── Removal ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn removing_missing_rule_is_not_found_and_changes_nothing() {
    let (store, admin) = setup();
    let cancel = CancellationToken::new();
    admin
        .create_global_blackout(
            date(2025, 7, 4),
            date(2025, 7, 4),
            "Independence Day",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    let before = store.snapshot().await;

    let err = admin
        .remove_blackout(RuleId(999), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AvailabilityError::NotFound { id: RuleId(999) }));
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn remove_deletes_exactly_one_rule() {
    let (store, admin) = setup();
    let cancel = CancellationToken::new();
    let keep = admin
        .create_global_blackout(date(2025, 7, 4), date(2025, 7, 4), "Keep", "ops", &cancel)
        .await
        .unwrap();
    let gone = admin
        .create_global_blackout(date(2025, 7, 5), date(2025, 7, 5), "Drop", "ops", &cancel)
        .await
        .unwrap();

    admin.remove_blackout(gone.id, &cancel).await.unwrap();
    let remaining = store.snapshot().await;
    assert_eq!(remaining, vec![keep]);

    let again = admin.remove_blackout(gone.id, &cancel).await.unwrap_err();
    assert!(matches!(again, AvailabilityError::NotFound { .. }));
}

// ── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_combines_global_and_resource_rules_by_start_date() {
    let (_, admin) = setup();
    let cancel = CancellationToken::new();
    admin
        .create_global_blackout(
            date(2025, 9, 1),
            date(2025, 9, 1),
            "Labor Day",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_blackout(
            Some("P"),
            date(2025, 8, 1),
            date(2025, 8, 2),
            "P work",
            "ops",
            false,
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_blackout(
            Some("Q"),
            date(2025, 7, 1),
            date(2025, 7, 2),
            "Q work",
            "ops",
            false,
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_recurring_blackout(None, "SUNDAY", "Sundays off", "ops", true, 2, &cancel)
        .await
        .unwrap();

    let reasons = |rules: Vec<showing_availability::BlackoutRule>| -> Vec<String> {
        rules.into_iter().map(|r| r.reason).collect()
    };

    let for_p = admin.list_blackouts(Some("P"), &cancel).await.unwrap();
    assert_eq!(reasons(for_p), vec!["Sundays off", "P work", "Labor Day"]);

    let global_only = admin.list_blackouts(None, &cancel).await.unwrap();
    assert_eq!(reasons(global_only), vec!["Sundays off", "Labor Day"]);
}

#[tokio::test]
async fn layered_listing_partitions_rules() {
    let (_, admin) = setup();
    let cancel = CancellationToken::new();
    admin
        .create_global_blackout(
            date(2025, 9, 1),
            date(2025, 9, 1),
            "Labor Day",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_recurring_blackout(None, "SUNDAY", "Sundays off", "ops", true, 2, &cancel)
        .await
        .unwrap();
    admin
        .create_vacation_blackout(
            date(2025, 8, 4),
            date(2025, 8, 8),
            "Agent A",
            "Beach",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_blackout(
            Some("P"),
            date(2025, 8, 1),
            date(2025, 8, 2),
            "P work",
            "ops",
            false,
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_recurring_blackout(Some("P"), "LAST_FRIDAY", "Audit", "ops", false, 3, &cancel)
        .await
        .unwrap();

    let layers = admin.list_layered(Some("P"), &cancel).await.unwrap();
    assert_eq!(layers.global_one_time.len(), 1);
    assert_eq!(layers.global_one_time[0].reason, "Labor Day");
    assert_eq!(layers.global_recurring.len(), 1);
    assert_eq!(layers.vacation.len(), 1);
    assert_eq!(layers.resource_one_time.len(), 1);
    assert_eq!(layers.resource_recurring.len(), 1);

    let without_resource = admin.list_layered(None, &cancel).await.unwrap();
    assert!(without_resource.resource_one_time.is_empty());
    assert!(without_resource.resource_recurring.is_empty());
    assert_eq!(without_resource.vacation.len(), 1);

    let summary = admin.summarize(Some("P"), &cancel).await.unwrap();
    assert_eq!(summary.global_rules, 1);
    assert_eq!(summary.vacation_periods, 1);
    assert_eq!(summary.resource_rules, 1);
    assert_eq!(summary.one_time_blackouts, 2);
    assert_eq!(
        summary.active_rules,
        vec![
            "Global: SUNDAY (Sundays off)",
            "Property: LAST_FRIDAY (Audit)",
        ]
    );
    assert_eq!(summary.upcoming_vacations, vec!["Agent A: Aug 4 to Aug 8"]);
}

#[tokio::test]
async fn vacation_already_started_is_not_upcoming_in_summary() {
    let (_, admin) = setup();
    let cancel = CancellationToken::new();
    admin
        .create_vacation_blackout(
            date(2025, 6, 10),
            date(2025, 6, 20),
            "Agent B",
            "Trip",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    let summary = admin.summarize(None, &cancel).await.unwrap();
    assert_eq!(summary.vacation_periods, 1);
    assert!(summary.upcoming_vacations.is_empty());
}

#[tokio::test]
async fn upcoming_uses_inclusive_window_from_today() {
    let (_, admin) = setup();
    let cancel = CancellationToken::new();
    for (start, reason) in [
        (date(2025, 6, 14), "yesterday"),
        (date(2025, 6, 15), "today"),
        (date(2025, 6, 22), "in a week"),
        (date(2025, 6, 25), "in ten days"),
        (date(2025, 6, 26), "in eleven days"),
    ] {
        admin
            .create_global_blackout(start, start, reason, "ops", &cancel)
            .await
            .unwrap();
    }
    admin
        .create_recurring_blackout(None, "SUNDAY", "no start date", "ops", true, 2, &cancel)
        .await
        .unwrap();

    let upcoming: Vec<String> = admin
        .upcoming(10, &cancel)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.reason)
        .collect();
    assert_eq!(upcoming, vec!["today", "in a week", "in ten days"]);

    let default_window = admin.upcoming_default(&cancel).await.unwrap();
    assert_eq!(default_window.len(), 4);
}

#[tokio::test]
async fn stats_count_each_category() {
    let (_, admin) = setup();
    let cancel = CancellationToken::new();
    admin
        .create_global_blackout(
            date(2025, 6, 14),
            date(2025, 6, 16),
            "Active",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_blackout(
            Some("P"),
            date(2025, 6, 18),
            date(2025, 6, 18),
            "Soon",
            "ops",
            false,
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_blackout(
            Some("P"),
            date(2025, 8, 1),
            date(2025, 8, 1),
            "Later",
            "ops",
            false,
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_recurring_blackout(Some("P"), "MONDAY", "Mondays", "ops", false, 2, &cancel)
        .await
        .unwrap();

    let stats = admin.stats(&cancel).await.unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.global, 1);
    assert_eq!(stats.resource, 3);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.upcoming, 1);
}

// ── Expiry ──────────────────────────────────────────────────────────────────

async fn seed_expiry_fixture(admin: &BlackoutAdministration) {
    let cancel = CancellationToken::new();
    admin
        .create_global_blackout(
            date(2025, 6, 1),
            date(2025, 6, 14),
            "ended yesterday",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_vacation_blackout(
            date(2025, 5, 1),
            date(2025, 5, 5),
            "Agent A",
            "past trip",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_blackout(
            Some("P"),
            date(2025, 6, 10),
            date(2025, 6, 15),
            "ends today",
            "ops",
            false,
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_vacation_blackout(
            date(2025, 7, 1),
            date(2025, 7, 5),
            "Agent B",
            "future trip",
            "ops",
            &cancel,
        )
        .await
        .unwrap();
    admin
        .create_recurring_blackout(Some("P"), "SUNDAY", "forever", "ops", false, 2, &cancel)
        .await
        .unwrap();
}

#[tokio::test]
async fn cleanup_removes_exactly_the_ended_ranges() {
    let (store, admin) = setup();
    seed_expiry_fixture(&admin).await;

    let removed = admin
        .cleanup_expired(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let mut left: Vec<String> = store
        .snapshot()
        .await
        .into_iter()
        .map(|r| r.reason)
        .collect();
    left.sort();
    assert_eq!(left, vec!["ends today", "forever", "future trip"]);

    let again = admin
        .cleanup_expired(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn sweep_runs_until_cancelled() {
    let (store, admin) = setup();
    seed_expiry_fixture(&admin).await;
    let admin = Arc::new(admin);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(sweep::run(admin, sweep::MIN_SWEEP_INTERVAL, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweep should stop after cancellation")
        .unwrap();

    assert_eq!(store.len().await, 3);
}
