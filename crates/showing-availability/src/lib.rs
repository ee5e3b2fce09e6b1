//! # showing-availability
//!
//! Decides whether a property showing can be booked on a given date.
//!
//! Several independently maintained layers of blackout rules are reconciled
//! for every check: company-wide blackouts, property blackouts, recurring
//! calendar patterns and personal vacations, followed by a same-day capacity
//! limit. When a date is blocked, nearby open weekdays are proposed.
//!
//! Persistence is not part of this crate. Rules and bookings are reached
//! through the [`ports`] traits; [`memory`] has in-process implementations.
//!
//! ## Modules
//!
//! - [`recurrence`] - Recurrence tokens and date matching
//! - [`rule`] - Blackout rule records and query filters
//! - [`ports`] - Rule store, booking counter and clock interfaces
//! - [`memory`] - In-memory rule store and booking counter
//! - [`capacity`] - Same-day booking limit
//! - [`evaluator`] - Layered availability checks
//! - [`alternatives`] - Alternative date search
//! - [`admin`] - Rule creation, removal, listing and expiry
//! - [`sweep`] - Background expiry loop
//! - [`config`] - Engine settings
//! - [`error`] - Error types

pub mod admin;
pub mod alternatives;
pub mod capacity;
pub mod config;
pub mod error;
pub mod evaluator;
mod guard;
pub mod memory;
pub mod ports;
pub mod recurrence;
pub mod rule;
pub mod sweep;

pub use admin::{BlackoutAdministration, BlackoutStats, BlackoutSummary, LayeredBlackouts};
pub use alternatives::AlternativeSlotFinder;
pub use capacity::{CapacityGuard, CapacityOutcome};
pub use config::EngineConfig;
pub use error::{AvailabilityError, ConfigError, StoreError};
pub use evaluator::{AvailabilityCheck, AvailabilityEvaluator};
pub use ports::{BookingCounter, Clock, FixedClock, RuleStore, SystemClock};
pub use recurrence::{matches_token, RecurrenceToken};
pub use rule::{BlackoutRule, BlackoutType, RuleFilter, RuleId, RuleSchedule, RuleScope};
