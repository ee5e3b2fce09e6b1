//! Engine configuration.
//!
//! The business timezone has no default: day boundaries for capacity checks
//! and the meaning of "today" for expiry both depend on it, so it must be
//! supplied explicitly.

use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// IANA zone the business operates in, e.g. `America/Chicago`.
    pub timezone: Tz,
    /// Active bookings on a day at which new bookings are refused.
    pub max_daily_bookings: u32,
    /// Active bookings on a day at which a warning is attached.
    pub warn_daily_bookings: u32,
    /// Days after the requested date scanned for alternatives.
    pub alternative_horizon_days: u32,
    pub max_alternatives: usize,
    /// Candidate days evaluated at once while searching for alternatives.
    pub alternative_concurrency: usize,
    /// Deadline applied to every collaborator call.
    pub store_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
    pub sweep_interval: Duration,
    pub upcoming_window_days: u32,
}

impl EngineConfig {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            max_daily_bookings: 5,
            warn_daily_bookings: 3,
            alternative_horizon_days: 14,
            max_alternatives: 5,
            alternative_concurrency: 4,
            store_timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(200),
            sweep_interval: Duration::from_secs(3600),
            upcoming_window_days: 30,
        }
    }

    /// Load from `SHOWING_*` environment variables.
    ///
    /// `SHOWING_TIMEZONE` is required. Every other variable is optional and
    /// falls back to the value from [`EngineConfig::new`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let tz_raw = lookup("SHOWING_TIMEZONE")
            .ok_or(ConfigError::Missing("SHOWING_TIMEZONE"))?;
        let timezone: Tz = tz_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "SHOWING_TIMEZONE",
            value: tz_raw.clone(),
        })?;

        let mut config = Self::new(timezone);
        if let Some(v) = parse_opt(&lookup, "SHOWING_MAX_DAILY_BOOKINGS")? {
            config.max_daily_bookings = v;
        }
        if let Some(v) = parse_opt(&lookup, "SHOWING_WARN_DAILY_BOOKINGS")? {
            config.warn_daily_bookings = v;
        }
        if let Some(v) = parse_opt(&lookup, "SHOWING_ALTERNATIVE_HORIZON_DAYS")? {
            config.alternative_horizon_days = v;
        }
        if let Some(v) = parse_opt(&lookup, "SHOWING_MAX_ALTERNATIVES")? {
            config.max_alternatives = v;
        }
        if let Some(v) = parse_opt(&lookup, "SHOWING_ALTERNATIVE_CONCURRENCY")? {
            config.alternative_concurrency = v;
        }
        if let Some(ms) = parse_opt(&lookup, "SHOWING_STORE_TIMEOUT_MS")? {
            config.store_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = parse_opt(&lookup, "SHOWING_RETRY_ATTEMPTS")? {
            config.retry_attempts = v;
        }
        if let Some(ms) = parse_opt(&lookup, "SHOWING_RETRY_BACKOFF_MS")? {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_opt(&lookup, "SHOWING_SWEEP_INTERVAL_SECS")? {
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(v) = parse_opt(&lookup, "SHOWING_UPCOMING_WINDOW_DAYS")? {
            config.upcoming_window_days = v;
        }

        if config.warn_daily_bookings > config.max_daily_bookings {
            return Err(ConfigError::Invalid {
                key: "SHOWING_WARN_DAILY_BOOKINGS",
                value: config.warn_daily_bookings.to_string(),
            });
        }
        if config.alternative_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "SHOWING_ALTERNATIVE_CONCURRENCY",
                value: "0".to_string(),
            });
        }
        if config.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SHOWING_SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        Ok(config)
    }
}

fn parse_opt<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
