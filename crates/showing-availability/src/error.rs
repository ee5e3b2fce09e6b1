//! Error types for availability evaluation and blackout administration.

use std::time::Duration;

use thiserror::Error;

use crate::rule::RuleId;

/// Failure reported by a collaborator (rule store or booking counter).
///
/// Collaborators own their own failure modes; this type only carries a
/// message and, when available, the underlying cause.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Error, Debug)]
pub enum AvailabilityError {
    /// A blackout rule failed validation at administration time.
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Blackout rule {id} not found")]
    NotFound { id: RuleId },

    /// A collaborator call failed. `operation` names the call that failed.
    #[error("Store error during {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Timed out after {after:?} during {operation}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The caller's cancellation token fired before every layer was checked.
    #[error("Availability evaluation cancelled")]
    Cancelled,

    /// Produced only by `validate_booking_date`. The message shows the first
    /// blocking reason; `reasons` keeps all of them.
    #[error("Booking not available: {reason}")]
    Unavailable {
        reason: String,
        reasons: Vec<String>,
    },
}

impl AvailabilityError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether a caller may retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Timeout { .. })
    }
}

/// Errors raised while loading [`crate::config::EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, AvailabilityError>;
