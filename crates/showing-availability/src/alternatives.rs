//! Search for nearby open dates when the requested one is blocked.

use chrono::{Days, NaiveDate};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{AvailabilityError, Result};
use crate::evaluator::AvailabilityEvaluator;
use crate::recurrence::RecurrenceToken;

pub struct AlternativeSlotFinder<'a> {
    evaluator: &'a AvailabilityEvaluator,
}

impl<'a> AlternativeSlotFinder<'a> {
    pub fn new(evaluator: &'a AvailabilityEvaluator) -> Self {
        Self { evaluator }
    }

    /// Scan the days after `requested` for dates on which `resource_ref` is
    /// fully available.
    ///
    /// Weekends are never proposed. Candidates are evaluated a few at a time
    /// but reported in date order, and the scan stops at `max_alternatives`
    /// hits or the end of the horizon. A candidate whose evaluation fails is
    /// skipped; cancellation aborts the whole search.
    pub async fn find_alternatives(
        &self,
        resource_ref: &str,
        requested: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<NaiveDate>> {
        let config = self.evaluator.config();
        let mut found = Vec::new();
        if config.max_alternatives == 0 {
            return Ok(found);
        }

        let candidates = (1..=u64::from(config.alternative_horizon_days))
            .filter_map(|offset| requested.checked_add_days(Days::new(offset)))
            .filter(|date| !RecurrenceToken::Weekends.matches(*date));

        let evaluator = self.evaluator;
        let mut evaluations = stream::iter(candidates)
            .map(move |date| async move {
                (date, evaluator.evaluate(resource_ref, date, cancel).await)
            })
            .buffered(config.alternative_concurrency.max(1));

        while let Some((date, outcome)) = evaluations.next().await {
            match outcome {
                Ok(check) if check.is_available => {
                    found.push(date);
                    if found.len() >= config.max_alternatives {
                        break;
                    }
                }
                Ok(_) => {}
                Err(AvailabilityError::Cancelled) => return Err(AvailabilityError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        resource = %resource_ref,
                        %date,
                        error = %e,
                        "Skipping alternative candidate"
                    );
                }
            }
        }

        Ok(found)
    }
}
