use chrono::NaiveDateTime;
use tracing::debug;

use crate::models::{CycleVerdict, ValidationResult};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date {candidate} is after the current time {now}")]
    FutureDate {
        candidate: NaiveDateTime,
        now: NaiveDateTime,
    },
    #[error("record limit of {limit} reached")]
    RecordLimitReached { limit: usize },
    #[error("{days_between} days since the last period is outside the {min}-{max} day range")]
    ImplausibleCycle { days_between: i64, min: i64, max: i64 },
}

/// Check a proposed period date against the most recent one.
/// Advisory only: an out-of-range gap yields `is_valid == false`, never an error.
pub fn validate_candidate(
    candidate: NaiveDateTime,
    most_recent: Option<NaiveDateTime>,
    min_cycle_days: i64,
    max_cycle_days: i64,
) -> ValidationResult {
    let Some(most_recent) = most_recent else {
        return ValidationResult {
            is_valid: true,
            days_between: None,
            verdict: CycleVerdict::FirstRecord,
        };
    };

    let days_between = (candidate - most_recent).num_days().abs();
    let verdict = if days_between < min_cycle_days {
        CycleVerdict::TooShort
    } else if days_between > max_cycle_days {
        CycleVerdict::TooLong
    } else {
        CycleVerdict::WithinRange
    };

    debug!(days_between, ?verdict, "validated candidate period date");

    ValidationResult {
        is_valid: verdict == CycleVerdict::WithinRange,
        days_between: Some(days_between),
        verdict,
    }
}

/// Reject dates after `now`. Equal to `now` is accepted.
pub fn ensure_not_future(candidate: NaiveDateTime, now: NaiveDateTime) -> Result<(), ValidationError> {
    if candidate > now {
        return Err(ValidationError::FutureDate { candidate, now });
    }
    Ok(())
}

pub fn ensure_capacity(existing: usize, max_records: usize) -> Result<(), ValidationError> {
    if existing >= max_records {
        return Err(ValidationError::RecordLimitReached { limit: max_records });
    }
    Ok(())
}
