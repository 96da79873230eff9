//! Error types for calendar caching.
//!
//! All errors are raised synchronously to the immediate caller. Nothing in
//! this crate retries or recovers partially: a failed fill leaves the cache
//! as it was before the failing occurrence was inserted.

use chrono::NaiveDateTime;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CalendarError>;

/// Errors raised by the calendar engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// The calendar definition cannot back a cache (e.g. no unspecified-time value).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A query window whose start lies after its end.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested window start.
        start: NaiveDateTime,
        /// Requested window end.
        end: NaiveDateTime,
    },

    /// An interval inserted into the cache with `start >= end`.
    #[error("invalid interval [{start_ms}, {end_ms}): start must be before end")]
    InvalidInterval {
        /// Interval start (ms).
        start_ms: i64,
        /// Interval end (ms).
        end_ms: i64,
    },

    /// Recurrence start/end occurrences that do not pair up.
    #[error("inconsistent recurrence in interval '{interval_id}': {detail}")]
    DataInconsistency {
        /// Offending calendar interval.
        interval_id: String,
        /// What did not match.
        detail: String,
    },

    /// A recurrence rule that could not be parsed.
    #[error("invalid recurrence rule '{rule}': {reason}")]
    InvalidRecurrence {
        /// Rule text as given.
        rule: String,
        /// Parser complaint.
        reason: String,
    },

    /// A working-time search ran past its horizon.
    #[error("no result within horizon ending at {horizon_end}")]
    HorizonExceeded {
        /// Last instant searched.
        horizon_end: NaiveDateTime,
    },
}

impl CalendarError {
    /// Whether the error stems from the calendar definition rather than the call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CalendarError::Configuration(_) | CalendarError::InvalidRecurrence { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_display_invalid_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let err = CalendarError::InvalidRange { start, end };
        assert_eq!(
            err.to_string(),
            "invalid range: start 2024-01-02 00:00:00 is after end 2024-01-01 00:00:00"
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(CalendarError::Configuration("x".into()).is_configuration());
        assert!(CalendarError::InvalidRecurrence {
            rule: "FREQ=NEVER".into(),
            reason: "unknown".into(),
        }
        .is_configuration());
    }
}
