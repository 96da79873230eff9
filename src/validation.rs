//! Input validation for calendar definitions.
//!
//! Checks structural integrity of a calendar before a cache is built on it.
//! Detects:
//! - Duplicate interval IDs
//! - Missing unspecified-time value
//! - Static intervals whose start is not before their end
//! - Intervals declared with the reserved unspecified kind
//! - Duplicate calendar IDs across a calendar set

use crate::models::{CalendarDefinition, IntervalKind};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// The calendar does not say whether unspecified time is working.
    MissingUnspecifiedTime,
    /// A static interval with `start >= end`.
    InvertedInterval,
    /// An interval uses the kind reserved for unspecified time.
    ReservedKind,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a single calendar definition.
///
/// Checks:
/// 1. The unspecified-time value is present
/// 2. No duplicate interval IDs
/// 3. Every static interval has `start < end`
/// 4. No interval is declared as unspecified time
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_calendar(calendar: &CalendarDefinition) -> ValidationResult {
    let mut errors = Vec::new();

    if calendar.unspecified_time_is_working.is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingUnspecifiedTime,
            format!("Calendar '{}' is missing the unspecified time interval", calendar.id),
        ));
    }

    let mut interval_ids = HashSet::new();
    for interval in &calendar.intervals {
        if !interval_ids.insert(interval.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate interval ID in calendar '{}': {}", calendar.id, interval.id),
            ));
        }

        match &interval.kind {
            IntervalKind::Static { start, end } if start >= end => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvertedInterval,
                    format!(
                        "Interval '{}' starts at {start} but ends at {end}",
                        interval.id
                    ),
                ));
            }
            IntervalKind::Unspecified => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ReservedKind,
                    format!(
                        "Interval '{}' cannot be declared as unspecified time",
                        interval.id
                    ),
                ));
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a set of calendars: each one individually, plus unique IDs.
pub fn validate_calendars(calendars: &[CalendarDefinition]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut calendar_ids = HashSet::new();

    for calendar in calendars {
        if !calendar_ids.insert(calendar.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate calendar ID: {}", calendar.id),
            ));
        }
        if let Err(mut found) = validate_calendar(calendar) {
            errors.append(&mut found);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalendarInterval, EndSchedule, RecurrenceRule};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn sample_calendar() -> CalendarDefinition {
        CalendarDefinition::new("general")
            .with_unspecified_time(false)
            .with_interval(
                CalendarInterval::recurrent(
                    "day",
                    RecurrenceRule::daily_at(8, 0),
                    EndSchedule::Rule(RecurrenceRule::daily_at(17, 0)),
                )
                .working(),
            )
            .with_interval(CalendarInterval::fixed("lunch", at(12), at(13)))
    }

    #[test]
    fn test_valid_calendar() {
        assert!(validate_calendar(&sample_calendar()).is_ok());
    }

    #[test]
    fn test_missing_unspecified_time() {
        let mut cal = sample_calendar();
        cal.unspecified_time_is_working = None;

        let errors = validate_calendar(&cal).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MissingUnspecifiedTime));
    }

    #[test]
    fn test_duplicate_interval_id() {
        let cal = sample_calendar().with_interval(CalendarInterval::fixed("lunch", at(14), at(15)));

        let errors = validate_calendar(&cal).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("lunch")));
    }

    #[test]
    fn test_inverted_and_empty_static_intervals() {
        let cal = sample_calendar()
            .with_interval(CalendarInterval::fixed("backwards", at(10), at(9)))
            .with_interval(CalendarInterval::fixed("empty", at(10), at(10)));

        let errors = validate_calendar(&cal).unwrap_err();
        let inverted = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvertedInterval)
            .count();
        assert_eq!(inverted, 2);
    }

    #[test]
    fn test_reserved_kind() {
        let cal = sample_calendar().with_interval(CalendarInterval::unspecified("general", true));

        let errors = validate_calendar(&cal).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::ReservedKind));
    }

    #[test]
    fn test_multiple_errors() {
        let cals = vec![
            sample_calendar(),
            sample_calendar(), // duplicate ID
            CalendarDefinition::new("bare"), // no unspecified time
        ];

        let errors = validate_calendars(&cals).unwrap_err();
        assert!(errors.len() >= 2);
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("calendar")));
    }
}
