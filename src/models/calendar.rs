//! Calendar and time window models.
//!
//! Defines the interval definitions a calendar is made of: static
//! intervals with fixed bounds, and recurrent intervals expanded from
//! a start schedule and an end schedule.
//!
//! # Time Model
//! Definitions are civil (`NaiveDateTime`) in UTC wall-clock time.
//! Cached ranges are `TimeWindow`s in milliseconds on the calendar's
//! effective wall clock.
//!
//! # Precedence
//! When several intervals cover the same instant, the one with the
//! highest effective priority decides whether the instant is working time.
//! Without an explicit `priority`:
//! - static intervals beat recurrent ones,
//! - a child calendar's intervals beat its parent's,
//! - unspecified time loses to every real interval of any calendar in
//!   the chain; among unspecified intervals the deepest calendar wins.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::recurrence::{EndSchedule, RecurrenceRule};

/// Priority step between calendar nesting levels.
pub const DEPTH_PRIORITY_STEP: i64 = 100;

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Interval start (ms, inclusive).
    pub start_ms: i64,
    /// Interval end (ms, exclusive).
    pub end_ms: i64,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Duration of this window (ms).
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Whether the window covers no time at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end_ms <= self.start_ms
    }

    /// Whether a timestamp falls within this window.
    #[inline]
    pub fn contains(&self, time_ms: i64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }

    /// The overlapping part of two windows, if any.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let start = self.start_ms.max(other.start_ms);
        let end = self.end_ms.min(other.end_ms);
        if end > start {
            Some(Self::new(start, end))
        } else {
            None
        }
    }
}

/// How an interval's occurrences are produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntervalKind {
    /// Fixed absolute bounds `[start, end)`.
    Static {
        /// Inclusive start.
        start: NaiveDateTime,
        /// Exclusive end.
        end: NaiveDateTime,
    },
    /// Occurrences generated from recurrence rules.
    Recurrent {
        /// Rule producing occurrence starts.
        start_schedule: RecurrenceRule,
        /// Rule (or `EOD` sentinel) producing occurrence ends.
        end_schedule: EndSchedule,
    },
    /// Time not covered by any other interval of the calendar.
    Unspecified,
}

/// A single interval definition of a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarInterval {
    /// Interval identifier, unique within its calendar.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Static or recurrent bounds.
    #[serde(flatten)]
    pub kind: IntervalKind,
    /// Whether time inside the interval is working time.
    #[serde(default)]
    pub is_working: bool,
    /// Explicit priority, overriding the computed one.
    #[serde(default)]
    pub priority: Option<i32>,
}

impl CalendarInterval {
    /// Creates a static interval.
    pub fn fixed(id: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: IntervalKind::Static { start, end },
            is_working: false,
            priority: None,
        }
    }

    /// Creates a recurrent interval.
    pub fn recurrent(
        id: impl Into<String>,
        start_schedule: RecurrenceRule,
        end_schedule: EndSchedule,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: IntervalKind::Recurrent {
                start_schedule,
                end_schedule,
            },
            is_working: false,
            priority: None,
        }
    }

    /// Creates the unspecified-time interval of a calendar.
    pub fn unspecified(calendar_id: &str, is_working: bool) -> Self {
        Self {
            id: format!("{calendar_id}:unspecified"),
            name: None,
            kind: IntervalKind::Unspecified,
            is_working,
            priority: None,
        }
    }

    /// Marks the interval as working time.
    pub fn working(mut self) -> Self {
        self.is_working = true;
        self
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets an explicit priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Whether occurrences come from recurrence rules.
    #[inline]
    pub fn is_recurrent(&self) -> bool {
        matches!(self.kind, IntervalKind::Recurrent { .. })
    }

    /// Whether this is a calendar's unspecified-time interval.
    #[inline]
    pub fn is_unspecified(&self) -> bool {
        matches!(self.kind, IntervalKind::Unspecified)
    }

    /// Effective priority for an interval owned by a calendar at `depth`.
    pub fn effective_priority(&self, depth: u32) -> i64 {
        if let Some(p) = self.priority {
            return i64::from(p);
        }
        let class = match self.kind {
            // Deeper unspecified time wins only over other unspecified time.
            IntervalKind::Unspecified => return i64::from(depth),
            IntervalKind::Recurrent { .. } => 20,
            IntervalKind::Static { .. } => 30,
        };
        i64::from(depth) * DEPTH_PRIORITY_STEP + class
    }
}

/// A calendar: a named set of interval definitions.
///
/// `unspecified_time_is_working` is required before a cache can be built
/// on this calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDefinition {
    /// Calendar identifier.
    pub id: String,
    /// Static and recurrent intervals.
    #[serde(default)]
    pub intervals: Vec<CalendarInterval>,
    /// Working state of time no interval covers.
    #[serde(default)]
    pub unspecified_time_is_working: Option<bool>,
    /// Keep definitions on the UTC wall clock even if the project has a zone.
    #[serde(default)]
    pub ignore_time_zone: bool,
}

impl CalendarDefinition {
    /// Creates an empty calendar with no unspecified-time value.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            intervals: Vec::new(),
            unspecified_time_is_working: None,
            ignore_time_zone: false,
        }
    }

    /// Adds an interval.
    pub fn with_interval(mut self, interval: CalendarInterval) -> Self {
        self.intervals.push(interval);
        self
    }

    /// Sets the working state of unspecified time.
    pub fn with_unspecified_time(mut self, is_working: bool) -> Self {
        self.unspecified_time_is_working = Some(is_working);
        self
    }

    /// Opts out of project time zone conversion.
    pub fn ignoring_time_zone(mut self) -> Self {
        self.ignore_time_zone = true;
        self
    }

    /// Intervals with fixed bounds.
    pub fn static_intervals(&self) -> impl Iterator<Item = &CalendarInterval> {
        self.intervals
            .iter()
            .filter(|i| matches!(i.kind, IntervalKind::Static { .. }))
    }

    /// Intervals expanded from recurrence rules.
    pub fn recurrent_intervals(&self) -> impl Iterator<Item = &CalendarInterval> {
        self.intervals.iter().filter(|i| i.is_recurrent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(100, 200);
        assert_eq!(w.duration_ms(), 100);
        assert!(w.contains(100));
        assert!(w.contains(199));
        assert!(!w.contains(200)); // exclusive end
        assert!(!w.contains(50));
        assert!(TimeWindow::new(5, 5).is_empty());
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(0, 100);
        let b = TimeWindow::new(50, 150);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert_eq!(a.intersect(&b), Some(TimeWindow::new(50, 100)));

        let c = TimeWindow::new(100, 200); // touching but not overlapping
        assert!(!a.overlaps(&c));
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn test_effective_priority() {
        let fixed = CalendarInterval::fixed("h", at(1, 0), at(2, 0));
        let rec = CalendarInterval::recurrent(
            "w",
            RecurrenceRule::daily_at(8, 0),
            EndSchedule::EndOfDay,
        );
        let unspecified = CalendarInterval::unspecified("cal", true);

        assert!(fixed.effective_priority(0) > rec.effective_priority(0));
        assert!(rec.effective_priority(1) > fixed.effective_priority(0));
        assert_eq!(unspecified.effective_priority(0), 0);
        assert!(unspecified.effective_priority(3) < rec.effective_priority(0));
        assert_eq!(fixed.with_priority(-5).effective_priority(3), -5);
    }

    #[test]
    fn test_definition_from_json() {
        let json = r#"{
            "id": "general",
            "unspecified_time_is_working": false,
            "intervals": [
                { "id": "day", "type": "recurrent", "is_working": true,
                  "start_schedule": "FREQ=DAILY;BYHOUR=8", "end_schedule": "FREQ=DAILY;BYHOUR=17" },
                { "id": "holiday", "type": "static",
                  "start": "2024-01-01T00:00:00", "end": "2024-01-02T00:00:00" }
            ]
        }"#;
        let cal: CalendarDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(cal.id, "general");
        assert_eq!(cal.unspecified_time_is_working, Some(false));
        assert_eq!(cal.recurrent_intervals().count(), 1);
        assert_eq!(cal.static_intervals().count(), 1);
        assert!(cal.intervals[0].is_working);
        assert!(!cal.ignore_time_zone);
    }

    #[test]
    fn test_definition_rejects_bad_rule() {
        let json = r#"{ "id": "x", "intervals": [
            { "id": "bad", "type": "recurrent",
              "start_schedule": "FREQ=SECONDLY", "end_schedule": "EOD" } ] }"#;
        assert!(serde_json::from_str::<CalendarDefinition>(json).is_err());
    }
}
