//! Interval caching for calendars.
//!
//! Two layers:
//!
//! - **`IntervalCache`**: a generic, non-overlapping, boundary-sorted set of
//!   segments, each carrying a payload merged with a caller-supplied combine
//!   function. Uncovered time carries an "empty" payload.
//! - **`CalendarCache`**: expands a calendar's static and recurrent interval
//!   definitions into an `IntervalCache<CacheInterval>` for requested date
//!   ranges, optionally inheriting a parent calendar's coverage.
//!
//! # Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use u_calendar::cache::CalendarCache;
//! use u_calendar::config::{CacheConfig, ProjectSettings};
//! use u_calendar::models::{CalendarDefinition, CalendarInterval, EndSchedule, RecurrenceRule};
//!
//! let calendar = CalendarDefinition::new("shifts")
//!     .with_unspecified_time(false)
//!     .with_interval(
//!         CalendarInterval::recurrent(
//!             "morning",
//!             RecurrenceRule::daily_at(6, 0),
//!             EndSchedule::Rule(RecurrenceRule::daily_at(14, 0)),
//!         )
//!         .working(),
//!     );
//! let mut cache =
//!     CalendarCache::new(calendar, ProjectSettings::default(), CacheConfig::default()).unwrap();
//!
//! let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
//! let segments = cache
//!     .intervals_between(day.and_hms_opt(0, 0, 0).unwrap(), day.and_hms_opt(23, 0, 0).unwrap())
//!     .unwrap();
//! assert_eq!(segments.iter().filter(|s| s.is_working()).count(), 1);
//! ```

mod cache_interval;
mod calendar_cache;
mod interval_cache;
mod range_set;

pub use cache_interval::{CacheEntry, CacheInterval};
pub use calendar_cache::{AvailabilitySegment, CalendarCache, Direction};
pub use interval_cache::IntervalCache;
pub use range_set::RangeSet;
