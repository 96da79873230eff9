//! Working-time queries on a calendar cache.
//!
//! Every query fills the cache on demand. Open-ended searches walk forward
//! in chunks of `CacheConfig::fill_chunk_days` up to a caller-supplied
//! horizon, so an all-non-working calendar cannot loop forever.
//!
//! # Precedence
//! Whether an instant is working time is decided by the winning interval
//! of its cached segment (see [`CacheInterval::winner`](crate::cache::CacheInterval::winner)).

use std::ops::ControlFlow;

use chrono::{Duration, NaiveDateTime};

use crate::cache::{CalendarCache, Direction};
use crate::error::{CalendarError, Result};
use crate::models::saturating_add;

impl CalendarCache {
    /// Whether `at` is working time.
    pub fn is_working_time(&mut self, at: NaiveDateTime) -> Result<bool> {
        Ok(self.interval_at(at)?.is_working())
    }

    /// Total working time within `[start, end)`.
    ///
    /// # Errors
    /// `CalendarError::InvalidRange` if `start > end`.
    pub fn working_time_between(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Duration> {
        let total = self
            .intervals_between(start, end)?
            .iter()
            .filter(|seg| seg.is_working())
            .map(|seg| seg.duration())
            .fold(Duration::zero(), |acc, d| acc + d);
        Ok(total)
    }

    /// Finds the first working instant at or after `from`.
    ///
    /// Returns `Ok(None)` if no working time starts before `from + horizon`
    /// (clamped to the representable range).
    pub fn next_working_time(
        &mut self,
        from: NaiveDateTime,
        horizon: Duration,
    ) -> Result<Option<NaiveDateTime>> {
        let limit = saturating_add(from, horizon);
        let chunk = self.config().fill_chunk();
        let mut cursor = from;

        while cursor < limit {
            let chunk_end = saturating_add(cursor, chunk).min(limit);
            let mut found = None;
            self.for_each_availability_interval(cursor, chunk_end, Direction::Forward, |seg| {
                if seg.is_working() {
                    found = Some(seg.start);
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })?;
            if found.is_some() {
                return Ok(found);
            }
            cursor = chunk_end;
        }
        Ok(None)
    }

    /// Finds when `duration` of working time, counted from `start`, is used up.
    ///
    /// A zero duration ends at `start` itself.
    ///
    /// # Errors
    /// - `CalendarError::InvalidRange` for a negative duration.
    /// - `CalendarError::HorizonExceeded` if the working time does not fit
    ///   before `start + horizon`.
    pub fn end_date_for_duration(
        &mut self,
        start: NaiveDateTime,
        duration: Duration,
        horizon: Duration,
    ) -> Result<NaiveDateTime> {
        if duration < Duration::zero() {
            return Err(CalendarError::InvalidRange {
                start,
                end: saturating_add(start, duration),
            });
        }
        if duration == Duration::zero() {
            return Ok(start);
        }

        let limit = saturating_add(start, horizon);
        let chunk = self.config().fill_chunk();
        let mut remaining = duration;
        let mut cursor = start;

        while cursor < limit {
            let chunk_end = saturating_add(cursor, chunk).min(limit);
            let mut finished = None;
            self.for_each_availability_interval(cursor, chunk_end, Direction::Forward, |seg| {
                if !seg.is_working() {
                    return ControlFlow::Continue(());
                }
                let available = seg.duration();
                if available >= remaining {
                    finished = Some(saturating_add(seg.start, remaining));
                    ControlFlow::Break(())
                } else {
                    remaining = remaining - available;
                    ControlFlow::Continue(())
                }
            })?;
            if let Some(end) = finished {
                return Ok(end);
            }
            cursor = chunk_end;
        }
        Err(CalendarError::HorizonExceeded { horizon_end: limit })
    }
}
