//! Calendar cache: expands a calendar's intervals into an [`IntervalCache`].
//!
//! # Lifecycle
//!
//! ```text
//! uninitialized ──fill──▶ static intervals cached ──fill(range)──▶ filled for range
//!       ▲                                                              │
//!       └─────────────────────────── clear ────────────────────────────┘
//! ```
//!
//! Static intervals are inserted once per construction/`clear` cycle.
//! Recurrent intervals are expanded lazily, only over parts of a query
//! window that no earlier fill covered, so repeated and overlapping fills
//! neither duplicate work nor change already cached content.
//!
//! # Algorithm (per recurrent interval and unfilled range)
//!
//! 1. Find the start occurrence at or before the range start and the end
//!    occurrence at or after the range end; step one further out when they
//!    land exactly on the edge.
//! 2. Enumerate start and end occurrences inside that wrapping window
//!    (`EOD` ends are the midnight after each start).
//! 3. Drop ends at or before the wrapping start and starts at or after the
//!    wrapping end, then pair each start with the first end after it that
//!    does not pass the next start. Unpaired occurrences are handled per
//!    [`MismatchPolicy`].
//! 4. Convert each pair to the effective time zone, clip it to the range
//!    and fold it into the cache.
//!
//! A parent calendar's coverage of the range is imported before step 1.
//!
//! # Concurrency
//! Single-threaded. A cache shared through `Rc<RefCell<_>>` must not be
//! filled or cleared from inside one of its own callbacks.

use std::cell::RefCell;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, trace, warn};

use super::cache_interval::CacheInterval;
use super::interval_cache::IntervalCache;
use super::range_set::RangeSet;
use crate::config::{CacheConfig, MismatchPolicy, ProjectSettings};
use crate::error::{CalendarError, Result};
use crate::models::{
    convert_time_zone, from_millis, saturating_add, to_millis, CalendarDefinition,
    CalendarInterval, EndSchedule, IntervalKind, TimeWindow, TimeZone,
};
use crate::validation::validate_calendar;

/// Step used to look strictly before/after an occurrence on a window edge.
fn edge_step() -> Duration {
    Duration::seconds(1)
}

/// Iteration order for [`CalendarCache::for_each_availability_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending time.
    Forward,
    /// Descending time.
    Backward,
}

/// A cached segment in civil time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySegment {
    /// Inclusive start.
    pub start: NaiveDateTime,
    /// Exclusive end.
    pub end: NaiveDateTime,
    /// Intervals active during the segment.
    pub interval: CacheInterval,
}

impl AvailabilitySegment {
    /// Whether the segment is working time.
    #[inline]
    pub fn is_working(&self) -> bool {
        self.interval.is_working()
    }

    /// Segment length.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Lazily filled availability cache of one calendar.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_calendar::cache::CalendarCache;
/// use u_calendar::config::{CacheConfig, ProjectSettings};
/// use u_calendar::models::{CalendarDefinition, CalendarInterval};
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let calendar = CalendarDefinition::new("office")
///     .with_unspecified_time(false)
///     .with_interval(
///         CalendarInterval::fixed(
///             "work",
///             day.and_hms_opt(9, 0, 0).unwrap(),
///             day.and_hms_opt(17, 0, 0).unwrap(),
///         )
///         .working(),
///     );
///
/// let mut cache =
///     CalendarCache::new(calendar, ProjectSettings::default(), CacheConfig::default()).unwrap();
/// assert!(cache.is_working_time(day.and_hms_opt(10, 0, 0).unwrap()).unwrap());
/// assert!(!cache.is_working_time(day.and_hms_opt(18, 0, 0).unwrap()).unwrap());
/// ```
#[derive(Debug)]
pub struct CalendarCache {
    calendar: CalendarDefinition,
    static_intervals: Vec<Arc<CalendarInterval>>,
    recurrent_intervals: Vec<Arc<CalendarInterval>>,
    depth: u32,
    time_zone: Option<TimeZone>,
    config: CacheConfig,
    parent: Option<Rc<RefCell<CalendarCache>>>,
    parent_generation: Option<u64>,
    interval_cache: IntervalCache<CacheInterval>,
    filled: RangeSet,
    static_intervals_cached: bool,
    generation: u64,
}

impl CalendarCache {
    /// Creates the cache of a root calendar.
    ///
    /// # Errors
    /// `CalendarError::Configuration` if the definition does not validate,
    /// in particular when the unspecified-time value is missing.
    pub fn new(
        calendar: CalendarDefinition,
        project: ProjectSettings,
        config: CacheConfig,
    ) -> Result<Self> {
        Self::build(calendar, None, 0, project, config)
    }

    /// Creates the cache of a calendar inheriting from `parent`.
    ///
    /// # Errors
    /// As [`CalendarCache::new`]; also fails if `parent` is mutably borrowed.
    pub fn with_parent(
        calendar: CalendarDefinition,
        parent: Rc<RefCell<CalendarCache>>,
        project: ProjectSettings,
        config: CacheConfig,
    ) -> Result<Self> {
        let depth = parent
            .try_borrow()
            .map_err(|_| CalendarError::Configuration("parent calendar cache is in use".into()))?
            .depth
            + 1;
        Self::build(calendar, Some(parent), depth, project, config)
    }

    fn build(
        calendar: CalendarDefinition,
        parent: Option<Rc<RefCell<CalendarCache>>>,
        depth: u32,
        project: ProjectSettings,
        config: CacheConfig,
    ) -> Result<Self> {
        if let Err(errors) = validate_calendar(&calendar) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(CalendarError::Configuration(messages.join("; ")));
        }
        let unspecified_is_working = calendar.unspecified_time_is_working.ok_or_else(|| {
            CalendarError::Configuration(format!(
                "calendar '{}' is missing the unspecified time interval",
                calendar.id
            ))
        })?;

        let unspecified = Arc::new(CalendarInterval::unspecified(
            &calendar.id,
            unspecified_is_working,
        ));
        let interval_cache =
            IntervalCache::new(CacheInterval::single(unspecified, depth), |a, b| {
                a.combine_with(b)
            });
        let static_intervals = calendar.static_intervals().cloned().map(Arc::new).collect();
        let recurrent_intervals = calendar.recurrent_intervals().cloned().map(Arc::new).collect();
        let time_zone = if calendar.ignore_time_zone {
            None
        } else {
            project.time_zone
        };

        debug!(
            calendar = %calendar.id,
            depth,
            time_zone = ?time_zone,
            "created calendar cache"
        );

        Ok(Self {
            calendar,
            static_intervals,
            recurrent_intervals,
            depth,
            time_zone,
            config,
            parent,
            parent_generation: None,
            interval_cache,
            filled: RangeSet::new(),
            static_intervals_cached: false,
            generation: 0,
        })
    }

    /// The calendar definition.
    #[inline]
    pub fn calendar(&self) -> &CalendarDefinition {
        &self.calendar
    }

    /// Nesting depth (0 for a root calendar).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Effective time zone of cached boundaries.
    #[inline]
    pub fn time_zone(&self) -> Option<&TimeZone> {
        self.time_zone.as_ref()
    }

    /// Cache settings.
    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Parent calendar cache, if any.
    #[inline]
    pub fn parent(&self) -> Option<&Rc<RefCell<CalendarCache>>> {
        self.parent.as_ref()
    }

    /// Whether static intervals have been inserted since the last `clear`.
    #[inline]
    pub fn static_intervals_cached(&self) -> bool {
        self.static_intervals_cached
    }

    /// Number of times this cache has been cleared.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Windows (ms) recurrences have been expanded over.
    #[inline]
    pub fn filled_ranges(&self) -> &[TimeWindow] {
        self.filled.ranges()
    }

    /// The underlying interval cache.
    #[inline]
    pub fn interval_cache(&self) -> &IntervalCache<CacheInterval> {
        &self.interval_cache
    }

    /// Drops all cached content; the next fill re-caches static intervals.
    pub fn clear(&mut self) {
        self.interval_cache.clear();
        self.filled.clear();
        self.static_intervals_cached = false;
        self.parent_generation = None;
        self.generation += 1;
        debug!(
            calendar = %self.calendar.id,
            generation = self.generation,
            "cleared calendar cache"
        );
    }

    /// Inserts every static interval once per construction/`clear` cycle.
    pub fn cache_static_intervals(&mut self) -> Result<()> {
        if self.static_intervals_cached {
            return Ok(());
        }
        for interval in &self.static_intervals {
            let IntervalKind::Static { start, end } = interval.kind else {
                continue;
            };
            let start_ms = to_millis(convert_time_zone(self.time_zone.as_ref(), start));
            let end_ms = to_millis(convert_time_zone(self.time_zone.as_ref(), end));
            if start_ms >= end_ms {
                // folded away by a DST change
                debug!(interval = %interval.id, %start, %end, "static interval empty in zone");
                continue;
            }
            let payload = CacheInterval::single(Arc::clone(interval), self.depth);
            self.interval_cache.combine_into(start_ms, end_ms, &payload)?;
        }
        self.static_intervals_cached = true;
        debug!(
            calendar = %self.calendar.id,
            count = self.static_intervals.len(),
            "cached static intervals"
        );
        Ok(())
    }

    /// Makes `[start, end)` fully available in the cache.
    ///
    /// Idempotent: ranges filled before are skipped, so the cached content
    /// on them does not change.
    ///
    /// # Errors
    /// - `CalendarError::InvalidRange` if `start > end` (before any work).
    /// - `CalendarError::DataInconsistency` under [`MismatchPolicy::Strict`].
    pub fn fill_cache(&mut self, start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        self.sync_with_parent()?;
        self.cache_static_intervals()?;
        if start == end {
            return Ok(());
        }

        let gaps = self.filled.gaps(TimeWindow::new(to_millis(start), to_millis(end)));
        if gaps.is_empty() {
            trace!(calendar = %self.calendar.id, %start, %end, "range already cached");
            return Ok(());
        }
        debug!(
            calendar = %self.calendar.id,
            %start,
            %end,
            gaps = gaps.len(),
            "filling calendar cache"
        );

        for gap in gaps {
            self.import_parent(gap)?;
            for i in 0..self.recurrent_intervals.len() {
                let interval = Arc::clone(&self.recurrent_intervals[i]);
                self.expand_recurrent(&interval, gap)?;
            }
            self.filled.insert(gap);
        }
        Ok(())
    }

    /// Payload at `at`, filling the surrounding day first.
    pub fn interval_at(&mut self, at: NaiveDateTime) -> Result<CacheInterval> {
        let day_start = at.date().and_time(chrono::NaiveTime::MIN);
        self.fill_cache(day_start, saturating_add(day_start, Duration::days(1)))?;
        Ok(self.cached_interval_at(at).clone())
    }

    /// Payload at `at` as currently cached, without filling.
    ///
    /// Never-filled time carries the unspecified-time payload.
    pub fn cached_interval_at(&self, at: NaiveDateTime) -> &CacheInterval {
        self.interval_cache.interval_of(to_millis(at))
    }

    /// Segments tiling `[start, end)`, after filling that range.
    pub fn intervals_between(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AvailabilitySegment>> {
        self.fill_cache(start, end)?;
        Ok(self
            .interval_cache
            .segments(to_millis(start), to_millis(end))
            .into_iter()
            .map(|(w, payload)| AvailabilitySegment {
                start: from_millis(w.start_ms),
                end: from_millis(w.end_ms),
                interval: payload.clone(),
            })
            .collect())
    }

    /// Calls `f` for each segment of `[start, end)` until it breaks.
    ///
    /// Returns `Ok(true)` if `f` broke out early.
    pub fn for_each_availability_interval<F>(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        direction: Direction,
        mut f: F,
    ) -> Result<bool>
    where
        F: FnMut(&AvailabilitySegment) -> ControlFlow<()>,
    {
        let mut segments = self.intervals_between(start, end)?;
        if direction == Direction::Backward {
            segments.reverse();
        }
        Ok(segments.iter().any(|seg| f(seg).is_break()))
    }

    /// Clears this cache if the parent was cleared since the last import.
    fn sync_with_parent(&mut self) -> Result<()> {
        let Some(parent) = &self.parent else {
            return Ok(());
        };
        let generation = parent
            .try_borrow()
            .map_err(|_| CalendarError::Configuration("parent calendar cache is in use".into()))?
            .generation;
        if self.parent_generation.is_some_and(|g| g != generation) {
            debug!(calendar = %self.calendar.id, "parent cache was cleared; clearing child");
            self.clear();
        }
        self.parent_generation = Some(generation);
        Ok(())
    }

    fn import_parent(&mut self, gap: TimeWindow) -> Result<()> {
        let Some(parent) = &self.parent else {
            return Ok(());
        };
        let mut parent = parent
            .try_borrow_mut()
            .map_err(|_| CalendarError::Configuration("parent calendar cache is in use".into()))?;
        parent.fill_cache(from_millis(gap.start_ms), from_millis(gap.end_ms))?;
        self.interval_cache
            .include_range_from(&parent.interval_cache, gap.start_ms, gap.end_ms)
    }

    fn expand_recurrent(
        &mut self,
        interval: &Arc<CalendarInterval>,
        gap: TimeWindow,
    ) -> Result<()> {
        let IntervalKind::Recurrent {
            start_schedule,
            end_schedule,
        } = &interval.kind
        else {
            return Ok(());
        };

        // Rules are written on the UTC wall clock; the gap is on the zone's.
        let (window_start, window_end) = match &self.time_zone {
            Some(tz) => (
                tz.from_time_zone(from_millis(gap.start_ms)),
                tz.from_time_zone(from_millis(gap.end_ms)),
            ),
            None => (from_millis(gap.start_ms), from_millis(gap.end_ms)),
        };

        let wrap_start = match start_schedule.prev_at_or_before(window_start) {
            Some(prev) if prev == window_start => prev
                .checked_sub_signed(edge_step())
                .and_then(|before| start_schedule.prev_at_or_before(before))
                .unwrap_or(prev),
            Some(prev) => prev,
            None => window_start,
        };
        let wrap_end = match end_schedule {
            EndSchedule::EndOfDay => window_end,
            EndSchedule::Rule(rule) => match rule.next_at_or_after(window_end) {
                Some(next) if next == window_end => next
                    .checked_add_signed(edge_step())
                    .and_then(|after| rule.next_at_or_after(after))
                    .unwrap_or(next),
                Some(next) => next,
                None => window_end,
            },
        };

        // Boundary context: starts opening a period that closes after the
        // wrapping window, and ends closing a period opened before it.
        let mut starts = start_schedule.occurrences_between(wrap_start, wrap_end);
        let trailing = starts.iter().rev().take_while(|&&s| s >= wrap_end).count();
        starts.truncate(starts.len() - trailing);

        let mut ends: Vec<NaiveDateTime> = match end_schedule {
            EndSchedule::EndOfDay => starts.iter().map(|&s| EndSchedule::end_of_day(s)).collect(),
            EndSchedule::Rule(rule) => rule.occurrences_between(wrap_start, wrap_end),
        };
        let leading = ends.iter().take_while(|&&e| e <= wrap_start).count();
        ends.drain(..leading);

        let pairing = pair_occurrences(&starts, &ends);
        if pairing.unmatched_starts > 0 || pairing.unmatched_ends > 0 {
            let detail = format!(
                "{} starts and {} ends unpaired between {wrap_start} and {wrap_end}",
                pairing.unmatched_starts, pairing.unmatched_ends
            );
            self.inconsistency(interval, detail)?;
        }

        for (start, end) in pairing.pairs {
            let window = TimeWindow::new(
                to_millis(convert_time_zone(self.time_zone.as_ref(), start)),
                to_millis(convert_time_zone(self.time_zone.as_ref(), end)),
            );
            let Some(clipped) = window.intersect(&gap) else {
                continue;
            };
            trace!(interval = %interval.id, %start, %end, "caching occurrence");
            let payload = CacheInterval::single(Arc::clone(interval), self.depth);
            self.interval_cache
                .combine_into(clipped.start_ms, clipped.end_ms, &payload)?;
        }
        Ok(())
    }

    fn inconsistency(&self, interval: &CalendarInterval, detail: String) -> Result<()> {
        match self.config.mismatch_policy {
            MismatchPolicy::Strict => Err(CalendarError::DataInconsistency {
                interval_id: interval.id.clone(),
                detail,
            }),
            MismatchPolicy::Lenient => {
                warn!(
                    calendar = %self.calendar.id,
                    interval = %interval.id,
                    %detail,
                    "dropping unpaired recurrence occurrences"
                );
                Ok(())
            }
        }
    }
}

/// Start/end occurrences matched into periods.
#[derive(Debug, Default, PartialEq, Eq)]
struct Pairing {
    pairs: Vec<(NaiveDateTime, NaiveDateTime)>,
    unmatched_starts: usize,
    unmatched_ends: usize,
}

/// Pairs each start with the first end after it, provided that end does not
/// pass the following start. Both inputs are ascending.
fn pair_occurrences(starts: &[NaiveDateTime], ends: &[NaiveDateTime]) -> Pairing {
    let mut pairing = Pairing::default();
    let mut next_end = 0;

    for (i, &start) in starts.iter().enumerate() {
        while next_end < ends.len() && ends[next_end] <= start {
            pairing.unmatched_ends += 1;
            next_end += 1;
        }
        let following = starts.get(i + 1).copied();
        match ends.get(next_end) {
            Some(&end) if following.map_or(true, |f| end <= f) => {
                pairing.pairs.push((start, end));
                next_end += 1;
            }
            _ => pairing.unmatched_starts += 1,
        }
    }
    pairing.unmatched_ends += ends.len() - next_end;
    pairing
}
