//! Boundary-sorted interval cache with merged payloads.
//!
//! # Representation
//!
//! `n` sorted boundary points split the time axis into `n + 1` segments:
//!
//! ```text
//! segment:   0        1        2              n
//!         -inf ── p0 ───── p1 ───── ... ── p(n-1) ── +inf
//! ```
//!
//! Segment `i` covers `[p(i-1), p(i))` and carries one payload. Segments
//! never overlap by construction, and time no insertion has touched keeps
//! the empty payload.
//!
//! # Invariants
//! - `intervals.len() == points.len() + 1`
//! - `points` is strictly increasing
//! - neighbouring segments carry different payloads (equal ones are coalesced)
//!
//! # Complexity
//! Lookup is O(log n). Insertion is O(n) because of the `Vec` shifts, which
//! stays cheap for the few hundred boundaries a visible date range produces.

use std::fmt;

use crate::error::{CalendarError, Result};
use crate::models::TimeWindow;

type CombineFn<T> = Box<dyn Fn(&T, &T) -> T>;

/// A non-overlapping, sorted set of payload-carrying segments.
///
/// # Examples
///
/// ```
/// use u_calendar::cache::IntervalCache;
///
/// let mut cache = IntervalCache::new(Vec::<&str>::new(), |a: &Vec<&str>, b: &Vec<&str>| {
///     a.iter().chain(b).copied().collect()
/// });
/// cache.combine_into(0, 10, &vec!["a"]).unwrap();
/// cache.combine_into(5, 15, &vec!["b"]).unwrap();
///
/// assert_eq!(cache.interval_of(2), &vec!["a"]);
/// assert_eq!(cache.interval_of(7), &vec!["a", "b"]);
/// assert_eq!(cache.interval_of(12), &vec!["b"]);
/// assert!(cache.interval_of(20).is_empty());
/// ```
pub struct IntervalCache<T> {
    points: Vec<i64>,
    intervals: Vec<T>,
    empty: T,
    combine: CombineFn<T>,
}

impl<T: Clone + PartialEq> IntervalCache<T> {
    /// Creates an empty cache.
    ///
    /// `empty` is the payload of uncovered time; `combine` folds a new
    /// payload into the one already occupying a segment.
    pub fn new(empty: T, combine: impl Fn(&T, &T) -> T + 'static) -> Self {
        Self {
            points: Vec::new(),
            intervals: vec![empty.clone()],
            empty,
            combine: Box::new(combine),
        }
    }

    /// Payload of time outside every inserted range.
    #[inline]
    pub fn empty_interval(&self) -> &T {
        &self.empty
    }

    /// Boundary points, ascending.
    #[inline]
    pub fn points(&self) -> &[i64] {
        &self.points
    }

    /// Number of segments, including the two unbounded ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether nothing has been inserted (or everything coalesced back to empty).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Resets to a single empty segment.
    pub fn clear(&mut self) {
        self.points.clear();
        self.intervals.clear();
        self.intervals.push(self.empty.clone());
    }

    /// Payload of the segment containing `time_ms`.
    pub fn interval_of(&self, time_ms: i64) -> &T {
        &self.intervals[self.index_of(time_ms)]
    }

    /// Bounds of the segment containing `time_ms` (`None` = unbounded).
    pub fn bounds_of(&self, time_ms: i64) -> (Option<i64>, Option<i64>) {
        let idx = self.index_of(time_ms);
        let start = idx.checked_sub(1).map(|i| self.points[i]);
        (start, self.points.get(idx).copied())
    }

    /// Segments covering `[start_ms, end_ms)`, clipped to that range.
    ///
    /// The returned windows tile the range exactly: ascending, adjacent,
    /// no gaps. An empty or inverted range yields nothing.
    pub fn segments(&self, start_ms: i64, end_ms: i64) -> Vec<(TimeWindow, &T)> {
        let mut out = Vec::new();
        if start_ms >= end_ms {
            return out;
        }
        let mut idx = self.index_of(start_ms);
        let mut cursor = start_ms;
        loop {
            let seg_end = self.points.get(idx).map_or(end_ms, |&p| p.min(end_ms));
            out.push((TimeWindow::new(cursor, seg_end), &self.intervals[idx]));
            if seg_end >= end_ms {
                break;
            }
            cursor = seg_end;
            idx += 1;
        }
        out
    }

    /// Inserts `[start_ms, end_ms)`, replacing each covered payload `p` with `merge(p)`.
    ///
    /// Parts of the range that were uncovered start from the empty payload.
    ///
    /// # Errors
    /// `CalendarError::InvalidInterval` if `start_ms >= end_ms`.
    pub fn add_interval(
        &mut self,
        start_ms: i64,
        end_ms: i64,
        mut merge: impl FnMut(&T) -> T,
    ) -> Result<()> {
        let (first, last) = self.split_range(start_ms, end_ms)?;
        for payload in &mut self.intervals[first..=last] {
            *payload = merge(payload);
        }
        self.coalesce(first - 1, last + 1);
        Ok(())
    }

    /// Inserts `[start_ms, end_ms)`, folding `payload` in with the combine function.
    ///
    /// # Errors
    /// `CalendarError::InvalidInterval` if `start_ms >= end_ms`.
    pub fn combine_into(&mut self, start_ms: i64, end_ms: i64, payload: &T) -> Result<()> {
        let (first, last) = self.split_range(start_ms, end_ms)?;
        let combine = &self.combine;
        for existing in &mut self.intervals[first..=last] {
            *existing = combine(existing, payload);
        }
        self.coalesce(first - 1, last + 1);
        Ok(())
    }

    /// Folds the segments of `other` within `[start_ms, end_ms)` into this cache.
    ///
    /// # Errors
    /// `CalendarError::InvalidInterval` if `start_ms > end_ms`.
    pub fn include_range_from(
        &mut self,
        other: &IntervalCache<T>,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<()> {
        if start_ms > end_ms {
            return Err(CalendarError::InvalidInterval { start_ms, end_ms });
        }
        for (window, payload) in other.segments(start_ms, end_ms) {
            self.combine_into(window.start_ms, window.end_ms, payload)?;
        }
        Ok(())
    }

    fn index_of(&self, time_ms: i64) -> usize {
        self.points.partition_point(|&p| p <= time_ms)
    }

    /// Ensures `time_ms` is a boundary; returns its index in `points`.
    fn split_at(&mut self, time_ms: i64) -> usize {
        match self.points.binary_search(&time_ms) {
            Ok(i) => i,
            Err(i) => {
                self.points.insert(i, time_ms);
                let payload = self.intervals[i].clone();
                self.intervals.insert(i, payload);
                i
            }
        }
    }

    /// Splits at both ends; returns the inclusive range of segment indices inside.
    fn split_range(&mut self, start_ms: i64, end_ms: i64) -> Result<(usize, usize)> {
        if start_ms >= end_ms {
            return Err(CalendarError::InvalidInterval { start_ms, end_ms });
        }
        let s = self.split_at(start_ms);
        let e = self.split_at(end_ms);
        Ok((s + 1, e))
    }

    /// Removes boundaries between equal neighbours among segments `lo..=hi`.
    fn coalesce(&mut self, lo: usize, hi: usize) {
        let hi = hi.min(self.intervals.len() - 1);
        let mut i = hi;
        while i > lo {
            if self.intervals[i] == self.intervals[i - 1] {
                self.points.remove(i - 1);
                self.intervals.remove(i);
            }
            i -= 1;
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for IntervalCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalCache")
            .field("points", &self.points)
            .field("intervals", &self.intervals)
            .field("empty", &self.empty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_cache() -> IntervalCache<Vec<u32>> {
        IntervalCache::new(Vec::new(), |a: &Vec<u32>, b: &Vec<u32>| {
            let mut out = a.clone();
            for x in b {
                if !out.contains(x) {
                    out.push(*x);
                }
            }
            out
        })
    }

    fn assert_invariants(cache: &IntervalCache<Vec<u32>>) {
        assert_eq!(cache.intervals.len(), cache.points.len() + 1);
        assert!(cache.points.windows(2).all(|w| w[0] < w[1]));
        assert!(cache.intervals.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_empty_cache_returns_empty_payload() {
        let cache = set_cache();
        assert!(cache.is_empty());
        assert!(cache.interval_of(i64::MIN).is_empty());
        assert!(cache.interval_of(42).is_empty());
        assert_eq!(cache.bounds_of(42), (None, None));
    }

    #[test]
    fn test_single_insert() {
        let mut cache = set_cache();
        cache.combine_into(100, 200, &vec![1]).unwrap();
        assert_eq!(cache.points(), &[100, 200]);
        assert_eq!(cache.interval_of(100), &vec![1]);
        assert_eq!(cache.interval_of(199), &vec![1]);
        assert!(cache.interval_of(200).is_empty()); // exclusive end
        assert!(cache.interval_of(99).is_empty());
        assert_eq!(cache.bounds_of(150), (Some(100), Some(200)));
        assert_invariants(&cache);
    }

    #[test]
    fn test_overlapping_inserts_split() {
        let mut cache = set_cache();
        cache.combine_into(0, 100, &vec![1]).unwrap();
        cache.combine_into(50, 150, &vec![2]).unwrap();
        assert_eq!(cache.points(), &[0, 50, 100, 150]);
        assert_eq!(cache.interval_of(25), &vec![1]);
        assert_eq!(cache.interval_of(75), &vec![1, 2]);
        assert_eq!(cache.interval_of(125), &vec![2]);
        assert_invariants(&cache);
    }

    #[test]
    fn test_adjacent_equal_payloads_coalesce() {
        let mut cache = set_cache();
        cache.combine_into(0, 100, &vec![1]).unwrap();
        cache.combine_into(100, 200, &vec![1]).unwrap();
        assert_eq!(cache.points(), &[0, 200]);
        assert_invariants(&cache);
    }

    #[test]
    fn test_repeated_insert_is_stable() {
        let mut cache = set_cache();
        cache.combine_into(0, 100, &vec![1]).unwrap();
        cache.combine_into(0, 100, &vec![1]).unwrap();
        assert_eq!(cache.points(), &[0, 100]);
        assert_eq!(cache.interval_of(50), &vec![1]);
    }

    #[test]
    fn test_inverted_interval_rejected() {
        let mut cache = set_cache();
        let err = cache.combine_into(10, 5, &vec![1]).unwrap_err();
        assert_eq!(err, CalendarError::InvalidInterval { start_ms: 10, end_ms: 5 });
        assert!(cache.add_interval(7, 7, |p| p.clone()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_add_interval_with_custom_merge() {
        let mut cache = set_cache();
        cache.combine_into(0, 10, &vec![1]).unwrap();
        cache
            .add_interval(5, 20, |p| {
                let mut out = p.clone();
                out.push(9);
                out
            })
            .unwrap();
        assert_eq!(cache.interval_of(7), &vec![1, 9]);
        assert_eq!(cache.interval_of(15), &vec![9]); // seeded from empty
        assert_invariants(&cache);
    }

    #[test]
    fn test_segments_tile_range() {
        let mut cache = set_cache();
        cache.combine_into(10, 20, &vec![1]).unwrap();
        cache.combine_into(30, 40, &vec![2]).unwrap();

        let segs = cache.segments(0, 35);
        let windows: Vec<TimeWindow> = segs.iter().map(|(w, _)| *w).collect();
        assert_eq!(
            windows,
            vec![
                TimeWindow::new(0, 10),
                TimeWindow::new(10, 20),
                TimeWindow::new(20, 30),
                TimeWindow::new(30, 35),
            ]
        );
        assert_eq!(segs[1].1, &vec![1]);
        assert_eq!(segs[3].1, &vec![2]);
        assert!(cache.segments(5, 5).is_empty());
    }

    #[test]
    fn test_include_range_from() {
        let mut parent = set_cache();
        parent.combine_into(0, 100, &vec![1]).unwrap();

        let mut child = set_cache();
        child.combine_into(40, 60, &vec![2]).unwrap();
        child.include_range_from(&parent, 50, 150).unwrap();

        assert_eq!(child.interval_of(45), &vec![2]); // outside imported range
        assert_eq!(child.interval_of(55), &vec![2, 1]);
        assert_eq!(child.interval_of(80), &vec![1]);
        assert!(child.interval_of(120).is_empty());
        assert_invariants(&child);
    }

    #[test]
    fn test_clear() {
        let mut cache = set_cache();
        cache.combine_into(0, 10, &vec![1]).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 1);
        assert!(cache.interval_of(5).is_empty());
    }
}
