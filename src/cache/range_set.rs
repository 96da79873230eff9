//! Normalized set of filled ranges.

use crate::models::TimeWindow;

/// Sorted, disjoint, non-touching windows.
///
/// Touching or overlapping insertions are merged, so the set stays minimal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<TimeWindow>,
}

impl RangeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored windows, ascending.
    #[inline]
    pub fn ranges(&self) -> &[TimeWindow] {
        &self.ranges
    }

    /// Whether nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Adds a window. Empty windows are ignored.
    pub fn insert(&mut self, window: TimeWindow) {
        if window.is_empty() {
            return;
        }
        self.ranges.push(window);
        self.normalize();
    }

    /// Whether `window` is fully covered.
    pub fn covers(&self, window: TimeWindow) -> bool {
        window.is_empty() || self.gaps(window).is_empty()
    }

    /// Parts of `window` not covered by the set, ascending.
    pub fn gaps(&self, window: TimeWindow) -> Vec<TimeWindow> {
        let mut out = Vec::new();
        if window.is_empty() {
            return out;
        }
        let mut cursor = window.start_ms;
        for r in &self.ranges {
            if r.end_ms <= cursor {
                continue;
            }
            if r.start_ms >= window.end_ms {
                break;
            }
            if r.start_ms > cursor {
                out.push(TimeWindow::new(cursor, r.start_ms));
            }
            cursor = cursor.max(r.end_ms);
            if cursor >= window.end_ms {
                return out;
            }
        }
        if cursor < window.end_ms {
            out.push(TimeWindow::new(cursor, window.end_ms));
        }
        out
    }

    fn normalize(&mut self) {
        self.ranges.sort_by_key(|r| r.start_ms);
        let mut merged: Vec<TimeWindow> = Vec::with_capacity(self.ranges.len());
        for r in self.ranges.drain(..) {
            match merged.last_mut() {
                // touching ranges merge too
                Some(last) if r.start_ms <= last.end_ms => last.end_ms = last.end_ms.max(r.end_ms),
                _ => merged.push(r),
            }
        }
        self.ranges = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(a: i64, b: i64) -> TimeWindow {
        TimeWindow::new(a, b)
    }

    #[test]
    fn test_insert_merges() {
        let mut set = RangeSet::new();
        set.insert(w(10, 20));
        set.insert(w(30, 40));
        set.insert(w(20, 30)); // bridges both
        assert_eq!(set.ranges(), &[w(10, 40)]);

        set.insert(w(5, 5));
        assert_eq!(set.ranges(), &[w(10, 40)]);
    }

    #[test]
    fn test_gaps() {
        let mut set = RangeSet::new();
        set.insert(w(10, 20));
        set.insert(w(30, 40));
        assert_eq!(set.gaps(w(0, 50)), vec![w(0, 10), w(20, 30), w(40, 50)]);
        assert_eq!(set.gaps(w(12, 18)), vec![]);
        assert_eq!(set.gaps(w(15, 35)), vec![w(20, 30)]);
        assert!(set.covers(w(31, 39)));
        assert!(!set.covers(w(19, 21)));
    }

    #[test]
    fn test_gaps_of_empty_set() {
        let set = RangeSet::new();
        assert_eq!(set.gaps(w(1, 2)), vec![w(1, 2)]);
        assert!(set.gaps(w(2, 1)).is_empty());
    }
}
