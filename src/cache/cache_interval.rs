//! Payload stored per cached segment: the calendar intervals active there.

use std::sync::Arc;

use crate::models::CalendarInterval;

/// A calendar interval together with the nesting depth of its calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The interval definition.
    pub interval: Arc<CalendarInterval>,
    /// Depth of the owning calendar (0 = root).
    pub depth: u32,
}

impl CacheEntry {
    /// Effective priority of this entry.
    #[inline]
    pub fn priority(&self) -> i64 {
        self.interval.effective_priority(self.depth)
    }
}

/// All calendar intervals active during one cached segment, in insertion order.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDate;
/// use u_calendar::cache::CacheInterval;
/// use u_calendar::models::CalendarInterval;
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let holiday = CalendarInterval::fixed(
///     "holiday",
///     day.and_hms_opt(0, 0, 0).unwrap(),
///     day.and_hms_opt(23, 0, 0).unwrap(),
/// );
/// let unspecified = CalendarInterval::unspecified("cal", true);
///
/// let merged = CacheInterval::single(Arc::new(unspecified), 0)
///     .combine_with(&CacheInterval::single(Arc::new(holiday), 0));
/// assert_eq!(merged.len(), 2);
/// assert!(!merged.is_working()); // the static holiday outranks unspecified time
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheInterval {
    entries: Vec<CacheEntry>,
}

impl CacheInterval {
    /// A payload with one interval.
    pub fn single(interval: Arc<CalendarInterval>, depth: u32) -> Self {
        Self {
            entries: vec![CacheEntry { interval, depth }],
        }
    }

    /// Entries in insertion order.
    #[inline]
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// Interval definitions in insertion order.
    pub fn intervals(&self) -> impl Iterator<Item = &CalendarInterval> {
        self.entries.iter().map(|e| e.interval.as_ref())
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no interval is active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the entries of `other` not already present.
    pub fn combine_with(&self, other: &CacheInterval) -> CacheInterval {
        let mut entries = self.entries.clone();
        for entry in &other.entries {
            if !entries.contains(entry) {
                entries.push(entry.clone());
            }
        }
        CacheInterval { entries }
    }

    /// The entry deciding this segment: highest priority, later entry on ties.
    pub fn winner(&self) -> Option<&CacheEntry> {
        self.entries.iter().max_by_key(|e| e.priority())
    }

    /// Whether the segment is working time (`false` when nothing is active).
    pub fn is_working(&self) -> bool {
        self.winner().is_some_and(|e| e.interval.is_working)
    }
}
