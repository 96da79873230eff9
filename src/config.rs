//! Cache and project configuration.
//!
//! Both structs are plain values: build them once, pass them to
//! [`CalendarCache`](crate::cache::CalendarCache), and they stay fixed for
//! the lifetime of the cache.

use serde::{Deserialize, Serialize};

use crate::models::TimeZone;

/// What to do when recurrence start and end occurrences do not pair up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Drop the unmatched occurrences and log a warning.
    #[default]
    Lenient,
    /// Fail the fill with `CalendarError::DataInconsistency`.
    Strict,
}

/// Cache behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Handling of mismatched recurrence occurrences.
    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,

    /// Size of each on-demand fill made by availability searches (days).
    #[serde(default = "default_fill_chunk_days")]
    pub fill_chunk_days: u32,
}

fn default_fill_chunk_days() -> u32 {
    7
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mismatch_policy: MismatchPolicy::default(),
            fill_chunk_days: default_fill_chunk_days(),
        }
    }
}

impl CacheConfig {
    /// Sets the mismatch policy.
    pub fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.mismatch_policy = policy;
        self
    }

    /// Sets the fill chunk size (at least one day).
    pub fn with_fill_chunk_days(mut self, days: u32) -> Self {
        self.fill_chunk_days = days.max(1);
        self
    }

    /// Fill chunk as a duration.
    pub fn fill_chunk(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.fill_chunk_days.max(1)))
    }
}

/// Project-wide settings a calendar reads but does not own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Project time zone (minutes east of UTC or an IANA name); `None` keeps
    /// the UTC wall clock.
    #[serde(default)]
    pub time_zone: Option<TimeZone>,
}

impl ProjectSettings {
    /// Settings with the given zone.
    pub fn with_time_zone(time_zone: TimeZone) -> Self {
        Self {
            time_zone: Some(time_zone),
        }
    }
}
