//! Time zone conversion and the millisecond time axis.
//!
//! Definitions are written in UTC wall-clock time. A calendar with an
//! effective zone shows every boundary on that zone's wall clock.
//!
//! # Time Model
//! The cache axis is `i64` milliseconds of wall-clock time, obtained by
//! reading a `NaiveDateTime` as if it were UTC.
//!
//! A zone is either a fixed offset in minutes or an IANA name such as
//! `Europe/Berlin`. Named zones resolve their offset per instant, so
//! boundaries on either side of a DST change shift by different amounts.
//! Local times skipped by a DST gap resolve the way RFC 5545 "compatible"
//! resolution does (the later offset); repeated times take the earlier one.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Timelike};
use jiff::{civil, tz, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

const MAX_OFFSET_MINUTES: u32 = 24 * 60;

/// How a zone was specified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ZoneSpec {
    Offset(i32),
    Named(String),
}

/// Serialized form: a number of minutes east of UTC, or an IANA name.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ZoneRepr {
    Offset(i32),
    Named(String),
}

/// A project time zone.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_calendar::models::TimeZone;
///
/// let tz = TimeZone::from_offset_minutes(120).unwrap();
/// let utc = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// assert_eq!(tz.to_time_zone(utc).to_string(), "2024-01-01 11:00:00");
///
/// let berlin = TimeZone::named("Europe/Berlin").unwrap();
/// let summer = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// assert_eq!(berlin.to_time_zone(summer).to_string(), "2024-07-01 11:00:00");
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "ZoneRepr", into = "ZoneRepr")]
pub struct TimeZone {
    kind: ZoneSpec,
    tz: tz::TimeZone,
}

impl TimeZone {
    /// UTC (zero offset).
    pub fn utc() -> Self {
        Self {
            kind: ZoneSpec::Offset(0),
            tz: tz::TimeZone::UTC,
        }
    }

    /// Creates a zone `minutes` east of UTC.
    ///
    /// Returns `None` when the offset is a full day or more.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        if minutes.unsigned_abs() >= MAX_OFFSET_MINUTES {
            return None;
        }
        let offset = tz::Offset::from_seconds(minutes * 60).ok()?;
        Some(Self {
            kind: ZoneSpec::Offset(minutes),
            tz: tz::TimeZone::fixed(offset),
        })
    }

    /// Looks up an IANA zone by name.
    ///
    /// # Errors
    /// `CalendarError::Configuration` if the name is unknown.
    pub fn named(name: &str) -> Result<Self> {
        let tz = tz::TimeZone::get(name).map_err(|e| {
            CalendarError::Configuration(format!("unknown time zone '{name}': {e}"))
        })?;
        Ok(Self {
            kind: ZoneSpec::Named(name.to_string()),
            tz,
        })
    }

    /// The IANA name, for named zones.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ZoneSpec::Named(name) => Some(name),
            ZoneSpec::Offset(_) => None,
        }
    }

    /// The constant offset east of UTC in minutes, for fixed-offset zones.
    pub fn fixed_offset_minutes(&self) -> Option<i32> {
        match self.kind {
            ZoneSpec::Offset(minutes) => Some(minutes),
            ZoneSpec::Named(_) => None,
        }
    }

    /// Offset east of UTC in minutes in effect at the UTC wall-clock instant `utc`.
    pub fn offset_minutes_at(&self, utc: NaiveDateTime) -> i32 {
        self.offset_seconds_at(utc) / 60
    }

    /// Converts a UTC wall-clock datetime to this zone's wall clock.
    pub fn to_time_zone(&self, utc: NaiveDateTime) -> NaiveDateTime {
        let offset = Duration::seconds(i64::from(self.offset_seconds_at(utc)));
        saturating_add(utc, offset)
    }

    /// Converts a wall-clock datetime in this zone back to UTC.
    pub fn from_time_zone(&self, local: NaiveDateTime) -> NaiveDateTime {
        let resolved = civil_datetime(local)
            .and_then(|dt| self.tz.to_ambiguous_timestamp(dt).compatible().ok());
        match resolved {
            Some(ts) => from_millis(ts.as_millisecond()),
            // Outside the zone database's range: use the offset at its edge.
            None => {
                let offset = Duration::seconds(i64::from(self.offset_seconds_at(local)));
                saturating_add(local, -offset)
            }
        }
    }

    fn offset_seconds_at(&self, utc: NaiveDateTime) -> i32 {
        let ms = to_millis(utc);
        let ts = Timestamp::from_millisecond(ms).unwrap_or(if ms < 0 {
            Timestamp::MIN
        } else {
            Timestamp::MAX
        });
        self.tz.to_offset(ts).seconds()
    }
}

impl fmt::Debug for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ZoneSpec::Offset(minutes) => write!(f, "TimeZone({minutes:+} min)"),
            ZoneSpec::Named(name) => write!(f, "TimeZone({name})"),
        }
    }
}

impl PartialEq for TimeZone {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for TimeZone {}

impl Hash for TimeZone {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl TryFrom<ZoneRepr> for TimeZone {
    type Error = String;

    fn try_from(repr: ZoneRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ZoneRepr::Offset(minutes) => Self::from_offset_minutes(minutes)
                .ok_or_else(|| format!("time zone offset out of range: {minutes} minutes")),
            ZoneRepr::Named(name) => Self::named(&name).map_err(|e| e.to_string()),
        }
    }
}

impl From<TimeZone> for ZoneRepr {
    fn from(zone: TimeZone) -> Self {
        match zone.kind {
            ZoneSpec::Offset(minutes) => ZoneRepr::Offset(minutes),
            ZoneSpec::Named(name) => ZoneRepr::Named(name),
        }
    }
}

fn civil_datetime(dt: NaiveDateTime) -> Option<civil::DateTime> {
    let narrow = |v: u32| i8::try_from(v).ok();
    civil::DateTime::new(
        i16::try_from(dt.year()).ok()?,
        narrow(dt.month())?,
        narrow(dt.day())?,
        narrow(dt.hour())?,
        narrow(dt.minute())?,
        narrow(dt.second())?,
        // leap-second nanos fold into the last representable one
        i32::try_from(dt.nanosecond().min(999_999_999)).ok()?,
    )
    .ok()
}

/// Converts an optional zone applied to a datetime (identity for `None`).
pub(crate) fn convert(zone: Option<&TimeZone>, utc: NaiveDateTime) -> NaiveDateTime {
    match zone {
        Some(tz) => tz.to_time_zone(utc),
        None => utc,
    }
}

/// `dt + delta`, clamped to chrono's representable range.
pub fn saturating_add(dt: NaiveDateTime, delta: Duration) -> NaiveDateTime {
    dt.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
        NaiveDateTime::MIN
    } else {
        NaiveDateTime::MAX
    })
}

/// Wall-clock datetime to cache-axis milliseconds.
#[inline]
pub fn to_millis(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Cache-axis milliseconds to wall-clock datetime, clamped to chrono's range.
pub fn from_millis(ms: i64) -> NaiveDateTime {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.naive_utc(),
        None if ms < 0 => NaiveDateTime::MIN,
        None => NaiveDateTime::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn on(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_offset_bounds() {
        assert!(TimeZone::from_offset_minutes(330).is_some());
        assert!(TimeZone::from_offset_minutes(-720).is_some());
        assert!(TimeZone::from_offset_minutes(24 * 60).is_none());
        assert!(TimeZone::from_offset_minutes(i32::MIN).is_none());
        assert!(TimeZone::from_offset_minutes(i32::MAX).is_none());
        assert_eq!(TimeZone::utc().fixed_offset_minutes(), Some(0));
    }

    #[test]
    fn test_round_trip_conversion() {
        let tz = TimeZone::from_offset_minutes(-300).unwrap();
        let local = tz.to_time_zone(dt(3, 0));
        assert_eq!(local, dt(3, 0) - chrono::Duration::hours(5));
        assert_eq!(tz.from_time_zone(local), dt(3, 0));
    }

    #[test]
    fn test_named_zone_follows_dst() {
        // Berlin switches from +01:00 to +02:00 at 2024-03-31 01:00 UTC.
        let berlin = TimeZone::named("Europe/Berlin").unwrap();
        assert_eq!(berlin.name(), Some("Europe/Berlin"));
        assert_eq!(berlin.fixed_offset_minutes(), None);

        assert_eq!(berlin.offset_minutes_at(on(2024, 3, 31, 0)), 60);
        assert_eq!(berlin.offset_minutes_at(on(2024, 3, 31, 1)), 120);
        assert_eq!(berlin.to_time_zone(on(2024, 3, 30, 8)), on(2024, 3, 30, 9));
        assert_eq!(berlin.to_time_zone(on(2024, 4, 1, 8)), on(2024, 4, 1, 10));

        assert_eq!(berlin.from_time_zone(on(2024, 3, 30, 9)), on(2024, 3, 30, 8));
        assert_eq!(berlin.from_time_zone(on(2024, 4, 1, 10)), on(2024, 4, 1, 8));
    }

    #[test]
    fn test_unknown_zone_name() {
        let err = TimeZone::named("Mars/Olympus_Mons").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_conversion_at_range_edges() {
        let berlin = TimeZone::named("Europe/Berlin").unwrap();
        assert_eq!(berlin.to_time_zone(NaiveDateTime::MAX), NaiveDateTime::MAX);
        assert_eq!(berlin.from_time_zone(NaiveDateTime::MIN), NaiveDateTime::MIN);
        let fixed = TimeZone::from_offset_minutes(-60).unwrap();
        assert_eq!(fixed.to_time_zone(NaiveDateTime::MIN), NaiveDateTime::MIN);
    }

    #[test]
    fn test_convert_none_is_identity() {
        assert_eq!(convert(None, dt(8, 15)), dt(8, 15));
    }

    #[test]
    fn test_saturating_add() {
        assert_eq!(saturating_add(dt(8, 0), Duration::hours(1)), dt(9, 0));
        assert_eq!(saturating_add(dt(8, 0), Duration::MAX), NaiveDateTime::MAX);
        assert_eq!(saturating_add(dt(8, 0), Duration::MIN), NaiveDateTime::MIN);
    }

    #[test]
    fn test_millis() {
        let t = dt(12, 30);
        assert_eq!(from_millis(to_millis(t)), t);
        assert_eq!(from_millis(i64::MAX), NaiveDateTime::MAX);
        assert_eq!(from_millis(i64::MIN), NaiveDateTime::MIN);
    }

    #[test]
    fn test_serde_offset() {
        let tz: TimeZone = serde_json::from_str("60").unwrap();
        assert_eq!(tz.fixed_offset_minutes(), Some(60));
        assert!(serde_json::from_str::<TimeZone>("5000").is_err());
        assert!(serde_json::from_str::<TimeZone>("-2147483648").is_err());
        assert_eq!(serde_json::to_string(&tz).unwrap(), "60");
    }

    #[test]
    fn test_serde_named() {
        let tz: TimeZone = serde_json::from_str("\"Europe/Berlin\"").unwrap();
        assert_eq!(tz, TimeZone::named("Europe/Berlin").unwrap());
        assert_eq!(serde_json::to_string(&tz).unwrap(), "\"Europe/Berlin\"");
        assert!(serde_json::from_str::<TimeZone>("\"Nowhere/Else\"").is_err());
    }
}
