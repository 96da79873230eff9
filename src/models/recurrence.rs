//! Recurrence rules for repeating calendar intervals.
//!
//! A small subset of RFC 5545 `RRULE`: enough to describe working hours,
//! weekly shifts, monthly maintenance and yearly holidays.
//!
//! # Supported Parts
//!
//! | Part | Meaning | Default |
//! |------|---------|---------|
//! | `FREQ` | `DAILY`, `WEEKLY`, `MONTHLY`, `YEARLY` | required |
//! | `INTERVAL` | every n-th period | 1 |
//! | `BYDAY` | weekdays (`MO`..`SU`) | weekly: anchor weekday |
//! | `BYMONTHDAY` | day of month, negative counts from month end | monthly/yearly: anchor day |
//! | `BYMONTH` | months 1..=12 | yearly: anchor month |
//! | `BYHOUR` / `BYMINUTE` | time of day | anchor time |
//! | `DTSTART` | anchor and lower bound | none |
//! | `UNTIL` | inclusive upper bound | none |
//!
//! Without `DTSTART` the anchor is Monday 1970-01-05 at midnight.
//!
//! # Reference
//! RFC 5545, "Internet Calendaring and Scheduling Core Object Specification", §3.3.10

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// Maximum number of days a `next`/`prev` search walks before giving up.
///
/// Eight years covers every leap-day rule.
const SCAN_HORIZON_DAYS: i64 = 366 * 8;

/// Recurrence frequency (the period `INTERVAL` counts in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every ISO week (Monday-based).
    Weekly,
    /// Every calendar month.
    Monthly,
    /// Every calendar year.
    Yearly,
}

impl Frequency {
    fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

/// A parsed recurrence rule.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_calendar::models::RecurrenceRule;
///
/// let rule: RecurrenceRule = "FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=9".parse().unwrap();
/// let from = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let next = rule.next_at_or_after(from).unwrap();
/// assert_eq!(next.to_string(), "2024-01-03 09:00:00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecurrenceRule {
    freq: Frequency,
    interval: u32,
    by_day: Vec<Weekday>,
    by_month_day: Vec<i8>,
    by_month: Vec<u32>,
    by_hour: Vec<u32>,
    by_minute: Vec<u32>,
    dtstart: Option<NaiveDateTime>,
    until: Option<NaiveDateTime>,
}

impl RecurrenceRule {
    /// Creates a rule firing every period at the anchor time.
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            by_hour: Vec::new(),
            by_minute: Vec::new(),
            dtstart: None,
            until: None,
        }
    }

    /// Daily rule at a fixed time of day.
    ///
    /// Further times added with [`with_time`](Self::with_time) combine
    /// with this one as described there.
    pub fn daily_at(hour: u32, minute: u32) -> Self {
        Self::new(Frequency::Daily).with_time(hour, minute)
    }

    /// Sets `INTERVAL` (values below 1 are raised to 1).
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Adds `hour` to `BYHOUR` and `minute` to `BYMINUTE`.
    ///
    /// As in RFC 5545, the rule fires at every combination of its hours
    /// and minutes: `daily_at(8, 30).with_time(9, 0)` fires at 08:00,
    /// 08:30, 09:00 and 09:30. Use separate rules for unrelated times.
    pub fn with_time(mut self, hour: u32, minute: u32) -> Self {
        push_sorted(&mut self.by_hour, hour.min(23));
        push_sorted(&mut self.by_minute, minute.min(59));
        self
    }

    /// Restricts the rule to the given weekdays.
    pub fn with_weekdays(mut self, days: &[Weekday]) -> Self {
        for &d in days {
            if !self.by_day.contains(&d) {
                self.by_day.push(d);
            }
        }
        self.by_day.sort_by_key(|d| d.num_days_from_monday());
        self
    }

    /// Restricts the rule to the given days of month.
    pub fn with_month_days(mut self, days: &[i8]) -> Self {
        for &d in days {
            if d != 0 && d.abs() <= 31 {
                push_sorted(&mut self.by_month_day, d);
            }
        }
        self
    }

    /// Restricts the rule to the given months (1..=12).
    pub fn with_months(mut self, months: &[u32]) -> Self {
        for &m in months {
            if (1..=12).contains(&m) {
                push_sorted(&mut self.by_month, m);
            }
        }
        self
    }

    /// Sets the anchor (`DTSTART`).
    pub fn with_start(mut self, dtstart: NaiveDateTime) -> Self {
        self.dtstart = Some(dtstart);
        self
    }

    /// Sets the inclusive upper bound (`UNTIL`).
    pub fn with_until(mut self, until: NaiveDateTime) -> Self {
        self.until = Some(until);
        self
    }

    /// Rule frequency.
    #[inline]
    pub fn frequency(&self) -> Frequency {
        self.freq
    }

    /// Whether `dt` is an occurrence of this rule.
    pub fn occurs_at(&self, dt: NaiveDateTime) -> bool {
        self.matches_day(dt.date())
            && self.times_of_day().contains(&dt.time())
            && self.within_bounds(dt)
    }

    /// First occurrence at or after `from`.
    ///
    /// Returns `None` if the rule does not fire within the scan horizon.
    pub fn next_at_or_after(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        let times = self.times_of_day();
        let mut date = from.date();
        if let Some(start) = self.dtstart {
            date = date.max(start.date());
        }
        let last = date
            .checked_add_signed(Duration::days(SCAN_HORIZON_DAYS))
            .unwrap_or(NaiveDate::MAX);

        while date <= last {
            if self.until.is_some_and(|u| date > u.date()) {
                return None;
            }
            if self.matches_day(date) {
                let hit = times
                    .iter()
                    .map(|&t| date.and_time(t))
                    .find(|&dt| dt >= from && self.within_bounds(dt));
                if hit.is_some() {
                    return hit;
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// Last occurrence at or before `from`.
    ///
    /// Returns `None` if the rule does not fire within the scan horizon.
    pub fn prev_at_or_before(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        let times = self.times_of_day();
        let mut date = from.date();
        if let Some(until) = self.until {
            date = date.min(until.date());
        }
        let first = date
            .checked_sub_signed(Duration::days(SCAN_HORIZON_DAYS))
            .unwrap_or(NaiveDate::MIN);

        while date >= first {
            if self.dtstart.is_some_and(|s| date < s.date()) {
                return None;
            }
            if self.matches_day(date) {
                let hit = times
                    .iter()
                    .rev()
                    .map(|&t| date.and_time(t))
                    .find(|&dt| dt <= from && self.within_bounds(dt));
                if hit.is_some() {
                    return hit;
                }
            }
            date = date.pred_opt()?;
        }
        None
    }

    /// All occurrences in `[start, end]` (both inclusive), ascending.
    pub fn occurrences_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<NaiveDateTime> {
        let mut out = Vec::new();
        if start > end {
            return out;
        }
        let times = self.times_of_day();
        let mut date = start.date();
        if let Some(s) = self.dtstart {
            date = date.max(s.date());
        }
        let mut last = end.date();
        if let Some(u) = self.until {
            last = last.min(u.date());
        }

        while date <= last {
            if self.matches_day(date) {
                out.extend(
                    times
                        .iter()
                        .map(|&t| date.and_time(t))
                        .filter(|&dt| dt >= start && dt <= end && self.within_bounds(dt)),
                );
            }
            match date.succ_opt() {
                Some(d) => date = d,
                None => break,
            }
        }
        out
    }

    fn within_bounds(&self, dt: NaiveDateTime) -> bool {
        self.dtstart.map_or(true, |s| dt >= s) && self.until.map_or(true, |u| dt <= u)
    }

    fn anchor(&self) -> NaiveDateTime {
        self.dtstart.unwrap_or_else(default_anchor)
    }

    /// Sorted times of day the rule fires on a matching day.
    fn times_of_day(&self) -> Vec<NaiveTime> {
        let anchor = self.anchor();
        let hours = if self.by_hour.is_empty() {
            vec![anchor.hour()]
        } else {
            self.by_hour.clone()
        };
        let minutes = if self.by_minute.is_empty() {
            vec![anchor.minute()]
        } else {
            self.by_minute.clone()
        };

        let mut times: Vec<NaiveTime> = hours
            .iter()
            .flat_map(|&h| minutes.iter().filter_map(move |&m| NaiveTime::from_hms_opt(h, m, 0)))
            .collect();
        times.sort();
        times.dedup();
        times
    }

    fn matches_day(&self, date: NaiveDate) -> bool {
        let anchor = self.anchor().date();

        if !self.by_month.is_empty() && !self.by_month.contains(&date.month()) {
            return false;
        }
        if !self.by_month_day.is_empty() && !month_day_matches(&self.by_month_day, date) {
            return false;
        }
        if !self.by_day.is_empty() && !self.by_day.contains(&date.weekday()) {
            return false;
        }

        // Implied parts: a rule without BY* parts repeats the anchor's position.
        let implied = match self.freq {
            Frequency::Daily => true,
            Frequency::Weekly => !self.by_day.is_empty() || date.weekday() == anchor.weekday(),
            Frequency::Monthly => {
                !self.by_day.is_empty()
                    || !self.by_month_day.is_empty()
                    || date.day() == anchor.day()
            }
            Frequency::Yearly => {
                let day_ok = !self.by_day.is_empty()
                    || !self.by_month_day.is_empty()
                    || date.day() == anchor.day();
                let month_ok = !self.by_month.is_empty()
                    || !self.by_day.is_empty()
                    || !self.by_month_day.is_empty()
                    || date.month() == anchor.month();
                day_ok && month_ok
            }
        };
        if !implied {
            return false;
        }

        self.period_index(anchor, date).rem_euclid(i64::from(self.interval)) == 0
    }

    /// Number of whole periods between the anchor and `date`.
    fn period_index(&self, anchor: NaiveDate, date: NaiveDate) -> i64 {
        match self.freq {
            Frequency::Daily => (date - anchor).num_days(),
            Frequency::Weekly => (week_start(date) - week_start(anchor)).num_days() / 7,
            Frequency::Monthly => month_ordinal(date) - month_ordinal(anchor),
            Frequency::Yearly => i64::from(date.year() - anchor.year()),
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        let err = |reason: String| CalendarError::InvalidRecurrence {
            rule: s.to_string(),
            reason,
        };

        let body = s.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);
        let mut freq = None;
        let mut rule = RecurrenceRule::new(Frequency::Daily);

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| err(format!("expected KEY=VALUE, got '{part}'")))?;
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(match value.trim().to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        "YEARLY" => Frequency::Yearly,
                        other => return Err(err(format!("unsupported frequency '{other}'"))),
                    })
                }
                "INTERVAL" => {
                    let n: u32 = value
                        .trim()
                        .parse()
                        .map_err(|_| err(format!("bad INTERVAL '{value}'")))?;
                    if n == 0 {
                        return Err(err("INTERVAL must be positive".into()));
                    }
                    rule.interval = n;
                }
                "BYDAY" => {
                    let days = split_list(value, |v| parse_weekday(v))
                        .ok_or_else(|| err(format!("bad BYDAY '{value}'")))?;
                    rule = rule.with_weekdays(&days);
                }
                "BYMONTHDAY" => {
                    let days = split_list(value, |v| {
                        v.parse::<i8>().ok().filter(|d| *d != 0 && d.abs() <= 31)
                    })
                    .ok_or_else(|| err(format!("bad BYMONTHDAY '{value}'")))?;
                    rule = rule.with_month_days(&days);
                }
                "BYMONTH" => {
                    let months = split_list(value, |v| {
                        v.parse::<u32>().ok().filter(|m| (1..=12).contains(m))
                    })
                    .ok_or_else(|| err(format!("bad BYMONTH '{value}'")))?;
                    rule = rule.with_months(&months);
                }
                "BYHOUR" => {
                    rule.by_hour = split_list(value, |v| v.parse::<u32>().ok().filter(|h| *h < 24))
                        .ok_or_else(|| err(format!("bad BYHOUR '{value}'")))?;
                    rule.by_hour.sort_unstable();
                    rule.by_hour.dedup();
                }
                "BYMINUTE" => {
                    rule.by_minute =
                        split_list(value, |v| v.parse::<u32>().ok().filter(|m| *m < 60))
                            .ok_or_else(|| err(format!("bad BYMINUTE '{value}'")))?;
                    rule.by_minute.sort_unstable();
                    rule.by_minute.dedup();
                }
                "DTSTART" => {
                    let dtstart = parse_datetime(value)
                        .ok_or_else(|| err(format!("bad DTSTART '{value}'")))?;
                    rule.dtstart = Some(dtstart);
                }
                "UNTIL" => {
                    let until = parse_datetime(value)
                        .ok_or_else(|| err(format!("bad UNTIL '{value}'")))?;
                    rule.until = Some(until);
                }
                other => return Err(err(format!("unsupported part '{other}'"))),
            }
        }

        rule.freq = freq.ok_or_else(|| err("missing FREQ".into()))?;
        Ok(rule)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.freq.as_str())?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if !self.by_day.is_empty() {
            let days: Vec<&str> = self.by_day.iter().map(|d| weekday_code(*d)).collect();
            write!(f, ";BYDAY={}", days.join(","))?;
        }
        write_list(f, "BYMONTHDAY", &self.by_month_day)?;
        write_list(f, "BYMONTH", &self.by_month)?;
        write_list(f, "BYHOUR", &self.by_hour)?;
        write_list(f, "BYMINUTE", &self.by_minute)?;
        if let Some(s) = self.dtstart {
            write!(f, ";DTSTART={}", s.format("%Y%m%dT%H%M%S"))?;
        }
        if let Some(u) = self.until {
            write!(f, ";UNTIL={}", u.format("%Y%m%dT%H%M%S"))?;
        }
        Ok(())
    }
}

impl TryFrom<String> for RecurrenceRule {
    type Error = CalendarError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<RecurrenceRule> for String {
    fn from(rule: RecurrenceRule) -> Self {
        rule.to_string()
    }
}

/// How the end of a recurrent interval occurrence is found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EndSchedule {
    /// Ends follow their own recurrence rule.
    Rule(RecurrenceRule),
    /// Each occurrence ends at the midnight after its start (`"EOD"`).
    EndOfDay,
}

impl EndSchedule {
    /// End of an occurrence starting at `start` under the end-of-day sentinel.
    ///
    /// Clamps to `NaiveDateTime::MAX` on the last representable day.
    pub fn end_of_day(start: NaiveDateTime) -> NaiveDateTime {
        start
            .date()
            .succ_opt()
            .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN))
    }
}

impl FromStr for EndSchedule {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("EOD") {
            Ok(EndSchedule::EndOfDay)
        } else {
            s.parse().map(EndSchedule::Rule)
        }
    }
}

impl fmt::Display for EndSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndSchedule::Rule(rule) => fmt::Display::fmt(rule, f),
            EndSchedule::EndOfDay => f.write_str("EOD"),
        }
    }
}

impl TryFrom<String> for EndSchedule {
    type Error = CalendarError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<EndSchedule> for String {
    fn from(end: EndSchedule) -> Self {
        end.to_string()
    }
}

fn default_anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 5)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(NaiveDate::MIN)
}

fn month_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

fn month_day_matches(days: &[i8], date: NaiveDate) -> bool {
    let len = days_in_month(date) as i32;
    let day = date.day() as i32;
    days.iter().any(|&d| {
        let d = i32::from(d);
        if d > 0 {
            d == day
        } else {
            len + 1 + d == day
        }
    })
}

fn parse_weekday(code: &str) -> Option<Weekday> {
    match code.to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let v = value.trim().trim_end_matches('Z');
    ["%Y%m%dT%H%M%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
        .or_else(|| {
            ["%Y%m%d", "%Y-%m-%d"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn split_list<T>(value: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    value.split(',').map(|v| parse(v.trim())).collect()
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, key: &str, values: &[T]) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
    write!(f, ";{key}={}", joined.join(","))
}

fn push_sorted<T: Ord>(values: &mut Vec<T>, value: T) {
    if let Err(pos) = values.binary_search(&value) {
        values.insert(pos, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let rule: RecurrenceRule = "FREQ=WEEKLY;BYDAY=FR,MO;BYHOUR=8;BYMINUTE=30".parse().unwrap();
        assert_eq!(rule.frequency(), Frequency::Weekly);
        assert_eq!(rule.to_string(), "FREQ=WEEKLY;BYDAY=MO,FR;BYHOUR=8;BYMINUTE=30");

        let again: RecurrenceRule = rule.to_string().parse().unwrap();
        assert_eq!(again, rule);
    }

    #[test]
    fn test_parse_errors() {
        assert!("BYHOUR=8".parse::<RecurrenceRule>().is_err()); // no FREQ
        assert!("FREQ=HOURLY".parse::<RecurrenceRule>().is_err());
        assert!("FREQ=DAILY;BYHOUR=24".parse::<RecurrenceRule>().is_err());
        assert!("FREQ=DAILY;INTERVAL=0".parse::<RecurrenceRule>().is_err());
        assert!("FREQ=DAILY;COUNT=3".parse::<RecurrenceRule>().is_err());
        assert!("FREQ=WEEKLY;BYDAY=1MO".parse::<RecurrenceRule>().is_err());
    }

    #[test]
    fn test_daily_next_and_prev() {
        let rule = RecurrenceRule::daily_at(8, 0);
        assert_eq!(rule.next_at_or_after(at(2024, 1, 1, 8, 0)), Some(at(2024, 1, 1, 8, 0)));
        assert_eq!(rule.next_at_or_after(at(2024, 1, 1, 8, 1)), Some(at(2024, 1, 2, 8, 0)));
        assert_eq!(rule.prev_at_or_before(at(2024, 1, 1, 8, 0)), Some(at(2024, 1, 1, 8, 0)));
        assert_eq!(rule.prev_at_or_before(at(2024, 1, 1, 7, 59)), Some(at(2023, 12, 31, 8, 0)));
    }

    #[test]
    fn test_occurrences_between_inclusive() {
        let rule = RecurrenceRule::daily_at(8, 0);
        let occ = rule.occurrences_between(at(2024, 1, 1, 8, 0), at(2024, 1, 3, 8, 0));
        assert_eq!(
            occ,
            vec![at(2024, 1, 1, 8, 0), at(2024, 1, 2, 8, 0), at(2024, 1, 3, 8, 0)]
        );
        assert!(rule
            .occurrences_between(at(2024, 1, 3, 0, 0), at(2024, 1, 1, 0, 0))
            .is_empty());
    }

    #[test]
    fn test_weekly_weekdays() {
        // 2024-01-06 is a Saturday.
        let rule: RecurrenceRule = "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=9".parse().unwrap();
        assert_eq!(rule.next_at_or_after(at(2024, 1, 6, 0, 0)), Some(at(2024, 1, 8, 9, 0)));
        assert!(!rule.occurs_at(at(2024, 1, 7, 9, 0)));
        assert!(rule.occurs_at(at(2024, 1, 5, 9, 0)));
    }

    #[test]
    fn test_interval_counts_from_anchor() {
        let rule = RecurrenceRule::daily_at(6, 0)
            .with_interval(2)
            .with_start(at(2024, 1, 1, 6, 0));
        assert!(rule.occurs_at(at(2024, 1, 3, 6, 0)));
        assert!(!rule.occurs_at(at(2024, 1, 2, 6, 0)));
        assert_eq!(rule.prev_at_or_before(at(2024, 1, 1, 5, 0)), None);
    }

    #[test]
    fn test_monthly_last_day() {
        let rule: RecurrenceRule = "FREQ=MONTHLY;BYMONTHDAY=-1".parse().unwrap();
        assert!(rule.occurs_at(at(2024, 2, 29, 0, 0)));
        assert!(!rule.occurs_at(at(2024, 2, 28, 0, 0)));
        assert_eq!(rule.next_at_or_after(at(2024, 3, 1, 0, 0)), Some(at(2024, 3, 31, 0, 0)));
    }

    #[test]
    fn test_yearly_implied_from_anchor() {
        let rule = RecurrenceRule::new(Frequency::Yearly).with_start(at(2020, 12, 25, 0, 0));
        assert_eq!(rule.next_at_or_after(at(2024, 1, 1, 0, 0)), Some(at(2024, 12, 25, 0, 0)));
    }

    #[test]
    fn test_until_bounds_search() {
        let rule = RecurrenceRule::daily_at(8, 0).with_until(at(2024, 1, 2, 8, 0));
        assert_eq!(rule.next_at_or_after(at(2024, 1, 2, 9, 0)), None);
        assert_eq!(rule.prev_at_or_before(at(2024, 5, 1, 0, 0)), Some(at(2024, 1, 2, 8, 0)));
    }

    #[test]
    fn test_never_firing_rule_terminates() {
        let rule: RecurrenceRule = "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30".parse().unwrap();
        assert_eq!(rule.next_at_or_after(at(2024, 1, 1, 0, 0)), None);
    }

    #[test]
    fn test_end_schedule() {
        assert_eq!("eod".parse::<EndSchedule>().unwrap(), EndSchedule::EndOfDay);
        assert_eq!(EndSchedule::end_of_day(at(2024, 1, 31, 22, 0)), at(2024, 2, 1, 0, 0));
        let end: EndSchedule = serde_json::from_str("\"FREQ=DAILY;BYHOUR=17\"").unwrap();
        assert!(matches!(end, EndSchedule::Rule(_)));
        assert_eq!(EndSchedule::end_of_day(NaiveDateTime::MAX), NaiveDateTime::MAX);
    }

    #[test]
    fn test_search_at_range_edges() {
        let rule = RecurrenceRule::daily_at(8, 0);
        assert_eq!(rule.next_at_or_after(NaiveDateTime::MAX), None);
        assert_eq!(rule.prev_at_or_before(NaiveDateTime::MIN), None);

        let last_day = NaiveDateTime::MAX.date();
        assert_eq!(
            rule.prev_at_or_before(NaiveDateTime::MAX),
            Some(last_day.and_hms_opt(8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_times_are_cross_product() {
        let rule = RecurrenceRule::daily_at(8, 30).with_time(9, 0);
        let occ = rule.occurrences_between(at(2024, 1, 1, 0, 0), at(2024, 1, 1, 23, 0));
        assert_eq!(
            occ,
            vec![
                at(2024, 1, 1, 8, 0),
                at(2024, 1, 1, 8, 30),
                at(2024, 1, 1, 9, 0),
                at(2024, 1, 1, 9, 30),
            ]
        );
    }
}
