//! Daily scheduled purge time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use super::PurgeError;

/// Default time of day for scheduled purges.
pub const DEFAULT_SCHEDULE_TIME: &str = "00:00";

/// A time of day (`H:MM` or `HH:MM`, 24-hour clock) in a fixed time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
    timezone: Tz,
}

impl DailySchedule {
    pub fn new(time: NaiveTime, timezone: Tz) -> Self {
        Self { time, timezone }
    }

    /// Parse `value` as a time of day; hours `0`-`23` (optionally zero-padded), minutes `00`-`59`.
    pub fn parse(value: &str, timezone: Tz) -> Result<Self, PurgeError> {
        parse_time_of_day(value).map(|time| Self::new(time, timezone))
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First scheduled instant strictly after `now`.
    ///
    /// A local time skipped by a DST transition runs one hour later that day.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_today = now.with_timezone(&self.timezone).date_naive();
        let mut day = local_today;
        loop {
            if let Some(candidate) = self.at_local(day) {
                if candidate > now {
                    return candidate;
                }
            }
            day = match day.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => return now + TimeDelta::days(1),
            };
        }
    }

    /// Wall-clock wait from `now` until the next run.
    pub fn duration_until_next(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_run_after(now) - now)
            .to_std()
            .unwrap_or_default()
    }

    fn at_local(&self, day: chrono::NaiveDate) -> Option<DateTime<Utc>> {
        let naive = day.and_time(self.time);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(naive + TimeDelta::hours(1)))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.time.format("%H:%M"), self.timezone)
    }
}

/// Validate and parse a time of day.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, PurgeError> {
    let invalid = || PurgeError::InvalidSchedule(value.to_string());
    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;

    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return Err(invalid());
    }

    let hours = u32::from_str(hours).map_err(|_| invalid())?;
    let minutes = u32::from_str(minutes).map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn accepts_valid_times() {
        for value in ["0:00", "00:00", "9:30", "09:30", "19:05", "23:59"] {
            assert!(parse_time_of_day(value).is_ok(), "{value} should be valid");
        }
        assert_eq!(
            parse_time_of_day("7:45").expect("valid"),
            NaiveTime::from_hms_opt(7, 45, 0).expect("time")
        );
    }

    #[test]
    fn rejects_invalid_times() {
        for value in ["", "24:00", "12:60", "1:5", "123:00", "12-30", "ab:cd", " 1:00", "12:00:00"] {
            assert!(
                matches!(parse_time_of_day(value), Err(PurgeError::InvalidSchedule(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        let schedule = DailySchedule::parse("03:30", Tz::UTC).expect("valid");

        assert_eq!(
            schedule.next_run_after(utc("2024-05-01T01:00:00Z")),
            utc("2024-05-01T03:30:00Z")
        );
        assert_eq!(
            schedule.next_run_after(utc("2024-05-01T03:30:00Z")),
            utc("2024-05-02T03:30:00Z")
        );
    }

    #[test]
    fn next_run_respects_timezone() {
        let schedule = DailySchedule::parse("00:00", chrono_tz::Europe::Amsterdam).expect("valid");

        // Amsterdam is UTC+2 in summer.
        assert_eq!(
            schedule.next_run_after(utc("2024-07-01T12:00:00Z")),
            utc("2024-07-01T22:00:00Z")
        );
    }

    #[test]
    fn skipped_local_time_runs_an_hour_later() {
        let schedule = DailySchedule::parse("02:30", chrono_tz::Europe::Amsterdam).expect("valid");

        // 2024-03-31 02:30 does not exist in Amsterdam; 03:30 CEST is 01:30 UTC.
        assert_eq!(
            schedule.next_run_after(utc("2024-03-30T12:00:00Z")),
            utc("2024-03-31T01:30:00Z")
        );
    }

    #[test]
    fn duration_until_next_is_positive() {
        let schedule = DailySchedule::parse("00:00", Tz::UTC).expect("valid");
        let wait = schedule.duration_until_next(utc("2024-05-01T23:00:00Z"));
        assert_eq!(wait, std::time::Duration::from_secs(3600));
    }
}
