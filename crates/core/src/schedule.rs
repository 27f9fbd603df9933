use chrono::{DateTime, Days, NaiveTime, Utc};
use std::str::FromStr;
use std::time::Duration;

/// A job that fires once per day at a fixed UTC wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Midnight UTC, every day.
    pub fn midnight() -> Self {
        Self::new(NaiveTime::default())
    }

    pub fn time(&self) -> NaiveTime {
        self.at
    }

    /// The first fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            today
        } else {
            // Adding one day to a NaiveDate only fails at the end of the calendar.
            let tomorrow = now
                .date_naive()
                .checked_add_days(Days::new(1))
                .unwrap_or(now.date_naive());
            tomorrow.and_time(self.at).and_utc()
        }
    }

    /// How long to sleep from `now` until the next fire time.
    pub fn until_next(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or_default()
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::midnight()
    }
}

impl FromStr for DailySchedule {
    type Err = chrono::ParseError;

    /// Parses `HH:MM` (24h).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M").map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_hh_mm() {
        let schedule: DailySchedule = "06:30".parse().unwrap();
        assert_eq!(schedule.time(), NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert!("25:00".parse::<DailySchedule>().is_err());
        assert!("noon".parse::<DailySchedule>().is_err());
    }

    #[test]
    fn test_next_after_later_today() {
        let schedule: DailySchedule = "18:00".parse().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 12, 17, 9, 15, 0).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Utc.with_ymd_and_hms(2024, 12, 17, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_midnight_rolls_over_to_next_day() {
        let schedule = DailySchedule::midnight();
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(schedule.until_next(now), Duration::from_secs(60));
    }

    #[test]
    fn test_exact_fire_time_schedules_next_day() {
        let schedule = DailySchedule::midnight();
        let now = Utc.with_ymd_and_hms(2024, 12, 17, 0, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Utc.with_ymd_and_hms(2024, 12, 18, 0, 0, 0).unwrap()
        );
    }
}
