//! Named wake-time presets.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnoozePreset {
    /// Three hours from now.
    LaterToday,
    /// 18:00 today, or tomorrow when that has already passed.
    ThisEvening,
    /// 09:00 on the next calendar day.
    Tomorrow,
    /// 10:00 on the next Saturday.
    ThisWeekend,
    /// 09:00 seven days from today.
    NextWeek,
    /// One hour from now.
    #[default]
    InOneHour,
}

impl SnoozePreset {
    /// Maps a preset name to a preset. Unknown names fall back to one hour.
    pub fn from_name(name: &str) -> Self {
        match name {
            "later_today" => Self::LaterToday,
            "this_evening" => Self::ThisEvening,
            "tomorrow" => Self::Tomorrow,
            "this_weekend" => Self::ThisWeekend,
            "next_week" => Self::NextWeek,
            _ => Self::InOneHour,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LaterToday => "later_today",
            Self::ThisEvening => "this_evening",
            Self::Tomorrow => "tomorrow",
            Self::ThisWeekend => "this_weekend",
            Self::NextWeek => "next_week",
            Self::InOneHour => "in_one_hour",
        }
    }
}

/// Computes the wake time for `preset` relative to `now`, in `now`'s time zone.
///
/// The result is always strictly after `now`.
pub fn wake_time<Tz: TimeZone>(preset: SnoozePreset, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    match preset {
        SnoozePreset::LaterToday => now.clone() + Duration::hours(3),
        SnoozePreset::InOneHour => now.clone() + Duration::hours(1),
        SnoozePreset::ThisEvening => {
            let evening = at(&tz, today, 18, 0);
            if evening > *now {
                evening
            } else {
                at(&tz, next_day(today), 18, 0)
            }
        }
        SnoozePreset::Tomorrow => at(&tz, next_day(today), 9, 0),
        SnoozePreset::ThisWeekend => {
            let from_sunday = today.weekday().num_days_from_sunday() as i64;
            let mut days = (6 - from_sunday).rem_euclid(7);
            if days == 0 {
                days = 7;
            }
            at(&tz, today + Duration::days(days), 10, 0)
        }
        SnoozePreset::NextWeek => at(&tz, today + Duration::days(7), 9, 0),
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date + Duration::days(1)
}

/// Resolves a wall-clock time in `tz`, taking the earlier instant on DST
/// overlaps and shifting forward an hour inside DST gaps.
fn at<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32, minute: u32) -> DateTime<Tz> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    let local = NaiveDateTime::new(date, time);
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc, Weekday};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_tomorrow_is_nine_next_day() {
        let now = utc(2026, 5, 13, 22, 30);
        let wake = wake_time(SnoozePreset::Tomorrow, &now);
        assert_eq!(wake, utc(2026, 5, 14, 9, 0));
    }

    #[test]
    fn test_later_today_adds_three_hours() {
        let now = utc(2026, 5, 13, 10, 15);
        assert_eq!(wake_time(SnoozePreset::LaterToday, &now), utc(2026, 5, 13, 13, 15));
    }

    #[test]
    fn test_this_evening_rolls_over_after_six() {
        let morning = utc(2026, 5, 13, 8, 0);
        assert_eq!(wake_time(SnoozePreset::ThisEvening, &morning), utc(2026, 5, 13, 18, 0));
        let late = utc(2026, 5, 13, 19, 0);
        assert_eq!(wake_time(SnoozePreset::ThisEvening, &late), utc(2026, 5, 14, 18, 0));
    }

    #[test]
    fn test_this_weekend_is_next_saturday() {
        // 2026-05-13 is a Wednesday.
        let wed = utc(2026, 5, 13, 12, 0);
        let wake = wake_time(SnoozePreset::ThisWeekend, &wed);
        assert_eq!(wake.weekday(), Weekday::Sat);
        assert_eq!(wake, utc(2026, 5, 16, 10, 0));

        let sat = utc(2026, 5, 16, 12, 0);
        assert_eq!(wake_time(SnoozePreset::ThisWeekend, &sat), utc(2026, 5, 23, 10, 0));
    }

    #[test]
    fn test_next_week() {
        let now = utc(2026, 5, 13, 12, 0);
        let wake = wake_time(SnoozePreset::NextWeek, &now);
        assert_eq!(wake, utc(2026, 5, 20, 9, 0));
        assert_eq!(wake.hour(), 9);
    }

    #[test]
    fn test_unknown_name_defaults_to_one_hour() {
        let preset = SnoozePreset::from_name("whenever");
        assert_eq!(preset, SnoozePreset::InOneHour);
        let now = utc(2026, 5, 13, 12, 0);
        assert_eq!(wake_time(preset, &now), utc(2026, 5, 13, 13, 0));
    }

    #[test]
    fn test_wake_is_always_after_now() {
        let now = utc(2026, 5, 16, 23, 59);
        for name in ["later_today", "this_evening", "tomorrow", "this_weekend", "next_week", "x"] {
            assert!(wake_time(SnoozePreset::from_name(name), &now) > now, "{}", name);
        }
    }
}
