//! Named reporting periods resolved to concrete windows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use thiserror::Error;

use super::types::TimeWindow;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Unknown period '{0}' (expected today, yesterday, this-week, last-week, this-month, last-month, all-time)"
)]
pub struct UnknownPeriod(pub String);

/// A reporting period relative to "now". Weeks start on Monday; all
/// boundaries are midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    Today,
    Yesterday,
    #[default]
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    AllTime,
}

impl Period {
    /// Resolve to a window relative to `now`.
    pub fn resolve(self, now: DateTime<Utc>) -> TimeWindow {
        let today = midnight(now.date_naive());
        let day = Duration::days(1);
        let week = Duration::days(7);

        match self {
            Period::Today => TimeWindow::between(today, today + day),
            Period::Yesterday => TimeWindow::between(today - day, today),
            Period::ThisWeek => {
                let monday = today - Duration::days(i64::from(now.weekday().num_days_from_monday()));
                TimeWindow::between(monday, monday + week)
            }
            Period::LastWeek => {
                let monday = today - Duration::days(i64::from(now.weekday().num_days_from_monday()));
                TimeWindow::between(monday - week, monday)
            }
            Period::ThisMonth => {
                let first = first_of_month(now.year(), now.month());
                TimeWindow::between(first, next_month(first))
            }
            Period::LastMonth => {
                let first = first_of_month(now.year(), now.month());
                TimeWindow::between(previous_month(first), first)
            }
            Period::AllTime => TimeWindow::new(None, Some(now + day)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Yesterday => "yesterday",
            Period::ThisWeek => "this-week",
            Period::LastWeek => "last-week",
            Period::ThisMonth => "this-month",
            Period::LastMonth => "last-month",
            Period::AllTime => "all-time",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "yesterday" => Ok(Period::Yesterday),
            "this-week" | "thisweek" => Ok(Period::ThisWeek),
            "last-week" | "lastweek" => Ok(Period::LastWeek),
            "this-month" | "thismonth" => Ok(Period::ThisMonth),
            "last-month" | "lastmonth" => Ok(Period::LastMonth),
            "all-time" | "alltime" => Ok(Period::AllTime),
            _ => Err(UnknownPeriod(s.to_string())),
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Day 1 exists for every valid month.
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(midnight)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn next_month(first: DateTime<Utc>) -> DateTime<Utc> {
    if first.month() == 12 {
        first_of_month(first.year() + 1, 1)
    } else {
        first_of_month(first.year(), first.month() + 1)
    }
}

fn previous_month(first: DateTime<Utc>) -> DateTime<Utc> {
    if first.month() == 1 {
        first_of_month(first.year() - 1, 12)
    } else {
        first_of_month(first.year(), first.month() - 1)
    }
}
