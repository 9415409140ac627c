//! Calendar-period resolution
//!
//! Maps a period key and an anchor instant onto the inclusive
//! `[start, end]` range the report queries use. Pure: the anchor is an
//! argument, never the wall clock. Weeks run Monday through Sunday and all
//! math is UTC; range ends sit on 23:59:59.999, matching the millisecond
//! precision of the stored timestamps.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// Reporting period selectable from the period menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl Period {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "quarter" => Some(Self::Quarter),
            "halfyear" => Some(Self::HalfYear),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

/// Resolve a period key against `now`.
///
/// An unrecognized key yields the zero-width range `(now, now)`, which
/// callers treat as "no data" rather than an error.
pub fn resolve(key: &str, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let Some(period) = Period::from_key(key) else {
        return (now, now);
    };

    let today = now.date_naive();
    let year = today.year();
    match period {
        Period::Day => (start_of_day(today), end_of_day(today)),
        Period::Week => {
            let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
            (start_of_day(monday), end_of_day(monday + Days::new(6)))
        }
        Period::Month => (
            start_of_day(first_of_month(year, today.month())),
            end_of_day(last_of_month(year, today.month())),
        ),
        Period::Quarter => {
            let first_month = (today.month0() / 3) * 3 + 1;
            (
                start_of_day(first_of_month(year, first_month)),
                end_of_day(last_of_month(year, first_month + 2)),
            )
        }
        Period::HalfYear => {
            let (first_month, last_month) = if today.month() <= 6 { (1, 6) } else { (7, 12) };
            (
                start_of_day(first_of_month(year, first_month)),
                end_of_day(last_of_month(year, last_month)),
            )
        }
        Period::Year => (
            start_of_day(first_of_month(year, 1)),
            end_of_day(last_of_month(year, 12)),
        ),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc()
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

fn last_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    first_of_month(next_year, next_month).pred_opt().unwrap()
}
