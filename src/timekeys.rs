//! Day and week bucketing for journal timestamps.
//!
//! Every aggregation in the engine buckets instants by the local calendar:
//! a day key is the local date (`YYYY-MM-DD`), a week key is the day key of
//! that week's Monday. Weeks are Monday-anchored with ISO weekday numbering,
//! so a Sunday entry belongs to the week opened by the preceding Monday.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};

/// Day key for an instant: the local calendar date as `YYYY-MM-DD`.
pub fn day_key(ts: DateTime<Utc>) -> String {
    format_date(ts.with_timezone(&Local).date_naive())
}

/// Week key for an instant: the day key of the Monday opening its week.
pub fn week_key(ts: DateTime<Utc>) -> String {
    format_date(week_monday(ts.with_timezone(&Local).date_naive()))
}

/// Monday of the week containing `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    // number_from_monday: Mon=1 .. Sun=7
    let back = i64::from(date.weekday().number_from_monday()) - 1;
    date - Duration::days(back)
}

/// Week key for a bare local date.
pub fn week_key_of_date(date: NaiveDate) -> String {
    format_date(week_monday(date))
}

/// Local calendar date for an instant.
pub fn local_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
