use std::str::FromStr;

use chrono::{TimeZone, Utc};
use cron::Schedule;

/// Parse a cron expression, auto-prepending a seconds field for the common
/// 5-field form.
///
/// The `cron` crate requires 6 fields (sec min hr dom mon dow); jobs files
/// use standard 5-field cron at minute resolution.
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {trimmed}"))
    } else {
        Schedule::from_str(trimmed)
    }
}

/// Next occurrence strictly after `now` (epoch seconds).
///
/// `None` only for exhausted schedules (e.g. a fixed year in the past).
pub fn next_occurrence(schedule: &Schedule, now: i64) -> Option<i64> {
    let from = Utc.timestamp_opt(now, 0).single()?;
    schedule.after(&from).next().map(|dt| dt.timestamp())
}
