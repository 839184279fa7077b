//! ISO-8601 periods and the time windows schedules must respect.

use chrono::{DateTime, Duration, Utc};

use crate::error::ValidationError;

pub const MIN_INTERVAL_SECONDS: u64 = 15 * 60;
pub const MAX_INTERVAL_SECONDS: u64 = 365 * 24 * 60 * 60;
pub const MAX_SCHEDULE_AHEAD_DAYS: i64 = 365;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Parses `P[n]Y[n]M[n]W[n]DT[n]H[n]M[n]S` into seconds.
///
/// Years count as 365 days and months as 30 days. Designators must appear in
/// order, at most once each, with integer amounts.
pub fn parse_period_seconds(period: &str) -> Option<u64> {
    let rest = period.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return None;
            }
            (date, Some(time))
        }
        None => (rest, None),
    };

    let date_units: &[(char, u64)] = &[('Y', 365 * DAY), ('M', 30 * DAY), ('W', 7 * DAY), ('D', DAY)];
    let time_units: &[(char, u64)] = &[('H', HOUR), ('M', MINUTE), ('S', 1)];

    let mut components = 0;
    let mut total = sum_components(date_part, date_units, &mut components)?;
    if let Some(time) = time_part {
        total = total.checked_add(sum_components(time, time_units, &mut components)?)?;
    }

    (components > 0).then_some(total)
}

fn sum_components(part: &str, units: &[(char, u64)], components: &mut usize) -> Option<u64> {
    let mut total: u64 = 0;
    let mut next_unit = 0;
    let mut digits = String::new();

    for ch in part.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if digits.is_empty() {
            return None;
        }
        let offset = units[next_unit..].iter().position(|(designator, _)| *designator == ch)?;
        let (_, seconds) = units[next_unit + offset];
        next_unit += offset + 1;

        let amount: u64 = digits.parse().ok()?;
        total = total.checked_add(amount.checked_mul(seconds)?)?;
        *components += 1;
        digits.clear();
    }

    digits.is_empty().then_some(total)
}

/// Validates a recurrence interval and returns its length in seconds.
pub fn validate_interval(period: &str) -> Result<u64, ValidationError> {
    match parse_period_seconds(period) {
        Some(seconds) if (MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&seconds) => Ok(seconds),
        _ => Err(ValidationError::InvalidInterval(period.to_string())),
    }
}

/// Accepts `start_at` iff `now <= start_at <= now + 365 days`.
pub fn validate_schedule_time(start_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
    let latest = now + Duration::days(MAX_SCHEDULE_AHEAD_DAYS);
    if start_at < now || start_at > latest {
        return Err(ValidationError::ScheduleWindowExceeded(start_at.to_rfc3339()));
    }
    Ok(())
}
