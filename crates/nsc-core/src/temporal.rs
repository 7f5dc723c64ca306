//! # Time Values
//!
//! Claim validity windows are stored as epoch seconds, with `0` meaning
//! "unset". Users write them as calendar dates, RFC 3339 timestamps, or
//! offsets relative to now (`30d`, `1y`). Response TTLs are durations in the
//! `<n><unit>` form with units `ns`, `us`, `ms`, `s`, `m`, `h`, which may be
//! chained (`1h30m`).

use std::time::Duration;

use chrono::{DateTime, Months, NaiveDate, TimeZone, Utc};

use crate::error::CoreError;

/// Current time in epoch seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Parse an expiry or not-before expression relative to the current time.
///
/// `""` and `"0"` clear the value (return `0`).
pub fn parse_expiry(expr: &str) -> Result<i64, CoreError> {
    parse_expiry_at(expr, Utc::now())
}

/// Parse an expiry expression against a fixed `now`.
pub fn parse_expiry_at(expr: &str, now: DateTime<Utc>) -> Result<i64, CoreError> {
    let s = expr.trim();
    if s.is_empty() || s == "0" {
        return Ok(0);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CoreError::invalid_value("expiry", expr, "invalid date"))?;
        return Ok(Utc.from_utc_datetime(&midnight).timestamp());
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.timestamp());
    }

    let (count, unit) = split_number(s)
        .ok_or_else(|| CoreError::invalid_value("expiry", expr, "expected a date, RFC 3339 timestamp or <n><unit>"))?;
    let count: u32 = count
        .parse()
        .map_err(|_| CoreError::invalid_value("expiry", expr, "count is out of range"))?;

    let target = match unit {
        "s" => now.checked_add_signed(chrono::Duration::seconds(count.into())),
        "m" => now.checked_add_signed(chrono::Duration::minutes(count.into())),
        "h" => now.checked_add_signed(chrono::Duration::hours(count.into())),
        "d" => now.checked_add_signed(chrono::Duration::days(count.into())),
        "w" => now.checked_add_signed(chrono::Duration::weeks(count.into())),
        "M" => now.checked_add_months(Months::new(count)),
        "y" => count
            .checked_mul(12)
            .and_then(|months| now.checked_add_months(Months::new(months))),
        other => {
            return Err(CoreError::invalid_value(
                "expiry",
                expr,
                format!("unknown unit {other:?} (use s, m, h, d, w, M or y)"),
            ))
        }
    };

    target
        .map(|t| t.timestamp())
        .ok_or_else(|| CoreError::invalid_value("expiry", expr, "date is out of range"))
}

/// Render an epoch-seconds value for change logs. `0` renders as `unset`.
pub fn format_epoch(secs: i64) -> String {
    if secs == 0 {
        return "unset".to_string();
    }
    match Utc.timestamp_opt(secs, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => secs.to_string(),
    }
}

/// Render an epoch-seconds value in a form [`parse_expiry()`] reads back:
/// RFC 3339 in UTC, or `0` when unset.
pub fn format_timestamp(secs: i64) -> String {
    if secs <= 0 {
        return "0".to_string();
    }
    match Utc.timestamp_opt(secs, 0).single() {
        Some(t) => t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        None => "0".to_string(),
    }
}

/// Parse a duration such as `2ms`, `30s` or `1h30m`.
pub fn parse_duration(expr: &str) -> Result<Duration, CoreError> {
    let s = expr.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(CoreError::invalid_value("duration", expr, "empty"));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return Err(CoreError::invalid_value("duration", expr, "expected a number"));
        }
        let (num, tail) = rest.split_at(digits);
        let unit_len = tail.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
        if unit_len == 0 {
            return Err(CoreError::invalid_value("duration", expr, "missing unit"));
        }
        let (unit, tail) = tail.split_at(unit_len);
        let n: u64 = num
            .parse()
            .map_err(|_| CoreError::invalid_value("duration", expr, "number is out of range"))?;

        let part = match unit {
            "ns" => Some(Duration::from_nanos(n)),
            "us" => Some(Duration::from_micros(n)),
            "ms" => Some(Duration::from_millis(n)),
            "s" => Some(Duration::from_secs(n)),
            "m" => n.checked_mul(60).map(Duration::from_secs),
            "h" => n.checked_mul(3600).map(Duration::from_secs),
            other => {
                return Err(CoreError::invalid_value(
                    "duration",
                    expr,
                    format!("unknown unit {other:?} (use ns, us, ms, s, m or h)"),
                ))
            }
        };
        total = part
            .and_then(|p| total.checked_add(p))
            .ok_or_else(|| CoreError::invalid_value("duration", expr, "duration is out of range"))?;
        rest = tail;
    }
    Ok(total)
}

/// Render a duration in the same `<n><unit>` syntax [`parse_duration()`]
/// accepts, choosing the largest unit that divides it exactly.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    const UNITS: [(u128, &str); 6] = [
        (3_600_000_000_000, "h"),
        (60_000_000_000, "m"),
        (1_000_000_000, "s"),
        (1_000_000, "ms"),
        (1_000, "us"),
        (1, "ns"),
    ];
    for (size, unit) in UNITS {
        if nanos % size == 0 {
            return format!("{}{unit}", nanos / size);
        }
    }
    format!("{nanos}ns")
}

fn split_number(s: &str) -> Option<(&str, &str)> {
    let digits = s.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits == s.len() {
        return None;
    }
    Some(s.split_at(digits))
}
