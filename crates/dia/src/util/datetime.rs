//! RFC 3339 timestamp parsing and formatting.
//!
//! Converts between the text form used by Axon and [`Timestamp`]
//! (microseconds since the Unix epoch plus the offset it was written in).
//! Only years 0000 through 9999 can be written; anything outside that range
//! has no RFC 3339 form.

use crate::model::Timestamp;

const MICROSECONDS_PER_SECOND: i64 = 1_000_000;
const MICROSECONDS_PER_MINUTE: i64 = 60 * MICROSECONDS_PER_SECOND;
const MICROSECONDS_PER_HOUR: i64 = 60 * MICROSECONDS_PER_MINUTE;
const MICROSECONDS_PER_DAY: i64 = 24 * MICROSECONDS_PER_HOUR;

/// Largest accepted offset magnitude, in minutes (24:00).
pub const MAX_OFFSET_MINUTES: i16 = 1440;

/// Error type for RFC 3339 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeParseError {
    pub message: String,
}

impl DateTimeParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DateTimeParseError {}

/// Parses a timezone offset string (Z, +HH:MM, -HH:MM) and returns offset in minutes.
fn parse_timezone_offset(offset: &str) -> Result<i16, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }

    let invalid = || DateTimeParseError::new(format!("invalid timezone offset: {offset}"));
    let bytes = offset.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return Err(invalid());
    }
    let sign = match bytes[0] {
        b'+' => 1i16,
        b'-' => -1i16,
        _ => return Err(invalid()),
    };

    let hours = parse_digits(&offset[1..3]).ok_or_else(invalid)? as i16;
    let minutes = parse_digits(&offset[4..6]).ok_or_else(invalid)? as i16;
    if minutes > 59 || hours * 60 + minutes > MAX_OFFSET_MINUTES {
        return Err(invalid());
    }

    Ok(sign * (hours * 60 + minutes))
}

/// Formats an offset in minutes as a timezone string (Z, +HH:MM, -HH:MM).
fn format_timezone_offset(offset_min: i16) -> String {
    if offset_min == 0 {
        return "Z".to_string();
    }

    let sign = if offset_min >= 0 { '+' } else { '-' };
    let abs_offset = offset_min.unsigned_abs();
    format!("{}{:02}:{:02}", sign, abs_offset / 60, abs_offset % 60)
}

/// Parses an all-ASCII-digit field.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses fractional seconds and returns microseconds.
///
/// Digits past the sixth are accepted and dropped.
fn parse_fractional_seconds(frac: &str) -> Option<i64> {
    if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut padded = frac.to_string();
    while padded.len() < 6 {
        padded.push('0');
    }
    padded.truncate(6);
    padded.parse().ok()
}

/// Formats microseconds as fractional seconds string, omitting if zero.
fn format_fractional_seconds(us: i64) -> String {
    if us == 0 {
        return String::new();
    }

    let digits = format!("{:06}", us);
    format!(".{}", digits.trim_end_matches('0'))
}

/// Returns true if the given year is a leap year.
fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since the Unix epoch for a civil date (Howard Hinnant's algorithm).
fn date_to_days(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year } as i64;
    let m = if month <= 2 {
        month as i64 + 9
    } else {
        month as i64 - 3
    };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * m + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;

    era * 146097 + doe - 719468
}

/// Civil date for a count of days since the Unix epoch.
fn days_to_date(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;

    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Parses `YYYY-MM-DD` and returns days since the epoch.
fn parse_date(date: &str, input: &str) -> Result<i64, DateTimeParseError> {
    let bytes = date.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(DateTimeParseError::new(format!("invalid RFC 3339 date: {input}")));
    }

    let year = parse_digits(&date[..4])
        .ok_or_else(|| DateTimeParseError::new(format!("invalid year: {input}")))?
        as i32;
    let month = parse_digits(&date[5..7])
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| DateTimeParseError::new(format!("invalid month: {input}")))?;
    let day = parse_digits(&date[8..10])
        .filter(|d| *d >= 1 && *d <= days_in_month(year, month))
        .ok_or_else(|| DateTimeParseError::new(format!("invalid day: {input}")))?;

    Ok(date_to_days(year, month, day))
}

/// Parses an RFC 3339 timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS[.frac](Z|±HH:MM)` and the date-only form
/// `YYYY-MM-DD`, which means midnight UTC.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, DateTimeParseError> {
    if !input.is_ascii() {
        return Err(DateTimeParseError::new(format!("invalid RFC 3339 timestamp: {input}")));
    }
    if input.len() == 10 {
        let days = parse_date(input, input)?;
        return Ok(Timestamp::new(days * MICROSECONDS_PER_DAY, 0));
    }
    if input.len() < 20 || !matches!(input.as_bytes()[10], b'T' | b't') {
        return Err(DateTimeParseError::new(format!("invalid RFC 3339 timestamp: {input}")));
    }

    let days = parse_date(&input[..10], input)?;

    let time = &input[11..];
    let tb = time.as_bytes();
    if tb[2] != b':' || tb[5] != b':' {
        return Err(DateTimeParseError::new(format!("invalid RFC 3339 time: {input}")));
    }
    let field = |range: std::ops::Range<usize>, max: u32, what: &str| {
        parse_digits(&time[range])
            .filter(|v| *v <= max)
            .map(i64::from)
            .ok_or_else(|| DateTimeParseError::new(format!("invalid {what}: {input}")))
    };
    let hours = field(0..2, 23, "hours")?;
    let minutes = field(3..5, 59, "minutes")?;
    let seconds = field(6..8, 59, "seconds")?;

    let rest = &time[8..];
    let (micros, offset) = match rest.strip_prefix('.') {
        Some(frac_and_tz) => {
            let end = frac_and_tz
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(frac_and_tz.len());
            let micros = parse_fractional_seconds(&frac_and_tz[..end]).ok_or_else(|| {
                DateTimeParseError::new(format!("invalid fractional seconds: {input}"))
            })?;
            (micros, &frac_and_tz[end..])
        }
        None => (0, rest),
    };
    let offset_min = parse_timezone_offset(offset)?;

    let local = days * MICROSECONDS_PER_DAY
        + hours * MICROSECONDS_PER_HOUR
        + minutes * MICROSECONDS_PER_MINUTE
        + seconds * MICROSECONDS_PER_SECOND
        + micros;

    // local time = UTC + offset
    Ok(Timestamp::new(
        local - offset_min as i64 * MICROSECONDS_PER_MINUTE,
        offset_min,
    ))
}

/// Formats a timestamp in its own offset.
///
/// Returns `None` when the local date falls outside years 0000-9999 or the
/// offset exceeds ±24:00.
pub fn format_timestamp(ts: Timestamp) -> Option<String> {
    if ts.offset_min.unsigned_abs() > MAX_OFFSET_MINUTES as u16 {
        return None;
    }
    let local = ts
        .epoch_us
        .checked_add(ts.offset_min as i64 * MICROSECONDS_PER_MINUTE)?;

    let days = local.div_euclid(MICROSECONDS_PER_DAY);
    let time_micros = local.rem_euclid(MICROSECONDS_PER_DAY);
    let (year, month, day) = days_to_date(days);
    if !(0..=9999).contains(&year) {
        return None;
    }

    let hours = time_micros / MICROSECONDS_PER_HOUR;
    let minutes = time_micros % MICROSECONDS_PER_HOUR / MICROSECONDS_PER_MINUTE;
    let seconds = time_micros % MICROSECONDS_PER_MINUTE / MICROSECONDS_PER_SECOND;
    let micros = time_micros % MICROSECONDS_PER_SECOND;

    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{}",
        year,
        month,
        day,
        hours,
        minutes,
        seconds,
        format_fractional_seconds(micros),
        format_timezone_offset(ts.offset_min)
    ))
}
