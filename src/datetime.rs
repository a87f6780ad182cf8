//! Timestamp conversion for the two Windows clock formats found in jump lists,
//! plus timezone handling for display.

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

/// FILETIME to Unix epoch offset (100-nanosecond intervals, 1601-01-01 to 1970-01-01)
pub const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

/// UUID time to Unix epoch offset (100-nanosecond intervals, 1582-10-15 to 1970-01-01)
pub const UUID_UNIX_EPOCH: u64 = 122_192_928_000_000_000;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert signed 100ns ticks relative to the Unix epoch
fn ticks_to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Convert a FILETIME to `DateTime<Utc>`.
///
/// Zero means "not set" in shell links and yields `None`, as does anything
/// earlier than the Unix epoch.
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 || filetime < FILETIME_UNIX_EPOCH {
        return None;
    }
    ticks_to_datetime((filetime - FILETIME_UNIX_EPOCH) as i64)
}

/// Convert a FILETIME, clamping anything before 1970 to the Unix epoch.
pub fn filetime_to_datetime_or_epoch(filetime: u64) -> DateTime<Utc> {
    filetime_to_datetime(filetime).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Convert a 60-bit UUID tick count (since 1582-10-15) to `DateTime<Utc>`.
pub fn uuid_ticks_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    // 60 bits always fits an i64
    let ticks = (ticks & 0x0FFF_FFFF_FFFF_FFFF) as i64;
    ticks_to_datetime(ticks - UUID_UNIX_EPOCH as i64)
}

/// Parse a timezone name ("UTC" or any IANA name such as "Asia/Hong_Kong")
pub fn parse_timezone(timezone_str: &str) -> Result<Tz> {
    if timezone_str.eq_ignore_ascii_case("utc") || timezone_str == "Z" {
        return Ok(Tz::UTC);
    }
    timezone_str.parse::<Tz>().map_err(|_| {
        Error::InvalidInput(format!(
            "Invalid timezone '{}'. Use 'UTC' or an IANA name like 'Europe/Berlin'",
            timezone_str
        ))
    })
}

/// Format a timestamp as RFC 3339 with full nanosecond precision in the given zone
pub fn format_timestamp(dt: &DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz)
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}
