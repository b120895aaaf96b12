//! Conversions between [`OffsetDateTime`] and the two timestamp encodings of
//! the byte stream.
//!
//! The `datetime` encoding stores a count of 100-nanosecond ticks since
//! `0001-01-01T00:00:00Z` in the low 62 bits and a "kind" in the top 2 bits.
//! Values written here always use the UTC kind. When reading, the kind is
//! ignored and the ticks are interpreted as UTC.
//!
//! The `ctime` encoding is plain unix seconds, where 0 stands for an unset
//! time. Sub-second precision is dropped.

use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::error::Error;

/// The zero point of the tick encoding.
pub const TICKS_EPOCH: OffsetDateTime = datetime!(0001-01-01 0:00 UTC);

/// The largest valid tick count, `9999-12-31T23:59:59.9999999Z`.
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

const KIND_UTC: i64 = 1 << 62;
const TICKS_MASK: i64 = (1 << 62) - 1;

/// Converts a date time to its tick-and-kind representation.
///
/// Precision below 100ns is truncated.
///
/// # Errors
///
/// Returns `Err` if the value lies before year 1.
pub fn to_binary(value: OffsetDateTime) -> Result<i64, Error> {
    let since = value - TICKS_EPOCH;
    let ticks = since
        .whole_seconds()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(i64::from(since.subsec_nanoseconds()) / NANOS_PER_TICK))
        .ok_or(Error::DateTimeRange(since.whole_seconds()))?;

    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(Error::DateTimeRange(ticks));
    }

    Ok(ticks | KIND_UTC)
}

/// Converts a tick-and-kind value back into a date time.
///
/// # Errors
///
/// Returns `Err` if the tick count is past [`MAX_TICKS`].
pub fn from_binary(value: i64) -> Result<OffsetDateTime, Error> {
    let ticks = value & TICKS_MASK;
    if ticks > MAX_TICKS {
        return Err(Error::DateTimeRange(value));
    }

    let since = Duration::seconds(ticks / TICKS_PER_SECOND)
        + Duration::nanoseconds((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK);

    TICKS_EPOCH
        .checked_add(since)
        .ok_or(Error::DateTimeRange(value))
}

/// Converts an optional date time to unix seconds, with [`None`] as 0.
#[must_use]
pub fn to_ctime(value: Option<OffsetDateTime>) -> i64 {
    value.map_or(0, OffsetDateTime::unix_timestamp)
}

/// Converts unix seconds to an optional date time, with 0 as [`None`].
///
/// # Errors
///
/// Returns `Err` if the seconds are outside the supported date range.
pub fn from_ctime(value: i64) -> Result<Option<OffsetDateTime>, Error> {
    if value == 0 {
        return Ok(None);
    }

    OffsetDateTime::from_unix_timestamp(value)
        .map(Some)
        .map_err(|_| Error::DateTimeRange(value))
}
