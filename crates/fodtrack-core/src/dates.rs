//! Timezone-aware calendar-date utilities.
//!
//! All streak logic works on calendar dates in the caller's timezone.
//! The caller supplies a UTC-offset string which is validated here before
//! any computation or store access happens.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

use crate::error::ValidationError;

/// Parse a caller-supplied UTC offset: `Z`, `UTC`, or `+HH:MM`/`-HH:MM`.
///
/// # Errors
/// Returns [`ValidationError::InvalidTimezone`] for anything else.
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset, ValidationError> {
    let invalid = || ValidationError::InvalidTimezone {
        input: input.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let (hours_str, minutes_str) = rest.split_once(':').ok_or_else(invalid)?;
    if hours_str.len() != 2 || minutes_str.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours_str.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes_str.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Calendar date of an instant in the given timezone.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// UTC instant at which the given local calendar date begins.
pub fn day_start_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN) - offset, Utc)
}

/// Bucket timestamped items by their local calendar date.
///
/// Multiple items may land on the same day; buckets are never empty.
pub fn bucket_by_local_date<T, I>(items: I, offset: FixedOffset) -> BTreeMap<NaiveDate, Vec<T>>
where
    I: IntoIterator<Item = (DateTime<Utc>, T)>,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<T>> = BTreeMap::new();
    for (at, item) in items {
        buckets.entry(local_date(at, offset)).or_default().push(item);
    }
    buckets
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
