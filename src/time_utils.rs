// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for dates and timestamps.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};

/// Oldest age accepted for a birth date.
pub const MAX_AGE_YEARS: u32 = 120;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whole years between `birth` and `today`; None if `birth` is in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// A birth date that is not in the future and not absurdly old.
pub fn is_plausible_birth_date(birth: NaiveDate, today: NaiveDate) -> bool {
    age_on(birth, today).is_some_and(|age| age <= MAX_AGE_YEARS)
}
