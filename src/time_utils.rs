// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as stored in documents.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Start of a calendar day in UTC.
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

/// Parse a stored calendar date.
///
/// Accepts `YYYY-MM-DD` and, for documents written by older clients, a full
/// RFC3339 timestamp (the UTC date is kept).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

/// Serde helper for optional calendar dates, see [`parse_calendar_date`].
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_calendar_date(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-03-05T07:08:09Z");
    }

    #[test]
    fn test_parse_calendar_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(parse_calendar_date("2024-06-01"), Some(expected));
        assert_eq!(parse_calendar_date("2024-06-01T10:30:00.000Z"), Some(expected));
        assert_eq!(parse_calendar_date("June 1st"), None);
    }

    #[test]
    fn test_start_of_day_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            start_of_day_utc(date),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }
}
