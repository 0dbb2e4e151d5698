//! Turns user-entered date/time text into a validated UTC [`DateRange`].
//!
//! Input usually comes from a `datetime-local` style field
//! (`2024-01-01T00:00`), which carries no zone. Such values are read in the
//! caller's local zone and converted to UTC before anything leaves the
//! process.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use solar_flares_flare_models::{DateRange, timestamp};

/// Layout produced by `datetime-local` inputs and by [`format_for_input`].
const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Zone-less layouts accepted from the user, tried in order.
const LOCAL_FORMATS: &[&str] = &[
    INPUT_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why a pair of raw inputs could not become a [`DateRange`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// The start field is empty, malformed, or names a nonexistent local
    /// time.
    #[error("Invalid start date: {value:?}")]
    InvalidStart { value: String },
    /// The end field is empty, malformed, or names a nonexistent local
    /// time.
    #[error("Invalid end date: {value:?}")]
    InvalidEnd { value: String },
    /// Both bounds parsed but are out of order.
    #[error("Start date {start} is after end date {end}")]
    StartAfterEnd { start: String, end: String },
}

/// Normalizes a start/end pair in the process-local time zone.
///
/// # Errors
///
/// See [`normalize_in`].
pub fn normalize(raw_start: &str, raw_end: &str) -> Result<DateRange, RangeError> {
    normalize_in(raw_start, raw_end, &Local)
}

/// Normalizes a start/end pair, reading zone-less inputs in `tz`.
///
/// `start == end` is accepted.
///
/// # Errors
///
/// * [`RangeError::InvalidStart`] / [`RangeError::InvalidEnd`] if a field
///   is empty, unparseable, or falls in a DST gap
/// * [`RangeError::StartAfterEnd`] if the start instant is after the end
///   instant
pub fn normalize_in<Tz: TimeZone>(
    raw_start: &str,
    raw_end: &str,
    tz: &Tz,
) -> Result<DateRange, RangeError> {
    let start = parse_instant(raw_start, tz).ok_or_else(|| RangeError::InvalidStart {
        value: raw_start.to_string(),
    })?;
    let end = parse_instant(raw_end, tz).ok_or_else(|| RangeError::InvalidEnd {
        value: raw_end.to_string(),
    })?;

    DateRange::new(start, end).map_err(|_| RangeError::StartAfterEnd {
        start: timestamp::encode(start),
        end: timestamp::encode(end),
    })
}

/// Parses one user-entered instant.
///
/// RFC 3339 input keeps its own offset. Anything else is a wall-clock time
/// in `tz`; a time repeated by a DST fold resolves to the earlier instant
/// and a time skipped by a DST gap is rejected.
#[must_use]
pub fn parse_instant<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Renders an instant in the `YYYY-MM-DDTHH:MM` form accepted by
/// [`normalize_in`], as wall-clock time in `tz`.
#[must_use]
pub fn format_for_input<Tz>(dt: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    dt.with_timezone(tz).format(INPUT_FORMAT).to_string()
}

/// The last `days` days up to `now`.
#[must_use]
pub fn trailing_days(now: DateTime<Utc>, days: u32) -> DateRange {
    DateRange::trailing(now, TimeDelta::days(i64::from(days)))
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        timestamp::parse(s).unwrap()
    }

    #[test]
    fn datetime_local_input_is_read_in_zone() {
        let range = normalize_in("2024-01-01T00:00", "2024-01-02T00:00", &Utc).unwrap();
        assert_eq!(timestamp::encode(range.start()), "2024-01-01T00:00:00.000Z");
        assert_eq!(timestamp::encode(range.end()), "2024-01-02T00:00:00.000Z");

        let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
        let range = normalize_in("2024-01-01T00:00", "2024-01-02T00:00", &plus_five).unwrap();
        assert_eq!(range.start(), utc("2023-12-31T19:00:00Z"));
        assert_eq!(range.end(), utc("2024-01-01T19:00:00Z"));
    }

    #[test]
    fn accepts_seconds_space_separator_and_bare_dates() {
        for (raw, expected) in [
            ("2024-01-01T06:30:15", "2024-01-01T06:30:15Z"),
            ("2024-01-01T06:30:15.500", "2024-01-01T06:30:15.500Z"),
            ("2024-01-01 06:30", "2024-01-01T06:30:00Z"),
            ("2024-01-01 06:30:15", "2024-01-01T06:30:15Z"),
            ("2024-01-01", "2024-01-01T00:00:00Z"),
            ("  2024-01-01T06:30  ", "2024-01-01T06:30:00Z"),
        ] {
            assert_eq!(parse_instant(raw, &Utc), Some(utc(expected)), "{raw}");
        }
    }

    #[test]
    fn rfc3339_input_keeps_its_offset() {
        let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
        assert_eq!(
            parse_instant("2024-01-01T00:00:00-02:00", &plus_five),
            Some(utc("2024-01-01T02:00:00Z"))
        );
    }

    #[test]
    fn equal_bounds_are_valid() {
        let range = normalize_in("2024-01-01T12:00", "2024-01-01T12:00", &Utc).unwrap();
        assert_eq!(range.start(), range.end());
    }

    #[test]
    fn reversed_bounds_are_rejected() {
        let err = normalize_in("2024-02-01T00:00", "2024-01-01T00:00", &Utc).unwrap_err();
        assert_eq!(
            err,
            RangeError::StartAfterEnd {
                start: "2024-02-01T00:00:00.000Z".to_string(),
                end: "2024-01-01T00:00:00.000Z".to_string(),
            }
        );
    }

    #[test]
    fn empty_and_garbage_fields_name_the_bad_side() {
        assert!(matches!(
            normalize_in("", "2024-01-01T00:00", &Utc),
            Err(RangeError::InvalidStart { .. })
        ));
        assert!(matches!(
            normalize_in("2024-01-01T00:00", "tomorrow", &Utc),
            Err(RangeError::InvalidEnd { value }) if value == "tomorrow"
        ));
        assert!(matches!(
            normalize_in("2024-13-01T00:00", "2024-01-01T00:00", &Utc),
            Err(RangeError::InvalidStart { .. })
        ));
    }

    #[test]
    fn ordered_pairs_always_normalize() {
        let base = utc("2024-01-01T00:00:00Z");
        for (offset_start, offset_end) in [(0, 0), (0, 59), (-90, 30), (-1440, 1440), (5, 6)] {
            let start = base + TimeDelta::minutes(offset_start);
            let end = base + TimeDelta::minutes(offset_end);
            let range = normalize_in(
                &format_for_input(start, &Utc),
                &format_for_input(end, &Utc),
                &Utc,
            )
            .unwrap();
            assert_eq!((range.start(), range.end()), (start, end));

            if start != end {
                assert!(
                    normalize_in(
                        &format_for_input(end, &Utc),
                        &format_for_input(start, &Utc),
                        &Utc
                    )
                    .is_err()
                );
            }
        }
    }

    #[test]
    fn format_for_input_uses_wall_clock_of_zone() {
        let minus_three = FixedOffset::west_opt(3 * 3600).unwrap();
        assert_eq!(
            format_for_input(utc("2024-01-01T02:00:00Z"), &minus_three),
            "2023-12-31T23:00"
        );
    }

    #[test]
    fn trailing_days_spans_requested_window() {
        let now = utc("2024-03-31T00:00:00Z");
        let range = trailing_days(now, 30);
        assert_eq!(range.start(), utc("2024-03-01T00:00:00Z"));
        assert_eq!(range.end(), now);
    }
}
