#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Solar flare record types, date ranges, and analytics aggregates.
//!
//! These are the shapes exchanged with the solar flare API. Records are
//! read-only to the client; the only value the client constructs and sends
//! is a [`DateRange`].

pub mod timestamp;

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A single stored solar flare as returned by `GET /solar-flares`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlareRecord {
    /// Store-assigned row id.
    pub id: i64,
    /// Upstream flare identifier (e.g., `"2024-01-01T00:00:00-FLR-001"`).
    pub flr_id: String,
    /// When the flare began.
    #[serde(with = "timestamp::required")]
    pub begin_time: DateTime<Utc>,
    /// When the flare peaked.
    #[serde(with = "timestamp::required")]
    pub peak_time: DateTime<Utc>,
    /// When the flare ended, if known.
    #[serde(default, with = "timestamp::optional")]
    pub end_time: Option<DateTime<Utc>>,
    /// GOES class (e.g., `"M1.2"`).
    pub class_type: String,
    /// Heliographic source location (e.g., `"N15W30"`).
    #[serde(default)]
    pub source_location: Option<String>,
    /// NOAA active region number.
    #[serde(default)]
    pub active_region_num: Option<i64>,
    /// Linked space-weather events, passed through untouched.
    #[serde(default)]
    pub linked_events: Option<serde_json::Value>,
}

/// A validated, absolute time window.
///
/// Serializes as `{"start_date": ..., "end_date": ...}` using the
/// [`timestamp::encode`] format, which doubles as the query string shape
/// for range-filtered endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateRangeParams", into = "DateRangeParams")]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDateRangeError::StartAfterEnd`] if the bounds are
    /// out of order.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidDateRangeError> {
        if start > end {
            return Err(InvalidDateRangeError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// The window of length `span` ending at `end`. Negative spans are
    /// treated as empty.
    #[must_use]
    pub fn trailing(end: DateTime<Utc>, span: TimeDelta) -> Self {
        let start = end
            .checked_sub_signed(span.max(TimeDelta::zero()))
            .unwrap_or(end);
        Self { start, end }
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive upper bound.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} .. {}",
            timestamp::encode(self.start),
            timestamp::encode(self.end)
        )
    }
}

/// Wire form of a [`DateRange`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeParams {
    /// Encoded lower bound.
    pub start_date: String,
    /// Encoded upper bound.
    pub end_date: String,
}

impl From<DateRange> for DateRangeParams {
    fn from(range: DateRange) -> Self {
        Self {
            start_date: timestamp::encode(range.start),
            end_date: timestamp::encode(range.end),
        }
    }
}

impl TryFrom<DateRangeParams> for DateRange {
    type Error = InvalidDateRangeError;

    fn try_from(params: DateRangeParams) -> Result<Self, Self::Error> {
        let start = timestamp::parse(&params.start_date).ok_or_else(|| {
            InvalidDateRangeError::Unparseable {
                value: params.start_date.clone(),
            }
        })?;
        let end = timestamp::parse(&params.end_date).ok_or_else(|| {
            InvalidDateRangeError::Unparseable {
                value: params.end_date.clone(),
            }
        })?;
        Self::new(start, end)
    }
}

/// Error returned when a [`DateRange`] cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidDateRangeError {
    /// A bound was not a recognizable timestamp.
    Unparseable {
        /// The rejected input.
        value: String,
    },
    /// The lower bound is after the upper bound.
    StartAfterEnd {
        /// Requested lower bound.
        start: DateTime<Utc>,
        /// Requested upper bound.
        end: DateTime<Utc>,
    },
}

impl std::fmt::Display for InvalidDateRangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable { value } => write!(f, "invalid timestamp: {value:?}"),
            Self::StartAfterEnd { start, end } => write!(
                f,
                "start {} is after end {}",
                timestamp::encode(*start),
                timestamp::encode(*end)
            ),
        }
    }
}

impl std::error::Error for InvalidDateRangeError {}

/// Response of `GET /analysis/peak-frequency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakFrequency {
    /// Echoed lower bound.
    pub start_date: String,
    /// Echoed upper bound.
    pub end_date: String,
    /// Most frequent GOES class, `None` when the range is empty.
    pub most_common_class: Option<String>,
    /// Flare count per class.
    #[serde(default)]
    pub peak_frequencies: BTreeMap<String, u64>,
}

/// Response of `GET /analysis/activity-summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Echoed lower bound.
    pub start_date: String,
    /// Echoed upper bound.
    pub end_date: String,
    /// Number of flares that began inside the range.
    pub total_flares: u64,
    /// Most frequent class, or `"No data"`.
    pub peak_intensity_class: String,
    /// Flare count per class.
    #[serde(default)]
    pub intensity_counts: BTreeMap<String, u64>,
}

/// Response of `GET /analysis/longest-flare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongestFlare {
    /// Identifier of the longest flare.
    pub flr_id: String,
    /// Its duration.
    pub duration_seconds: f64,
    /// Its GOES class.
    pub class_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        timestamp::parse(s).unwrap()
    }

    #[test]
    fn deserializes_backend_record() {
        let record: FlareRecord = serde_json::from_value(serde_json::json!({
            "id": 7,
            "flr_id": "2024-01-01T00:10:00-FLR-001",
            "begin_time": "2024-01-01T00:10:00",
            "peak_time": "2024-01-01T00:25:00",
            "end_time": null,
            "class_type": "M1.2",
            "source_location": "N15W30",
            "active_region_num": 13536,
            "linked_events": [{"activityID": "2024-01-01T01:00:00-CME-001"}]
        }))
        .unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.begin_time, utc("2024-01-01T00:10:00Z"));
        assert!(record.end_time.is_none());
        assert_eq!(record.active_region_num, Some(13536));
    }

    #[test]
    fn missing_optional_fields_default() {
        let record: FlareRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "flr_id": "FLR-1",
            "begin_time": "2024-01-01T00:00:00",
            "peak_time": "2024-01-01T00:05:00",
            "class_type": "C3.4"
        }))
        .unwrap();

        assert!(record.end_time.is_none());
        assert!(record.source_location.is_none());
        assert!(record.linked_events.is_none());
    }

    #[test]
    fn date_range_serializes_as_wire_params() {
        let range =
            DateRange::new(utc("2024-01-01T00:00:00Z"), utc("2024-01-02T00:00:00Z")).unwrap();
        assert_eq!(
            serde_json::to_value(range).unwrap(),
            serde_json::json!({
                "start_date": "2024-01-01T00:00:00.000Z",
                "end_date": "2024-01-02T00:00:00.000Z",
            })
        );
    }

    #[test]
    fn date_range_rejects_reversed_bounds() {
        let err =
            DateRange::new(utc("2024-02-01T00:00:00Z"), utc("2024-01-01T00:00:00Z")).unwrap_err();
        assert!(matches!(err, InvalidDateRangeError::StartAfterEnd { .. }));
    }

    #[test]
    fn trailing_window_ends_at_anchor() {
        let now = utc("2024-03-31T12:00:00Z");
        let range = DateRange::trailing(now, TimeDelta::days(30));
        assert_eq!(range.start(), utc("2024-03-01T12:00:00Z"));
        assert_eq!(range.end(), now);

        let empty = DateRange::trailing(now, TimeDelta::days(-1));
        assert_eq!(empty.start(), empty.end());
    }

    #[test]
    fn date_range_deserialization_enforces_ordering() {
        let result: Result<DateRange, _> = serde_json::from_value(serde_json::json!({
            "start_date": "2024-02-01T00:00:00Z",
            "end_date": "2024-01-01T00:00:00Z",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_peak_frequency_has_no_class() {
        let peak: PeakFrequency = serde_json::from_value(serde_json::json!({
            "start_date": "2024-01-01",
            "end_date": "2024-01-02",
            "most_common_class": null,
            "peak_frequencies": {}
        }))
        .unwrap();
        assert!(peak.most_common_class.is_none());
        assert!(peak.peak_frequencies.is_empty());
    }
}
