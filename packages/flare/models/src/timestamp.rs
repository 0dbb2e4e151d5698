//! Absolute-time encoding used on the wire.
//!
//! Outgoing timestamps are always RFC 3339 in UTC with millisecond
//! precision (`2024-01-01T00:00:00.000Z`). Incoming timestamps are
//! accepted either fully qualified or zone-less; the backend stores naive
//! UTC datetimes and serializes them without an offset.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

/// Zone-less layouts the backend is known to emit. All are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Encodes an instant as RFC 3339 UTC with a `Z` suffix.
#[must_use]
pub fn encode(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a timestamp received from the API.
///
/// RFC 3339 values keep their offset; zone-less values are taken as UTC.
#[must_use]
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `serde(with = ...)` adapter for required timestamps.
pub mod required {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc};

    /// Serializes with [`super::encode`].
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(*dt))
    }

    /// Deserializes with [`super::parse`].
    ///
    /// # Errors
    ///
    /// Fails if the value is not a string or is not a recognizable
    /// timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_or_error::<D>(&raw)
    }
}

/// `serde(with = ...)` adapter for optional timestamps (`null` or absent).
pub mod optional {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc};

    /// Serializes `Some` with [`super::encode`] and `None` as `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => serializer.serialize_str(&super::encode(*dt)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes `null` as `None` and strings with [`super::parse`].
    ///
    /// # Errors
    ///
    /// Fails if a present value is not a recognizable timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse_or_error::<D>(&raw))
            .transpose()
    }
}

fn parse_or_error<'de, D: Deserializer<'de>>(raw: &str) -> Result<DateTime<Utc>, D::Error> {
    parse(raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_millis_and_z_suffix() {
        let dt = parse("2024-01-15T14:30:00").unwrap();
        assert_eq!(encode(dt), "2024-01-15T14:30:00.000Z");
    }

    #[test]
    fn parses_naive_backend_timestamp_as_utc() {
        let dt = parse("2024-01-15T14:30:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_fractional_seconds() {
        let dt = parse("2024-01-15T14:30:00.250").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn respects_explicit_offset() {
        let dt = parse("2024-01-15T14:30:00+02:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 12:30:00 UTC");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("yesterday").is_none());
        assert!(parse("").is_none());
    }
}
