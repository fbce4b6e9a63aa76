//! Timestamps that GitHub sends either as Unix epochs or as RFC 3339 strings.

use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

/// A point in time decoded from an epoch number, a numeric string or an
/// RFC 3339 string. Always encoded as RFC 3339, with fractional seconds only
/// when the value has them.
///
/// Epoch values too large to be seconds (past the year 3000) are read as
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Wraps a UTC date-time.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(time)
    }

    /// Builds a timestamp from a Unix epoch, applying the milliseconds rule.
    pub fn from_epoch(value: i64) -> Option<Self> {
        match Utc.timestamp_opt(value, 0).single() {
            Some(time) if time.year() <= 3000 => Some(Self(time)),
            _ => Utc.timestamp_millis_opt(value).single().map(Self),
        }
    }

    /// Parses an RFC 3339 string.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|t| Self(t.with_timezone(&Utc)))
    }

    /// Returns the wrapped date-time.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self(time)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a Unix timestamp or an RFC 3339 date-time string")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Timestamp, E> {
        Timestamp::from_epoch(value)
            .ok_or_else(|| E::custom(format!("timestamp {} is out of range", value)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Timestamp, E> {
        let value = i64::try_from(value)
            .map_err(|_| E::custom(format!("timestamp {} is out of range", value)))?;
        self.visit_i64(value)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Timestamp, E> {
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(E::invalid_value(de::Unexpected::Float(value), &self));
        }
        self.visit_i64(value as i64)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Timestamp, E> {
        let trimmed = value.trim();
        if let Ok(epoch) = trimmed.parse::<i64>() {
            return self.visit_i64(epoch);
        }
        Timestamp::parse_rfc3339(trimmed)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(value), &self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn utc(rfc3339: &str) -> Timestamp {
        Timestamp::parse_rfc3339(rfc3339).unwrap()
    }

    #[test_case("1700000000", "2023-11-14T22:13:20Z" ; "epoch number")]
    #[test_case("\"1700000000\"", "2023-11-14T22:13:20Z" ; "numeric string")]
    #[test_case("\"2023-11-14T22:13:20Z\"", "2023-11-14T22:13:20Z" ; "rfc3339 utc")]
    #[test_case("\"2023-11-14T23:13:20+01:00\"", "2023-11-14T22:13:20Z" ; "rfc3339 offset")]
    #[test_case("1700000000000", "2023-11-14T22:13:20Z" ; "epoch milliseconds")]
    fn test_decode(json: &str, expected: &str) {
        let decoded: Timestamp = serde_json::from_str(json).unwrap();
        assert_eq!(decoded, utc(expected));
    }

    #[test]
    fn test_encodes_rfc3339() {
        let encoded = serde_json::to_string(&utc("2024-01-02T03:04:05Z")).unwrap();
        assert_eq!(encoded, "\"2024-01-02T03:04:05Z\"");
    }

    #[test_case("\"2023-11-14T22:13:20.123Z\"", "\"2023-11-14T22:13:20.123Z\"" ; "fractional rfc3339")]
    #[test_case("1700000000123", "\"2023-11-14T22:13:20.123Z\"" ; "epoch milliseconds")]
    #[test_case("\"2023-11-14T22:13:20.000123456Z\"", "\"2023-11-14T22:13:20.000123456Z\"" ; "nanoseconds")]
    fn test_sub_second_precision_survives_encoding(json: &str, expected: &str) {
        let decoded: Timestamp = serde_json::from_str(json).unwrap();
        let encoded = serde_json::to_string(&decoded).unwrap();
        assert_eq!(encoded, expected);
        assert_eq!(serde_json::from_str::<Timestamp>(&encoded).unwrap(), decoded);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Timestamp>("\"yesterday\"").is_err());
        assert!(serde_json::from_str::<Timestamp>("true").is_err());
    }

    #[test]
    fn test_optional_field() {
        #[derive(Deserialize)]
        struct Seat {
            #[serde(default)]
            last_activity_at: Option<Timestamp>,
        }

        let seat: Seat = serde_json::from_str(r#"{"last_activity_at": null}"#).unwrap();
        assert!(seat.last_activity_at.is_none());
        let seat: Seat = serde_json::from_str("{}").unwrap();
        assert!(seat.last_activity_at.is_none());
    }
}
