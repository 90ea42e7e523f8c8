#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

const EPOCH_RFC3339: &str = "1970-01-01T00:00:00Z";

// Producers upstream sometimes emit naive ISO-8601 (no offset); those are read as UTC.
const NAIVE_T: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_T_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const NAIVE_SPACE: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const NAIVE_SPACE_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid timestamp: {0:?}")]
pub struct TimestampError(pub String);

/// A point in time, serialized as RFC 3339.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Seconds since the unix epoch; out-of-range values collapse to the epoch.
    pub fn from_unix_seconds(secs: i64) -> Self {
        Self(OffsetDateTime::from_unix_timestamp(secs).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    pub fn as_offset(&self) -> OffsetDateTime {
        self.0
    }

    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        let trimmed = raw.trim();
        if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Ok(Self(value));
        }
        for format in [NAIVE_T_FRACTION, NAIVE_T, NAIVE_SPACE_FRACTION, NAIVE_SPACE] {
            if let Ok(value) = PrimitiveDateTime::parse(trimmed, format) {
                return Ok(Self(value.assume_utc()));
            }
        }
        Err(TimestampError(raw.to_string()))
    }

    pub fn to_rfc3339(&self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| EPOCH_RFC3339.to_string())
    }

    /// Time elapsed from `self` until `later` (negative if `later` is earlier).
    pub fn until(&self, later: Timestamp) -> Duration {
        later.0 - self.0
    }

    pub fn saturating_sub(&self, span: Duration) -> Timestamp {
        Self(self.0.checked_sub(span).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}
