// arbiter-core/src/model/time.rs
// ============================================================================
// Module: Timestamp
// Description: RFC3339 event time, the only clock the pipeline is allowed to
//              consult for decisions.
// Purpose: Parse and compare event-supplied timestamps without ever reading
//          the wall clock on the decision path.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Every timestamp that can influence a decision (gate cooldown, tenant-rate
//! bucket, `evaluation_time`) comes from `event.occurred_at`, parsed once at
//! the schema-validation stage. Wall-clock reads are confined to audit `ts`
//! and file I/O, neither of which is modeled by this type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// An RFC3339 instant used exclusively for decision-making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    /// Milliseconds since the Unix epoch.
    unix_millis: i64,
}

impl Timestamp {
    /// Parses an RFC3339 timestamp string.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::InvalidFormat`] when the string is not valid RFC3339.
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        let parsed = OffsetDateTime::parse(raw, &Rfc3339)
            .map_err(|err| TimestampError::InvalidFormat(err.to_string()))?;
        let unix_millis = parsed.unix_timestamp() * 1000 + i64::from(parsed.millisecond());
        Ok(Self {
            unix_millis,
        })
    }

    /// Builds a timestamp directly from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_unix_millis(unix_millis: i64) -> Self {
        Self {
            unix_millis,
        }
    }

    /// Returns milliseconds since the Unix epoch.
    #[must_use]
    pub const fn unix_millis(self) -> i64 {
        self.unix_millis
    }

    /// Returns the minute bucket (`floor(unix_seconds / 60)`) for tenant-rate keying.
    #[must_use]
    pub const fn minute_bucket(self) -> i64 {
        self.unix_millis.div_euclid(60_000)
    }

    /// Adds a millisecond offset, returning a new timestamp.
    #[must_use]
    pub const fn plus_millis(self, millis: i64) -> Self {
        Self {
            unix_millis: self.unix_millis + millis,
        }
    }

    /// Returns the RFC3339 string form.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        let secs = self.unix_millis.div_euclid(1000);
        let millis = self.unix_millis.rem_euclid(1000);
        let nanos = millis * 1_000_000;
        OffsetDateTime::from_unix_timestamp(secs)
            .ok()
            .and_then(|dt| dt.replace_nanosecond(u32::try_from(nanos).ok()?).ok())
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_default()
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Errors raised when parsing an event timestamp.
#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    /// The input was not a valid RFC3339 timestamp.
    #[error("invalid RFC3339 timestamp: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_round_trips() {
        let ts = Timestamp::parse("2026-02-14T00:00:00Z").unwrap();
        assert_eq!(ts.unix_millis(), 1_771_027_200_000);
    }

    #[test]
    fn rejects_invalid_format() {
        assert!(Timestamp::parse("not-a-timestamp").is_err());
        assert!(Timestamp::parse("2026-02-14").is_err());
    }

    #[test]
    fn minute_bucket_floors() {
        let ts = Timestamp::parse("2026-02-14T00:00:59Z").unwrap();
        let next = Timestamp::parse("2026-02-14T00:01:00Z").unwrap();
        assert_eq!(ts.minute_bucket() + 1, next.minute_bucket());
    }

    #[test]
    fn ordering_respects_time() {
        let a = Timestamp::parse("2026-02-14T00:00:00Z").unwrap();
        let b = Timestamp::parse("2026-02-14T00:00:01Z").unwrap();
        assert!(a < b);
    }
}
