//! Timestamp helpers.
//!
//! Persisted instants are RFC 3339 strings with millisecond precision
//! (`2024-05-01T10:00:00.123Z`). Fresh timestamps are truncated to the same
//! precision so a persist/restore cycle reproduces them exactly.

use chrono::{DateTime, SubsecRound, Utc};

/// Current instant truncated to milliseconds.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Serde adapter for `DateTime<Utc>` as an RFC 3339 millisecond string.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    ///
    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Parse any RFC 3339 timestamp and normalize it to UTC.
    ///
    /// # Errors
    /// Returns a deserializer error if the string is not RFC 3339.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
