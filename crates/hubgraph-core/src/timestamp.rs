//! RFC 822 timestamps with a numeric zone, e.g. `02 Jan 06 15:04 -0700`.
//!
//! This is the format the frontend expects in `lastUpdate`. It has minute
//! precision, so parsing a formatted value drops the seconds.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserializer, Serializer};

use crate::error::{CoreError, Result};

/// chrono format string for RFC 822 with numeric zone.
pub const RFC822Z: &str = "%d %b %y %H:%M %z";

/// Formats a timestamp as RFC 822 with numeric zone.
pub fn format_rfc822z<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(RFC822Z).to_string()
}

/// Parses an RFC 822 timestamp with numeric zone.
pub fn parse_rfc822z(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), RFC822Z).map_err(|e| CoreError::TimestampParse {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Seconds from `now` until `last_update + interval_secs`, where
/// `last_update` is RFC 822 as published. Negative once the refresh is due.
pub fn seconds_until_refresh<Tz: TimeZone>(
    last_update: &str,
    interval_secs: i64,
    now: &DateTime<Tz>,
) -> Result<i64> {
    let next = parse_rfc822z(last_update)? + chrono::Duration::seconds(interval_secs);
    Ok(next.timestamp() - now.timestamp())
}

/// Serde adapter for `DateTime<FixedOffset>` fields rendered as RFC 822.
pub mod serde_rfc822z {
    use super::*;

    pub fn serialize<S: Serializer>(
        at: &DateTime<FixedOffset>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&format_rfc822z(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<DateTime<FixedOffset>, D::Error> {
        let raw: String = serde::Deserialize::deserialize(d)?;
        parse_rfc822z(&raw).map_err(serde::de::Error::custom)
    }
}

/// Like [`serde_rfc822z`], for optional timestamps. `None` is rendered as an
/// empty string, which is also what an empty snapshot carries.
pub mod serde_rfc822z_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        at: &Option<DateTime<FixedOffset>>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match at {
            Some(at) => s.serialize_str(&format_rfc822z(at)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error> {
        let raw: String = serde::Deserialize::deserialize(d)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        parse_rfc822z(&raw).map(Some).map_err(serde::de::Error::custom)
    }
}
