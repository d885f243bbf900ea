//! Rate-limit metadata reported by the upstream API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Seconds added on top of the reported reset instant before retrying,
/// to absorb clock skew between us and the upstream.
pub const RESET_SAFETY_MARGIN_SECS: i64 = 3;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";
pub const HEADER_POLL_INTERVAL: &str = "x-poll-interval";

/// Quota state as of the most recent upstream response.
///
/// Invariant: `remaining <= limit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Unix seconds at which the window resets.
    pub reset_at: i64,
    /// Minimum seconds between polls of one page, as suggested upstream.
    pub poll_interval: u32,
}

impl RateLimitState {
    /// Creates a state, clamping `remaining` to `limit`.
    pub fn new(limit: u32, remaining: u32, reset_at: i64, poll_interval: u32) -> Self {
        Self {
            limit,
            remaining: remaining.min(limit),
            reset_at,
            poll_interval,
        }
    }

    /// Computes the state carried by a response's headers.
    ///
    /// Missing headers count as 0. A header that is present but not a
    /// number keeps the value from `previous` and is reported back so the
    /// caller can log it.
    pub fn from_headers<'a>(
        previous: &RateLimitState,
        header: impl Fn(&str) -> Option<&'a str>,
    ) -> (Self, Vec<CoreError>) {
        let mut faults = Vec::new();
        let mut field = |name: &str, fallback: i64| match parse_header(name, header(name)) {
            Ok(value) => value,
            Err(e) => {
                faults.push(e);
                fallback
            }
        };

        let limit = field(HEADER_LIMIT, previous.limit as i64);
        let remaining = field(HEADER_REMAINING, previous.remaining as i64);
        let reset_at = field(HEADER_RESET, previous.reset_at);
        let poll_interval = field(HEADER_POLL_INTERVAL, previous.poll_interval as i64);

        let state = Self::new(
            clamp_u32(limit),
            clamp_u32(remaining),
            reset_at,
            clamp_u32(poll_interval),
        );
        (state, faults)
    }

    /// Requests consumed in the current window.
    pub fn requests_used(&self) -> u32 {
        self.limit.saturating_sub(self.remaining)
    }

    /// The reset instant, if it is representable.
    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.reset_at, 0)
    }

    /// Seconds to wait before retrying after being rate limited:
    /// `reset_at - now + 3`. May be zero or negative when the reset
    /// instant is already well in the past. Saturates instead of
    /// overflowing on absurd reset values.
    pub fn seconds_until_retry(&self, now: DateTime<Utc>) -> i64 {
        self.reset_at
            .saturating_sub(now.timestamp())
            .saturating_add(RESET_SAFETY_MARGIN_SECS)
    }

    /// Refresh interval suggested by the upstream for polling `pages`
    /// pages, in seconds. Zero when the upstream gave no hint.
    pub fn suggested_interval(&self, pages: u32) -> u64 {
        self.poll_interval as u64 * pages as u64
    }
}

/// Parses one numeric header. Absent or blank headers are 0.
pub fn parse_header(name: &str, value: Option<&str>) -> Result<i64> {
    match value.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw.parse::<i64>().map_err(|_| CoreError::MalformedHeader {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}
