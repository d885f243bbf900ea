//! Progress events emitted while refreshing.
//!
//! The scheduler logs through `tracing` on its own; these events exist for
//! interactive front ends that want to render a live status line.

use std::time::Duration;

/// Progress events emitted by the refresh scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RefreshProgress {
    /// A cycle is starting. `bootstrap` is set for the very first cycle.
    CycleStarted { bootstrap: bool },

    /// One page of the feed was fetched.
    PageFetched {
        /// Page number (1-indexed).
        page: u32,
        /// Pages requested per cycle.
        pages: u32,
        /// Events on this page.
        events: usize,
    },

    /// Waiting for the rate-limit window to reset. Emitted once per second.
    RateLimitCountdown {
        /// Seconds left before the cycle restarts from page 1.
        seconds_left: i64,
        /// Restart number within this cycle (1-indexed).
        attempt: u32,
    },

    /// A page request failed in transit and will be retried.
    TransportRetry {
        page: u32,
        attempt: u32,
        retry_after: Duration,
        error: String,
    },

    /// The upstream reported no change; the cycle was abandoned.
    NoNewData,

    /// A snapshot was published.
    CycleCompleted {
        version: u64,
        nodes: usize,
        links: usize,
        requests_used: u32,
        max_requests: u32,
    },

    /// The cycle ended without publishing for a reason other than no new data.
    CycleFailed { error: String },

    /// The refresh interval was (re)computed.
    IntervalResolved { seconds: u64 },

    /// Idle between cycles. Emitted once per second.
    NextRefreshIn {
        seconds: i64,
        requests_used: u32,
        max_requests: u32,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(RefreshProgress) + Send + Sync>;

/// Calls `callback` with `event` if a callback is set.
#[inline]
pub(crate) fn emit(callback: Option<&ProgressCallback>, event: RefreshProgress) {
    if let Some(cb) = callback {
        cb(event);
    }
}
