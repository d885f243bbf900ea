//! HubGraph Core - Events and rate-limit bookkeeping
//!
//! This crate holds the data that flows between the feed client, the graph
//! builder and the refresh scheduler:
//!
//! - [`Event`]: one activity record decoded from the upstream feed
//! - [`EventKind`]: the fixed event-type classification table used by the
//!   frontend to colour nodes
//! - [`RateLimitState`]: quota metadata extracted from response headers
//! - RFC 822 timestamp helpers for the published `lastUpdate` field
//!
//! # Example
//!
//! ```
//! use hubgraph_core::EventKind;
//!
//! let kind = EventKind::classify("PushEvent");
//! assert_eq!(kind.group(), 12);
//! assert_eq!(kind.label(), "New commit pushed");
//! ```

mod error;
mod event;
mod kind;
mod rate_limit;
pub mod timestamp;

pub use error::{CoreError, Result};
pub use event::{decode_events, Event};
pub use kind::EventKind;
pub use rate_limit::{
    parse_header, RateLimitState, HEADER_LIMIT, HEADER_POLL_INTERVAL, HEADER_REMAINING,
    HEADER_RESET, RESET_SAFETY_MARGIN_SECS,
};
