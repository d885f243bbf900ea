//! HubGraph Feed - Client for the paginated upstream event feed
//!
//! The feed is GitHub's public `/events` endpoint. This crate knows how to
//! request one page of it, how to read the rate-limit headers that come
//! back, and how to map the response status to a [`FetchOutcome`].
//!
//! All HTTP I/O goes through the [`HttpTransport`] trait so the source can
//! be exercised in tests without sockets.

mod auth;
mod config;
mod error;
mod http;
mod source;

pub use auth::BearerAuth;
pub use config::{FeedConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{FeedError, Result};
pub use http::reqwest_transport::ReqwestTransport;
pub use http::{header_get, HttpHeaders, HttpRequest, HttpResponse, HttpTransport};
pub use source::{EventSource, FetchOutcome};

#[cfg(any(test, feature = "test-util"))]
pub use http::MockTransport;
