//! Feed client configuration.

use crate::error::{FeedError, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the upstream feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// API root; pages are requested from `{api_url}/events?page=N`.
    pub api_url: String,
    /// Bearer token. `None` means unauthenticated requests.
    pub token: Option<String>,
    /// Upper bound for one page request, connect to last byte.
    pub timeout: Duration,
    /// Sent as `User-Agent`, which GitHub requires.
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("hubgraph/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FeedConfig {
    /// Sets the bearer token. Empty or blank tokens mean unauthenticated.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Checks the values that would otherwise fail at request time.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(FeedError::Config(format!(
                "api url must be http(s), got {:?}",
                self.api_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(FeedError::Config("timeout must be positive".into()));
        }
        Ok(())
    }

    /// URL of one feed page.
    pub fn page_url(&self, page: u32) -> String {
        format!("{}/events?page={}", self.api_url.trim_end_matches('/'), page)
    }
}
