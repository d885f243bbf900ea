//! Scheduler error types.

use hubgraph_feed::FeedError;
use thiserror::Error;

/// Why a refresh cycle ended without publishing.
///
/// "No new data" is not an error; see [`crate::CycleOutcome::NoNewData`].
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("feed request failed: {0}")]
    Feed(#[from] FeedError),

    #[error("still rate limited after {retries} retries")]
    RateLimitExhausted { retries: u32 },

    #[error("refresh cancelled")]
    Cancelled,

    #[error("invalid scheduler configuration: {0}")]
    Config(String),
}

impl CycleError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, CycleError>;
