//! Feed client error types.

use thiserror::Error;

/// Errors that end a single page request.
///
/// Rate limiting and "not modified" are not errors: they are ordinary
/// [`crate::FetchOutcome`]s.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },

    #[error("upstream answered {status} for page {page}")]
    UnexpectedStatus { status: u16, page: u32 },

    #[error("page numbers start at 1, got {0}")]
    InvalidPage(u32),

    #[error("invalid feed configuration: {0}")]
    Config(String),
}

impl FeedError {
    /// Whether retrying the same request later may succeed.
    ///
    /// Network failures and upstream 5xx answers are transient; anything
    /// else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            Self::NoMockResponse { .. } | Self::InvalidPage(_) | Self::Config(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(FeedError::Transport("connection reset".into()).is_retryable());
        assert!(FeedError::UnexpectedStatus { status: 502, page: 1 }.is_retryable());
        assert!(!FeedError::UnexpectedStatus { status: 404, page: 1 }.is_retryable());
        assert!(!FeedError::InvalidPage(0).is_retryable());
    }
}
