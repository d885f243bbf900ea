//! Authenticated transport.
//!
//! Authentication is a decorator: the same request goes through the same
//! inner transport, with an `Authorization: Bearer` header added on the way.

use async_trait::async_trait;

use crate::error::FeedError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// Wraps a transport and authenticates every request with a static token.
pub struct BearerAuth<T> {
    inner: T,
    token: String,
}

impl<T> BearerAuth<T> {
    pub fn new(inner: T, token: impl Into<String>) -> Self {
        Self {
            inner,
            token: token.into(),
        }
    }

    /// Get a reference to the inner transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> std::fmt::Debug for BearerAuth<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for BearerAuth<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FeedError> {
        let request = request.header("Authorization", format!("Bearer {}", self.token));
        self.inner.send(request).await
    }
}
