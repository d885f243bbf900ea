//! Transport boundary for all upstream HTTP I/O.
//!
//! The feed only ever issues `GET` requests, so requests carry a URL and
//! headers and nothing else.

use async_trait::async_trait;

use crate::error::FeedError;

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by [`header_get`].
pub type HttpHeaders = Vec<(String, String)>;

/// A `GET` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HttpHeaders,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

/// Sends requests to the upstream.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FeedError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub mod reqwest_transport {
    use super::*;

    use std::time::Duration;

    /// A real HTTP transport backed by reqwest.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        /// Builds a client whose requests give up after `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self, FeedError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| FeedError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FeedError> {
            let mut builder = self.client.get(&request.url);
            for (k, v) in request.headers {
                builder = builder.header(k, v);
            }

            let resp = builder
                .send()
                .await
                .map_err(|e| FeedError::Transport(e.to_string()))?;

            let status = resp.status().as_u16();
            let headers: HttpHeaders = resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            let body = resp
                .bytes()
                .await
                .map_err(|e| FeedError::Transport(e.to_string()))?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

// ---------- Test-only mock transport ----------

#[cfg(any(test, feature = "test-util"))]
mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// In-memory transport for tests: no sockets, no loopback servers.
    ///
    /// Responses are registered per URL and handed out in FIFO order.
    /// A registered `Err` simulates a transport failure.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        inner: Arc<Mutex<MockTransportInner>>,
    }

    #[derive(Default)]
    struct MockTransportInner {
        routes: HashMap<String, VecDeque<Result<HttpResponse, String>>>,
        requests: Vec<HttpRequest>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a response for a URL.
        pub fn push_response(&self, url: impl Into<String>, response: HttpResponse) {
            self.lock()
                .routes
                .entry(url.into())
                .or_default()
                .push_back(Ok(response));
        }

        /// Register a transport failure for a URL.
        pub fn push_failure(&self, url: impl Into<String>, message: impl Into<String>) {
            self.lock()
                .routes
                .entry(url.into())
                .or_default()
                .push_back(Err(message.into()));
        }

        /// Every request sent so far, in order.
        #[must_use]
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.lock().requests.clone()
        }

        /// URLs of every request sent so far, in order.
        #[must_use]
        pub fn requested_urls(&self) -> Vec<String> {
            self.lock().requests.iter().map(|r| r.url.clone()).collect()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockTransportInner> {
            self.inner
                .lock()
                .expect("mock transport lock should not be poisoned")
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FeedError> {
            let mut inner = self.lock();

            let url = request.url.clone();
            inner.requests.push(request);

            match inner.routes.get_mut(&url).and_then(|q| q.pop_front()) {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(message)) => Err(FeedError::Transport(message)),
                None => Err(FeedError::NoMockResponse {
                    method: "GET".to_string(),
                    url,
                }),
            }
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("ETag".to_string(), "W/\"abc\"".to_string()),
            ("etag".to_string(), "W/\"def\"".to_string()),
        ];
        assert_eq!(header_get(&headers, "etag"), Some("W/\"abc\""));
        assert_eq!(header_get(&headers, "ETAG"), Some("W/\"abc\""));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[tokio::test]
    async fn mock_transport_replays_in_order_and_records_requests() {
        let mock = MockTransport::new();
        mock.push_response("http://x/a", HttpResponse::new(200).with_body("first"));
        mock.push_failure("http://x/a", "connection reset");

        let first = mock.send(HttpRequest::get("http://x/a")).await.unwrap();
        assert_eq!(first.body, b"first");

        let second = mock.send(HttpRequest::get("http://x/a")).await;
        assert!(matches!(second, Err(FeedError::Transport(_))));

        let third = mock.send(HttpRequest::get("http://x/a")).await;
        assert!(matches!(third, Err(FeedError::NoMockResponse { .. })));

        assert_eq!(mock.requests().len(), 3);
    }
}
