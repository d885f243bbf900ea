//! Paginated event source.

use std::collections::HashMap;
use std::sync::Arc;

use hubgraph_core::{decode_events, Event, RateLimitState};
use tracing::{debug, warn};

use crate::auth::BearerAuth;
use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpTransport};

/// How one page request ended, short of a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx: the decoded events of the page (possibly none).
    Success(Vec<Event>),
    /// 304: nothing changed since the previous poll of this page.
    NoNewContent,
    /// 403 or 429: the quota is exhausted until the reset instant.
    RateLimited,
}

/// Requests pages of the upstream feed and tracks the quota it reports.
///
/// The source is the only writer of its [`RateLimitState`]; it is updated
/// from the headers of every response, whatever the status. Taking
/// `&mut self` for fetches keeps it that way.
pub struct EventSource {
    transport: Arc<dyn HttpTransport>,
    config: FeedConfig,
    rate_limit: RateLimitState,
    /// `ETag` per page as of the last published snapshot, replayed as
    /// `If-None-Match`.
    etags: HashMap<u32, String>,
    /// `ETag`s seen during the current cycle, not replayed until committed.
    staged_etags: HashMap<u32, String>,
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("api_url", &self.config.api_url)
            .field("authenticated", &self.is_authenticated())
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

impl EventSource {
    /// Creates a source backed by reqwest, authenticated when the config
    /// carries a token.
    pub fn connect(config: FeedConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::with_timeout(config.timeout)?;
        Ok(Self::with_transport(transport, config))
    }

    /// Creates a source on top of an arbitrary transport.
    ///
    /// With a token in `config` the transport is wrapped in [`BearerAuth`];
    /// without one requests go out unauthenticated.
    pub fn with_transport<T: HttpTransport + 'static>(transport: T, config: FeedConfig) -> Self {
        let transport: Arc<dyn HttpTransport> = match config.token.clone() {
            Some(token) => Arc::new(BearerAuth::new(transport, token)),
            None => Arc::new(transport),
        };

        Self {
            transport,
            config,
            rate_limit: RateLimitState::default(),
            etags: HashMap::new(),
            staged_etags: HashMap::new(),
        }
    }

    /// Whether requests carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.config.token.is_some()
    }

    /// Quota state as of the last response.
    pub fn rate_limit(&self) -> RateLimitState {
        self.rate_limit
    }

    /// Makes the `ETag`s seen since the last commit the ones replayed as
    /// `If-None-Match`.
    ///
    /// Call this once the pages they came from have been published; a 304
    /// against an unpublished page would hide its content for good.
    pub fn commit_etags(&mut self) {
        self.etags.extend(self.staged_etags.drain());
    }

    /// Forgets the `ETag`s seen since the last commit.
    pub fn discard_etags(&mut self) {
        self.staged_etags.clear();
    }

    /// Requests one page of the feed. Pages start at 1.
    ///
    /// Errors are transport failures and unexpected statuses only; rate
    /// limiting and "not modified" come back as a [`FetchOutcome`].
    pub async fn fetch_page(&mut self, page: u32) -> Result<FetchOutcome> {
        if page == 0 {
            return Err(FeedError::InvalidPage(page));
        }

        let url = self.config.page_url(page);
        let mut request = HttpRequest::get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", self.config.user_agent.as_str());
        if let Some(etag) = self.etags.get(&page) {
            request = request.header("If-None-Match", etag.as_str());
        }

        debug!("GET {}", url);
        let response = self.transport.send(request).await?;

        let (rate_limit, faults) =
            RateLimitState::from_headers(&self.rate_limit, |name| response.header(name));
        for fault in faults {
            warn!("{}; keeping previous value", fault);
        }
        self.rate_limit = rate_limit;

        debug!(
            "Page {} answered {} (RL: {}/{} used)",
            page,
            response.status,
            rate_limit.requests_used(),
            rate_limit.limit
        );

        match response.status {
            304 => Ok(FetchOutcome::NoNewContent),
            403 | 429 => Ok(FetchOutcome::RateLimited),
            200..=299 => {
                if let Some(etag) = response.header("etag") {
                    self.staged_etags.insert(page, etag.to_string());
                }
                Ok(FetchOutcome::Success(decode_events(&response.body)))
            }
            status => Err(FeedError::UnexpectedStatus { status, page }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{header_get, HttpResponse, MockTransport};

    const PAGE_1: &str = "http://feed.test/events?page=1";
    const PAGE_2: &str = "http://feed.test/events?page=2";

    fn config() -> FeedConfig {
        FeedConfig {
            api_url: "http://feed.test".into(),
            ..FeedConfig::default()
        }
    }

    fn with_quota(resp: HttpResponse, remaining: u32) -> HttpResponse {
        resp.with_header("X-RateLimit-Limit", "60")
            .with_header("X-RateLimit-Remaining", remaining.to_string())
            .with_header("X-RateLimit-Reset", "1700000000")
            .with_header("X-Poll-Interval", "60")
    }

    #[tokio::test]
    async fn test_success_decodes_events_and_updates_quota() {
        let mock = MockTransport::new();
        mock.push_response(
            PAGE_1,
            with_quota(HttpResponse::new(200), 59).with_body(
                r#"[{"id":"1","type":"PushEvent","repo":{"name":"a/b"}}]"#,
            ),
        );

        let mut source = EventSource::with_transport(mock.clone(), config());
        let outcome = source.fetch_page(1).await.unwrap();

        assert_eq!(
            outcome,
            FetchOutcome::Success(vec![Event::new("1", "PushEvent", "a/b")])
        );
        assert_eq!(source.rate_limit(), RateLimitState::new(60, 59, 1_700_000_000, 60));
        assert!(!source.is_authenticated());

        let sent = &mock.requests()[0];
        assert_eq!(header_get(&sent.headers, "authorization"), None);
        assert!(header_get(&sent.headers, "user-agent").is_some());
    }

    #[tokio::test]
    async fn test_forbidden_is_rate_limited() {
        let mock = MockTransport::new();
        mock.push_response(
            PAGE_1,
            with_quota(HttpResponse::new(403), 0).with_body(r#"{"message":"API rate limit exceeded"}"#),
        );

        let mut source = EventSource::with_transport(mock, config());
        assert_eq!(source.fetch_page(1).await.unwrap(), FetchOutcome::RateLimited);
        assert_eq!(source.rate_limit().remaining, 0);
        assert_eq!(source.rate_limit().requests_used(), 60);
    }

    #[tokio::test]
    async fn test_not_modified_is_no_new_content() {
        let mock = MockTransport::new();
        mock.push_response(PAGE_1, with_quota(HttpResponse::new(304), 58));

        let mut source = EventSource::with_transport(mock, config());
        assert_eq!(source.fetch_page(1).await.unwrap(), FetchOutcome::NoNewContent);
        assert_eq!(source.rate_limit().remaining, 58);
    }

    #[tokio::test]
    async fn test_etag_is_replayed_per_page() {
        let mock = MockTransport::new();
        mock.push_response(
            PAGE_1,
            HttpResponse::new(200)
                .with_header("ETag", "\"v1\"")
                .with_body("[]"),
        );
        mock.push_response(PAGE_2, HttpResponse::new(200).with_body("[]"));
        mock.push_response(PAGE_1, HttpResponse::new(304));

        let mut source = EventSource::with_transport(mock.clone(), config());
        source.fetch_page(1).await.unwrap();
        source.fetch_page(2).await.unwrap();
        source.commit_etags();
        assert_eq!(source.fetch_page(1).await.unwrap(), FetchOutcome::NoNewContent);

        let requests = mock.requests();
        assert_eq!(header_get(&requests[0].headers, "if-none-match"), None);
        assert_eq!(header_get(&requests[1].headers, "if-none-match"), None);
        assert_eq!(header_get(&requests[2].headers, "if-none-match"), Some("\"v1\""));
    }

    #[tokio::test]
    async fn test_uncommitted_etag_is_not_replayed() {
        let mock = MockTransport::new();
        for etag in ["\"v1\"", "\"v2\"", "\"v3\""] {
            mock.push_response(
                PAGE_1,
                HttpResponse::new(200).with_header("ETag", etag).with_body("[]"),
            );
        }
        mock.push_response(PAGE_1, HttpResponse::new(304));

        let mut source = EventSource::with_transport(mock.clone(), config());
        source.fetch_page(1).await.unwrap();
        source.fetch_page(1).await.unwrap();
        source.discard_etags();
        source.commit_etags();
        source.fetch_page(1).await.unwrap();
        source.commit_etags();
        source.fetch_page(1).await.unwrap();

        let requests = mock.requests();
        let sent: Vec<Option<&str>> = requests
            .iter()
            .map(|r| header_get(&r.headers, "if-none-match"))
            .collect();
        assert_eq!(sent, vec![None, None, None, Some("\"v3\"")]);
    }

    #[tokio::test]
    async fn test_token_authenticates_requests() {
        let mock = MockTransport::new();
        mock.push_response(PAGE_1, HttpResponse::new(200).with_body("[]"));

        let config = config().with_token(Some("ghp_token".into()));
        let mut source = EventSource::with_transport(mock.clone(), config);
        assert!(source.is_authenticated());
        source.fetch_page(1).await.unwrap();

        assert_eq!(
            header_get(&mock.requests()[0].headers, "authorization"),
            Some("Bearer ghp_token")
        );
    }

    #[tokio::test]
    async fn test_transport_failure_and_unexpected_status() {
        let mock = MockTransport::new();
        mock.push_failure(PAGE_1, "dns error");
        mock.push_response(PAGE_1, HttpResponse::new(502));

        let mut source = EventSource::with_transport(mock, config());
        let err = source.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FeedError::Transport(_)));
        assert!(err.is_retryable());

        let err = source.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FeedError::UnexpectedStatus { status: 502, page: 1 }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_empty_success() {
        let mock = MockTransport::new();
        mock.push_response(PAGE_1, HttpResponse::new(200).with_body("<html>oops</html>"));

        let mut source = EventSource::with_transport(mock, config());
        assert_eq!(
            source.fetch_page(1).await.unwrap(),
            FetchOutcome::Success(Vec::new())
        );
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected() {
        let mut source = EventSource::with_transport(MockTransport::new(), config());
        assert!(matches!(
            source.fetch_page(0).await,
            Err(FeedError::InvalidPage(0))
        ));
    }
}
