//! The refresh loop.
//!
//! A cycle walks pages `1..=pages` of the feed:
//!
//! ```text
//! Idle ──► FetchingPage(1) ──► … ──► FetchingPage(n) ──► publish ──► Idle
//!               │                         │
//!               ├── 304 ──► abandon cycle ┤
//!               └── 403 ──► RateLimitWait ┴──► FetchingPage(1)
//! ```
//!
//! Between cycles the scheduler idles until `last update + interval`,
//! re-reading the clock every second so per-tick overhead never accumulates.
//! Time spent waiting out a rate limit counts towards that interval.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use chrono::{DateTime, Utc};
use hubgraph_core::RateLimitState;
use hubgraph_feed::{EventSource, FetchOutcome};
use hubgraph_graph::{GraphBuilder, GraphSnapshot, SharedPublisher};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{SchedulerConfig, MAX_RATE_LIMIT_WAIT_SECS, MAX_REFRESH_INTERVAL_SECS};
use crate::error::{CycleError, Result};
use crate::progress::{emit, ProgressCallback, RefreshProgress};

/// `refreshInterval` carried by the snapshot of the bootstrap cycle.
pub const BOOTSTRAP_INTERVAL: i64 = -1;

/// Where the scheduler is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    FetchingPage(u32),
    RateLimitWait { attempt: u32 },
}

/// How a cycle that was not cancelled and did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every page was fetched and a new snapshot is current.
    Published {
        version: u64,
        nodes: usize,
        links: usize,
        last_update: DateTime<Utc>,
        /// Times the cycle restarted from page 1 after rate limiting.
        rate_limit_retries: u32,
        /// Total time spent waiting for rate-limit resets.
        rate_limit_wait: Duration,
    },
    /// The upstream had nothing new; the previous snapshot stays current.
    NoNewData,
}

/// Drives fetch → build → publish cycles forever.
///
/// The scheduler owns its [`EventSource`] and is the only writer to the
/// snapshot publisher.
pub struct RefreshScheduler {
    source: EventSource,
    publisher: SharedPublisher,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    on_progress: Option<ProgressCallback>,
    state: CycleState,
    interval: Option<u64>,
}

impl RefreshScheduler {
    /// Creates a scheduler using the system clock.
    pub fn new(
        source: EventSource,
        publisher: SharedPublisher,
        config: SchedulerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            publisher,
            config,
            clock: Arc::new(SystemClock),
            on_progress: None,
            state: CycleState::Idle,
            interval: None,
        })
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets a callback receiving [`RefreshProgress`] events.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// The refresh interval in seconds, once resolved after bootstrap.
    pub fn interval(&self) -> Option<u64> {
        self.interval
    }

    pub fn rate_limit(&self) -> RateLimitState {
        self.source.rate_limit()
    }

    /// Runs the scheduler on its own task until `cancel` fires.
    pub fn spawn(mut self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Runs cycles until `cancel` fires.
    ///
    /// Cycle failures are logged and never end the loop.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            "Refresh scheduler started: {} page(s) per cycle, {}",
            self.config.pages,
            if self.source.is_authenticated() {
                "authenticated"
            } else {
                "unauthenticated"
            }
        );

        // The bootstrap cycle is what teaches us the quota and poll hint.
        emit(
            self.on_progress.as_ref(),
            RefreshProgress::CycleStarted { bootstrap: true },
        );
        if self.run_and_report(BOOTSTRAP_INTERVAL, &cancel).await.is_err() {
            info!("Refresh scheduler stopped");
            return;
        }

        let mut interval = self.resolve_interval();
        loop {
            emit(
                self.on_progress.as_ref(),
                RefreshProgress::CycleStarted { bootstrap: false },
            );
            let (anchor, waited) = match self.run_and_report(interval as i64, &cancel).await {
                Ok(Some(published)) => published,
                Ok(None) => (self.clock.now(), Duration::ZERO),
                Err(_) => break,
            };

            if self.config.adaptive_interval {
                interval = self.resolve_interval();
            }

            let delay = interval.saturating_sub(waited.as_secs());
            let deadline = anchor + chrono::Duration::seconds(delay as i64);
            if self.idle_until(deadline, &cancel).await.is_err() {
                break;
            }
        }

        info!("Refresh scheduler stopped");
    }

    /// Runs one cycle and reports how it went.
    ///
    /// Returns the publish time and the rate-limit wait when a snapshot was
    /// published, and `Err` only when cancelled.
    async fn run_and_report(
        &mut self,
        refresh_interval: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<(DateTime<Utc>, Duration)>> {
        match self.run_cycle(refresh_interval, cancel).await {
            Ok(CycleOutcome::Published {
                version,
                nodes,
                links,
                last_update,
                rate_limit_retries,
                rate_limit_wait,
            }) => {
                let rate_limit = self.source.rate_limit();
                info!(
                    "Content updated: snapshot v{} with {} nodes, {} links (RL: {}/{} req used)",
                    version,
                    nodes,
                    links,
                    rate_limit.requests_used(),
                    rate_limit.limit
                );
                if rate_limit_retries > 0 {
                    info!(
                        "Cycle was rate limited {} time(s), waited {:?}",
                        rate_limit_retries, rate_limit_wait
                    );
                }
                emit(
                    self.on_progress.as_ref(),
                    RefreshProgress::CycleCompleted {
                        version,
                        nodes,
                        links,
                        requests_used: rate_limit.requests_used(),
                        max_requests: rate_limit.limit,
                    },
                );
                Ok(Some((last_update, rate_limit_wait)))
            }
            Ok(CycleOutcome::NoNewData) => {
                info!("No new data available");
                emit(self.on_progress.as_ref(), RefreshProgress::NoNewData);
                Ok(None)
            }
            Err(CycleError::Cancelled) => Err(CycleError::Cancelled),
            Err(e) => {
                error!("Refresh cycle failed: {}", e);
                emit(
                    self.on_progress.as_ref(),
                    RefreshProgress::CycleFailed {
                        error: e.to_string(),
                    },
                );
                Ok(None)
            }
        }
    }

    /// Fetches every page, builds the graph and publishes it.
    ///
    /// A 304 on any page abandons the cycle without touching the published
    /// snapshot. A 403 waits for the quota reset and restarts from page 1.
    ///
    /// `refresh_interval` is what the snapshot advertises, less any time
    /// spent waiting on the rate limit. The bootstrap value is kept as is.
    pub async fn run_cycle(
        &mut self,
        refresh_interval: i64,
        cancel: &CancellationToken,
    ) -> Result<CycleOutcome> {
        let mut retries = 0u32;
        let mut waited = Duration::ZERO;

        let result = 'cycle: loop {
            // ETags from an abandoned attempt must not turn the retry into a 304.
            self.source.discard_etags();
            let mut builder = GraphBuilder::new();

            for page in 1..=self.config.pages {
                self.state = CycleState::FetchingPage(page);

                match self.fetch_with_retry(page, cancel).await {
                    Ok(FetchOutcome::Success(events)) => {
                        debug!("Page {} analyzed ({} events)", page, events.len());
                        emit(
                            self.on_progress.as_ref(),
                            RefreshProgress::PageFetched {
                                page,
                                pages: self.config.pages,
                                events: events.len(),
                            },
                        );
                        builder.add_events(events);
                    }
                    Ok(FetchOutcome::NoNewContent) => break 'cycle Ok(CycleOutcome::NoNewData),
                    Ok(FetchOutcome::RateLimited) => {
                        if retries >= self.config.max_rate_limit_retries {
                            break 'cycle Err(CycleError::RateLimitExhausted { retries });
                        }
                        retries += 1;
                        match self.wait_for_reset(retries, cancel).await {
                            Ok(wait) => waited += wait,
                            Err(e) => break 'cycle Err(e),
                        }
                        continue 'cycle;
                    }
                    Err(e) => break 'cycle Err(e),
                }
            }

            let rate_limit = self.source.rate_limit();
            let now = self.clock.local_now();
            let graph = builder.build();
            let (nodes, links) = (graph.nodes.len(), graph.links.len());
            let advertised = if refresh_interval == BOOTSTRAP_INTERVAL {
                refresh_interval
            } else {
                refresh_interval
                    .saturating_sub(waited.as_secs() as i64)
                    .max(0)
            };
            let version = self.publisher.publish(GraphSnapshot::new(
                graph,
                &rate_limit,
                now,
                advertised,
            ));
            self.source.commit_etags();

            break 'cycle Ok(CycleOutcome::Published {
                version,
                nodes,
                links,
                last_update: now.with_timezone(&Utc),
                rate_limit_retries: retries,
                rate_limit_wait: waited,
            });
        };

        self.state = CycleState::Idle;
        result
    }

    /// Requests one page, retrying transport failures with backoff.
    async fn fetch_with_retry(
        &mut self,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        let mut backoff = self.config.transport_retry.clone().into_backoff().build();
        let mut attempt = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(CycleError::Cancelled),
                result = self.source.fetch_page(page) => result,
            };

            match result {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() => {
                    let Some(delay) = backoff.next() else {
                        return Err(e.into());
                    };
                    attempt += 1;
                    warn!(
                        "Page {} request failed, retrying in {:?} (attempt {}): {}",
                        page, delay, attempt, e
                    );
                    emit(
                        self.on_progress.as_ref(),
                        RefreshProgress::TransportRetry {
                            page,
                            attempt,
                            retry_after: delay,
                            error: e.to_string(),
                        },
                    );
                    pause(delay, cancel).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Counts down until the rate-limit window resets, plus a safety margin.
    ///
    /// Returns the time waited.
    async fn wait_for_reset(&mut self, attempt: u32, cancel: &CancellationToken) -> Result<Duration> {
        self.state = CycleState::RateLimitWait { attempt };

        // Never retry in a tight loop, even if the reset is already past,
        // and never wait longer than one window.
        let seconds = self
            .source
            .rate_limit()
            .seconds_until_retry(self.clock.now())
            .clamp(1, MAX_RATE_LIMIT_WAIT_SECS);
        warn!("Rate limit reached. Will reset in {} seconds", seconds);

        for left in (1..=seconds).rev() {
            emit(
                self.on_progress.as_ref(),
                RefreshProgress::RateLimitCountdown {
                    seconds_left: left,
                    attempt,
                },
            );
            pause(Duration::from_secs(1), cancel).await?;
        }

        Ok(Duration::from_secs(seconds as u64))
    }

    /// Picks the refresh interval: the configured delay if any, otherwise
    /// the upstream poll hint scaled by the page count.
    ///
    /// Without a hint the previous interval is kept, or a conservative
    /// default is used before the first one is known.
    fn resolve_interval(&mut self) -> u64 {
        let seconds = match self.config.refresh_delay {
            Some(delay) => delay.as_secs().max(1),
            None => {
                let hint = self.source.rate_limit().suggested_interval(self.config.pages);
                match (hint, self.interval) {
                    (0, Some(previous)) => {
                        warn!("Upstream sent no poll interval, keeping {}s", previous);
                        previous
                    }
                    (0, None) => {
                        let fallback = self.config.fallback_interval();
                        warn!("Upstream sent no poll interval, using {}s", fallback);
                        fallback
                    }
                    (hint, _) => hint,
                }
            }
        };

        let seconds = if seconds > MAX_REFRESH_INTERVAL_SECS {
            warn!(
                "Refresh interval {}s is too long, capping at {}s",
                seconds, MAX_REFRESH_INTERVAL_SECS
            );
            MAX_REFRESH_INTERVAL_SECS
        } else {
            seconds
        };

        if self.interval != Some(seconds) {
            info!("Refresh interval = {}s", seconds);
        }
        self.interval = Some(seconds);
        emit(
            self.on_progress.as_ref(),
            RefreshProgress::IntervalResolved { seconds },
        );
        seconds
    }

    /// Idles until `deadline`, re-reading the clock at least once a second.
    async fn idle_until(&mut self, deadline: DateTime<Utc>, cancel: &CancellationToken) -> Result<()> {
        loop {
            let left_ms = (deadline - self.clock.now()).num_milliseconds();
            if left_ms <= 0 {
                return Ok(());
            }

            let rate_limit = self.source.rate_limit();
            emit(
                self.on_progress.as_ref(),
                RefreshProgress::NextRefreshIn {
                    seconds: (left_ms + 999) / 1000,
                    requests_used: rate_limit.requests_used(),
                    max_requests: rate_limit.limit,
                },
            );

            pause(Duration::from_millis(left_ms.min(1000) as u64), cancel).await?;
        }
    }
}

/// Sleeps for `duration` unless cancelled first.
async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(CycleError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
