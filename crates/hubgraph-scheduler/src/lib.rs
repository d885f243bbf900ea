//! HubGraph Scheduler - Rate-limit aware refresh loop
//!
//! Repeatedly fetches the configured number of feed pages, builds a graph
//! from them and publishes it as the current snapshot. The loop paces
//! itself from the upstream's poll hint, waits out rate-limit windows and
//! retries flaky transport, and never lets a failed cycle end the process.
//!
//! ```no_run
//! use hubgraph_feed::{EventSource, FeedConfig};
//! use hubgraph_graph::SnapshotPublisher;
//! use hubgraph_scheduler::{RefreshScheduler, SchedulerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = EventSource::connect(FeedConfig::default())?;
//! let publisher = SnapshotPublisher::shared();
//! let scheduler = RefreshScheduler::new(source, publisher.clone(), SchedulerConfig::default())?;
//!
//! let cancel = CancellationToken::new();
//! scheduler.spawn(cancel.clone());
//! # Ok(())
//! # }
//! ```

pub mod clock;
mod config;
mod error;
mod progress;
mod scheduler;

pub use clock::{Clock, SystemClock, TokioClock};
pub use config::{
    RetryConfig, SchedulerConfig, DEFAULT_MAX_RATE_LIMIT_RETRIES, DEFAULT_PAGES,
    DEFAULT_POLL_INTERVAL_SECS, MAX_RATE_LIMIT_WAIT_SECS, MAX_REFRESH_INTERVAL_SECS,
};
pub use error::{CycleError, Result};
pub use progress::{ProgressCallback, RefreshProgress};
pub use scheduler::{CycleOutcome, CycleState, RefreshScheduler, BOOTSTRAP_INTERVAL};
