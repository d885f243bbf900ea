//! Scheduler configuration.

use std::time::Duration;

use backon::ExponentialBuilder;
use hubgraph_core::RESET_SAFETY_MARGIN_SECS;

use crate::error::{CycleError, Result};

/// Poll interval assumed per page when the upstream gives no hint.
/// Safe for the unauthenticated quota of 60 requests per hour.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_PAGES: u32 = 3;
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 10;

/// Upper bound on the refresh interval, whatever the override or hint says.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound on one rate-limit countdown. The upstream window is an hour.
pub const MAX_RATE_LIMIT_WAIT_SECS: i64 = 60 * 60 + RESET_SAFETY_MARGIN_SECS;

/// How the refresh scheduler paces itself.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Feed pages requested per cycle, starting at 1.
    pub pages: u32,
    /// Fixed delay between refreshes. `None` derives it from the upstream
    /// poll-interval hint.
    pub refresh_delay: Option<Duration>,
    /// Re-derive the interval from the live hint after every cycle instead
    /// of fixing it once after the bootstrap cycle.
    pub adaptive_interval: bool,
    /// Rate-limited restarts allowed within one cycle before giving up on it.
    pub max_rate_limit_retries: u32,
    /// Backoff for transport failures on a single page.
    pub transport_retry: RetryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES,
            refresh_delay: None,
            adaptive_interval: false,
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
            transport_retry: RetryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Sets the refresh delay from a seconds count where 0 means "derive".
    #[must_use]
    pub fn with_delay_secs(mut self, secs: u64) -> Self {
        self.refresh_delay = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pages == 0 {
            return Err(CycleError::Config("pages must be at least 1".into()));
        }
        if self.transport_retry.min_delay > self.transport_retry.max_delay {
            return Err(CycleError::Config(
                "transport retry min delay exceeds max delay".into(),
            ));
        }
        Ok(())
    }

    /// Interval used when neither an override nor a hint is available.
    pub fn fallback_interval(&self) -> u64 {
        DEFAULT_POLL_INTERVAL_SECS * self.pages as u64
    }
}

/// Configuration for retrying transport failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_retries: 5,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;

    #[test]
    fn test_zero_delay_means_derive() {
        assert_eq!(SchedulerConfig::default().with_delay_secs(0).refresh_delay, None);
        assert_eq!(
            SchedulerConfig::default().with_delay_secs(90).refresh_delay,
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn test_validate() {
        assert!(SchedulerConfig::default().validate().is_ok());

        let config = SchedulerConfig {
            pages: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(config.validate(), Err(CycleError::Config(_))));
    }

    #[test]
    fn test_fallback_interval_scales_with_pages() {
        let config = SchedulerConfig {
            pages: 4,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.fallback_interval(), 240);
    }

    #[test]
    fn test_backoff_is_bounded() {
        let config = RetryConfig {
            with_jitter: false,
            ..RetryConfig::default()
        };
        let delays: Vec<Duration> = config.into_backoff().build().collect();

        assert_eq!(delays.len(), 5);
        assert_eq!(delays[0], Duration::from_secs(1));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(60)));
    }
}
