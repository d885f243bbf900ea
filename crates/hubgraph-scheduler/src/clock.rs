//! Wall-clock source for the scheduler.
//!
//! Rate-limit resets arrive as wall-clock instants and snapshots are stamped
//! with wall-clock time, so the scheduler asks a [`Clock`] rather than
//! calling `Utc::now()` directly.

use chrono::{DateTime, Local, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time in the local zone, used to stamp snapshots.
    fn local_now(&self) -> DateTime<chrono::FixedOffset> {
        self.now().with_timezone(&Local).fixed_offset()
    }
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that advances with tokio's clock, starting from a fixed instant.
///
/// Under `#[tokio::test(start_paused = true)]` it moves exactly as far as
/// the runtime's virtual time, which makes countdowns deterministic.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_virtual_time() {
        let origin = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = TokioClock::starting_at(origin);

        tokio::time::sleep(Duration::from_secs(90)).await;

        assert_eq!(clock.now().timestamp(), 1_700_000_090);
    }
}
