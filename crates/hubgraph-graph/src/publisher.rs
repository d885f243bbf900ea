//! Holds the current snapshot for concurrent readers.
//!
//! The refresh scheduler is the only writer. Readers (one per inbound HTTP
//! request, plus live-update subscribers) get an `Arc` to an immutable
//! snapshot, so the lock is only held for a pointer clone or swap.

use crate::snapshot::GraphSnapshot;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Shared publisher handle.
pub type SharedPublisher = Arc<SnapshotPublisher>;

#[derive(Debug)]
struct Published {
    version: u64,
    snapshot: Arc<GraphSnapshot>,
}

/// Single-writer, many-reader holder of the latest [`GraphSnapshot`].
///
/// Every `publish` bumps a version counter under the same lock that swaps
/// the snapshot, so versions and snapshots can never be observed out of
/// step and a reader never sees an older snapshot after a newer one.
#[derive(Debug)]
pub struct SnapshotPublisher {
    current: RwLock<Published>,
    updates: broadcast::Sender<Arc<GraphSnapshot>>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPublisher {
    /// Creates a publisher serving the empty snapshot.
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            current: RwLock::new(Published {
                version: 0,
                snapshot: Arc::new(GraphSnapshot::empty()),
            }),
            updates,
        }
    }

    /// Creates a shared publisher.
    pub fn shared() -> SharedPublisher {
        Arc::new(Self::new())
    }

    /// Returns the current snapshot.
    pub fn current(&self) -> Arc<GraphSnapshot> {
        let published = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&published.snapshot)
    }

    /// Returns the current snapshot along with its version.
    ///
    /// Version 0 is the empty snapshot.
    pub fn current_versioned(&self) -> (u64, Arc<GraphSnapshot>) {
        let published = self.current.read().unwrap_or_else(|e| e.into_inner());
        (published.version, Arc::clone(&published.snapshot))
    }

    /// Number of snapshots published so far.
    pub fn version(&self) -> u64 {
        self.current.read().unwrap_or_else(|e| e.into_inner()).version
    }

    /// Atomically replaces the current snapshot and notifies subscribers.
    ///
    /// Returns the new version.
    pub fn publish(&self, snapshot: GraphSnapshot) -> u64 {
        let snapshot = Arc::new(snapshot);
        let version = {
            let mut published = self.current.write().unwrap_or_else(|e| e.into_inner());
            published.version += 1;
            published.snapshot = Arc::clone(&snapshot);
            published.version
        };

        debug!(
            "Published snapshot v{} ({} nodes, {} links)",
            version,
            snapshot.nodes.len(),
            snapshot.links.len()
        );

        // No subscribers is fine.
        let _ = self.updates.send(snapshot);
        version
    }

    /// Subscribes to snapshots published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<GraphSnapshot>> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_graph;
    use chrono::Utc;
    use hubgraph_core::{Event, RateLimitState};
    use std::thread;

    fn snapshot_of(n: usize) -> GraphSnapshot {
        let events: Vec<Event> = (0..n)
            .map(|i| Event::new(format!("e{}", i), "PushEvent", format!("r/{}", n)))
            .collect();
        GraphSnapshot::new(
            build_graph(&events),
            &RateLimitState::new(60, 60 - n as u32, 0, 60),
            Utc::now().fixed_offset(),
            60,
        )
    }

    #[test]
    fn test_empty_before_first_publish() {
        let publisher = SnapshotPublisher::new();
        let (version, snapshot) = publisher.current_versioned();

        assert_eq!(version, 0);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.requests_used, 0);
    }

    #[test]
    fn test_publish_replaces_snapshot() {
        let publisher = SnapshotPublisher::new();
        publisher.publish(snapshot_of(2));
        assert_eq!(publisher.publish(snapshot_of(5)), 2);

        let current = publisher.current();
        assert_eq!(current.links.len(), 5);
        assert_eq!(current.requests_used, 5);
        assert_eq!(publisher.version(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_receive_new_snapshots() {
        let publisher = SnapshotPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish(snapshot_of(3));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.links.len(), 3);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_or_older_snapshots() {
        let publisher = SnapshotPublisher::shared();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let publisher = Arc::clone(&publisher);
                thread::spawn(move || {
                    let mut last_version = 0;
                    for _ in 0..2_000 {
                        let (version, snapshot) = publisher.current_versioned();
                        assert!(version >= last_version, "snapshot went backwards");
                        last_version = version;

                        // Every published snapshot of size n has n links, one
                        // repo node and requests_used == n.
                        let n = snapshot.links.len();
                        assert_eq!(snapshot.requests_used as usize, n);
                        if n > 0 {
                            assert_eq!(snapshot.nodes.len(), n + 1);
                        }
                    }
                })
            })
            .collect();

        for n in 1..=50 {
            publisher.publish(snapshot_of(n));
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(publisher.current().links.len(), 50);
    }
}
