//! The published graph snapshot.

use crate::builder::EventGraph;
use crate::link::GraphLink;
use crate::node::GraphNode;
use chrono::{DateTime, FixedOffset};
use hubgraph_core::timestamp::serde_rfc822z_opt;
use hubgraph_core::RateLimitState;
use serde::{Deserialize, Serialize};

/// One complete graph plus quota metrics, as served to the frontend.
///
/// Snapshots are immutable once built. A new refresh cycle produces a new
/// snapshot that replaces, never merges with, the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    #[serde(rename = "requestsUsed")]
    pub requests_used: u32,
    #[serde(rename = "maxRequests")]
    pub max_requests: u32,
    /// When the cycle that built this snapshot completed. `None` only for
    /// the empty snapshot served before the first cycle.
    #[serde(rename = "lastUpdate", with = "serde_rfc822z_opt")]
    pub last_update: Option<DateTime<FixedOffset>>,
    /// Seconds between refreshes, or -1 for the bootstrap cycle.
    #[serde(rename = "refreshInterval")]
    pub refresh_interval: i64,
}

impl GraphSnapshot {
    /// The snapshot served before any cycle has completed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Combines a built graph with the quota state at the end of its cycle.
    pub fn new(
        graph: EventGraph,
        rate_limit: &RateLimitState,
        last_update: DateTime<FixedOffset>,
        refresh_interval: i64,
    ) -> Self {
        Self {
            nodes: graph.nodes,
            links: graph.links,
            requests_used: rate_limit.requests_used(),
            max_requests: rate_limit.limit,
            last_update: Some(last_update),
            refresh_interval,
        }
    }

    /// Whether this is the placeholder served before the first cycle.
    pub fn is_empty(&self) -> bool {
        self.last_update.is_none() && self.nodes.is_empty()
    }

    /// Serializes to the JSON shape the frontend expects.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_graph;
    use hubgraph_core::Event;
    use serde_json::json;

    #[test]
    fn test_snapshot_json_shape() {
        let graph = build_graph(&[Event::new("1", "PushEvent", "a/b")]);
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:20:30+02:00").unwrap();
        let snapshot = GraphSnapshot::new(graph, &RateLimitState::new(60, 57, 0, 60), at, 180);

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "nodes": [
                    {"id": "a/b", "group": 0, "title": ""},
                    {"id": "1", "group": 12, "title": "New commit pushed"}
                ],
                "links": [{"source": "a/b", "target": "1", "value": 1}],
                "requestsUsed": 3,
                "maxRequests": 60,
                "lastUpdate": "01 May 24 10:20 +0200",
                "refreshInterval": 180
            })
        );
    }

    #[test]
    fn test_empty_snapshot_json() {
        let value = serde_json::to_value(GraphSnapshot::empty()).unwrap();
        assert_eq!(
            value,
            json!({
                "nodes": [],
                "links": [],
                "requestsUsed": 0,
                "maxRequests": 0,
                "lastUpdate": "",
                "refreshInterval": 0
            })
        );
        assert!(GraphSnapshot::empty().is_empty());
    }

    #[test]
    fn test_snapshot_parses_back() {
        let raw = r#"{"nodes":[],"links":[],"requestsUsed":1,"maxRequests":5000,
            "lastUpdate":"02 Jan 06 15:04 -0700","refreshInterval":-1}"#;
        let snapshot: GraphSnapshot = serde_json::from_str(raw).unwrap();

        assert_eq!(snapshot.max_requests, 5000);
        assert_eq!(snapshot.refresh_interval, -1);
        assert_eq!(
            snapshot.last_update.map(|t| t.timestamp()),
            Some(1_136_239_440)
        );
    }
}
