//! Upstream activity events.
//!
//! The feed is decoded permissively. Only four fields matter to the graph
//! and each of them falls back to an empty value when absent or of the
//! wrong shape. Entries that are not JSON objects are skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::kind::EventKind;

/// One activity record from the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Upstream event identifier. Identity of the event.
    pub id: String,

    /// Raw upstream type string, e.g. `PushEvent`. Opaque to everything
    /// except [`EventKind::classify`].
    #[serde(rename = "type")]
    pub event_type: String,

    /// Full name of the repository the event happened in (`owner/name`).
    pub repo_name: String,

    /// When the event was created upstream, if the feed said so.
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates an event without a creation timestamp.
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        repo_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            repo_name: repo_name.into(),
            created_at: None,
        }
    }

    /// Sets the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Classifies this event's type.
    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.event_type)
    }

    /// Builds an event from one element of the feed array.
    ///
    /// Returns `None` only when the element is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let id = match obj.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let event_type = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let repo_name = obj
            .get("repo")
            .and_then(|repo| repo.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let created_at = obj
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(Self {
            id,
            event_type,
            repo_name,
            created_at,
        })
    }
}

/// Decodes a feed response body into events.
///
/// A body that is not a JSON array yields no events; individual entries that
/// are not objects are dropped. Neither case is an error.
pub fn decode_events(body: &[u8]) -> Vec<Event> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Feed body is not valid JSON ({} bytes): {}", body.len(), e);
            return Vec::new();
        }
    };

    let Value::Array(entries) = value else {
        warn!("Feed body is not a JSON array, ignoring it");
        return Vec::new();
    };

    let total = entries.len();
    let events: Vec<Event> = entries.iter().filter_map(Event::from_json).collect();
    if events.len() != total {
        debug!("Skipped {} malformed feed entries", total - events.len());
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_github_event() {
        let body = br#"[{
            "id": "2489651045",
            "type": "PushEvent",
            "actor": {"id": 665991, "display_login": "octocat"},
            "repo": {"id": 28688495, "name": "octocat/Hello-World", "url": "https://api.github.com/repos/octocat/Hello-World"},
            "payload": {"size": 1},
            "public": true,
            "created_at": "2015-01-01T15:00:00Z"
        }]"#;

        let events = decode_events(body);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id, "2489651045");
        assert_eq!(event.event_type, "PushEvent");
        assert_eq!(event.repo_name, "octocat/Hello-World");
        assert_eq!(event.kind(), EventKind::Push);
        assert_eq!(
            event.created_at.map(|t| t.timestamp()),
            Some(1_420_124_400)
        );
    }

    #[test]
    fn test_decode_tolerates_missing_and_mistyped_fields() {
        let body = br#"[
            {"id": 17, "type": 5, "repo": "not-an-object", "created_at": "yesterday"},
            {"type": "WatchEvent"},
            "garbage",
            42
        ]"#;

        let events = decode_events(body);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Event::new("17", "", ""));
        assert_eq!(events[1], Event::new("", "WatchEvent", ""));
    }

    #[test]
    fn test_decode_non_array_bodies() {
        assert!(decode_events(b"").is_empty());
        assert!(decode_events(b"{\"message\": \"API rate limit exceeded\"}").is_empty());
        assert!(decode_events(b"[1, 2").is_empty());
        assert!(decode_events(b"[]").is_empty());
    }
}
