//! Graph nodes.

use hubgraph_core::Event;
use serde::{Deserialize, Serialize};

/// Group shared by all repository nodes.
pub const REPO_GROUP: u32 = 0;

/// A node in the event graph.
///
/// Repository nodes and event nodes live in the same list and are told
/// apart by `group`: repositories are always group 0 with an empty title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub group: u32,
    pub title: String,
}

impl GraphNode {
    /// Creates a repository node.
    pub fn repo(name: impl Into<String>) -> Self {
        Self {
            id: name.into(),
            group: REPO_GROUP,
            title: String::new(),
        }
    }

    /// Creates the node for one event, classified by its type.
    pub fn event(event: &Event) -> Self {
        let kind = event.kind();
        Self {
            id: event.id.clone(),
            group: kind.group(),
            title: kind.label().to_string(),
        }
    }

    /// Whether this is a repository node.
    pub fn is_repo(&self) -> bool {
        self.group == REPO_GROUP
    }
}
