//! Links between repositories and their events.

use serde::{Deserialize, Serialize};

/// A directed link from a repository node to one of its event nodes.
///
/// The weight is serialized as `value`, which is what D3's force layout
/// reads for link strength. It is always 1 today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "value")]
    pub weight: u32,
}

impl GraphLink {
    /// Creates a link with weight 1.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: 1,
        }
    }
}
