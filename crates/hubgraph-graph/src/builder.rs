//! Graph builder for turning feed events into nodes and links.
//!
//! The builder collects events from every page of a refresh cycle and
//! folds them into a graph in one go, so repository nodes are
//! deduplicated across pages and not only within one.

use crate::link::GraphLink;
use crate::node::GraphNode;
use hubgraph_core::Event;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// The nodes and links derived from one batch of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl EventGraph {
    /// Number of repository nodes.
    pub fn repo_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_repo()).count()
    }
}

/// Builds an [`EventGraph`] from feed events.
///
/// The builder handles the two-pass process:
/// 1. One repository node per distinct repository name, first-seen order
/// 2. One event node and one repository → event link per event, input order
///
/// Nothing is sorted, so the same input always yields the same output.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    events: Vec<Event>,
}

impl GraphBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the events of one feed page.
    ///
    /// Call this for each fetched page, then call `build` once the cycle
    /// is complete.
    pub fn add_events(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// Number of events collected so far.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Finishes building and returns the graph.
    pub fn build(self) -> EventGraph {
        build_graph(&self.events)
    }
}

/// Folds a batch of events into a graph.
///
/// Events with an empty repository name are kept: they produce a repository
/// node with an empty id and a link with an empty source.
pub fn build_graph(events: &[Event]) -> EventGraph {
    let mut graph = EventGraph {
        nodes: Vec::with_capacity(events.len() * 2),
        links: Vec::with_capacity(events.len()),
    };

    // First pass: repositories
    let mut seen: HashSet<&str> = HashSet::new();
    for event in events {
        if seen.insert(event.repo_name.as_str()) {
            graph.nodes.push(GraphNode::repo(event.repo_name.as_str()));
        }
    }

    // Second pass: events and links
    for event in events {
        graph.nodes.push(GraphNode::event(event));
        graph
            .links
            .push(GraphLink::new(event.repo_name.as_str(), event.id.as_str()));
    }

    debug!(
        "Built graph: {} repos, {} events",
        seen.len(),
        graph.links.len()
    );

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_push_event() {
        let graph = build_graph(&[Event::new("1", "PushEvent", "a/b")]);

        assert_eq!(
            graph.nodes,
            vec![
                GraphNode {
                    id: "a/b".into(),
                    group: 0,
                    title: "".into()
                },
                GraphNode {
                    id: "1".into(),
                    group: 12,
                    title: "New commit pushed".into()
                },
            ]
        );
        assert_eq!(graph.links, vec![GraphLink::new("a/b", "1")]);
        assert_eq!(graph.links[0].weight, 1);
    }

    #[test]
    fn test_repos_deduplicated_in_first_seen_order() {
        let mut builder = GraphBuilder::new();
        builder.add_events(vec![
            Event::new("1", "PushEvent", "z/last"),
            Event::new("2", "WatchEvent", "a/first"),
        ]);
        // Second page repeats a repository from the first one.
        builder.add_events(vec![
            Event::new("3", "ForkEvent", "z/last"),
            Event::new("4", "IssuesEvent", "m/middle"),
        ]);
        assert_eq!(builder.event_count(), 4);

        let graph = builder.build();
        let repos: Vec<&str> = graph
            .nodes
            .iter()
            .filter(|n| n.is_repo())
            .map(|n| n.id.as_str())
            .collect();

        assert_eq!(repos, vec!["z/last", "a/first", "m/middle"]);
        assert_eq!(graph.repo_count(), 3);
        assert_eq!(graph.nodes.len(), 3 + 4);
    }

    #[test]
    fn test_one_node_and_link_per_event() {
        let events = vec![
            Event::new("10", "PushEvent", "o/r"),
            Event::new("10", "PushEvent", "o/r"),
            Event::new("11", "SponsorshipEvent", "o/s"),
        ];
        let graph = build_graph(&events);

        let event_nodes: Vec<&GraphNode> = graph.nodes.iter().filter(|n| !n.is_repo()).collect();
        assert_eq!(event_nodes.len(), events.len());
        assert_eq!(graph.links.len(), events.len());

        for (event, link) in events.iter().zip(&graph.links) {
            assert_eq!(link.source, event.repo_name);
            assert_eq!(link.target, event.id);
        }
        assert_eq!(event_nodes[2].group, 99);
        assert_eq!(event_nodes[2].title, "Unknown event");
    }

    #[test]
    fn test_empty_repo_name_is_kept() {
        let graph = build_graph(&[Event::new("7", "PushEvent", "")]);

        assert_eq!(graph.nodes[0], GraphNode::repo(""));
        assert_eq!(graph.links, vec![GraphLink::new("", "7")]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let events: Vec<Event> = (0..50)
            .map(|i| Event::new(i.to_string(), "PushEvent", format!("repo/{}", i % 7)))
            .collect();

        assert_eq!(build_graph(&events), build_graph(&events));
        assert!(build_graph(&[]).nodes.is_empty());
    }
}
