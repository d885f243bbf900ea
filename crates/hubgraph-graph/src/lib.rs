//! HubGraph Graph - Event graph construction and publishing
//!
//! This crate turns a batch of feed events into the node/link graph the
//! visualizer draws, and holds the most recent graph snapshot for any number
//! of concurrent readers.
//!
//! # Architecture
//!
//! The graph is deliberately flat: two kinds of nodes share one list.
//! - Repository nodes (group 0), one per distinct repository name
//! - Event nodes (group from [`hubgraph_core::EventKind`]), one per event
//!
//! Every event contributes exactly one link from its repository to itself.
//!
//! # Example
//!
//! ```
//! use hubgraph_core::Event;
//! use hubgraph_graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_events(vec![Event::new("1", "PushEvent", "a/b")]);
//! let graph = builder.build();
//!
//! assert_eq!(graph.nodes.len(), 2);
//! assert_eq!(graph.links[0].source, "a/b");
//! ```

mod builder;
mod link;
mod node;
mod publisher;
mod snapshot;

pub use builder::{build_graph, EventGraph, GraphBuilder};
pub use link::GraphLink;
pub use node::GraphNode;
pub use publisher::{SharedPublisher, SnapshotPublisher};
pub use snapshot::GraphSnapshot;
