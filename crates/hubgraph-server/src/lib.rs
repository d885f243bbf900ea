//! HubGraph Server - Serves the latest graph snapshot
//!
//! Two front doors onto the same [`hubgraph_graph::SnapshotPublisher`]:
//!
//! - An HTTP server answering `GET /hubdata.json` with the current snapshot
//!   (and `GET /healthz` for probes)
//! - An optional WebSocket sync server that pushes every newly published
//!   snapshot to connected visualizers
//!
//! Both only ever read the publisher; readers never block the refresh loop
//! and never observe a half-built graph.

mod error;
mod handlers;
mod server;
pub mod sync_server;

pub use error::{Result, ServerError};
pub use handlers::{router, AppState, HEALTH_PATH, HUBDATA_PATH};
pub use server::{HubServer, ServerConfig, DEFAULT_PORT};
pub use sync_server::{BroadcastMessage, GraphUpdatePayload, SyncServer, SyncServerConfig};
