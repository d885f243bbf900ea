//! Real-time sync server for the visualizer.
//!
//! A WebSocket server that pushes the current snapshot to each client on
//! connect, then every snapshot the refresh loop publishes afterwards, so a
//! visualizer can redraw without polling `/hubdata.json`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use hubgraph_graph::{GraphSnapshot, SharedPublisher};
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ServerError};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct SyncServerConfig {
    /// Address to bind the WebSocket server.
    pub addr: SocketAddr,
}

impl Default for SyncServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3001)),
        }
    }
}

/// Messages sent to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum BroadcastMessage<'a> {
    /// A complete snapshot, replacing whatever the client had.
    GraphUpdate(GraphUpdatePayload<'a>),
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphUpdatePayload<'a> {
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Number of links in the graph.
    pub link_count: usize,
    /// The snapshot itself, in the `/hubdata.json` shape.
    pub snapshot: &'a GraphSnapshot,
}

impl<'a> BroadcastMessage<'a> {
    pub fn graph_update(snapshot: &'a GraphSnapshot) -> Self {
        Self::GraphUpdate(GraphUpdatePayload {
            node_count: snapshot.nodes.len(),
            link_count: snapshot.links.len(),
            snapshot,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SyncServer
// ─────────────────────────────────────────────────────────────────────────────

/// Pushes published snapshots to WebSocket clients.
pub struct SyncServer {
    config: SyncServerConfig,
    publisher: SharedPublisher,
}

impl SyncServer {
    pub fn new(publisher: SharedPublisher, config: SyncServerConfig) -> Self {
        Self { config, publisher }
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.addr,
                source,
            })
    }

    /// Accepts clients on `listener` until `cancel` fires.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        info!("WebSocket sync server listening on ws://{}", listener.local_addr()?);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let publisher = self.publisher.clone();
                        let cancel = cancel.child_token();

                        tokio::spawn(async move {
                            if let Err(e) = handle_client(stream, addr, publisher, cancel).await {
                                warn!("Connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                },
            }
        }

        info!("WebSocket sync server stopped");
        Ok(())
    }

    /// Binds and serves until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, cancel).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

/// Handles a single WebSocket client connection.
async fn handle_client(
    stream: TcpStream,
    addr: SocketAddr,
    publisher: SharedPublisher,
    cancel: CancellationToken,
) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    debug!("WebSocket handshake complete with {}", addr);

    // Subscribe first so nothing published after the initial read is lost.
    let mut updates = publisher.subscribe();
    let mut last_sent: Arc<GraphSnapshot> = publisher.current();
    write
        .send(Message::Text(BroadcastMessage::graph_update(&last_sent).to_json()?))
        .await?;
    debug!("Sent initial snapshot to {}", addr);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    // Clients have nothing to say.
                    Some(Ok(_)) => {}
                }
            }

            update = updates.recv() => {
                match update {
                    Ok(snapshot) => {
                        if Arc::ptr_eq(&snapshot, &last_sent) {
                            continue;
                        }
                        let json = BroadcastMessage::graph_update(&snapshot).to_json()?;
                        if write.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                        last_sent = snapshot;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Snapshots are complete, so skipping to the newest loses nothing.
                        debug!("Client {} lagged by {} snapshots", addr, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hubgraph_core::{Event, RateLimitState};
    use hubgraph_graph::{build_graph, SnapshotPublisher};
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    fn snapshot(events: &[Event]) -> GraphSnapshot {
        GraphSnapshot::new(
            build_graph(events),
            &RateLimitState::new(60, 58, 0, 60),
            chrono::Utc::now().fixed_offset(),
            180,
        )
    }

    #[test]
    fn test_broadcast_message_serialization() {
        let snapshot = snapshot(&[Event::new("1", "PushEvent", "a/b")]);
        let json = BroadcastMessage::graph_update(&snapshot).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "GraphUpdate");
        assert_eq!(value["payload"]["node_count"], 2);
        assert_eq!(value["payload"]["link_count"], 1);
        assert_eq!(value["payload"]["snapshot"]["requestsUsed"], 2);
    }

    async fn next_update(
        ws: &mut (impl StreamExt<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
                  + Unpin),
    ) -> serde_json::Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for update")
                .unwrap()
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_client_gets_current_then_published_snapshots() {
        let publisher = SnapshotPublisher::shared();
        publisher.publish(snapshot(&[Event::new("1", "PushEvent", "a/b")]));

        let server = SyncServer::new(
            publisher.clone(),
            SyncServerConfig {
                addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            },
        );
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { server.serve(listener, cancel).await }
        });

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let initial = next_update(&mut ws).await;
        assert_eq!(initial["payload"]["node_count"], 2);

        publisher.publish(snapshot(&[
            Event::new("2", "ForkEvent", "c/d"),
            Event::new("3", "WatchEvent", "e/f"),
        ]));
        let update = next_update(&mut ws).await;
        assert_eq!(update["payload"]["node_count"], 4);
        assert_eq!(update["payload"]["snapshot"]["links"][0]["target"], "2");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
