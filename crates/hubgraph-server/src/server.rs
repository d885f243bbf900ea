//! HTTP server for the snapshot endpoint.

use std::net::{Ipv4Addr, SocketAddr};

use axum::Router;
use hubgraph_graph::SharedPublisher;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{Result, ServerError};
use crate::handlers::{router, AppState, HUBDATA_PATH};

pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::local(DEFAULT_PORT)
    }
}

impl ServerConfig {
    /// Listens on loopback only.
    pub fn local(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
        }
    }

    /// Listens on every interface.
    pub fn public(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        }
    }
}

/// Serves `/hubdata.json` from a snapshot publisher.
pub struct HubServer {
    config: ServerConfig,
    publisher: SharedPublisher,
}

impl HubServer {
    pub fn new(publisher: SharedPublisher, config: ServerConfig) -> Self {
        Self { config, publisher }
    }

    pub fn router(&self) -> Router {
        router(AppState::new(self.publisher.clone()))
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

    /// Serves on an already bound listener until `cancel` fires.
    ///
    /// In-flight requests are allowed to finish.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        let addr = listener.local_addr()?;
        info!("Listening on http://{}{}", addr, HUBDATA_PATH);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Binds and serves until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, cancel).await
    }
}
