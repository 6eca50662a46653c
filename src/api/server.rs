//! Node API Server
//!
//! Serves the REST router on the configured endpoint with graceful shutdown.

use crate::error::{Error, Result};
use crate::node::NodeService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use super::rest::RestRouter;

// =============================================================================
// Server Configuration
// =============================================================================

/// Default RPC endpoint
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:10000";

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Bind address
    pub addr: SocketAddr,
}

impl ApiServerConfig {
    /// Build from an endpoint string
    pub fn from_endpoint(endpoint: &str) -> Result<Self> {
        Ok(Self {
            addr: parse_endpoint(endpoint)?,
        })
    }
}

/// Parse `tcp://host:port` or bare `host:port`
pub fn parse_endpoint(endpoint: &str) -> Result<SocketAddr> {
    let (scheme, addr) = match endpoint.split_once("://") {
        Some((scheme, addr)) => (scheme.to_lowercase(), addr),
        None => ("tcp".to_string(), endpoint),
    };

    if scheme != "tcp" {
        return Err(Error::Configuration(format!(
            "unsupported endpoint scheme {:?} in {}",
            scheme, endpoint
        )));
    }

    addr.parse()
        .map_err(|e| Error::Configuration(format!("invalid endpoint {}: {}", endpoint, e)))
}

// =============================================================================
// API Server
// =============================================================================

/// Server exposing the node service
pub struct ApiServer {
    config: ApiServerConfig,
    service: Arc<NodeService>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, service: Arc<NodeService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            service,
            shutdown_tx,
        }
    }

    /// Run until [`ApiServer::shutdown`] is called
    pub async fn run(&self) -> Result<()> {
        let app = RestRouter::new(self.service.clone()).build();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind API server: {}", e)))?;

        info!("Node API listening on {}", self.config.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Node API shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("API server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
