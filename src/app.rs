//! src/app.rs
//!
//! `App`: wires together the `Node` event loop and the admin `ApiServer`,
//! and manages their shared lifecycle. Grounded in the teacher's
//! `app.rs` for the spawn-then-wait-for-shutdown shape, generalized to our
//! two services instead of three.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio_util::sync::CancellationToken;

use crate::api::ApiServer;
use crate::config::NodeConfig;
use crate::engine::Node;
use crate::error::Result;

/// Port the admin HTTP surface listens on, offset from `ui_port` so it
/// never collides with the node's own UDP admin socket on the same port
/// number.
const ADMIN_HTTP_PORT_OFFSET: u16 = 1000;

pub struct App {
    config: NodeConfig,
    shutdown_token: CancellationToken,
}

impl App {
    pub fn new(config: NodeConfig) -> Result<Self> {
        Ok(Self {
            config,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Binds the node's sockets, spawns the event loop and the admin HTTP
    /// surface, then waits for Ctrl+C before shutting both down gracefully.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            name = %self.config.name,
            gossip_addr = %self.config.gossip_addr,
            ui_port = self.config.ui_port,
            "starting peerster node"
        );

        let node = Node::bind(&self.config).await?;
        let node_ui_addr = node.ui_addr()?;
        let snapshot_rx = node.subscribe();

        let node_task = tokio::spawn(node.run(self.shutdown_token.clone()));
        tracing::debug!("node event loop spawned");

        let admin_bind_addr = SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            self.config.ui_port + ADMIN_HTTP_PORT_OFFSET,
        );
        let api_server = ApiServer::bind(admin_bind_addr, node_ui_addr, snapshot_rx).await?;
        let api_task = tokio::spawn(api_server.run(self.shutdown_token.clone()));
        tracing::debug!("admin API server spawned");

        let shutdown_token = self.shutdown_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::error!("failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Ctrl+C received, shutting down");
            shutdown_token.cancel();
        });

        self.shutdown_token.cancelled().await;

        match node_task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "node event loop failed"),
            Err(e) => tracing::error!(error = ?e, "node event loop task panicked"),
            Ok(Ok(())) => {}
        }
        match api_task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "admin API server failed"),
            Err(e) => tracing::error!(error = ?e, "admin API server task panicked"),
            Ok(Ok(())) => {}
        }

        tracing::info!("node shut down gracefully");
        Ok(())
    }
}
