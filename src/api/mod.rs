//! src/api/mod.rs
//!
//! `ApiServer`: the admin HTTP surface spec.md §6 describes as a
//! collaborator contract, not core protocol. Every handler either reads a
//! `watch::Receiver<NodeSnapshot>` (no lock contention with the gossip hot
//! path) or builds a `ClientMessage` and forwards it by UDP to the node's
//! own admin socket — the same path the `peerster-client` binary uses.
//! Grounded in the teacher's `api/mod.rs` (axum + `ServeDir`) and
//! `original_source/webserver/main.go`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;

mod handlers;

use crate::codec::Codec;
use crate::domain::ClientMessage;
use crate::engine::NodeSnapshot;
use crate::error::Result;

/// Shared state every handler reads or writes through.
#[derive(Clone)]
pub struct ApiState {
    snapshot_rx: watch::Receiver<NodeSnapshot>,
    forward_socket: Arc<UdpSocket>,
    node_ui_addr: SocketAddr,
}

impl ApiState {
    /// Encodes `msg` and sends it to the node's own admin socket, exactly
    /// as `peerster-client` would.
    async fn forward(&self, msg: &ClientMessage) -> Result<()> {
        let bytes = Codec::encode_client_message(msg)?;
        self.forward_socket.send_to(&bytes, self.node_ui_addr).await?;
        Ok(())
    }

    fn snapshot(&self) -> NodeSnapshot {
        self.snapshot_rx.borrow().clone()
    }
}

pub struct ApiServer {
    bind_addr: SocketAddr,
    state: ApiState,
}

impl ApiServer {
    /// `node_ui_addr` is the node's own admin socket (`127.0.0.1:ui_port`);
    /// `bind_addr` is where this HTTP surface itself listens.
    pub async fn bind(
        bind_addr: SocketAddr,
        node_ui_addr: SocketAddr,
        snapshot_rx: watch::Receiver<NodeSnapshot>,
    ) -> Result<Self> {
        let forward_socket = UdpSocket::bind("127.0.0.1:0").await?;
        Ok(Self {
            bind_addr,
            state: ApiState {
                snapshot_rx,
                forward_socket: Arc::new(forward_socket),
                node_ui_addr,
            },
        })
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let app = Router::new()
            .route("/message", get(handlers::get_message).post(handlers::post_message))
            .route("/node", get(handlers::get_node).post(handlers::post_node))
            .route("/destination", get(handlers::get_destination))
            .route("/file", get(handlers::get_file))
            .route("/id", get(handlers::get_id))
            .nest_service("/static", ServeDir::new("static"))
            .with_state(self.state);

        tracing::info!(listen_addr = %self.bind_addr, "admin API server listening");
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("admin API server received shutdown signal");
            })
            .await?;

        Ok(())
    }
}
