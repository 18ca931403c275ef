//! tests/common/harness.rs
//!
//! Spawns real `Node` event loops on loopback ephemeral ports so
//! integration tests drive the gossip protocol the way `peerster-client`
//! would, instead of poking internal state directly.

use std::net::SocketAddr;
use std::time::Duration;

use peerster::codec::Codec;
use peerster::config::NodeConfig;
use peerster::domain::{ClientMessage, GossipPacket};
use peerster::engine::{Node, NodeSnapshot};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TestNode {
    pub name: String,
    pub gossip_addr: SocketAddr,
    ui_addr: SocketAddr,
    shared_dir: std::path::PathBuf,
    downloads_dir: std::path::PathBuf,
    client_socket: UdpSocket,
    snapshot_rx: watch::Receiver<NodeSnapshot>,
    shutdown: CancellationToken,
    task: JoinHandle<peerster::error::Result<()>>,
}

impl TestNode {
    /// Spawns a node named `name` with no initial peers, using `dir` as its
    /// private `_SharedFiles`/`_Downloads` root so concurrently-running
    /// test nodes never collide on disk.
    pub async fn spawn(name: &str, dir: &std::path::Path, simple: bool) -> Self {
        let shared_dir = dir.join("shared");
        let downloads_dir = dir.join("downloads");
        std::fs::create_dir_all(&shared_dir).expect("shared dir creates");

        let config = NodeConfig {
            ui_port: 0,
            gossip_addr: "127.0.0.1:0".parse().unwrap(),
            name: name.to_string(),
            peers: Vec::new(),
            simple,
            rtimer: 0,
        };

        let node = Node::bind_with_dirs(&config, shared_dir.clone(), downloads_dir.clone())
            .await
            .expect("node binds on loopback");
        let gossip_addr = node.gossip_addr().expect("bound gossip socket");
        let ui_addr = node.ui_addr().expect("bound admin socket");
        let snapshot_rx = node.subscribe();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(node.run(shutdown.clone()));

        let client_socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("client socket binds");

        Self {
            name: name.to_string(),
            gossip_addr,
            ui_addr,
            shared_dir,
            downloads_dir,
            client_socket,
            snapshot_rx,
            shutdown,
            task,
        }
    }

    /// Writes `bytes` to `<shared_dir>/<name>` so a subsequent `upload`
    /// call has something to read.
    pub fn put_shared_file(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.shared_dir.join(name), bytes).expect("shared file writes");
    }

    pub fn downloaded_file_path(&self, name: &str) -> std::path::PathBuf {
        self.downloads_dir.join(name)
    }

    pub async fn add_peer(&self, peer: SocketAddr) {
        self.send(ClientMessage {
            peer: Some(peer.to_string()),
            ..Default::default()
        })
        .await;
    }

    pub async fn send_rumor(&self, text: &str) {
        self.send(ClientMessage {
            text: Some(text.to_string()),
            ..Default::default()
        })
        .await;
    }

    pub async fn send_private(&self, destination: &str, text: &str) {
        self.send(ClientMessage {
            text: Some(text.to_string()),
            destination: Some(destination.to_string()),
            ..Default::default()
        })
        .await;
    }

    pub async fn upload(&self, file_name: &str) {
        self.send(ClientMessage {
            file: Some(file_name.to_string()),
            ..Default::default()
        })
        .await;
    }

    pub async fn download(&self, file_name: &str, meta_hash_hex: &str, destination: &str) {
        self.send(ClientMessage {
            file: Some(file_name.to_string()),
            request: Some(meta_hash_hex.to_string()),
            destination: Some(destination.to_string()),
            ..Default::default()
        })
        .await;
    }

    async fn send(&self, msg: ClientMessage) {
        let bytes = Codec::encode_client_message(&msg).expect("client message encodes");
        self.client_socket
            .send_to(&bytes, self.ui_addr)
            .await
            .expect("client message sends");
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Polls `predicate` against successive snapshots until it holds or
    /// `timeout` elapses, returning whether it held.
    pub async fn wait_for(&mut self, timeout: Duration, predicate: impl Fn(&NodeSnapshot) -> bool) -> bool {
        if predicate(&self.snapshot_rx.borrow()) {
            return true;
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return predicate(&self.snapshot_rx.borrow());
            }
            match tokio::time::timeout(remaining, self.snapshot_rx.changed()).await {
                Ok(Ok(())) => {
                    if predicate(&self.snapshot_rx.borrow()) {
                        return true;
                    }
                }
                _ => return predicate(&self.snapshot_rx.borrow()),
            }
        }
    }

    pub fn shutdown(self) {
        self.shutdown.cancel();
        self.task.abort();
    }
}

/// Connects `a` and `b` as mutual peers.
pub async fn link(a: &TestNode, b: &TestNode) {
    a.add_peer(b.gossip_addr).await;
    b.add_peer(a.gossip_addr).await;
}

/// Binds a bare loopback socket standing in for a peer that isn't a full
/// `Node`, for tests that want to observe exactly what crosses the wire.
pub async fn fake_peer() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("fake peer socket binds")
}

pub async fn send_packet(socket: &UdpSocket, to: SocketAddr, packet: &GossipPacket) {
    let bytes = Codec::encode_packet(packet).expect("packet encodes");
    socket.send_to(&bytes, to).await.expect("packet sends");
}

/// Waits up to `timeout` for a single packet, returning `None` on timeout
/// (used to assert something was *not* sent).
pub async fn recv_packet(socket: &UdpSocket, timeout: Duration) -> Option<GossipPacket> {
    let mut buf = vec![0u8; 16 * 1024];
    match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(Codec::decode_packet(&buf[..len]).expect("packet decodes")),
        _ => None,
    }
}
