//! src/transport/mod.rs
//!
//! The thin I/O boundary the `Node` event loop binds its two UDP sockets
//! through. Peerster runs over plain UDP with no connection handshake or
//! transport-level security, so this module shrinks to the one thing
//! `std`/`tokio` don't already do for us: turning a bind failure into our
//! own `Error` type at the call site.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::error::Result;

/// Binds a UDP socket at `addr`, used for both the peer-to-peer gossip
/// socket and the local admin/client socket.
pub async fn bind_udp(addr: SocketAddr) -> Result<UdpSocket> {
    Ok(UdpSocket::bind(addr).await?)
}
