//! src/domain/packet.rs
//!
//! The wire types exchanged between nodes (`GossipPacket`, a tagged union
//! with exactly one active variant) and between a node and its local admin
//! client (`ClientMessage`).

use serde::{Deserialize, Serialize};

use super::rumor::Rumor;

/// A single datagram's worth of protocol traffic. Exactly one variant is
/// ever active; `bincode` encodes the discriminant for us, so there is no
/// way to construct a packet with zero or multiple active cases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GossipPacket {
    Simple(SimpleMessage),
    Rumor(Rumor),
    Status(StatusPacket),
    Private(PrivateMessage),
    DataRequest(DataRequest),
    DataReply(DataReply),
}

/// Simple-broadcast-mode message: no rumor mongering, just flood-and-forget
/// with a relay stamp rewritten at every hop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleMessage {
    pub origin: String,
    pub relay: String,
    pub contents: String,
}

/// A node's status vector, serialized as the list of `(origin, nextId)`
/// pairs it currently knows about.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPacket {
    pub want: Vec<PeerStatus>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerStatus {
    pub identifier: String,
    pub next_id: u32,
}

/// A hop-limited point-to-point text message, routed via the `RouteTable`.
/// `id` is carried on the wire but reserved/unused, per spec.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub origin: String,
    pub id: u32,
    pub text: String,
    pub destination: String,
    pub hop_limit: u32,
}

/// Requests the metafile or a single chunk identified by `hash_value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub hash_value: [u8; 32],
}

/// Carries the bytes requested by a matching `DataRequest`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataReply {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub hash_value: [u8; 32],
    pub data: Vec<u8>,
}

/// The schema submitted by the local admin client (CLI `client` binary or
/// the admin HTTP surface's `POST /message` / `POST /node`). All fields are
/// optional; the combination present decides what the node does with it.
/// `peer` is admin-surface-only: the CLI client never sets it, but
/// `POST /node` forwards a new peer endpoint through the same loopback
/// channel everything else already uses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub text: Option<String>,
    pub destination: Option<String>,
    pub file: Option<String>,
    pub request: Option<String>,
    pub peer: Option<String>,
}
