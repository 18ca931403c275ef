//! src/domain/private.rs
//!
//! `PrivateRouter`: hop-limited unicast delivery of `PrivateMessage` along
//! the `RouteTable`. Grounded in `original_source/types/gossipers.go`'s
//! `ForwardPrivate`/`RecordPrivate` and `main.go`'s private-message branch
//! of `handleServerMessage`.

use std::net::SocketAddr;

use super::packet::PrivateMessage;
use super::route::RouteTable;

pub const INITIAL_HOP_LIMIT: u32 = 10;

/// What a node should do with a `PrivateMessage`, decided by `PrivateRouter`.
pub enum Delivery {
    /// We are the destination: hand to the caller for logging and the
    /// visible log.
    Deliver { origin: String, text: String },
    /// Forward the (hop-decremented) message to `next_hop`.
    Forward {
        next_hop: SocketAddr,
        message: PrivateMessage,
    },
    /// Hop limit exhausted or no route known; silently dropped.
    Drop,
}

pub struct PrivateRouter;

impl PrivateRouter {
    /// Decides how to handle a `PrivateMessage` received from the network.
    pub fn on_receive(self_name: &str, mut message: PrivateMessage, routes: &RouteTable) -> Delivery {
        if message.destination == self_name {
            return Delivery::Deliver {
                origin: message.origin,
                text: message.text,
            };
        }
        if message.hop_limit == 0 {
            return Delivery::Drop;
        }
        message.hop_limit -= 1;
        if message.hop_limit == 0 {
            return Delivery::Drop;
        }
        match routes.lookup(&message.destination) {
            Some(next_hop) => Delivery::Forward { next_hop, message },
            None => Delivery::Drop,
        }
    }

    /// Decides where to emit a client-originated `PrivateMessage`, at its
    /// initial (undecremented) hop limit.
    pub fn on_send(message: &PrivateMessage, routes: &RouteTable) -> Option<SocketAddr> {
        if message.hop_limit == 0 {
            return None;
        }
        routes.lookup(&message.destination)
    }
}
