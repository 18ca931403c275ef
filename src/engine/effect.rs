//! src/engine/effect.rs
//!
//! `Effect`: the small command vocabulary `GossipEngine` and the transfer
//! dispatch logic use to ask the event loop (`Node`) to perform I/O or arm
//! a timer, instead of owning the socket or a timer queue themselves. This
//! keeps the protocol state machine synchronous and unit-testable without a
//! tokio runtime, the same separation the teacher draws between `Engine`
//! (logic) and `Transport`/timer plumbing (I/O).

use std::net::SocketAddr;

use crate::domain::GossipPacket;

#[derive(Debug, PartialEq)]
pub enum Effect {
    /// Send `packet` to `addr` over the peer UDP socket.
    Send(SocketAddr, GossipPacket),
    /// Arm (or re-arm) the 1-second `MongerTimer` for `peer`.
    ArmMonger(SocketAddr),
    /// Cancel any outstanding `MongerTimer` for `peer`.
    CancelMonger(SocketAddr),
    /// Arm the 5-second retry timer for the in-flight transfer keyed by
    /// hex(hash).
    ArmTransferRetry(String),
    /// Cancel the retry timer keyed by hex(hash) (a valid reply arrived).
    CancelTransferRetry(String),
}
