//! src/domain/mod.rs
//!
//! The Lingua Franca of our system: the core, shared data structures that
//! flow between `engine`, `transfer`, `transport`, and `api`. Centralizing
//! them here avoids circular dependencies and gives every other module a
//! single source of truth for the protocol's vocabulary.

mod file;
mod packet;
mod peers;
mod private;
mod route;
mod rumor;

pub use file::{File, FileStore, Lookup, CHUNK_SIZE, HASH_SIZE};
pub use packet::{
    ClientMessage, DataReply, DataRequest, GossipPacket, PeerStatus, PrivateMessage,
    SimpleMessage, StatusPacket,
};
pub use peers::PeerSet;
pub use private::{Delivery, PrivateRouter, INITIAL_HOP_LIMIT};
pub use route::RouteTable;
pub use rumor::{Diff, Rumor, RumorStore, VisibleEntry};
