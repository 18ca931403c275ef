//! src/error.rs
//!
//! Defines the library's custom, comprehensive `Error` enum using `thiserror`.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize or deserialize a packet: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Failed to join background task: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Admin API server error: {0}")]
    ApiServer(#[from] axum::Error),

    #[error("Invalid hex hash: {0}")]
    InvalidHexHash(#[from] hex::FromHexError),

    #[error("Hash must be exactly 32 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("Unknown destination peer: {0}")]
    UnknownDestination(String),

    #[error("Invalid peer address {0:?}: {1}")]
    InvalidPeerAddr(String, std::net::AddrParseError),
}
