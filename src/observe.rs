//! src/observe.rs
//!
//! The protocol's test-scraped observable log lines (spec.md §4.4) are a
//! wire-level diagnostic contract, not general operational logging: their
//! exact text must survive independent of whatever `tracing` formatter a
//! deployer configures. Each function here prints one line verbatim to
//! stdout, separate from the `tracing::debug!`/`trace!` calls the engine
//! also emits for operators.

use std::net::SocketAddr;

use crate::domain::{PeerStatus, Rumor, SimpleMessage, StatusPacket};

pub fn peers(peer_list: &str) {
    println!("PEERS {peer_list}");
}

pub fn simple_message(msg: &SimpleMessage) {
    println!(
        "SIMPLE MESSAGE origin {} from {} contents {}",
        msg.origin, msg.relay, msg.contents
    );
}

pub fn rumor(r: &Rumor, from: SocketAddr) {
    println!(
        "RUMOR origin {} from {} ID {} contents {}",
        r.origin, from, r.id, r.text
    );
}

pub fn status(from: SocketAddr, status: &StatusPacket) {
    let mut line = format!("STATUS from {from}");
    for PeerStatus { identifier, next_id } in &status.want {
        line.push_str(&format!(" peer {identifier} nextID {next_id}"));
    }
    println!("{line}");
}

pub fn mongering_with(dst: SocketAddr) {
    println!("MONGERING with {dst}");
}

pub fn flipped_coin(dst: SocketAddr) {
    println!("FLIPPED COIN sending rumor to {dst}");
}

pub fn in_sync_with(peer: SocketAddr) {
    println!("IN SYNC WITH {peer}");
}

pub fn dsdv(origin: &str, next_hop: SocketAddr) {
    println!("DSDV {origin} {next_hop}");
}

pub fn downloading_metafile(file_name: &str, origin: &str) {
    println!("DOWNLOADING metafile of {file_name} from {origin}");
}

pub fn downloading_chunk(file_name: &str, chunk_num: i64, origin: &str) {
    println!("DOWNLOADING {file_name} chunk {chunk_num} from {origin}");
}

pub fn reconstructed(file_name: &str) {
    println!("RECONSTRUCTED file {file_name}");
}
