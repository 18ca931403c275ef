//! src/codec.rs
//!
//! Length-delimited wire encoding for `GossipPacket` and `ClientMessage`.
//!
//! Every packet is a tagged union (a Rust enum) with exactly one active
//! variant. `bincode` encodes enums as a little-endian `u32` variant index
//! followed by that variant's fields, which already gives us the
//! self-describing "field presence tags the variant" shape the wire format
//! calls for. On top of that we prefix a 4-byte length so a reader can
//! detect a truncated or corrupted datagram before handing it to bincode.

use crate::domain::{ClientMessage, GossipPacket};
use crate::error::{Error, Result};

/// Maximum size of a single encoded datagram, matching the UDP read buffer.
pub const MAX_DATAGRAM_SIZE: usize = 16 * 1024;

const LENGTH_PREFIX_SIZE: usize = 4;

fn encode_framed<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let body = bincode::serialize(value)?;
    let mut framed = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

fn decode_framed<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < LENGTH_PREFIX_SIZE {
        return Err(Error::InvalidHashLength(bytes.len()));
    }
    let (len_bytes, body) = bytes.split_at(LENGTH_PREFIX_SIZE);
    let declared_len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
    if declared_len != body.len() {
        return Err(Error::InvalidHashLength(body.len()));
    }
    Ok(bincode::deserialize(body)?)
}

/// Encodes and decodes the two packet families exchanged over UDP.
pub struct Codec;

impl Codec {
    pub fn encode_packet(packet: &GossipPacket) -> Result<Vec<u8>> {
        encode_framed(packet)
    }

    /// Decodes a `GossipPacket` from a raw datagram. Malformed input is
    /// reported as an `Error` so the caller can log-and-drop per spec;
    /// nothing here ever panics on attacker-controlled bytes.
    pub fn decode_packet(bytes: &[u8]) -> Result<GossipPacket> {
        decode_framed(bytes)
    }

    pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>> {
        encode_framed(msg)
    }

    pub fn decode_client_message(bytes: &[u8]) -> Result<ClientMessage> {
        decode_framed(bytes)
    }
}
