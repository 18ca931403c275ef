//! src/domain/peers.rs
//!
//! `PeerSet`: the dynamic, never-shrinking set of known peer endpoints.
//! Grounded in `original_source/types/gossipers.go`'s `Peers` slice,
//! `AddPeer`, and `RandomPeer`.

use std::net::SocketAddr;

use rand::seq::SliceRandom;

/// An ordered, append-only set of peer endpoints, unique by textual form.
#[derive(Debug, Default, Clone)]
pub struct PeerSet {
    peers: Vec<SocketAddr>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter<I: IntoIterator<Item = SocketAddr>>(iter: I) -> Self {
        let mut set = Self::new();
        for addr in iter {
            set.add(addr);
        }
        set
    }

    /// Idempotent by textual form; appends if absent. Peers are never
    /// removed.
    pub fn add(&mut self, addr: SocketAddr) {
        if !self.peers.iter().any(|p| p.to_string() == addr.to_string()) {
            self.peers.push(addr);
        }
    }

    /// Uniform random choice, excluding `exclude` when more than one peer
    /// is known. With zero peers, returns `None`; with exactly one peer
    /// equal to `exclude`, returns that peer anyway (the caller treats it
    /// as a no-op per spec.md §4.2).
    pub fn random_except(&self, exclude: Option<&SocketAddr>) -> Option<SocketAddr> {
        if self.peers.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        match exclude {
            Some(excluded) if self.peers.len() > 1 => {
                let candidates: Vec<&SocketAddr> =
                    self.peers.iter().filter(|p| *p != excluded).collect();
                candidates.choose(&mut rng).map(|p| **p)
            }
            _ => self.peers.choose(&mut rng).copied(),
        }
    }

    pub fn snapshot(&self) -> Vec<SocketAddr> {
        self.peers.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn as_string(&self) -> String {
        self.peers
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
