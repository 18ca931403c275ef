//! src/domain/rumor.rs
//!
//! `Rumor`, the per-origin append-only `RumorStore`, and the status-vector
//! diff that drives anti-entropy. Grounded in
//! `original_source/types/gossipers.go`'s `Rumors` map and
//! `GetNextIDForOrigin`/`RecordRumor`/`GetNewRumorForPeer`/`PeerHasRumors`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::packet::{PeerStatus, StatusPacket};

/// `(origin, id, text)`. A rumor with empty `text` is a route rumor —
/// an announcement, not user content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rumor {
    pub origin: String,
    pub id: u32,
    pub text: String,
}

impl Rumor {
    pub fn is_route_rumor(&self) -> bool {
        self.text.is_empty()
    }
}

/// What a peer's status vector tells us to do next.
#[derive(Debug, PartialEq)]
pub enum Diff {
    /// We hold a rumor the peer lacks; send it to them (or to anyone,
    /// per spec.md's "spread to a random peer" rule for `monger`).
    Send(Rumor),
    /// The peer holds rumors we lack; ask for their status back.
    Request,
    /// Neither side is ahead.
    InSync,
}

/// Per-origin append-only log of rumors, plus the visible log the admin UI
/// reads (non-empty rumors and received private messages, in arrival
/// order).
#[derive(Debug, Default)]
pub struct RumorStore {
    rumors: HashMap<String, HashMap<u32, Rumor>>,
    visible_log: Vec<VisibleEntry>,
}

/// An entry in the log the admin surface exposes to a human.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VisibleEntry {
    Rumor(Rumor),
    Private {
        origin: String,
        text: String,
    },
}

impl RumorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `nextId(origin) = |rumors[origin]| + 1`.
    pub fn next_id(&self, origin: &str) -> u32 {
        self.rumors.get(origin).map_or(1, |m| m.len() as u32 + 1)
    }

    /// Exactly the next expected id for its origin.
    pub fn is_new(&self, rumor: &Rumor) -> bool {
        rumor.id == self.next_id(&rumor.origin)
    }

    /// A gap: the id is ahead of what we can accept in order.
    pub fn should_ignore(&self, rumor: &Rumor) -> bool {
        rumor.id > self.next_id(&rumor.origin)
    }

    /// Stores `rumor` under `(origin, id)`. Appends to the visible log when
    /// it carries user text. Caller is responsible for calling `is_new`
    /// first — this does not re-check order, matching the original's
    /// unconditional map insert.
    pub fn record(&mut self, rumor: Rumor) {
        let by_id = self.rumors.entry(rumor.origin.clone()).or_default();
        let is_dup = by_id.contains_key(&rumor.id);
        by_id.insert(rumor.id, rumor.clone());
        if !is_dup && !rumor.text.is_empty() {
            self.visible_log.push(VisibleEntry::Rumor(rumor));
        }
    }

    pub fn record_private(&mut self, origin: String, text: String) {
        self.visible_log.push(VisibleEntry::Private { origin, text });
    }

    pub fn get(&self, origin: &str, id: u32) -> Option<&Rumor> {
        self.rumors.get(origin).and_then(|m| m.get(&id))
    }

    pub fn visible_log(&self) -> &[VisibleEntry] {
        &self.visible_log
    }

    /// Serialized want-list: `{origin: nextId(origin)}` for every known
    /// origin.
    pub fn status_vector(&self) -> StatusPacket {
        let want = self
            .rumors
            .keys()
            .map(|origin| PeerStatus {
                identifier: origin.clone(),
                next_id: self.next_id(origin),
            })
            .collect();
        StatusPacket { want }
    }

    /// Decides what to do against a peer's advertised status.
    ///
    /// Iteration order over our own origins is unspecified (spec.md §9);
    /// this implementation walks `HashMap` order and the first origin we
    /// are ahead on wins — tests must not depend on which one that is.
    pub fn diff_against(&self, peer_status: &StatusPacket) -> Diff {
        let peer_map: HashMap<&str, u32> = peer_status
            .want
            .iter()
            .map(|s| (s.identifier.as_str(), s.next_id))
            .collect();

        for origin in self.rumors.keys() {
            let our_next = self.next_id(origin);
            match peer_map.get(origin.as_str()) {
                Some(&peer_next) if peer_next == our_next - 1 => {
                    if let Some(rumor) = self.get(origin, our_next - 1) {
                        return Diff::Send(rumor.clone());
                    }
                }
                None => {
                    if let Some(rumor) = self.get(origin, 1) {
                        return Diff::Send(rumor.clone());
                    }
                }
                _ => {}
            }
        }

        if self.peer_has_rumors(peer_status) {
            return Diff::Request;
        }

        Diff::InSync
    }

    /// True if the peer's status vector names an origin whose `nextId`
    /// exceeds ours (they have something we lack).
    fn peer_has_rumors(&self, peer_status: &StatusPacket) -> bool {
        peer_status
            .want
            .iter()
            .any(|s| self.next_id(&s.identifier) < s.next_id)
    }
}
