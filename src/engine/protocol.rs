//! src/engine/protocol.rs
//!
//! `GossipEngine`: the rumor-mongering state machine, anti-entropy,
//! simple-broadcast flooding, and the route table it maintains as a side
//! effect — spec.md §4.4. Pure and synchronous: every handler mutates its
//! own state and returns the `Effect`s the event loop (`Node`) must carry
//! out, so the whole state machine is unit-testable without a tokio
//! runtime. Grounded in `examples/original_source/main.go`'s
//! `handleServerMessage`/`handleClientMessage` and
//! `types/gossipers.go`'s `MongerRumor`/`CoinFlip`/`UpdateRoute`.

use std::collections::HashMap;
use std::net::SocketAddr;

use rand::random;

use crate::domain::{
    GossipPacket, PeerSet, Rumor, RumorStore, RouteTable, SimpleMessage, StatusPacket,
};
use crate::engine::effect::Effect;
use crate::observe;

pub struct GossipEngine {
    self_name: String,
    self_addr: SocketAddr,
    simple: bool,
    pub(crate) peers: PeerSet,
    pub(crate) rumors: RumorStore,
    pub(crate) routes: RouteTable,
    last_rumor_from: HashMap<SocketAddr, Rumor>,
    /// Per-peer `(rumor, exclude)` recorded when a `MongerTimer` is armed,
    /// so the timeout can re-run the same coin flip the original `monger`
    /// call would have. Removed whenever a `Status` from that peer cancels
    /// the timer.
    monger_state: HashMap<SocketAddr, (Rumor, Option<SocketAddr>)>,
    last_interaction: Option<SocketAddr>,
}

impl GossipEngine {
    pub fn new(self_name: String, self_addr: SocketAddr, simple: bool) -> Self {
        Self {
            self_name,
            self_addr,
            simple,
            peers: PeerSet::new(),
            rumors: RumorStore::new(),
            routes: RouteTable::new(),
            last_rumor_from: HashMap::new(),
            monger_state: HashMap::new(),
            last_interaction: None,
        }
    }

    pub fn self_name(&self) -> &str {
        &self.self_name
    }

    pub fn is_simple(&self) -> bool {
        self.simple
    }

    pub fn add_peer(&mut self, addr: SocketAddr) {
        self.peers.add(addr);
    }

    pub fn peers_as_string(&self) -> String {
        self.peers.as_string()
    }

    /// A client asked us to gossip `text` as a public rumor (spec.md §4.4
    /// "On client text rumor").
    pub fn on_client_text(&mut self, text: String) -> Vec<Effect> {
        let id = self.rumors.next_id(&self.self_name);
        let rumor = Rumor {
            origin: self.self_name.clone(),
            id,
            text,
        };
        self.rumors.record(rumor.clone());
        self.monger(rumor, None, false)
    }

    /// A client asked us to flood `text` in simple-broadcast mode.
    pub fn on_client_simple(&mut self, text: String) -> Vec<Effect> {
        let msg = SimpleMessage {
            origin: self.self_name.clone(),
            relay: self.self_addr.to_string(),
            contents: text,
        };
        self.flood_simple(None, msg)
    }

    /// A `SimpleMessage` arrived from `sender`: re-stamp its relay address
    /// and flood to every peer except the immediate sender.
    pub fn on_simple(&mut self, sender: SocketAddr, mut msg: SimpleMessage) -> Vec<Effect> {
        msg.relay = sender.to_string();
        observe::simple_message(&msg);
        self.flood_simple(Some(sender), msg)
    }

    fn flood_simple(&self, exclude: Option<SocketAddr>, msg: SimpleMessage) -> Vec<Effect> {
        self.peers
            .snapshot()
            .into_iter()
            .filter(|p| Some(*p) != exclude)
            .map(|p| Effect::Send(p, GossipPacket::Simple(msg.clone())))
            .collect()
    }

    /// A `Rumor` arrived from `sender` (spec.md §4.4 "On received Rumor").
    pub fn on_rumor(&mut self, sender: SocketAddr, rumor: Rumor) -> Vec<Effect> {
        let mut effects = Vec::new();

        if rumor.origin != self.self_name {
            self.routes.update(&rumor.origin, sender, &self.self_name);
            observe::dsdv(&rumor.origin, sender);
        }

        if self.rumors.should_ignore(&rumor) {
            return effects;
        }

        observe::rumor(&rumor, sender);

        if self.rumors.is_new(&rumor) {
            self.rumors.record(rumor.clone());
            effects.extend(self.monger(rumor.clone(), Some(sender), false));
        }

        self.last_interaction = Some(sender);
        self.last_rumor_from.insert(sender, rumor);
        effects.push(Effect::Send(
            sender,
            GossipPacket::Status(self.rumors.status_vector()),
        ));
        effects
    }

    /// A `Status` arrived from `sender` (spec.md §4.4 "On received
    /// Status").
    pub fn on_status(&mut self, sender: SocketAddr, status: StatusPacket) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.monger_state.remove(&sender).is_some() {
            effects.push(Effect::CancelMonger(sender));
        }

        observe::status(sender, &status);

        match self.rumors.diff_against(&status) {
            crate::domain::Diff::Send(r) => {
                effects.extend(self.monger(r, None, false));
            }
            crate::domain::Diff::Request => {
                effects.push(Effect::Send(
                    sender,
                    GossipPacket::Status(self.rumors.status_vector()),
                ));
            }
            crate::domain::Diff::InSync => {
                observe::in_sync_with(sender);
                if self.has_alternative_peer(Some(sender)) {
                    if let Some(r) = self.last_rumor_from.get(&sender).cloned() {
                        if random::<bool>() {
                            effects.extend(self.monger(r, None, true));
                        }
                    }
                }
            }
        }

        effects
    }

    /// A `MongerTimer` fired for `peer` without an intervening `Status`:
    /// perform the coin flip using the rumor and exclusion that were
    /// active when the timer was armed.
    pub fn on_monger_timeout(&mut self, peer: SocketAddr) -> Vec<Effect> {
        let Some((r, exclude)) = self.monger_state.remove(&peer) else {
            return Vec::new();
        };
        if self.has_alternative_peer(exclude) && random::<bool>() {
            self.monger(r, exclude, true)
        } else {
            Vec::new()
        }
    }

    /// Every `rtimer` seconds (if configured): emit a route rumor, an
    /// empty-text announcement that seeds remote route tables.
    pub fn route_announcement(&mut self) -> Vec<Effect> {
        let id = self.rumors.next_id(&self.self_name);
        let rumor = Rumor {
            origin: self.self_name.clone(),
            id,
            text: String::new(),
        };
        self.rumors.record(rumor.clone());
        self.monger(rumor, None, false)
    }

    /// Every 1 second: send our status to a random peer other than the one
    /// we last interacted with.
    pub fn anti_entropy_tick(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(dst) = self.peers.random_except(self.last_interaction.as_ref()) else {
            return effects;
        };
        effects.push(Effect::Send(
            dst,
            GossipPacket::Status(self.rumors.status_vector()),
        ));
        self.last_interaction = Some(dst);
        effects
    }

    /// spec.md §4.4 `monger(r, exclude, flipped)`.
    fn monger(&mut self, r: Rumor, exclude: Option<SocketAddr>, flipped: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.peers.is_empty() {
            return effects;
        }
        let Some(dst) = self.peers.random_except(exclude.as_ref()) else {
            return effects;
        };
        if let Some(e) = exclude {
            if dst == e && self.peers.len() == 1 {
                // Only peer is the one we must exclude: no-op.
                return effects;
            }
        }

        effects.push(Effect::Send(dst, GossipPacket::Rumor(r.clone())));
        if flipped {
            observe::flipped_coin(dst);
        }
        observe::mongering_with(dst);
        self.monger_state.insert(dst, (r, exclude));
        effects.push(Effect::ArmMonger(dst));
        effects
    }

    /// True if some known peer is not `exclude` — the gate spec.md places
    /// on the post-sync coin flip ("only if there exists at least one peer
    /// ≠ sender").
    fn has_alternative_peer(&self, exclude: Option<SocketAddr>) -> bool {
        match exclude {
            Some(e) => self.peers.snapshot().iter().any(|p| *p != e),
            None => !self.peers.is_empty(),
        }
    }
}
