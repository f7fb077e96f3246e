use crate::engine::PeerConnection;
use rendezvous_core::PeerId;
use std::collections::HashMap;
use std::fmt;

/// Negotiation progress of a registered connection. Peers without an entry
/// are `absent`; a closed connection is never kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Offer sent, waiting for the answer.
    Offering,
    /// Answer applied, candidates exchanged.
    Negotiating,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleState::Offering => write!(f, "offering"),
            HandleState::Negotiating => write!(f, "negotiating"),
        }
    }
}

pub(crate) struct PeerSlot {
    pub(crate) handle: Box<dyn PeerConnection>,
    pub(crate) state: HandleState,
}

/// At most one live connection per remote peer.
///
/// Owned by the [`Dispatcher`](crate::dispatch::Dispatcher) and mutated only
/// through `&mut`, so peer state transitions never race. Removing an entry
/// is the only way to close its connection.
#[derive(Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, PeerSlot>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn state(&self, peer_id: &PeerId) -> Option<HandleState> {
        self.peers.get(peer_id).map(|slot| slot.state)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.keys()
    }

    pub(crate) fn get(&self, peer_id: &PeerId) -> Option<&PeerSlot> {
        self.peers.get(peer_id)
    }

    pub(crate) fn get_mut(&mut self, peer_id: &PeerId) -> Option<&mut PeerSlot> {
        self.peers.get_mut(peer_id)
    }

    /// Register `handle` for `peer_id`. The caller must have closed any
    /// previous connection first.
    pub(crate) fn insert(&mut self, peer_id: PeerId, handle: Box<dyn PeerConnection>, state: HandleState) {
        let previous = self.peers.insert(peer_id, PeerSlot { handle, state });
        debug_assert!(previous.is_none(), "registry entry replaced without close");
    }

    /// Remove and close the connection of `peer_id`. Returns whether one
    /// existed.
    pub(crate) async fn close(&mut self, peer_id: &PeerId) -> bool {
        let Some(slot) = self.peers.remove(peer_id) else {
            return false;
        };
        slot.handle.close().await;
        true
    }

    pub(crate) async fn close_all(&mut self) {
        for (_, slot) in self.peers.drain() {
            slot.handle.close().await;
        }
    }
}
