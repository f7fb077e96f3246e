use anyhow::Result;
use async_trait::async_trait;
use rendezvous_core::{IceCandidate, PeerId, SessionDescription};

/// Factory of peer connections, one per negotiation attempt.
#[async_trait]
pub trait PeerEngine: Send + Sync {
    async fn new_connection(&self, peer_id: &PeerId) -> Result<Box<dyn PeerConnection>>;
}

/// One engine session with a remote peer.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Create the local offer and install it as the local description.
    async fn offer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Local candidates discovered so far, in discovery order.
    async fn ice_candidates(&self) -> Vec<IceCandidate>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self);
}
