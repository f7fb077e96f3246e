use crate::error::SignalError;
use rendezvous_core::PeerId;
use std::time::Duration;

pub const DEFAULT_ROOM: &str = "sample";
pub const DEFAULT_PEER_ID: &str = "**master**";
pub const DEFAULT_HUB_URL: &str = "ws://127.0.0.1:8080";

/// Settings of one responder peer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub room: String,
    pub id: PeerId,
    pub hub_url: String,
    /// Every running peer announces itself at least once per interval.
    pub announce_interval: Duration,
    /// Pause between consecutive Candidate sends to one peer.
    pub candidate_pause: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room: DEFAULT_ROOM.to_owned(),
            id: PeerId::from(DEFAULT_PEER_ID),
            hub_url: DEFAULT_HUB_URL.to_owned(),
            announce_interval: Duration::from_secs(10),
            candidate_pause: Duration::from_micros(100),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.id.is_blank() {
            return Err(SignalError::InvalidIdentity);
        }
        Ok(())
    }
}
