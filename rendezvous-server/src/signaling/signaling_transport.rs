use async_trait::async_trait;
use bytes::Bytes;
use rendezvous_core::{CodecError, PeerId, Presence};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport has not joined a room")]
    NotJoined,

    #[error("transport channel closed")]
    Closed,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode control frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to encode signaling message: {0}")]
    Codec(#[from] CodecError),
}

/// Pub/sub channel shared by the members of a room.
///
/// Delivery is at-most-once and unordered across senders. A member may
/// receive its own broadcasts back.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Join `room` as `id`. Every frame relayed to the room afterwards is
    /// delivered on the returned receiver until [`leave`](Self::leave).
    async fn join(&self, room: &str, id: &PeerId) -> Result<mpsc::Receiver<Bytes>, TransportError>;

    /// Broadcast signaling bytes to the room.
    async fn send(&self, data: Bytes) -> Result<(), TransportError>;

    /// Announce this member's presence to the room.
    async fn announce(&self, presence: Presence) -> Result<(), TransportError>;

    async fn leave(&self) -> Result<(), TransportError>;
}
