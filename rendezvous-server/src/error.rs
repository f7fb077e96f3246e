use crate::signaling::TransportError;
use rendezvous_core::{CodecError, PayloadKind, PeerId, Presence};
use thiserror::Error;

/// Errors raised while handling one signaling message, announcing presence
/// or validating startup configuration.
///
/// Engine failures carry the engine's `anyhow::Error` as their source.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to decode signaling message: {0}")]
    Decode(#[from] CodecError),

    #[error("failed to create connection for {peer}: {source}")]
    ConnectionCreate {
        peer: PeerId,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create offer for {peer}: {source}")]
    Offer {
        peer: PeerId,
        #[source]
        source: anyhow::Error,
    },

    #[error("unusable session description from {peer}: {source}")]
    DescriptionDecode {
        peer: PeerId,
        #[source]
        source: CodecError,
    },

    #[error("failed to apply remote description from {peer}: {source}")]
    RemoteDescription {
        peer: PeerId,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to send {kind} to {peer}: {source}")]
    Send {
        peer: PeerId,
        kind: PayloadKind,
        #[source]
        source: TransportError,
    },

    #[error("unusable ice candidate from {peer}: {source}")]
    CandidateDecode {
        peer: PeerId,
        #[source]
        source: CodecError,
    },

    #[error("failed to add ice candidate from {peer}: {source}")]
    CandidateAdd {
        peer: PeerId,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to announce {state:?} presence: {source}")]
    Announce {
        state: Presence,
        #[source]
        source: TransportError,
    },

    #[error("failed to join room '{room}': {source}")]
    Join {
        room: String,
        #[source]
        source: TransportError,
    },

    #[error("lost connection to the signaling hub")]
    HubLost,

    #[error("peer id must be set to a unique, non-empty value")]
    InvalidIdentity,
}
