use bytes::Bytes;
use rendezvous_core::{IceCandidate, PeerId, SessionDescription, SignalMessage, SignalPayload, codec};
use rendezvous_server::{Dispatcher, PeerEngine, SignalingTransport};
use std::sync::Arc;
use std::time::Duration;

/// Identity of the dispatcher under test.
pub const SERVER_ID: &str = "srv";

/// Dispatcher for [`SERVER_ID`] with no pause between candidate sends.
pub fn dispatcher(
    engine: Arc<dyn PeerEngine>,
    transport: Arc<dyn SignalingTransport>,
) -> Dispatcher {
    Dispatcher::new(PeerId::from(SERVER_ID), engine, transport).with_candidate_pause(Duration::ZERO)
}

/// Encode a message from `sender` to the server.
pub fn frame_to_server(sender: &str, payload: SignalPayload) -> Bytes {
    frame(sender, Some(SERVER_ID), payload)
}

pub fn frame(sender: &str, to: Option<&str>, payload: SignalPayload) -> Bytes {
    let message = SignalMessage::new(PeerId::from(sender), to.map(PeerId::from), payload);
    codec::encode(&message).expect("test frame must encode")
}

pub fn request() -> SignalPayload {
    SignalPayload::Request
}

pub fn answer(sdp: &str) -> SignalPayload {
    SignalPayload::Answer {
        description: SessionDescription::answer(sdp)
            .to_blob()
            .expect("answer must encode"),
    }
}

pub fn raw_answer(description: &str) -> SignalPayload {
    SignalPayload::Answer {
        description: description.to_owned(),
    }
}

pub fn host_candidate(port: u16) -> IceCandidate {
    IceCandidate::new(
        format!("candidate:{port} 1 udp 2130706431 192.0.2.10 {port} typ host"),
        Some("0".to_owned()),
        Some(0),
    )
}

pub fn candidate(port: u16) -> SignalPayload {
    SignalPayload::Candidate(host_candidate(port))
}

/// One payload of every kind, for properties that must hold regardless of
/// kind.
pub fn every_kind() -> Vec<SignalPayload> {
    vec![
        request(),
        SignalPayload::Offer {
            description: SessionDescription::offer("v=0").to_blob().expect("offer must encode"),
        },
        answer("v=0"),
        candidate(5000),
    ]
}
