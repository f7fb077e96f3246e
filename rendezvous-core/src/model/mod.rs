mod peer;
mod presence;
mod signaling;

pub use peer::PeerId;
pub use presence::{HubControl, Presence};
pub use signaling::{
    IceCandidate, PayloadKind, SdpType, SessionDescription, SignalMessage, SignalPayload,
};
