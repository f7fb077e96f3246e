pub mod codec;
pub mod error;
pub mod model;

pub use error::CodecError;
pub use model::{
    HubControl, IceCandidate, PayloadKind, PeerId, Presence, SdpType, SessionDescription,
    SignalMessage, SignalPayload,
};
