pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod hub;
pub mod presence;
pub mod responder;
pub mod signaling;

pub use config::ServerConfig;
pub use dispatch::{DispatchOutcome, Dispatcher, HandleState, PeerRegistry};
pub use engine::{
    ChannelHandler, EchoHandler, EngineConfig, PeerConnection, PeerEngine, WebRtcEngine,
};
pub use error::SignalError;
pub use hub::{HubConfig, RelayHub};
pub use presence::PresenceAnnouncer;
pub use responder::Responder;
pub use signaling::{MemoryHub, MemoryTransport, SignalingTransport, TransportError, WsTransport};
