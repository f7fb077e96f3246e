mod channel_handler;
mod engine_config;
mod peer_engine;
mod webrtc_engine;

pub use channel_handler::*;
pub use engine_config::*;
pub use peer_engine::*;
pub use webrtc_engine::*;
