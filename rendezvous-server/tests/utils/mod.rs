pub mod signal_helpers;
pub mod webrtc_client;

pub use mock_engine::*;
pub use recording_transport::*;
pub use signal_helpers::*;
pub use webrtc_client::*;
