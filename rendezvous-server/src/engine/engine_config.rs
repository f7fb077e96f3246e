use std::time::Duration;

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Configuration for WebRTC
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ice_servers: Vec<String>,
    /// Upper bound on waiting for ICE gathering before candidates are
    /// enumerated.
    pub gather_timeout: Duration,
    /// Offer 127.0.0.1 host candidates. Only useful when both ends run on
    /// the same machine.
    pub include_loopback_candidates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_owned()],
            gather_timeout: Duration::from_secs(2),
            include_loopback_candidates: false,
        }
    }
}
