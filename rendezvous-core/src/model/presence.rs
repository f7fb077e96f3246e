use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// Presence state announced to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// The member is (still) reachable and accepts connection requests.
    Create,
    /// The member is leaving.
    Bye,
}

/// Control frames exchanged with the room hub, separate from the relayed
/// signaling bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "lowercase")]
pub enum HubControl {
    Presence { id: PeerId, state: Presence },
}

impl HubControl {
    pub fn presence(id: PeerId, state: Presence) -> Self {
        HubControl::Presence { id, state }
    }
}
