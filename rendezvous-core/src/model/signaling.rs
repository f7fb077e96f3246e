use crate::error::CodecError;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a [`SignalPayload`], carried explicitly on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Request,
    Offer,
    Answer,
    Candidate,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::Request => "request",
            PayloadKind::Offer => "offer",
            PayloadKind::Answer => "answer",
            PayloadKind::Candidate => "candidate",
        };
        f.write_str(name)
    }
}

/// The four signaling payloads exchanged between room members.
///
/// The set is closed: adding a kind is a protocol change and every dispatch
/// site matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalPayload {
    /// The sender wants this peer to start a negotiation with it.
    Request,
    /// Serialized local session description of the offering side.
    Offer { description: String },
    /// Serialized session description answering a previous offer.
    Answer { description: String },
    /// One ICE candidate discovered by the sender.
    Candidate(IceCandidate),
}

impl SignalPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            SignalPayload::Request => PayloadKind::Request,
            SignalPayload::Offer { .. } => PayloadKind::Offer,
            SignalPayload::Answer { .. } => PayloadKind::Answer,
            SignalPayload::Candidate(_) => PayloadKind::Candidate,
        }
    }
}

/// A signaling envelope. `to == None` addresses every member of the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    pub sender: PeerId,
    pub to: Option<PeerId>,
    pub payload: SignalPayload,
}

impl SignalMessage {
    pub fn new(sender: PeerId, to: Option<PeerId>, payload: SignalPayload) -> Self {
        Self { sender, to, payload }
    }

    pub fn broadcast(sender: PeerId, payload: SignalPayload) -> Self {
        Self::new(sender, None, payload)
    }

    pub fn direct(sender: PeerId, to: PeerId, payload: SignalPayload) -> Self {
        Self::new(sender, Some(to), payload)
    }

    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    /// True when the message is broadcast or addressed to `id`.
    pub fn is_addressed_to(&self, id: &PeerId) -> bool {
        match &self.to {
            None => true,
            Some(to) => to == id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Session description in its JSON form: `{"type": "offer", "sdp": "v=0..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    /// Serialize into the opaque blob carried by Offer/Answer payloads.
    pub fn to_blob(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a blob received in an Offer/Answer payload. A description with
    /// no SDP body is rejected, it cannot be applied to a connection.
    pub fn from_blob(blob: &str) -> Result<Self, CodecError> {
        let desc: SessionDescription =
            serde_json::from_str(blob).map_err(|_| CodecError::InvalidDescription)?;
        if desc.sdp.trim().is_empty() {
            return Err(CodecError::InvalidDescription);
        }
        Ok(desc)
    }
}

/// One ICE candidate as exchanged in Candidate payloads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>, sdp_mid: Option<String>, sdp_m_line_index: Option<u16>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid,
            sdp_m_line_index,
        }
    }

    /// Checks that the candidate line can be handed to an engine.
    ///
    /// Accepts both `candidate:...` and the SDP attribute form
    /// `a=candidate:...`.
    pub fn validate(&self) -> Result<(), CodecError> {
        let line = self.candidate.trim();
        let line = line.strip_prefix("a=").unwrap_or(line);
        if line.starts_with("candidate:") && line.len() > "candidate:".len() {
            Ok(())
        } else {
            Err(CodecError::InvalidCandidate(self.candidate.clone()))
        }
    }
}
