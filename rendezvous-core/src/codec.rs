//! JSON codec for [`SignalMessage`] envelopes.
//!
//! Wire shape:
//!
//! ```json
//! {"sender": "alice", "to": "srv", "kind": "answer", "value": {"description": "..."}}
//! ```
//!
//! An empty `to` means broadcast. `value` is omitted for `request`. The
//! `kind` field selects the value decoder; it is never inferred from the
//! value's shape.

use crate::error::CodecError;
use crate::model::{IceCandidate, PayloadKind, PeerId, SignalMessage, SignalPayload};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    sender: String,
    #[serde(default)]
    to: String,
    kind: PayloadKind,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    value: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct DescriptionValue {
    description: String,
}

/// Encode `message`. A broadcast is written as an empty `to`, so an empty
/// recipient id is refused rather than silently turned into one.
pub fn encode(message: &SignalMessage) -> Result<Bytes, CodecError> {
    if message.sender.as_str().is_empty() {
        return Err(CodecError::EmptySender);
    }
    if message.to.as_ref().is_some_and(|to| to.as_str().is_empty()) {
        return Err(CodecError::EmptyRecipient);
    }

    let value = match &message.payload {
        SignalPayload::Request => Value::Null,
        SignalPayload::Offer { description } | SignalPayload::Answer { description } => {
            serde_json::to_value(DescriptionValue {
                description: description.clone(),
            })?
        }
        SignalPayload::Candidate(candidate) => serde_json::to_value(candidate)?,
    };

    let envelope = Envelope {
        sender: message.sender.to_string(),
        to: message
            .to
            .as_ref()
            .map(PeerId::to_string)
            .unwrap_or_default(),
        kind: message.kind(),
        value,
    };

    Ok(Bytes::from(serde_json::to_vec(&envelope)?))
}

pub fn decode(bytes: &[u8]) -> Result<SignalMessage, CodecError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;

    if envelope.sender.is_empty() {
        return Err(CodecError::EmptySender);
    }

    let payload = match envelope.kind {
        PayloadKind::Request => SignalPayload::Request,
        PayloadKind::Offer => SignalPayload::Offer {
            description: description_of(envelope.kind, envelope.value)?,
        },
        PayloadKind::Answer => SignalPayload::Answer {
            description: description_of(envelope.kind, envelope.value)?,
        },
        PayloadKind::Candidate => {
            if envelope.value.is_null() {
                return Err(CodecError::MissingValue(envelope.kind));
            }
            SignalPayload::Candidate(serde_json::from_value::<IceCandidate>(envelope.value)?)
        }
    };

    let to = if envelope.to.is_empty() {
        None
    } else {
        Some(PeerId(envelope.to))
    };

    Ok(SignalMessage {
        sender: PeerId(envelope.sender),
        to,
        payload,
    })
}

fn description_of(kind: PayloadKind, value: Value) -> Result<String, CodecError> {
    if value.is_null() {
        return Err(CodecError::MissingValue(kind));
    }
    let value: DescriptionValue = serde_json::from_value(value)?;
    Ok(value.description)
}
