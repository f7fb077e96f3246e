use crate::model::PayloadKind;
use thiserror::Error;

/// Failure to turn signaling bytes (or a payload blob) into a usable value.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed signaling envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} message carries no value")]
    MissingValue(PayloadKind),

    #[error("signaling envelope has an empty sender")]
    EmptySender,

    #[error("signaling envelope is addressed to an empty recipient")]
    EmptyRecipient,

    #[error("session description is not usable")]
    InvalidDescription,

    #[error("ice candidate is not usable: {0:?}")]
    InvalidCandidate(String),
}
