//! Text-frame codec for [`WireMessage`].
//!
//! Decoding validates everything the registry relies on, so nothing past
//! this point has to check payload shape: a register frame that decodes
//! has a non-empty set id and at least one definition, and every definition
//! has a string `id`.

use super::messages::{MessageKind, WireMessage};

const KIND_FIELD: &str = "messageType";

/// Reasons a frame is dropped.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is not a JSON object.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The object has no string `messageType`.
    #[error("frame has no messageType")]
    MissingKind,

    /// `messageType` names no known message.
    #[error("unknown messageType: {0}")]
    UnknownKind(String),

    /// The payload does not fit the named message.
    #[error("invalid {kind} frame: {source}")]
    InvalidPayload {
        /// Kind named by the frame.
        kind: MessageKind,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A register frame with an empty `deviceSetId`.
    #[error("register frame has an empty deviceSetId")]
    EmptyDeviceSetId,

    /// A register frame without device definitions.
    #[error("register frame for {0} has no device definitions")]
    NoDeviceDefinitions(String),

    /// Encoding failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Parses one text frame.
///
/// # Errors
///
/// Returns a [`CodecError`] describing why the frame was rejected.
pub fn decode(text: &str) -> Result<WireMessage, CodecError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(CodecError::Malformed("expected a JSON object".to_string()));
    };

    let raw_kind = object
        .get(KIND_FIELD)
        .and_then(serde_json::Value::as_str)
        .ok_or(CodecError::MissingKind)?;
    let kind = MessageKind::parse(raw_kind).ok_or_else(|| CodecError::UnknownKind(raw_kind.to_string()))?;

    let message: WireMessage =
        serde_json::from_value(value).map_err(|source| CodecError::InvalidPayload { kind, source })?;

    validate(&message)?;
    Ok(message)
}

/// Serializes a message into one text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails, which only happens
/// for pass-through values serde cannot represent.
pub fn encode(message: &WireMessage) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(CodecError::Encode)
}

fn validate(message: &WireMessage) -> Result<(), CodecError> {
    if let WireMessage::Register(register) = message {
        if register.device_set_id.as_str().is_empty() {
            return Err(CodecError::EmptyDeviceSetId);
        }
        if register.device_definitions.is_empty() {
            return Err(CodecError::NoDeviceDefinitions(
                register.device_set_id.to_string(),
            ));
        }
    }
    Ok(())
}
