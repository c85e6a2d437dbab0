//! JSON codec for [`Message`]s and handler payloads.
//!
//! The frame codec ([`crate::protocol::frame`]) only knows about byte blobs.
//! This module turns a [`Message`] into the blob that goes inside a frame and
//! back again.
//!
//! Wire format of one blob (UTF-8 JSON, camelCase field names):
//! ```text
//! {"head":{"operationCode":<u32>,"commandCode":"<kind>"},"body":{"payload":"<string>"},"timestamp":<u64>}
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::protocol::message::Message;

/// Errors that can occur while encoding or decoding JSON.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// A value could not be turned into JSON.
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// The bytes were not valid JSON, or did not match the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into the JSON bytes carried inside one frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use gamenet_core::protocol::{decode_message, encode_message, Message, OperationCode};
///
/// let msg = Message::request(OperationCode::LOGIN, r#"{"uid":"x"}"#, 1);
/// let bytes = encode_message(&msg).unwrap();
/// assert_eq!(decode_message(&bytes).unwrap(), msg);
/// ```
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(msg).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Decodes one [`Message`] from the JSON bytes of a single frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Deserialize`] if the bytes are not a valid
/// message.  Unknown operation codes are *not* an error: they decode into an
/// [`crate::OperationCode`] with no name and are routed to a Default handler.
pub fn decode_message(bytes: &[u8]) -> Result<Message, ProtocolError> {
    serde_json::from_slice(bytes).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

/// Serializes a handler payload into the string stored in a message body.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] if serialization fails.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(value).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Parses a message body payload into a handler-specific type.
///
/// # Errors
///
/// Returns [`ProtocolError::Deserialize`] if `payload` does not match `T`.
pub fn decode_payload<T: DeserializeOwned>(payload: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(payload).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::{CommandCode, OperationCode};
    use serde::Deserialize;

    #[test]
    fn test_encoded_message_uses_camel_case_field_names() {
        // Arrange
        let msg = Message::request(OperationCode::LOGIN, "{}", 99);

        // Act
        let text = String::from_utf8(encode_message(&msg).unwrap()).unwrap();

        // Assert
        assert!(text.contains("\"operationCode\":10001"), "got {text}");
        assert!(text.contains("\"commandCode\":\"Request\""), "got {text}");
        assert!(text.contains("\"payload\":\"{}\""), "got {text}");
        assert!(text.contains("\"timestamp\":99"), "got {text}");
    }

    #[test]
    fn test_decode_message_accepts_server_json() {
        // Arrange – exactly what the server writes
        let json = br#"{"head":{"operationCode":10001,"commandCode":"Response"},"body":{"payload":"{\"entityId\":\"y\"}"},"timestamp":42}"#;

        // Act
        let msg = decode_message(json).unwrap();

        // Assert
        assert_eq!(msg.head.operation_code, OperationCode::LOGIN);
        assert_eq!(msg.head.command_code, CommandCode::Response);
        assert_eq!(msg.body.payload, r#"{"entityId":"y"}"#);
        assert_eq!(msg.timestamp, 42);
    }

    #[test]
    fn test_decode_message_keeps_unknown_operation_code() {
        let json = br#"{"head":{"operationCode":55555,"commandCode":"Event"},"body":{"payload":""},"timestamp":1}"#;
        let msg = decode_message(json).unwrap();
        assert_eq!(msg.head.operation_code, OperationCode(55555));
        assert_eq!(msg.head.operation_code.name(), None);
    }

    #[test]
    fn test_decode_message_rejects_unknown_command_code() {
        let json = br#"{"head":{"operationCode":1,"commandCode":"Shout"},"body":{"payload":""},"timestamp":1}"#;
        assert!(matches!(decode_message(json), Err(ProtocolError::Deserialize(_))));
    }

    #[test]
    fn test_decode_message_rejects_garbage() {
        assert!(matches!(
            decode_message(b"\x00\x01not json"),
            Err(ProtocolError::Deserialize(_))
        ));
    }

    #[test]
    fn test_decode_message_rejects_missing_timestamp() {
        let json = br#"{"head":{"operationCode":1,"commandCode":"Event"},"body":{"payload":""}}"#;
        assert!(decode_message(json).is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct LoginReply {
        entity_id: String,
    }

    #[test]
    fn test_decode_payload_parses_typed_body() {
        let reply: LoginReply = decode_payload(r#"{"entityId":"y"}"#).unwrap();
        assert_eq!(reply.entity_id, "y");
    }

    #[test]
    fn test_decode_payload_reports_shape_mismatch() {
        let result: Result<LoginReply, _> = decode_payload(r#"{"uid":"x"}"#);
        assert!(matches!(result, Err(ProtocolError::Deserialize(_))));
    }

    #[test]
    fn test_encode_payload_produces_json_text() {
        let text = encode_payload(&serde_json::json!({ "uid": "x" })).unwrap();
        assert_eq!(text, r#"{"uid":"x"}"#);
    }
}
