//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The server only depends on the [`Codec`] trait; [`JsonCodec`] is the
//! one the browser lobby speaks.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use partyroom_protocol::{ClientCommand, Codec, JsonCodec, RoomCode};
///
/// let codec = JsonCodec;
/// let bytes = br#"{"event":"getRoomState","data":{"roomCode":"AB12CD"}}"#;
///
/// let cmd: ClientCommand = codec.decode(bytes).unwrap();
/// assert_eq!(
///     cmd,
///     ClientCommand::GetRoomState { room_code: RoomCode::new("AB12CD") }
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientCommand, Identity, ServerEvent, UserId};

    #[test]
    fn test_json_codec_decode_unknown_event_is_decode_error() {
        let result: Result<ClientCommand, _> =
            JsonCodec.decode(br#"{"event":"flyToMoon","data":{}}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_missing_field_is_decode_error() {
        // joinRoom without userName.
        let result: Result<ClientCommand, _> = JsonCodec
            .decode(br#"{"event":"joinRoom","data":{"roomCode":"AAAAAA","userId":"U1"}}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encode_produces_utf8_json() {
        let event = ServerEvent::PlayerLeft(Identity {
            id: UserId::new("U1"),
            name: "Ann".into(),
        });
        let bytes = JsonCodec.encode(&event).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.starts_with(r#"{"event":"playerLeft""#));
    }
}
