//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not a well-formed command: malformed JSON, an unknown
    /// `event` name, or a missing/mistyped field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The command decoded but breaks a protocol rule, e.g. an empty
    /// `userId`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
