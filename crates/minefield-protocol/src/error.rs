//! Error types for the protocol layer.

/// Errors that can occur while turning messages into bytes and back.
///
/// A `ProtocolError` always means the problem is in the message itself
/// (shape, encoding, ordering), never in the game or the ledger.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown message tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. a
    /// request sent before the handshake.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
