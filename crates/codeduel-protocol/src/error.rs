//! Error types for the protocol layer.
//!
//! Each Codeduel crate has its own error enum, so a `ProtocolError` always
//! means "these bytes are not a message we understand", never a room or
//! networking problem.

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown request type,
    /// a missing field, or an unknown mode.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
