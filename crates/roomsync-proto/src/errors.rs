//! Error types for wire-level encoding and decoding.

use thiserror::Error;

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding backend payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is not valid JSON or does not match the expected shape.
    #[error("json decode failed: {0}")]
    JsonDecode(String),

    /// Value could not be serialized.
    #[error("json encode failed: {0}")]
    JsonEncode(String),

    /// A single event-stream line grew beyond the decoder's limit.
    #[error("event stream line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum accepted line length in bytes.
        limit: usize,
    },
}

/// Decoding is the common direction; encode sites map explicitly.
impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonDecode(err.to_string())
    }
}
