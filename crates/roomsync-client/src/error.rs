//! Client error types.

use roomsync_core::ValidationError;
use roomsync_proto::ProtocolError;
use thiserror::Error;

/// Network-level failures: the exchange itself did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach the backend.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request was sent but no complete response came back.
    #[error("request failed: {0}")]
    Request(String),

    /// Push channel broke mid-stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// A read endpoint answered with a non-success status.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Body could not be encoded or decoded.
    #[error("payload error: {0}")]
    Payload(#[from] ProtocolError),
}

impl TransportError {
    /// Returns true if retrying later may succeed.
    ///
    /// Network failures and server-side statuses are transient. Malformed
    /// payloads and client-side statuses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Request(_) | Self::Stream(_) => true,
            Self::Status { status } => *status >= 500,
            Self::Payload(_) => false,
        }
    }
}

/// Failure of a control command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Backend answered with a non-2xx status.
    #[error("rejected ({status}): {reason}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// `erreur` field of the reply, or a generic description
        reason: String,
    },

    /// The exchange did not complete.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Input rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CommandError {
    /// Human-readable reason for a notification.
    pub fn reason(&self) -> String {
        match self {
            Self::Rejected { reason, .. } => reason.clone(),
            Self::Transport(err) => err.to_string(),
            Self::Validation(err) => err.to_string(),
        }
    }

    /// Returns true if the same command may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status >= 500,
            Self::Transport(err) => err.is_transient(),
            Self::Validation(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_transient() {
        assert!(TransportError::Connection("refused".into()).is_transient());
        assert!(TransportError::Status { status: 503 }.is_transient());
        assert!(CommandError::Rejected { status: 500, reason: "boom".into() }.is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert!(!TransportError::Status { status: 404 }.is_transient());
        assert!(!TransportError::Payload(ProtocolError::JsonDecode("x".into())).is_transient());
        assert!(!CommandError::Rejected { status: 400, reason: "bad".into() }.is_transient());
        assert!(!CommandError::Validation(ValidationError::EmptyRoomName).is_transient());
    }

    #[test]
    fn reason_prefers_backend_text() {
        let err = CommandError::Rejected { status: 404, reason: "Pièce non trouvée".into() };
        assert_eq!(err.reason(), "Pièce non trouvée");
        assert_eq!(
            CommandError::from(ValidationError::EmptyRoomName).reason(),
            "room name must not be empty"
        );
    }
}
