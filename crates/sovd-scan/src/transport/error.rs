//! Transport layer errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport not supported: {0}")]
    Unsupported(String),
}

impl TransportError {
    /// Failures of a single exchange that may succeed when the request is
    /// sent again (I/O, malformed data, protocol layer).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::SendFailed(_)
                | TransportError::ReceiveFailed(_)
                | TransportError::MalformedResponse(_)
                | TransportError::ProtocolError(_)
        )
    }
}
