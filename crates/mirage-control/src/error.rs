use thiserror::Error;

/// Errors raised by the control channel (spec.md §7 `ProtocolError`,
/// `StateMismatch`, `TransportError`).
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("unknown control message type: {0}")]
    UnknownMessageType(u8),

    #[error("malformed message body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("message for unknown or wrong-state stream: {0:?}")]
    UnknownStream(mirage_core::StreamId),

    #[error("state mismatch: {0}")]
    StateMismatch(String),

    #[error(transparent)]
    Wire(#[from] mirage_wire::WireError),

    #[error(transparent)]
    Security(#[from] mirage_security::SecurityError),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
}
