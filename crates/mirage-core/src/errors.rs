use thiserror::Error;

/// Umbrella error returned at session/control boundaries (spec.md §7
/// "Kinds"). Lower-level crates (`mirage-wire`, `mirage-security`, ...)
/// define their own detailed error enums and convert into this one with
/// `#[from]` at the point they cross into session/control code, mirroring
/// `DualLinkError::Decoder(#[from] DecoderError)` in the teacher crate.
#[derive(Error, Debug)]
pub enum MirageError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("decryption failed")]
    Decryption,

    #[error("checksum mismatch")]
    Checksum,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("not connected")]
    NotConnected,

    #[error("already in flight: {0}")]
    AlreadyInFlight(String),

    #[error("state mismatch: {0}")]
    StateMismatch(String),

    #[error("rejected by policy: {0}")]
    RejectedByPolicy(String),

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
