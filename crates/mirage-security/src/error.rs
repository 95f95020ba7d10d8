use thiserror::Error;

/// Errors raised by the media-security layer (spec.md §4.2, §7 `AuthError`
/// / `DecryptionError`).
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("unauthorized identity")]
    UnauthorizedIdentity,

    #[error("replay detected")]
    ReplayDetected,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid registration token")]
    InvalidToken,
}
