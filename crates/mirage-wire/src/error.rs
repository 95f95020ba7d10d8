use thiserror::Error;

/// Errors produced while encoding or decoding wire structures (spec.md §4.1).
#[derive(Error, Debug)]
pub enum WireError {
    #[error("invalid header")]
    InvalidHeader,

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("unknown magic: {0:?}")]
    UnknownMagic([u8; 4]),

    #[error("control message body too large: {0} bytes")]
    BodyTooLarge(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
