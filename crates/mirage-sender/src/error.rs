use mirage_security::SecurityError;
use mirage_wire::WireError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("wire encode error: {0}")]
    Wire(#[from] WireError),

    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stale generation, work item discarded")]
    StaleGeneration,

    #[error("superseded by a newer keyframe, work item discarded")]
    SupersededByKeyframe,

    #[error("dropped non-keyframe while awaiting a keyframe")]
    AwaitingKeyframe,

    #[error("frame requires more than {} fragments, rejected at send time", u16::MAX)]
    FrameTooLarge,
}
