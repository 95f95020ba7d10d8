use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssemblerError {
    #[error("stream is not active")]
    StreamNotActive,

    #[error("epoch {received:?} is older than newest seen {newest:?}")]
    StaleEpoch { received: u16, newest: u16 },

    #[error("fragment index {index} is out of range for fragment count {count}")]
    FragmentIndexOutOfRange { index: u16, count: u16 },

    #[error("duplicate fragment index {0}")]
    DuplicateFragment(u16),
}
