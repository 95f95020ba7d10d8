use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Control(#[from] mirage_control::ControlError),

    #[error("not connected")]
    NotConnected,

    #[error("unknown stream: {0:?}")]
    UnknownStream(mirage_core::StreamId),
}
