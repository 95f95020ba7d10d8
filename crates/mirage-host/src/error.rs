use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("unknown stream: {0}")]
    UnknownStream(mirage_core::StreamId),

    #[error("session is not active, rejecting request")]
    RejectedByPolicy,

    #[error(transparent)]
    Sender(#[from] mirage_sender::SenderError),

    #[error(transparent)]
    Control(#[from] mirage_control::ControlError),
}
