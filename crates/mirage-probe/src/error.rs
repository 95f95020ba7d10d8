use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Wire(#[from] mirage_wire::WireError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown stage id: {0}")]
    UnknownStage(u32),

    #[error("stage plan is empty")]
    EmptyPlan,
}
