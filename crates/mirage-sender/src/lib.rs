//! Host packet sender (spec.md §2 component 3, §4.3): the per-stream
//! sender actor that fragments encoder output, attaches XOR parity, paces
//! egress via a token bucket, and drops stale work when generations change
//! or keyframes supersede.

pub mod error;
pub mod fec;
pub mod pacer;
pub mod sender;
pub mod sink;
pub mod state;
pub mod work_item;

pub use error::SenderError;
pub use pacer::Pacer;
pub use sender::PacketSender;
pub use sink::DatagramSink;
pub use state::GenerationControl;
pub use work_item::{KeyframeCallbacks, WorkItem};
