//! Control-channel protocol: message catalogue, framing, connection and
//! per-stream lifecycle state machines, and the TLS transport that carries
//! them (spec.md §4.8, §6).

mod connection;
mod error;
mod lifecycle;
mod message;
mod transport;

pub use connection::{ConnectionMachine, ConnectionState};
pub use error::ControlError;
pub use lifecycle::{PendingResize, StreamGeometry, StreamLifecycleMachine, StreamLifecycleState};
pub use message::{ControlMessage, MessageType};
pub use message as messages;
pub use transport::{connect, generate_self_signed_identity, ControlListener, ControlStream, TlsIdentity};
