//! Quality probe & link characterization (spec.md §4.11): the host-driven
//! staged bandwidth sweep and the client-side decode-only probe.

pub mod decode_probe;
pub mod error;
pub mod stage;

pub use decode_probe::{run_decode_probe, DecodeProbeResult};
pub use error::ProbeError;
pub use stage::{HostProbeDriver, StageAccumulator, SweepAction, SweepPlanner};
