//! Wire codec & framing (spec.md §2 component 1, §4.1, §6): serializes and
//! parses `FrameHeader`, UDP registration datagrams, quality-test packet
//! headers, and control-channel envelopes. Computes and validates CRC32.

pub mod envelope;
pub mod error;
pub mod header;
pub mod probe;
pub mod registration;

pub use envelope::{read_envelope, write_envelope, Envelope, MAX_BODY_BYTES};
pub use error::WireError;
pub use header::{compute_crc32, decode_header, encode_header, verify_crc32, HEADER_SIZE};
pub use probe::{QualityTestPacketHeader, PROBE_HEADER_SIZE};
pub use registration::{RegistrationKind, RegistrationPacket, MAGIC_AUDIO, MAGIC_QUALITY_TEST, MAGIC_VIDEO};
