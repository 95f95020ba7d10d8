use serde::{Deserialize, Serialize};

use crate::ids::StreamId;

/// Bitfield flags carried by every [`FrameHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameFlags(pub u8);

impl FrameFlags {
    pub const KEYFRAME: u8 = 1 << 0;
    pub const END_OF_FRAME: u8 = 1 << 1;
    pub const DISCONTINUITY: u8 = 1 << 2;
    pub const PARAMETER_SET: u8 = 1 << 3;
    pub const FEC_PARITY: u8 = 1 << 4;
    pub const ENCRYPTED_PAYLOAD: u8 = 1 << 5;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, bit: u8) -> Self {
        self.0 |= bit;
        self
    }

    pub fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn is_keyframe(self) -> bool {
        self.has(Self::KEYFRAME)
    }

    pub fn is_end_of_frame(self) -> bool {
        self.has(Self::END_OF_FRAME)
    }

    pub fn is_discontinuity(self) -> bool {
        self.has(Self::DISCONTINUITY)
    }

    pub fn is_parameter_set(self) -> bool {
        self.has(Self::PARAMETER_SET)
    }

    pub fn is_fec_parity(self) -> bool {
        self.has(Self::FEC_PARITY)
    }

    pub fn is_encrypted(self) -> bool {
        self.has(Self::ENCRYPTED_PAYLOAD)
    }
}

/// Pixel-space rectangle of the content carried by a frame, in encoder
/// output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// Opaque generation tag advertised by the host; lets the client discard
/// fragments produced before a resize took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DimensionToken(pub u16);

/// Receiver-facing discontinuity counter (see GLOSSARY: Epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Epoch(pub u16);

impl Epoch {
    pub fn advance(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

/// One per UDP data (or parity) fragment. `FrameHeader` is the fixed-size
/// structure that prefixes every media datagram; see `mirage-wire` for wire
/// encoding/decoding.
///
/// Invariants (spec.md §3):
/// - `fragment_index < fragment_count`
/// - exactly one fragment of a frame has `END_OF_FRAME` set
/// - `fragment_count == ceil(frame_byte_count / max_payload) + parity_count`
/// - all fragments of a frame share `frame_number`, `timestamp_ns`,
///   `frame_byte_count`, `dimension_token`, `epoch`, and `stream_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub flags: FrameFlags,
    pub stream_id: StreamId,
    pub sequence_number: u32,
    pub timestamp_ns: u64,
    pub frame_number: u32,
    pub fragment_index: u16,
    pub fragment_count: u16,
    pub payload_length: u16,
    pub frame_byte_count: u32,
    pub crc32: u32,
    pub content_rect: ContentRect,
    pub dimension_token: DimensionToken,
    pub epoch: Epoch,
}

impl FrameHeader {
    /// Number of data fragments (excludes FEC parity fragments) implied by
    /// `frame_byte_count` and a fragment payload budget.
    pub fn data_fragment_count(frame_byte_count: u32, max_payload: usize) -> u32 {
        if max_payload == 0 {
            return 0;
        }
        ((frame_byte_count as usize + max_payload - 1) / max_payload) as u32
    }
}
