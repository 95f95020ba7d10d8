//! In-flight reassembly state for a single frame number (spec.md §4.5).
//!
//! The wire carries `fragment_count` but not the FEC block size, so the
//! assembler infers block grouping from the fixed loss-mode constants
//! (spec.md §4.4: 8 for keyframes, 16 for P-frames) keyed off the
//! `keyframe` flag every fragment of a frame shares. `data_fragment_count`
//! is likewise derived, not transmitted: both ends compute
//! `FrameHeader::data_fragment_count` from `frame_byte_count` against the
//! same fixed payload budget (`mirage_core::policy::DEFAULT_MAX_PAYLOAD_BYTES`).

use std::time::Instant;

use bytes::Bytes;
use mirage_core::policy::{DEFAULT_MAX_PAYLOAD_BYTES, LOSS_MODE_KEYFRAME_FEC_BLOCK, LOSS_MODE_PFRAME_FEC_BLOCK};
use mirage_core::{ContentRect, DimensionToken, Epoch, FrameHeader, StreamId};

use crate::error::AssemblerError;

pub(crate) struct PartialFrame {
    pub stream_id: StreamId,
    pub frame_number: u32,
    pub timestamp_ns: u64,
    pub frame_byte_count: u32,
    pub content_rect: ContentRect,
    pub dimension_token: DimensionToken,
    pub epoch: Epoch,
    pub is_keyframe: bool,
    data_fragment_count: u16,
    fec_block_size: u32,
    data_slots: Vec<Option<Bytes>>,
    parity_slots: Vec<Option<Bytes>>,
    received_data_count: u16,
    pub end_of_frame_seen: bool,
    pub first_seen: Instant,
}

impl PartialFrame {
    pub fn new(header: &FrameHeader, now: Instant) -> Self {
        let data_fragment_count =
            FrameHeader::data_fragment_count(header.frame_byte_count, DEFAULT_MAX_PAYLOAD_BYTES) as u16;
        let parity_count = header.fragment_count.saturating_sub(data_fragment_count);
        let is_keyframe = header.flags.is_keyframe();
        let fec_block_size = if parity_count == 0 {
            0
        } else if is_keyframe {
            LOSS_MODE_KEYFRAME_FEC_BLOCK
        } else {
            LOSS_MODE_PFRAME_FEC_BLOCK
        };

        Self {
            stream_id: header.stream_id,
            frame_number: header.frame_number,
            timestamp_ns: header.timestamp_ns,
            frame_byte_count: header.frame_byte_count,
            content_rect: header.content_rect,
            dimension_token: header.dimension_token,
            epoch: header.epoch,
            is_keyframe,
            data_fragment_count,
            fec_block_size,
            data_slots: vec![None; data_fragment_count as usize],
            parity_slots: vec![None; parity_count as usize],
            received_data_count: 0,
            end_of_frame_seen: false,
            first_seen: now,
        }
    }

    pub fn push(&mut self, header: &FrameHeader, payload: Bytes) -> Result<(), AssemblerError> {
        if header.fragment_index >= header.fragment_count {
            return Err(AssemblerError::FragmentIndexOutOfRange {
                index: header.fragment_index,
                count: header.fragment_count,
            });
        }

        if header.flags.is_end_of_frame() {
            self.end_of_frame_seen = true;
        }

        if header.fragment_index < self.data_fragment_count {
            let slot = &mut self.data_slots[header.fragment_index as usize];
            if slot.is_some() {
                return Err(AssemblerError::DuplicateFragment(header.fragment_index));
            }
            *slot = Some(payload);
            self.received_data_count += 1;
        } else {
            let parity_index = (header.fragment_index - self.data_fragment_count) as usize;
            let slot = &mut self.parity_slots[parity_index];
            if slot.is_some() {
                return Err(AssemblerError::DuplicateFragment(header.fragment_index));
            }
            *slot = Some(payload);
        }

        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.received_data_count == self.data_fragment_count
    }

    /// Reconstruct any block in which exactly one data fragment is missing
    /// and that block's parity fragment has arrived (spec.md §4.5 point 4,
    /// §9: "tolerates one missing data fragment per block").
    pub fn try_reconstruct(&mut self) {
        if self.fec_block_size == 0 {
            return;
        }
        let block_size = self.fec_block_size as usize;
        let data_count = self.data_slots.len();

        for block_index in 0..self.parity_slots.len() {
            let start = block_index * block_size;
            let end = (start + block_size).min(data_count);
            if start >= end {
                continue;
            }

            let missing: Vec<usize> = (start..end).filter(|&i| self.data_slots[i].is_none()).collect();
            if missing.len() != 1 {
                continue;
            }
            let Some(parity) = &self.parity_slots[block_index] else { continue };

            let mut recovered = parity.to_vec();
            for i in start..end {
                if i == missing[0] {
                    continue;
                }
                if let Some(fragment) = &self.data_slots[i] {
                    for (byte_index, byte) in fragment.iter().enumerate() {
                        recovered[byte_index] ^= byte;
                    }
                }
            }

            recovered.truncate(self.expected_fragment_len(missing[0]));
            self.data_slots[missing[0]] = Some(Bytes::from(recovered));
            self.received_data_count += 1;
        }
    }

    /// The byte length a data fragment at `index` is expected to carry:
    /// `DEFAULT_MAX_PAYLOAD_BYTES` for every fragment but the last, which
    /// only holds the frame's remainder.
    fn expected_fragment_len(&self, index: usize) -> usize {
        if index + 1 == self.data_slots.len() {
            self.frame_byte_count as usize - index * DEFAULT_MAX_PAYLOAD_BYTES
        } else {
            DEFAULT_MAX_PAYLOAD_BYTES
        }
    }

    pub fn assemble(&self) -> Bytes {
        let total: usize = self.data_slots.iter().flatten().map(|f| f.len()).sum();
        let mut buf = Vec::with_capacity(total);
        for fragment in self.data_slots.iter().flatten() {
            buf.extend_from_slice(fragment);
        }
        Bytes::from(buf)
    }
}
