//! Per-stream jitter buffer keyed by frame number (spec.md §4.5).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use mirage_core::policy::{ASSEMBLER_DEADLINE_FACTOR, ASSEMBLER_INTERVAL_SMOOTHING_FACTOR};
use mirage_core::{Epoch, FrameHeader, StreamId};
use tracing::warn;

use crate::assembled::AssembledFrame;
use crate::error::AssemblerError;
use crate::partial_frame::PartialFrame;

#[derive(Debug)]
pub enum AssemblerOutcome {
    Emitted(AssembledFrame),
    Pending,
    /// The fragment belonged to a frame number already emitted, dropped, or
    /// superseded (spec.md §4.5 point 5); not an error, just a no-op.
    Superseded,
}

pub struct FrameAssembler {
    stream_id: StreamId,
    active: bool,
    newest_epoch: Epoch,
    last_emitted_frame_number: Option<u32>,
    pending: HashMap<u32, PartialFrame>,
    smoothed_interval: Duration,
    last_new_frame_at: Option<Instant>,
}

impl FrameAssembler {
    pub fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            active: true,
            newest_epoch: Epoch(0),
            last_emitted_frame_number: None,
            pending: HashMap::new(),
            smoothed_interval: Duration::from_millis(16),
            last_new_frame_at: None,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.pending.clear();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Feed one fragment through the buffer (spec.md §4.5 points 1-4).
    pub fn push_fragment(
        &mut self,
        header: FrameHeader,
        payload: Bytes,
        now: Instant,
    ) -> Result<AssemblerOutcome, AssemblerError> {
        if !self.active {
            return Err(AssemblerError::StreamNotActive);
        }

        if header.epoch < self.newest_epoch {
            return Err(AssemblerError::StaleEpoch { received: header.epoch.0, newest: self.newest_epoch.0 });
        }
        if header.epoch > self.newest_epoch {
            let dropped = self.pending.len();
            if dropped > 0 {
                warn!(stream_id = %self.stream_id, dropped, "epoch advanced, dropping in-flight fragments");
            }
            self.pending.clear();
            self.newest_epoch = header.epoch;
            self.last_emitted_frame_number = None;
        }

        if let Some(last) = self.last_emitted_frame_number {
            if header.frame_number <= last {
                return Ok(AssemblerOutcome::Superseded);
            }
        }

        let frame_number = header.frame_number;
        if !self.pending.contains_key(&frame_number) {
            if let Some(last_new) = self.last_new_frame_at {
                let observed = now.saturating_duration_since(last_new);
                self.smoothed_interval = self
                    .smoothed_interval
                    .mul_f64(1.0 - ASSEMBLER_INTERVAL_SMOOTHING_FACTOR)
                    + observed.mul_f64(ASSEMBLER_INTERVAL_SMOOTHING_FACTOR);
            }
            self.last_new_frame_at = Some(now);
            self.pending.insert(frame_number, PartialFrame::new(&header, now));
        }

        let partial = self.pending.get_mut(&frame_number).expect("inserted above if absent");
        partial.push(&header, payload)?;

        if !partial.is_complete() && partial.end_of_frame_seen {
            partial.try_reconstruct();
        }

        if partial.is_complete() {
            let partial = self.pending.remove(&frame_number).unwrap();
            let frame = AssembledFrame {
                stream_id: partial.stream_id,
                frame_number: partial.frame_number,
                timestamp_ns: partial.timestamp_ns,
                is_keyframe: partial.is_keyframe,
                content_rect: partial.content_rect,
                dimension_token: partial.dimension_token,
                epoch: partial.epoch,
                data: partial.assemble(),
            };
            self.last_emitted_frame_number = Some(frame_number);
            self.retire_older_than(frame_number);
            return Ok(AssemblerOutcome::Emitted(frame));
        }

        Ok(AssemblerOutcome::Pending)
    }

    /// Drop any still-pending frame older than `frame_number` (spec.md
    /// §4.5 point 5: superseded by a later frame's arrival).
    fn retire_older_than(&mut self, frame_number: u32) {
        self.pending.retain(|pending_frame_number, _| *pending_frame_number >= frame_number);
    }

    fn deadline(&self) -> Duration {
        self.smoothed_interval.mul_f64(ASSEMBLER_DEADLINE_FACTOR).max(Duration::from_millis(1))
    }

    /// Drop any frame that has sat incomplete past the deadline (spec.md
    /// §4.5 point 4), returning the dropped frame numbers so the caller
    /// can decide whether to request a keyframe.
    pub fn tick(&mut self, now: Instant) -> Vec<u32> {
        let deadline = self.deadline();
        let mut dropped = Vec::new();
        self.pending.retain(|frame_number, partial| {
            if now.saturating_duration_since(partial.first_seen) >= deadline {
                dropped.push(*frame_number);
                false
            } else {
                true
            }
        });
        if !dropped.is_empty() {
            warn!(stream_id = %self.stream_id, ?dropped, "dropped incomplete frames past deadline");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::{ContentRect, DimensionToken, FrameFlags};

    fn header(frame_number: u32, fragment_index: u16, fragment_count: u16, flags: FrameFlags) -> FrameHeader {
        FrameHeader {
            flags,
            stream_id: StreamId(1),
            sequence_number: fragment_index as u32,
            timestamp_ns: 0,
            frame_number,
            fragment_index,
            fragment_count,
            payload_length: 1200,
            frame_byte_count: 200_000,
            crc32: 0,
            content_rect: ContentRect { x: 0, y: 0, w: 1920, h: 1080 },
            dimension_token: DimensionToken(0),
            epoch: Epoch(0),
        }
    }

    #[test]
    fn emits_once_every_data_fragment_arrives() {
        let mut assembler = FrameAssembler::new(StreamId(1));
        let now = Instant::now();
        // 200_000 bytes / 1200 = 167 fragments (ceil).
        let count = 167u16;
        let mut outcome = AssemblerOutcome::Pending;
        for i in 0..count {
            let flags = if i + 1 == count { FrameFlags::empty().with(FrameFlags::END_OF_FRAME) } else { FrameFlags::empty() };
            let header = header(1, i, count, flags);
            let mut header = header;
            header.frame_byte_count = 200_000;
            outcome = assembler.push_fragment(header, Bytes::from(vec![0u8; 1200]), now).unwrap();
        }
        assert!(matches!(outcome, AssemblerOutcome::Emitted(_)));
        assert_eq!(assembler.pending_count(), 0);
    }

    #[test]
    fn stale_epoch_is_rejected() {
        let mut assembler = FrameAssembler::new(StreamId(1));
        let now = Instant::now();
        let mut h = header(1, 0, 4, FrameFlags::empty());
        h.epoch = Epoch(5);
        assembler.push_fragment(h, Bytes::from_static(b"x"), now).unwrap();

        let mut stale = header(2, 0, 4, FrameFlags::empty());
        stale.epoch = Epoch(3);
        assert!(matches!(
            assembler.push_fragment(stale, Bytes::from_static(b"x"), now),
            Err(AssemblerError::StaleEpoch { .. })
        ));
    }

    #[test]
    fn epoch_advance_clears_pending_frames() {
        let mut assembler = FrameAssembler::new(StreamId(1));
        let now = Instant::now();
        let h = header(1, 0, 4, FrameFlags::empty());
        assembler.push_fragment(h, Bytes::from_static(b"x"), now).unwrap();
        assert_eq!(assembler.pending_count(), 1);

        let mut next_epoch = header(2, 0, 4, FrameFlags::empty());
        next_epoch.epoch = Epoch(1);
        assembler.push_fragment(next_epoch, Bytes::from_static(b"x"), now).unwrap();
        assert_eq!(assembler.pending_count(), 1); // old frame 1 dropped, frame 2 pending
    }

    #[test]
    fn tick_drops_incomplete_frames_past_the_deadline() {
        let mut assembler = FrameAssembler::new(StreamId(1));
        let now = Instant::now();
        let h = header(1, 0, 4, FrameFlags::empty());
        assembler.push_fragment(h, Bytes::from_static(b"x"), now).unwrap();

        let later = now + Duration::from_secs(1);
        let dropped = assembler.tick(later);
        assert_eq!(dropped, vec![1]);
        assert_eq!(assembler.pending_count(), 0);
    }

    #[test]
    fn superseded_frame_number_is_a_no_op() {
        let mut assembler = FrameAssembler::new(StreamId(1));
        let now = Instant::now();
        let mut h = header(5, 0, 1, FrameFlags::empty().with(FrameFlags::END_OF_FRAME));
        h.frame_byte_count = 1;
        assembler.push_fragment(h, Bytes::from_static(b"x"), now).unwrap();

        let mut stale = header(3, 0, 1, FrameFlags::empty().with(FrameFlags::END_OF_FRAME));
        stale.frame_byte_count = 1;
        let outcome = assembler.push_fragment(stale, Bytes::from_static(b"x"), now).unwrap();
        assert!(matches!(outcome, AssemblerOutcome::Superseded));
    }
}
