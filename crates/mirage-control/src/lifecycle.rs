//! Per-stream lifecycle state machine and resize-ack protocol (spec.md
//! §4.8): `requested → started{streamID,w,h,fps,codec} → {active|paused}
//! → stopped`.

use std::time::{Duration, Instant};

use mirage_core::policy::{RESIZE_ACK_TIMEOUT_MS, RESIZE_ACK_TOLERANCE_POINTS};
use mirage_core::{StreamId, VideoCodec};

use crate::error::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGeometry {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamLifecycleState {
    Requested,
    Started { stream_id: StreamId, geometry: StreamGeometry, codec: VideoCodec },
    /// The client enters `Active` only after the first UDP packet for the
    /// stream is received (spec.md §4.8), not merely on `streamStarted`.
    Active { stream_id: StreamId, geometry: StreamGeometry, codec: VideoCodec },
    Paused { stream_id: StreamId, geometry: StreamGeometry, codec: VideoCodec },
    Stopped,
}

/// Tracks the explicit resize-ack handshake (spec.md §4.8): the client
/// blocks input, waits up to [`RESIZE_ACK_TIMEOUT_MS`] for the host's
/// acknowledged size to converge within [`RESIZE_ACK_TOLERANCE_POINTS`],
/// issuing exactly one single-shot correction if the first ack misses.
pub struct PendingResize {
    pub requested: StreamGeometry,
    pub deadline: Instant,
    pub correction_sent: bool,
}

pub struct StreamLifecycleMachine {
    state: StreamLifecycleState,
    pending_resize: Option<PendingResize>,
    input_blocked: bool,
}

impl StreamLifecycleMachine {
    pub fn new() -> Self {
        Self { state: StreamLifecycleState::Requested, pending_resize: None, input_blocked: false }
    }

    pub fn state(&self) -> &StreamLifecycleState {
        &self.state
    }

    pub fn input_blocked(&self) -> bool {
        self.input_blocked
    }

    /// Host emitted `streamStarted` / `desktopStreamStarted` /
    /// `loginDisplayReady` (spec.md §4.8).
    pub fn on_started(
        &mut self,
        stream_id: StreamId,
        geometry: StreamGeometry,
        codec: VideoCodec,
    ) -> Result<(), ControlError> {
        match self.state {
            StreamLifecycleState::Requested => {
                self.state = StreamLifecycleState::Started { stream_id, geometry, codec };
                Ok(())
            }
            _ => Err(ControlError::StateMismatch(format!("on_started from {:?}", self.state))),
        }
    }

    /// First UDP packet for the stream arrived (spec.md §4.8).
    pub fn on_first_data_packet(&mut self) -> Result<(), ControlError> {
        match self.state.clone() {
            StreamLifecycleState::Started { stream_id, geometry, codec } => {
                self.state = StreamLifecycleState::Active { stream_id, geometry, codec };
                Ok(())
            }
            _ => Err(ControlError::StateMismatch(format!("on_first_data_packet from {:?}", self.state))),
        }
    }

    pub fn on_paused(&mut self) -> Result<(), ControlError> {
        match self.state.clone() {
            StreamLifecycleState::Active { stream_id, geometry, codec } => {
                self.state = StreamLifecycleState::Paused { stream_id, geometry, codec };
                Ok(())
            }
            _ => Err(ControlError::StateMismatch(format!("on_paused from {:?}", self.state))),
        }
    }

    pub fn on_resumed(&mut self) -> Result<(), ControlError> {
        match self.state.clone() {
            StreamLifecycleState::Paused { stream_id, geometry, codec } => {
                self.state = StreamLifecycleState::Active { stream_id, geometry, codec };
                Ok(())
            }
            _ => Err(ControlError::StateMismatch(format!("on_resumed from {:?}", self.state))),
        }
    }

    pub fn on_stopped(&mut self) {
        self.state = StreamLifecycleState::Stopped;
        self.pending_resize = None;
        self.input_blocked = false;
    }

    /// The client sends `displayResolutionChange` and blocks input (spec.md
    /// §4.8). A request matching the last acknowledged size is a no-op
    /// that leaves input unblocked (spec.md §8 "Round-trip / idempotence").
    pub fn request_resize(&mut self, requested: StreamGeometry, now: Instant, acknowledged: StreamGeometry) {
        if requested.width == acknowledged.width && requested.height == acknowledged.height {
            return;
        }
        self.input_blocked = true;
        self.pending_resize = Some(PendingResize {
            requested,
            deadline: now + Duration::from_millis(RESIZE_ACK_TIMEOUT_MS),
            correction_sent: false,
        });
    }

    /// Host acknowledged a resize with `acked` as its minSize. Returns
    /// `Some(correction)` exactly once if `acked` misses tolerance and no
    /// correction has been sent yet (spec.md §4.8, §8 scenario 5).
    pub fn on_resize_ack(&mut self, acked: StreamGeometry) -> Option<StreamGeometry> {
        let pending = self.pending_resize.as_mut()?;

        let dw = (acked.width as i64 - pending.requested.width as i64).unsigned_abs() as u32;
        let dh = (acked.height as i64 - pending.requested.height as i64).unsigned_abs() as u32;

        if dw <= RESIZE_ACK_TOLERANCE_POINTS && dh <= RESIZE_ACK_TOLERANCE_POINTS {
            self.pending_resize = None;
            self.input_blocked = false;
            return None;
        }

        if pending.correction_sent {
            return None;
        }
        pending.correction_sent = true;
        Some(pending.requested)
    }

    /// Called on each control-loop tick; on timeout the client unblocks
    /// input regardless of convergence (spec.md §4.8 scenario 5: "on
    /// timeout, the client unblocks input regardless").
    pub fn check_resize_timeout(&mut self, now: Instant) -> bool {
        let Some(pending) = &self.pending_resize else { return false };
        if now < pending.deadline {
            return false;
        }
        self.pending_resize = None;
        self.input_blocked = false;
        true
    }
}

impl Default for StreamLifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(w: u32, h: u32) -> StreamGeometry {
        StreamGeometry { width: w, height: h, frame_rate: 120 }
    }

    #[test]
    fn full_lifecycle_happy_path() {
        let mut machine = StreamLifecycleMachine::new();
        machine.on_started(StreamId(1), geometry(1920, 1080), VideoCodec::H264).unwrap();
        machine.on_first_data_packet().unwrap();
        assert!(matches!(machine.state(), StreamLifecycleState::Active { .. }));
        machine.on_paused().unwrap();
        machine.on_resumed().unwrap();
        machine.on_stopped();
        assert_eq!(machine.state(), &StreamLifecycleState::Stopped);
    }

    #[test]
    fn matching_resize_request_is_a_no_op() {
        let mut machine = StreamLifecycleMachine::new();
        let now = Instant::now();
        machine.request_resize(geometry(960, 540), now, geometry(960, 540));
        assert!(!machine.input_blocked());
    }

    #[test]
    fn mismatched_ack_issues_exactly_one_correction() {
        let mut machine = StreamLifecycleMachine::new();
        let now = Instant::now();
        machine.request_resize(geometry(960, 540), now, geometry(1920, 1080));
        assert!(machine.input_blocked());

        let correction = machine.on_resize_ack(geometry(958, 540));
        assert_eq!(correction, Some(geometry(960, 540)));

        // A second mismatch does not send a second correction.
        assert_eq!(machine.on_resize_ack(geometry(950, 540)), None);
    }

    #[test]
    fn converged_ack_unblocks_input() {
        let mut machine = StreamLifecycleMachine::new();
        let now = Instant::now();
        machine.request_resize(geometry(960, 540), now, geometry(1920, 1080));
        assert_eq!(machine.on_resize_ack(geometry(960, 540)), None);
        assert!(!machine.input_blocked());
    }

    #[test]
    fn timeout_unblocks_input_regardless_of_convergence() {
        let mut machine = StreamLifecycleMachine::new();
        let now = Instant::now();
        machine.request_resize(geometry(960, 540), now, geometry(1920, 1080));
        assert!(!machine.check_resize_timeout(now));
        assert!(machine.check_resize_timeout(now + Duration::from_millis(RESIZE_ACK_TIMEOUT_MS)));
        assert!(!machine.input_blocked());
    }
}
