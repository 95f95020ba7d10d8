//! Host-side stream context: keyframe cadence, motion smoothing,
//! client-initiated recovery escalation, the pending-keyframe gate, and
//! loss mode (spec.md §4.4).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mirage_core::policy::{KeyframePolicy, LOSS_MODE_KEYFRAME_FEC_BLOCK, LOSS_MODE_PFRAME_FEC_BLOCK};
use mirage_core::{Epoch, StreamId};
use mirage_sender::GenerationControl;

/// Why a keyframe is pending emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeReason {
    /// Regular cadence-driven keyframe.
    Scheduled,
    /// Client-requested, below the hard-recovery threshold.
    SoftRecovery,
    /// Client-requested, at or above the hard-recovery threshold: the
    /// queue was reset and the epoch advanced.
    HardRecovery,
}

#[derive(Debug, Clone, Copy)]
struct PendingKeyframe {
    reason: KeyframeReason,
    urgent: bool,
    requested_at: Instant,
}

/// A keyframe ready to hand to the packet sender.
#[derive(Debug, Clone, Copy)]
pub struct KeyframeEmission {
    pub reason: KeyframeReason,
    pub discontinuity: bool,
    pub epoch: Epoch,
    pub fec_block_size: u32,
}

/// Outcome of a client-initiated recovery request (spec.md §4.4, §4.8:
/// "coalesces requests within cooldown and drops them when an in-flight
/// deadline is pending").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Dropped: a keyframe is already pending, or we are within cooldown
    /// of the last accepted request.
    Coalesced,
    Soft,
    /// Escalated: epoch advanced, send queue reset, P-frame FEC enabled.
    Hard { new_epoch: Epoch },
}

pub struct StreamContext {
    stream_id: StreamId,
    key_frame_interval_frames: u32,
    current_frame_rate: u32,
    policy: KeyframePolicy,
    /// The stream's packet-sender generation control. A hard recovery
    /// drives this directly (spec.md §4.4 "Recovery", §9 "Generation &
    /// epoch": "a hard recovery bumps both [generation and epoch]").
    generation: Arc<GenerationControl>,

    epoch: Epoch,
    motion_ema: f64,
    last_keyframe_at: Option<Instant>,
    last_keyframe_request_at: Option<Instant>,
    recovery_requests: VecDeque<Instant>,
    pending_keyframe: Option<PendingKeyframe>,

    recovery_only_mode: bool,
    mid_resize: bool,
    queued_bytes: u64,

    loss_mode: bool,
    loss_mode_deadline: Option<Instant>,
    pframe_fec_active: bool,
}

impl StreamContext {
    pub fn new(
        stream_id: StreamId,
        key_frame_interval_frames: u32,
        current_frame_rate: u32,
        policy: KeyframePolicy,
        generation: Arc<GenerationControl>,
    ) -> Self {
        Self {
            stream_id,
            key_frame_interval_frames,
            current_frame_rate: current_frame_rate.max(1),
            policy,
            generation,
            epoch: Epoch(0),
            motion_ema: 0.0,
            last_keyframe_at: None,
            last_keyframe_request_at: None,
            recovery_requests: VecDeque::new(),
            pending_keyframe: None,
            recovery_only_mode: false,
            mid_resize: false,
            queued_bytes: 0,
            loss_mode: false,
            loss_mode_deadline: None,
            pframe_fec_active: false,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn loss_mode_active(&self) -> bool {
        self.loss_mode
    }

    /// The stream's packet-sender generation control, shared with the
    /// `mirage-sender` actor driving this stream's egress.
    pub fn generation(&self) -> &Arc<GenerationControl> {
        &self.generation
    }

    pub fn set_recovery_only_mode(&mut self, value: bool) {
        self.recovery_only_mode = value;
    }

    pub fn set_mid_resize(&mut self, value: bool) {
        self.mid_resize = value;
    }

    pub fn update_queued_bytes(&mut self, bytes: u64) {
        self.queued_bytes = bytes;
    }

    pub fn set_frame_rate(&mut self, frame_rate: u32) {
        self.current_frame_rate = frame_rate.max(1);
    }

    /// `interval = max(1s, keyFrameInterval/rate)` (spec.md §4.4).
    pub fn interval(&self) -> Duration {
        let seconds = self.key_frame_interval_frames as f64 / self.current_frame_rate as f64;
        Duration::from_secs_f64(seconds).max(Duration::from_secs(1))
    }

    /// `maxInterval = max(interval×2, interval+1)` (spec.md §4.4).
    pub fn max_interval(&self) -> Duration {
        let interval = self.interval();
        (interval * 2).max(interval + Duration::from_secs(1))
    }

    /// Exponential moving average of per-frame dirty-area percentage
    /// (spec.md §4.4 "Motion smoothing").
    pub fn record_rendered_frame(&mut self, dirty_area_percentage: f64) {
        let factor = self.policy.motion_smoothing_factor;
        self.motion_ema = self.motion_ema * (1.0 - factor) + dirty_area_percentage * factor;
    }

    fn high_motion(&self) -> bool {
        self.motion_ema >= self.policy.motion_threshold
    }

    fn queue_backed_up(&self) -> bool {
        self.queued_bytes >= self.policy.queue_pressure_bytes
    }

    /// Whether a new cadence-driven keyframe should be scheduled right now
    /// (spec.md §4.4 "Keyframe cadence").
    pub fn should_schedule_keyframe(&self, now: Instant) -> bool {
        if self.recovery_only_mode || self.mid_resize || self.pending_keyframe.is_some() {
            return false;
        }
        let elapsed = self.last_keyframe_at.map(|t| now.duration_since(t)).unwrap_or(Duration::MAX);
        if elapsed < self.interval() {
            return false;
        }
        if (self.high_motion() || self.queue_backed_up()) && elapsed < self.max_interval() {
            return false;
        }
        true
    }

    pub fn schedule_keyframe(&mut self, now: Instant) {
        self.pending_keyframe = Some(PendingKeyframe { reason: KeyframeReason::Scheduled, urgent: false, requested_at: now });
    }

    /// Client-initiated keyframe request (spec.md §4.4 "Recovery").
    pub fn request_recovery_keyframe(&mut self, now: Instant) -> RecoveryOutcome {
        if self.pending_keyframe.is_some() {
            return RecoveryOutcome::Coalesced;
        }
        if let Some(last) = self.last_keyframe_request_at {
            let elapsed = now.duration_since(last).as_secs_f64();
            if elapsed < self.policy.keyframe_request_cooldown_secs {
                return RecoveryOutcome::Coalesced;
            }
        }
        self.last_keyframe_request_at = Some(now);

        let window = Duration::from_secs_f64(self.policy.soft_recovery_window_secs);
        self.recovery_requests.retain(|t| now.duration_since(*t) <= window);
        self.recovery_requests.push_back(now);

        if self.recovery_requests.len() as u32 >= self.policy.hard_recovery_threshold {
            self.recovery_requests.clear();
            self.generation.reset_queue("hard recovery: client keyframe requests crossed hard-recovery threshold");
            let new_epoch = self.epoch.advance();
            self.epoch = new_epoch;
            self.loss_mode = true;
            self.loss_mode_deadline = Some(now + Duration::from_secs_f64(self.policy.loss_mode_hold_secs));
            self.pframe_fec_active = true;
            self.pending_keyframe =
                Some(PendingKeyframe { reason: KeyframeReason::HardRecovery, urgent: true, requested_at: now });
            RecoveryOutcome::Hard { new_epoch }
        } else {
            self.pending_keyframe =
                Some(PendingKeyframe { reason: KeyframeReason::SoftRecovery, urgent: true, requested_at: now });
            RecoveryOutcome::Soft
        }
    }

    /// Whether the pending keyframe (if any) may be emitted now (spec.md
    /// §4.4 "Pending-keyframe gate"). Urgent requests bypass all gates.
    fn pending_ready(&self, pending: &PendingKeyframe, now: Instant) -> bool {
        if pending.urgent {
            return true;
        }
        let settle_threshold =
            self.policy.min_queued_bytes.max((self.policy.queue_pressure_bytes as f64 * self.policy.keyframe_queue_settle_factor) as u64);
        let queue_settled = self.queued_bytes < settle_threshold;
        let motion_low = self.motion_ema < self.policy.motion_threshold;
        if queue_settled && motion_low {
            return true;
        }
        now.duration_since(pending.requested_at) >= self.max_interval()
    }

    /// Emits the pending keyframe if the gate allows it, updating cadence
    /// bookkeeping and resolving its FEC block size.
    pub fn try_emit_pending_keyframe(&mut self, now: Instant) -> Option<KeyframeEmission> {
        let pending = self.pending_keyframe?;
        if !self.pending_ready(&pending, now) {
            return None;
        }
        self.pending_keyframe = None;
        self.last_keyframe_at = Some(now);
        Some(KeyframeEmission {
            reason: pending.reason,
            discontinuity: pending.reason != KeyframeReason::Scheduled,
            epoch: self.epoch,
            fec_block_size: self.resolved_fec_block_size(true),
        })
    }

    /// Resolved FEC block size for a frame of this stream right now
    /// (spec.md §4.4 "Loss mode").
    pub fn resolved_fec_block_size(&self, is_keyframe: bool) -> u32 {
        if !self.loss_mode {
            0
        } else if is_keyframe {
            LOSS_MODE_KEYFRAME_FEC_BLOCK
        } else if self.pframe_fec_active {
            LOSS_MODE_PFRAME_FEC_BLOCK
        } else {
            0
        }
    }

    /// Clears loss mode once its hold window elapses. Call on a tick.
    pub fn tick_loss_mode(&mut self, now: Instant) {
        if let Some(deadline) = self.loss_mode_deadline {
            if now >= deadline {
                self.loss_mode = false;
                self.pframe_fec_active = false;
                self.loss_mode_deadline = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> KeyframePolicy {
        KeyframePolicy::default()
    }

    fn new_context(stream_id: StreamId, key_frame_interval_frames: u32, current_frame_rate: u32) -> StreamContext {
        StreamContext::new(stream_id, key_frame_interval_frames, current_frame_rate, policy(), Arc::new(GenerationControl::new()))
    }

    #[test]
    fn cadence_waits_for_the_interval() {
        let ctx = new_context(StreamId(1), 3600, 120);
        assert!(!ctx.should_schedule_keyframe(Instant::now()));
    }

    #[test]
    fn high_motion_defers_until_max_interval() {
        let mut ctx = new_context(StreamId(1), 120, 120);
        let t0 = Instant::now();
        ctx.last_keyframe_at = Some(t0);
        ctx.record_rendered_frame(0.9);
        assert!(ctx.high_motion());
        assert!(!ctx.should_schedule_keyframe(t0 + ctx.interval() + Duration::from_millis(1)));
        assert!(ctx.should_schedule_keyframe(t0 + ctx.max_interval() + Duration::from_millis(1)));
    }

    #[test]
    fn soft_recovery_is_urgent_and_does_not_advance_epoch() {
        let mut ctx = new_context(StreamId(1), 3600, 120);
        let outcome = ctx.request_recovery_keyframe(Instant::now());
        assert_eq!(outcome, RecoveryOutcome::Soft);
        assert_eq!(ctx.epoch(), Epoch(0));
        // A soft recovery bumps neither generation nor epoch (spec.md §9).
        assert_eq!(ctx.generation().current_generation(), 0);
    }

    #[test]
    fn third_request_within_window_escalates_to_hard_recovery() {
        let mut ctx = new_context(StreamId(1), 3600, 120);
        let t0 = Instant::now();
        // Space requests apart by more than the cooldown so each is accepted,
        // but well within the 10s soft-recovery window.
        let step = Duration::from_millis((policy().keyframe_request_cooldown_secs * 1000.0) as u64 + 10);

        assert_eq!(ctx.request_recovery_keyframe(t0), RecoveryOutcome::Soft);
        ctx.try_emit_pending_keyframe(t0).unwrap();

        assert_eq!(ctx.request_recovery_keyframe(t0 + step), RecoveryOutcome::Soft);
        ctx.try_emit_pending_keyframe(t0 + step).unwrap();

        let outcome = ctx.request_recovery_keyframe(t0 + step * 2);
        assert_eq!(outcome, RecoveryOutcome::Hard { new_epoch: Epoch(1) });
        assert!(ctx.loss_mode_active());
        assert_eq!(ctx.resolved_fec_block_size(true), LOSS_MODE_KEYFRAME_FEC_BLOCK);
        assert_eq!(ctx.resolved_fec_block_size(false), LOSS_MODE_PFRAME_FEC_BLOCK);
        // A hard recovery bumps both epoch and the sender's generation,
        // invalidating any queued work (spec.md §4.3, §9).
        assert_eq!(ctx.generation().current_generation(), 1);
    }

    #[test]
    fn duplicate_request_within_cooldown_is_coalesced() {
        let mut ctx = new_context(StreamId(1), 3600, 120);
        let t0 = Instant::now();
        assert_eq!(ctx.request_recovery_keyframe(t0), RecoveryOutcome::Soft);
        // Still pending (not yet emitted): a second request within cooldown
        // is coalesced rather than queued again.
        assert_eq!(ctx.request_recovery_keyframe(t0), RecoveryOutcome::Coalesced);
    }

    #[test]
    fn loss_mode_clears_after_its_hold_window() {
        let mut ctx = new_context(StreamId(1), 3600, 120);
        let t0 = Instant::now();
        for i in 0..3 {
            let at = t0 + Duration::from_millis(600 * i);
            ctx.request_recovery_keyframe(at);
            ctx.try_emit_pending_keyframe(at);
        }
        assert!(ctx.loss_mode_active());
        ctx.tick_loss_mode(t0 + Duration::from_secs_f64(policy().loss_mode_hold_secs + 1.0));
        assert!(!ctx.loss_mode_active());
    }
}
