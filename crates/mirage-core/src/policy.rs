//! Named thresholds, formats, and cadences used by the pacer, cache,
//! keyframe/loss-mode, adaptive-quality, and control-channel timeout logic
//! (spec.md §2 component 11, "Adaptation policy constants & ladders").
//!
//! Values called out with an explicit literal in spec.md (§3, §5, §8) are
//! `const`s here. Values spec.md leaves as an Open Question (§9) are
//! `Default` fields on the policy structs below, chosen and recorded in
//! DESIGN.md so they can be tuned per deployment without touching call
//! sites.

use serde::{Deserialize, Serialize};

use crate::codec::PixelFormat;

// ── Fixed literals (spec.md §3 / §5 / §8) ──────────────────────────────────

/// Default UDP payload budget per fragment. Chosen so that
/// `FrameHeader + payload` plus IPv4/IPv6 + UDP headers fits the IPv6
/// minimum-MTU datagram ceiling of 1232 bytes (spec.md §6).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1200;

/// Maximum UDP datagram size advertised by the protocol (spec.md §6).
pub const MAX_DATAGRAM_BYTES: usize = 1232;

pub const CACHE_MAX_QUEUE_DEPTH: usize = 12;
pub const CACHE_EMERGENCY_SAFE_DEPTH: usize = 4;
pub const CACHE_BACKLOG_DEPTH_THRESHOLD: usize = 8;
pub const CACHE_BACKLOG_AGE_MS: u64 = 150;

pub const PACER_MIN_BURST_PACKETS: usize = 8;
pub const PACER_MAX_BURST_PACKETS: usize = 64;

pub const PING_TIMEOUT_MS: u64 = 1_000;
pub const RESIZE_ACK_TIMEOUT_MS: u64 = 3_000;
pub const RESIZE_ACK_TOLERANCE_POINTS: u32 = 4;
pub const MANUAL_APPROVAL_TIMEOUT_MS: u64 = 1_500;
pub const QUALITY_STAGE_RESULT_SLACK_MS: u64 = 400;
pub const CLIENT_ERROR_TIMEOUT_SECS: f64 = 2.0;
pub const PRESENT_RETRY_MS: u64 = 4;
pub const APP_PREFERENCES_RECENT_CAP: usize = 50;

/// Target FPS ladder a client may choose between (spec.md §4.7).
pub const TARGET_FPS_CHOICES: [u32; 2] = [60, 120];

/// FEC block size for keyframes while loss mode is active (spec.md §4.4).
pub const LOSS_MODE_KEYFRAME_FEC_BLOCK: u32 = 8;
/// FEC block size for P-frames while loss mode *and* P-frame FEC are active.
pub const LOSS_MODE_PFRAME_FEC_BLOCK: u32 = 16;

/// Multiplier applied to the assembler's smoothed inter-frame interval to
/// get the incomplete-frame drop deadline (spec.md §9 Open Question: "the
/// precise deadline is implied by smoothed inter-frame interval; pick one
/// (e.g., `2x interval`) and document" — resolved to `2.0`).
pub const ASSEMBLER_DEADLINE_FACTOR: f64 = 2.0;
/// Smoothing factor for the assembler's inter-frame interval EMA, mirroring
/// `KeyframePolicy::motion_smoothing_factor`'s weighting convention.
pub const ASSEMBLER_INTERVAL_SMOOTHING_FACTOR: f64 = 0.2;

// ── Open-Question decisions (documented in DESIGN.md) ──────────────────────

/// Token-bucket burst budget, expressed as seconds of bitrate-worth of
/// bytes, before clamping into `[minBurstPackets, maxBurstPackets] *
/// maxPayload` (spec.md §9 Open Question: "2.5ms worth of bytes").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacerPolicy {
    pub burst_seconds: f64,
    pub min_burst_packets: usize,
    pub max_burst_packets: usize,
    pub max_payload_bytes: usize,
}

impl Default for PacerPolicy {
    fn default() -> Self {
        Self {
            burst_seconds: 0.0025,
            min_burst_packets: PACER_MIN_BURST_PACKETS,
            max_burst_packets: PACER_MAX_BURST_PACKETS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl PacerPolicy {
    /// Burst budget in bytes for a given bitrate, clamped to
    /// `[min_burst_packets, max_burst_packets] * max_payload_bytes`
    /// (spec.md §8 "Boundary behaviors").
    pub fn burst_bytes(&self, bitrate_bps: u64) -> usize {
        let bytes_per_sec = bitrate_bps as f64 / 8.0;
        let raw = (bytes_per_sec * self.burst_seconds) as usize;
        let floor = self.min_burst_packets * self.max_payload_bytes;
        let ceiling = self.max_burst_packets * self.max_payload_bytes;
        raw.clamp(floor, ceiling)
    }
}

/// Keyframe cadence / recovery-escalation tuning (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframePolicy {
    pub motion_smoothing_factor: f64,
    pub motion_threshold: f64,
    pub soft_recovery_window_secs: f64,
    pub hard_recovery_threshold: u32,
    pub loss_mode_hold_secs: f64,
    pub keyframe_queue_settle_factor: f64,
    pub min_queued_bytes: u64,
    pub queue_pressure_bytes: u64,
    pub keyframe_request_cooldown_secs: f64,
}

impl Default for KeyframePolicy {
    fn default() -> Self {
        Self {
            motion_smoothing_factor: 0.2,
            motion_threshold: 0.35,
            soft_recovery_window_secs: 10.0,
            hard_recovery_threshold: 3,
            loss_mode_hold_secs: 5.0,
            keyframe_queue_settle_factor: 2.0,
            min_queued_bytes: 32 * 1024,
            queue_pressure_bytes: 256 * 1024,
            keyframe_request_cooldown_secs: 0.5,
        }
    }
}

/// Adaptive bitrate/format loop tuning (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptivePolicy {
    pub collapse_threshold: u32,
    pub collapse_window_secs: f64,
    pub collapse_cooldown_secs: f64,
    pub fallback_bitrate_step: f64,
    pub fallback_bitrate_floor_bps: u64,
    pub pressure_under_target_ratio: f64,
    pub pressure_trigger_count: u32,
    pub pressure_trigger_cooldown_secs: f64,
    pub restore_window_secs: f64,
    pub restore_bitrate_step: f64,
    pub restore_fps_ratio: f64,
    pub baseline_pixel_format: PixelFormat,
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self {
            collapse_threshold: 2,
            collapse_window_secs: 4.0,
            collapse_cooldown_secs: 3.0,
            fallback_bitrate_step: 0.75,
            fallback_bitrate_floor_bps: 2_000_000,
            pressure_under_target_ratio: 0.85,
            pressure_trigger_count: 5,
            pressure_trigger_cooldown_secs: 5.0,
            restore_window_secs: 120.0,
            restore_bitrate_step: 1.25,
            restore_fps_ratio: 0.90,
            baseline_pixel_format: PixelFormat::Bgr10a2,
        }
    }
}

/// Quality-probe stability thresholds (spec.md §4.11 point 4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbePolicy {
    pub throughput_floor: f64,
    pub loss_ceiling_percent: f64,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            throughput_floor: 0.85,
            loss_ceiling_percent: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_bytes_clamped_between_min_and_max() {
        let p = PacerPolicy::default();
        // Very low bitrate clamps to the packet-count floor.
        assert_eq!(p.burst_bytes(1), p.min_burst_packets * p.max_payload_bytes);
        // Very high bitrate clamps to the packet-count ceiling.
        assert_eq!(
            p.burst_bytes(10_000_000_000),
            p.max_burst_packets * p.max_payload_bytes
        );
    }
}
