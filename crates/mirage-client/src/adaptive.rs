//! Client-side adaptive bitrate/format loop (spec.md §2 component 8, §4.10).
//!
//! This module only computes *what* to step; committing a step by sending
//! `streamEncoderSettingsChange` is the caller's job (spec.md §4.10: "All
//! steps are committed by sending `streamEncoderSettingsChange`"), since
//! that requires a live control-channel connection this crate's
//! [`crate::connection::ClientConnection`] owns.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use mirage_core::policy::AdaptivePolicy;
use mirage_core::PixelFormat;

/// spec.md §4.10 "Modes".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveMode {
    Disabled,
    Automatic,
    CustomTemporary,
}

/// One committed step of the adaptive loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdaptiveStep {
    Degrade { bitrate_bps: u64, pixel_format: PixelFormat },
    Restore { bitrate_bps: u64, pixel_format: PixelFormat },
}

/// Per-stream adaptive state (spec.md §4.10). One instance per active
/// stream; `adaptiveFallbackCurrentFormatByStream` in spec.md §8 scenario 4
/// maps to this struct's `current_pixel_format` field, keyed externally by
/// [`mirage_core::StreamId`].
pub struct AdaptiveLoop {
    mode: AdaptiveMode,
    policy: AdaptivePolicy,

    baseline_bitrate_bps: u64,
    baseline_pixel_format: PixelFormat,
    current_bitrate_bps: u64,
    current_pixel_format: PixelFormat,

    collapse_events: VecDeque<Instant>,
    last_collapse_step_at: Option<Instant>,
    pressure_consecutive: u32,
    last_pressure_step_at: Option<Instant>,

    /// Start of the current uninterrupted streak of fps samples clearing
    /// `restore_fps_ratio`. Reset to `None` by any degrade step (spec.md
    /// §4.10: "ignoring the interval just after a collapse").
    stable_since: Option<Instant>,
}

impl AdaptiveLoop {
    pub fn new(
        mode: AdaptiveMode,
        policy: AdaptivePolicy,
        baseline_bitrate_bps: u64,
        baseline_pixel_format: PixelFormat,
    ) -> Self {
        Self {
            mode,
            policy,
            baseline_bitrate_bps,
            baseline_pixel_format,
            current_bitrate_bps: baseline_bitrate_bps,
            current_pixel_format: baseline_pixel_format,
            collapse_events: VecDeque::new(),
            last_collapse_step_at: None,
            pressure_consecutive: 0,
            last_pressure_step_at: None,
            stable_since: None,
        }
    }

    pub fn mode(&self) -> AdaptiveMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AdaptiveMode) {
        self.mode = mode;
    }

    pub fn current_bitrate_bps(&self) -> u64 {
        self.current_bitrate_bps
    }

    pub fn current_pixel_format(&self) -> PixelFormat {
        self.current_pixel_format
    }

    /// An explicit collapse event (decoder failure, observed severe loss)
    /// occurred. Only `CustomTemporary` mode tracks collapses (spec.md
    /// §4.10 "Collapse detection (customTemporary)").
    pub fn record_collapse(&mut self, now: Instant) -> Option<AdaptiveStep> {
        if self.mode != AdaptiveMode::CustomTemporary {
            return None;
        }

        let window = Duration::from_secs_f64(self.policy.collapse_window_secs);
        self.collapse_events.retain(|t| now.duration_since(*t) <= window);
        self.collapse_events.push_back(now);

        if (self.collapse_events.len() as u32) < self.policy.collapse_threshold {
            return None;
        }
        if let Some(last) = self.last_collapse_step_at {
            if now.duration_since(last).as_secs_f64() < self.policy.collapse_cooldown_secs {
                return None;
            }
        }
        self.last_collapse_step_at = Some(now);
        self.collapse_events.clear();
        Some(self.degrade_preferring_format(now))
    }

    /// One encoded-fps sample from the host's metrics report. Drives
    /// pressure detection and restore tracking (spec.md §4.10 "Pressure
    /// detection", "Recovery"), both scoped to `CustomTemporary` mode.
    pub fn record_encoded_fps_sample(
        &mut self,
        now: Instant,
        encoded_fps: f64,
        target_fps: f64,
        transport_bound: bool,
        decode_bound: bool,
    ) -> Option<AdaptiveStep> {
        if self.mode != AdaptiveMode::CustomTemporary {
            return None;
        }

        let under_pressure = encoded_fps < target_fps * self.policy.pressure_under_target_ratio;
        let mut step = None;

        if under_pressure && !transport_bound && !decode_bound {
            self.pressure_consecutive += 1;
            let cooldown_elapsed = self
                .last_pressure_step_at
                .map(|last| now.duration_since(last).as_secs_f64() >= self.policy.pressure_trigger_cooldown_secs)
                .unwrap_or(true);
            if self.pressure_consecutive >= self.policy.pressure_trigger_count && cooldown_elapsed {
                self.pressure_consecutive = 0;
                self.last_pressure_step_at = Some(now);
                step = Some(self.degrade_preferring_format(now));
            }
        } else {
            self.pressure_consecutive = 0;
        }

        if step.is_some() {
            return step;
        }

        let effective_ok = encoded_fps >= target_fps * self.policy.restore_fps_ratio;
        if !effective_ok {
            self.stable_since = None;
            return None;
        }
        let stable_since = *self.stable_since.get_or_insert(now);
        let stable_secs = now.duration_since(stable_since).as_secs_f64();
        if stable_secs >= self.policy.restore_window_secs {
            self.stable_since = Some(now);
            return self.restore_one_step();
        }
        None
    }

    /// `Automatic` mode's only path downward: an externally supplied
    /// degrade trigger, bitrate-only, never touching pixel format (spec.md
    /// §4.10: "Automatic mode ignores collapse/format stepping and only
    /// steps bitrate down on explicit trigger until floor is reached").
    pub fn trigger_automatic_degrade(&mut self) -> Option<AdaptiveStep> {
        if self.mode != AdaptiveMode::Automatic {
            return None;
        }
        if self.current_bitrate_bps <= self.policy.fallback_bitrate_floor_bps {
            return None;
        }
        self.current_bitrate_bps = self.stepped_down_bitrate();
        Some(AdaptiveStep::Degrade {
            bitrate_bps: self.current_bitrate_bps,
            pixel_format: self.current_pixel_format,
        })
    }

    fn stepped_down_bitrate(&self) -> u64 {
        let stepped = (self.current_bitrate_bps as f64 * self.policy.fallback_bitrate_step) as u64;
        stepped.max(self.policy.fallback_bitrate_floor_bps)
    }

    /// One degradation notch: format step first, bitrate step if already
    /// at the format floor (spec.md §4.10 "Collapse detection": "first try
    /// a format step... else step bitrate").
    fn degrade_preferring_format(&mut self, now: Instant) -> AdaptiveStep {
        self.stable_since = None;
        if let Some(next) = self.current_pixel_format.step_down() {
            self.current_pixel_format = next;
        } else {
            self.current_bitrate_bps = self.stepped_down_bitrate();
        }
        let _ = now;
        AdaptiveStep::Degrade {
            bitrate_bps: self.current_bitrate_bps,
            pixel_format: self.current_pixel_format,
        }
    }

    /// One restore notch toward baseline. Only one dimension recovers per
    /// step (spec.md §4.10 "Recovery"): pixel format first, then bitrate.
    fn restore_one_step(&mut self) -> Option<AdaptiveStep> {
        if self.current_pixel_format != self.baseline_pixel_format {
            if let Some(next) = self.current_pixel_format.step_up(self.baseline_pixel_format) {
                self.current_pixel_format = next;
                return Some(AdaptiveStep::Restore {
                    bitrate_bps: self.current_bitrate_bps,
                    pixel_format: self.current_pixel_format,
                });
            }
        }
        if self.current_bitrate_bps < self.baseline_bitrate_bps {
            let stepped = (self.current_bitrate_bps as f64 * self.policy.restore_bitrate_step) as u64;
            self.current_bitrate_bps = stepped.min(self.baseline_bitrate_bps);
            return Some(AdaptiveStep::Restore {
                bitrate_bps: self.current_bitrate_bps,
                pixel_format: self.current_pixel_format,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AdaptivePolicy {
        AdaptivePolicy::default()
    }

    #[test]
    fn collapse_threshold_steps_format_before_bitrate() {
        let mut loop_ = AdaptiveLoop::new(
            AdaptiveMode::CustomTemporary,
            policy(),
            100_000_000,
            PixelFormat::Bgr10a2,
        );
        let t0 = Instant::now();
        assert_eq!(loop_.record_collapse(t0), None);
        let step = loop_
            .record_collapse(t0 + Duration::from_secs(1))
            .expect("threshold reached on the 2nd collapse");
        assert_eq!(
            step,
            AdaptiveStep::Degrade { bitrate_bps: 100_000_000, pixel_format: PixelFormat::P010 }
        );
        assert_eq!(loop_.current_pixel_format(), PixelFormat::P010);
    }

    #[test]
    fn collapse_outside_window_does_not_accumulate() {
        let mut loop_ = AdaptiveLoop::new(
            AdaptiveMode::CustomTemporary,
            policy(),
            100_000_000,
            PixelFormat::Bgr10a2,
        );
        let t0 = Instant::now();
        loop_.record_collapse(t0);
        let far_later = t0 + Duration::from_secs_f64(policy().collapse_window_secs + 1.0);
        assert_eq!(loop_.record_collapse(far_later), None);
    }

    #[test]
    fn format_floor_falls_through_to_bitrate_step() {
        let mut loop_ =
            AdaptiveLoop::new(AdaptiveMode::CustomTemporary, policy(), 100_000_000, PixelFormat::Nv12);
        let t0 = Instant::now();
        loop_.record_collapse(t0);
        let step = loop_.record_collapse(t0 + Duration::from_secs(1)).unwrap();
        match step {
            AdaptiveStep::Degrade { bitrate_bps, pixel_format } => {
                assert_eq!(pixel_format, PixelFormat::Nv12);
                assert!(bitrate_bps < 100_000_000);
            }
            other => panic!("expected Degrade, got {other:?}"),
        }
    }

    #[test]
    fn bitrate_never_steps_below_floor() {
        let mut loop_ =
            AdaptiveLoop::new(AdaptiveMode::Automatic, policy(), 3_000_000, PixelFormat::Nv12);
        for _ in 0..50 {
            loop_.trigger_automatic_degrade();
        }
        assert!(loop_.current_bitrate_bps() >= policy().fallback_bitrate_floor_bps);
    }

    #[test]
    fn automatic_mode_ignores_collapse_events() {
        let mut loop_ =
            AdaptiveLoop::new(AdaptiveMode::Automatic, policy(), 100_000_000, PixelFormat::Bgr10a2);
        let t0 = Instant::now();
        assert_eq!(loop_.record_collapse(t0), None);
        assert_eq!(loop_.record_collapse(t0 + Duration::from_secs(1)), None);
        assert_eq!(loop_.current_pixel_format(), PixelFormat::Bgr10a2);
    }

    #[test]
    fn restore_never_passes_baseline_and_recovers_one_dimension_at_a_time() {
        let baseline_format = PixelFormat::Bgr10a2;
        let mut loop_ = AdaptiveLoop::new(AdaptiveMode::CustomTemporary, policy(), 100_000_000, baseline_format);
        let t0 = Instant::now();
        loop_.record_collapse(t0);
        loop_.record_collapse(t0 + Duration::from_millis(100));
        assert_eq!(loop_.current_pixel_format(), PixelFormat::P010);

        // Sustained good fps for the restore window: format recovers before bitrate,
        // and never overshoots the baseline.
        let mut now = t0 + Duration::from_secs(1);
        let step_period = Duration::from_secs(1);
        let samples = (policy().restore_window_secs as u64) + 2;
        let mut last_step = None;
        for _ in 0..samples {
            now += step_period;
            if let Some(step) = loop_.record_encoded_fps_sample(now, 119.0, 120.0, false, false) {
                last_step = Some(step);
            }
        }
        assert_eq!(loop_.current_pixel_format(), baseline_format);
        assert!(matches!(last_step, Some(AdaptiveStep::Restore { .. })));
    }

    #[test]
    fn pressure_trigger_requires_consecutive_samples_and_respects_cooldown() {
        let mut loop_ =
            AdaptiveLoop::new(AdaptiveMode::CustomTemporary, policy(), 100_000_000, PixelFormat::Bgr10a2);
        let t0 = Instant::now();
        let mut step = None;
        for i in 0..policy().pressure_trigger_count {
            step = loop_.record_encoded_fps_sample(
                t0 + Duration::from_millis(i as u64 * 10),
                50.0,
                120.0,
                false,
                false,
            );
        }
        assert!(step.is_some());
        assert_eq!(loop_.current_pixel_format(), PixelFormat::P010);
    }

    #[test]
    fn transport_bound_pressure_is_not_a_trigger() {
        let mut loop_ =
            AdaptiveLoop::new(AdaptiveMode::CustomTemporary, policy(), 100_000_000, PixelFormat::Bgr10a2);
        let t0 = Instant::now();
        for i in 0..(policy().pressure_trigger_count * 2) {
            let step = loop_.record_encoded_fps_sample(
                t0 + Duration::from_millis(i as u64 * 10),
                50.0,
                120.0,
                true,
                false,
            );
            assert_eq!(step, None);
        }
    }
}
