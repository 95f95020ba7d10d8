//! Display-synchronized present scheduler (spec.md §2 component 5, §4.7).
//!
//! The scheduler is driven externally by a display-link/vsync tick (or an
//! explicit target-FPS timer); this module only decides *which* decoded
//! frame, if any, is current for that tick, and reports presentation
//! events back to the cache (spec.md §4.6 `markPresented`). Drawing the
//! pixel buffer onto a GPU surface is out of core scope (spec.md §9
//! "Dynamic dispatch" — replaced here by the abstract [`Presenter`]
//! capability).

use std::time::{Duration, Instant};

use mirage_core::policy::{PRESENT_RETRY_MS, TARGET_FPS_CHOICES};
use mirage_core::{DecodedFrameEntry, StreamId};

use crate::cache::DecodedFrameCache;

/// Replaces the source's platform-specific view classes (macOS vs.
/// iOS/visionOS) with a single capability the scheduler can call without
/// knowing which concrete backing renders it (spec.md §9).
pub trait Presenter: Send {
    /// Ask the concrete backing to redraw using the frame most recently
    /// handed to [`PresentScheduler::on_tick`].
    fn request_redraw(&mut self);
    /// Called once per tick before frame selection, so a presenter that
    /// drives its own clock can observe scheduler time.
    fn on_tick(&mut self, now: Instant);
    /// Reported by the concrete backing whenever its drawable surface
    /// changes; `None` width/height means no drawable is currently
    /// available.
    fn report_drawable_metrics(&mut self, width: u32, height: u32, scale: f32);
}

/// One tick's outcome (spec.md §4.7 points 1-3).
#[derive(Debug)]
pub enum PresentOutcome {
    /// A newer frame was selected and handed to the presenter.
    Presented { frame: DecodedFrameEntry, dropped_older: usize },
    /// No drawable surface is available; retry after the returned delay.
    NoDrawable { retry_after: Duration },
    /// Nothing newer than what's already presented; no redraw issued.
    Idle,
}

/// Target FPS ladder choice (spec.md §4.7: "one of {60, 120}, chosen from
/// client screen max, optional override, and a 'ProMotion' preference").
pub struct TargetFps;

impl TargetFps {
    /// Pick the highest entry in [`TARGET_FPS_CHOICES`] that does not
    /// exceed the screen's maximum refresh rate, then apply `override_fps`
    /// (if present) or the ProMotion preference as an additional ceiling.
    pub fn choose(screen_max_hz: u32, override_fps: Option<u32>, pro_motion_preference: bool) -> u32 {
        let screen_ceiling = TARGET_FPS_CHOICES
            .iter()
            .copied()
            .filter(|&f| f <= screen_max_hz)
            .max()
            .unwrap_or(TARGET_FPS_CHOICES[0]);

        match override_fps {
            Some(requested) => TARGET_FPS_CHOICES
                .iter()
                .copied()
                .filter(|&f| f <= requested && f <= screen_max_hz)
                .max()
                .unwrap_or(TARGET_FPS_CHOICES[0]),
            None if pro_motion_preference => screen_ceiling,
            None => TARGET_FPS_CHOICES[0].min(screen_ceiling),
        }
    }
}

/// Per-stream present scheduler, ticked by an external display-link (or
/// target-FPS timer).
pub struct PresentScheduler {
    stream_id: StreamId,
    presenter: Box<dyn Presenter>,
    target_fps: u32,
    pending_target_fps: Option<u32>,
    last_presented_sequence: Option<u64>,
    last_presented_frame: Option<DecodedFrameEntry>,
    pending_redraw: bool,
    drawable_ready: bool,
    retries: u64,
}

impl PresentScheduler {
    pub fn new(stream_id: StreamId, presenter: Box<dyn Presenter>, target_fps: u32) -> Self {
        Self {
            stream_id,
            presenter,
            target_fps,
            pending_target_fps: None,
            last_presented_sequence: None,
            last_presented_frame: None,
            pending_redraw: false,
            drawable_ready: false,
            retries: 0,
        }
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Changes take effect on the next tick (spec.md §4.7: "Changes take
    /// effect on the next tick").
    pub fn set_target_fps(&mut self, fps: u32) {
        self.pending_target_fps = Some(fps);
    }

    pub fn report_drawable_metrics(&mut self, width: u32, height: u32, scale: f32) {
        self.drawable_ready = width > 0 && height > 0;
        self.presenter.report_drawable_metrics(width, height, scale);
    }

    /// Force the next tick to present even if the cache's latest sequence
    /// hasn't advanced (spec.md §4.7 point 3: "unless the scheduler is
    /// explicitly asked to redraw"). Re-presents the last-presented frame
    /// rather than discarding presentation history: a stream with no
    /// newer frame still has something to redraw.
    pub fn request_redraw(&mut self) {
        self.pending_redraw = true;
    }

    pub fn retry_count(&self) -> u64 {
        self.retries
    }

    /// Drive one display-link tick (spec.md §4.7 points 1-3).
    pub fn on_tick(&mut self, cache: &DecodedFrameCache, now: Instant) -> PresentOutcome {
        if let Some(pending) = self.pending_target_fps.take() {
            self.target_fps = pending;
        }
        self.presenter.on_tick(now);

        if !self.drawable_ready {
            self.retries += 1;
            return PresentOutcome::NoDrawable { retry_after: Duration::from_millis(PRESENT_RETRY_MS) };
        }

        let has_newer = cache
            .peek_latest(self.stream_id)
            .map(|latest| Some(latest.sequence) != self.last_presented_sequence)
            .unwrap_or(false);

        if !has_newer {
            if self.pending_redraw {
                if let Some(frame) = self.last_presented_frame.clone() {
                    self.pending_redraw = false;
                    self.presenter.request_redraw();
                    return PresentOutcome::Presented { frame, dropped_older: 0 };
                }
                self.pending_redraw = false;
            }
            return PresentOutcome::Idle;
        }

        let latest_sequence =
            cache.peek_latest(self.stream_id).expect("has_newer implies peek_latest is Some").sequence;
        let mut dropped_older = 0;
        let mut selected = None;
        while let Some(entry) = cache.dequeue(self.stream_id) {
            if entry.sequence >= latest_sequence {
                selected = Some(entry);
                break;
            }
            dropped_older += 1;
        }
        let frame = selected.expect("the sequence observed by peek_latest must still be dequeueable");

        self.last_presented_sequence = Some(frame.sequence);
        self.last_presented_frame = Some(frame.clone());
        self.pending_redraw = false;
        cache.mark_presented(self.stream_id, frame.sequence, now);
        self.presenter.request_redraw();

        PresentOutcome::Presented { frame, dropped_older }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::{ContentRect, DecodedPixelFormat};

    struct RecordingPresenter {
        redraws: u32,
        last_metrics: Option<(u32, u32, f32)>,
    }

    impl Presenter for RecordingPresenter {
        fn request_redraw(&mut self) {
            self.redraws += 1;
        }
        fn on_tick(&mut self, _now: Instant) {}
        fn report_drawable_metrics(&mut self, width: u32, height: u32, scale: f32) {
            self.last_metrics = Some((width, height, scale));
        }
    }

    fn frame() -> crate::cache::NewDecodedFrame {
        crate::cache::NewDecodedFrame {
            pixels: bytes::Bytes::from_static(b"pixels"),
            width: 1920,
            height: 1080,
            format: DecodedPixelFormat::Nv12,
            content_rect: ContentRect { x: 0, y: 0, w: 1920, h: 1080 },
            decode_timestamp_ns: 0,
        }
    }

    #[test]
    fn no_drawable_schedules_a_bounded_retry() {
        let cache = DecodedFrameCache::new();
        let presenter = RecordingPresenter { redraws: 0, last_metrics: None };
        let mut scheduler = PresentScheduler::new(StreamId(1), Box::new(presenter), 60);

        let outcome = scheduler.on_tick(&cache, Instant::now());
        assert!(matches!(outcome, PresentOutcome::NoDrawable { .. }));
        assert_eq!(scheduler.retry_count(), 1);
    }

    #[test]
    fn presents_once_per_newer_frame_and_drops_the_backlog() {
        let cache = DecodedFrameCache::new();
        let now = Instant::now();
        cache.enqueue(StreamId(1), frame(), now);
        cache.enqueue(StreamId(1), frame(), now);
        let presenter = RecordingPresenter { redraws: 0, last_metrics: None };
        let mut scheduler = PresentScheduler::new(StreamId(1), Box::new(presenter), 60);
        scheduler.report_drawable_metrics(1920, 1080, 2.0);

        let outcome = scheduler.on_tick(&cache, now);
        match outcome {
            PresentOutcome::Presented { frame, dropped_older } => {
                assert_eq!(frame.sequence, 1);
                assert_eq!(dropped_older, 1);
            }
            other => panic!("expected Presented, got {other:?}"),
        }

        // Nothing newer arrived: the next tick is idle.
        let idle = scheduler.on_tick(&cache, now);
        assert!(matches!(idle, PresentOutcome::Idle));
    }

    #[test]
    fn explicit_redraw_request_forces_a_present_without_a_newer_frame() {
        let cache = DecodedFrameCache::new();
        let now = Instant::now();
        cache.enqueue(StreamId(1), frame(), now);
        let presenter = RecordingPresenter { redraws: 0, last_metrics: None };
        let mut scheduler = PresentScheduler::new(StreamId(1), Box::new(presenter), 60);
        scheduler.report_drawable_metrics(1920, 1080, 2.0);
        let first = scheduler.on_tick(&cache, now);
        let first_sequence = match first {
            PresentOutcome::Presented { frame, .. } => frame.sequence,
            other => panic!("expected Presented, got {other:?}"),
        };

        // With nothing newer queued, an ordinary tick is idle.
        assert!(matches!(scheduler.on_tick(&cache, now), PresentOutcome::Idle));

        // An explicit redraw re-presents the last-presented frame even
        // though the cache has nothing newer.
        scheduler.request_redraw();
        let outcome = scheduler.on_tick(&cache, now);
        match outcome {
            PresentOutcome::Presented { frame, dropped_older } => {
                assert_eq!(frame.sequence, first_sequence);
                assert_eq!(dropped_older, 0);
            }
            other => panic!("expected a redraw-triggered Presented, got {other:?}"),
        }

        // The redraw request is one-shot: the next ordinary tick is idle again.
        assert!(matches!(scheduler.on_tick(&cache, now), PresentOutcome::Idle));
    }

    #[test]
    fn target_fps_choice_respects_screen_ceiling_and_override() {
        assert_eq!(TargetFps::choose(60, None, true), 60);
        assert_eq!(TargetFps::choose(120, None, true), 120);
        assert_eq!(TargetFps::choose(120, None, false), 60);
        assert_eq!(TargetFps::choose(120, Some(60), true), 60);
    }
}
