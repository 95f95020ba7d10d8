//! Generation and drop-non-keyframes state shared between the sender's
//! data path and the encoder-callback fast path (spec.md §8: "`generation`
//! and `dropNonKeyframesUntilKeyframe` on the sender: protected by one
//! small lock and also mirrored to an atomic counter for fast-path reads
//! from encoder callbacks").

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::warn;

#[derive(Default)]
pub struct GenerationControl {
    lock: Mutex<()>,
    generation: AtomicU64,
    drop_non_keyframes_until_keyframe: AtomicBool,
}

impl GenerationControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn should_drop_non_keyframes(&self) -> bool {
        self.drop_non_keyframes_until_keyframe.load(Ordering::Acquire)
    }

    /// Invalidates all queued work (spec.md §4.3: "`bumpGeneration`
    /// invalidates all queued work").
    pub fn bump_generation(&self) -> u64 {
        let _guard = self.lock.lock().unwrap();
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Same invalidation as `bump_generation`, plus a log of why (spec.md
    /// §4.3: "`resetQueue` does the same and logs the reason").
    pub fn reset_queue(&self, reason: &str) -> u64 {
        let generation = self.bump_generation();
        warn!(reason, generation, "sender queue reset");
        generation
    }

    pub fn set_drop_non_keyframes_until_keyframe(&self, value: bool) {
        let _guard = self.lock.lock().unwrap();
        self.drop_non_keyframes_until_keyframe.store(value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_generation_increments_monotonically() {
        let control = GenerationControl::new();
        assert_eq!(control.current_generation(), 0);
        assert_eq!(control.bump_generation(), 1);
        assert_eq!(control.bump_generation(), 2);
        assert_eq!(control.current_generation(), 2);
    }

    #[test]
    fn drop_flag_defaults_to_false() {
        let control = GenerationControl::new();
        assert!(!control.should_drop_non_keyframes());
        control.set_drop_non_keyframes_until_keyframe(true);
        assert!(control.should_drop_non_keyframes());
    }
}
