//! Decoded-frame cache (spec.md §2 component 5, §4.6): a process-wide,
//! lock-protected multi-producer (decoder callbacks)/single-consumer
//! (present scheduler) queue of decoded frames, keyed by stream. Created
//! lazily on first enqueue; a stream's entry is purged by `clear` on
//! stream stop (spec.md §9 "Global singletons").

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use mirage_core::policy::{
    CACHE_BACKLOG_AGE_MS, CACHE_BACKLOG_DEPTH_THRESHOLD, CACHE_EMERGENCY_SAFE_DEPTH, CACHE_MAX_QUEUE_DEPTH,
};
use mirage_core::{DecodedFrameEntry, StreamId};
use tracing::warn;

/// A decoded frame handed to the cache, missing only the sequence number
/// the cache itself assigns on enqueue.
pub struct NewDecodedFrame {
    pub pixels: bytes::Bytes,
    pub width: u32,
    pub height: u32,
    pub format: mirage_core::DecodedPixelFormat,
    pub content_rect: mirage_core::ContentRect,
    pub decode_timestamp_ns: u64,
}

/// Result of one `enqueue` call (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueReport {
    pub sequence: u64,
    pub queue_depth: usize,
    pub oldest_age_ms: u64,
    pub emergency_drops: usize,
}

struct StreamQueue {
    entries: VecDeque<(DecodedFrameEntry, Instant)>,
    next_sequence: u64,
    last_presented_sequence: Option<u64>,
    last_presented_at: Option<Instant>,
}

impl StreamQueue {
    fn new() -> Self {
        Self { entries: VecDeque::new(), next_sequence: 0, last_presented_sequence: None, last_presented_at: None }
    }

    /// Emergency trim policy (spec.md §3): on sustained backlog (depth >=
    /// 8 and oldest age >= 150ms, or depth > 12) discard oldest entries
    /// down to `emergencySafeDepth` (4).
    fn trim(&mut self, now: Instant) -> usize {
        let depth = self.entries.len();
        let oldest_age_ms = self.entries.front().map(|(_, at)| now.duration_since(*at).as_millis() as u64);

        let backlogged = depth > CACHE_MAX_QUEUE_DEPTH
            || (depth >= CACHE_BACKLOG_DEPTH_THRESHOLD && oldest_age_ms.unwrap_or(0) >= CACHE_BACKLOG_AGE_MS);

        if !backlogged {
            return 0;
        }

        let mut dropped = 0;
        while self.entries.len() > CACHE_EMERGENCY_SAFE_DEPTH {
            self.entries.pop_front();
            dropped += 1;
        }
        dropped
    }
}

#[derive(Default)]
pub struct DecodedFrameCache {
    streams: Mutex<HashMap<StreamId, StreamQueue>>,
}

impl DecodedFrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, stream_id: StreamId, frame: NewDecodedFrame, now: Instant) -> EnqueueReport {
        let mut streams = self.streams.lock().unwrap();
        let queue = streams.entry(stream_id).or_insert_with(StreamQueue::new);

        let sequence = queue.next_sequence;
        queue.next_sequence += 1;

        let entry = DecodedFrameEntry {
            pixels: frame.pixels,
            width: frame.width,
            height: frame.height,
            format: frame.format,
            content_rect: frame.content_rect,
            sequence,
            decode_timestamp_ns: frame.decode_timestamp_ns,
        };
        queue.entries.push_back((entry, now));

        let emergency_drops = queue.trim(now);
        if emergency_drops > 0 {
            warn!(stream_id = %stream_id, emergency_drops, "decoded-frame cache emergency trim");
        }

        let queue_depth = queue.entries.len();
        let oldest_age_ms = queue.entries.front().map(|(_, at)| now.duration_since(*at).as_millis() as u64).unwrap_or(0);

        EnqueueReport { sequence, queue_depth, oldest_age_ms, emergency_drops }
    }

    pub fn dequeue(&self, stream_id: StreamId) -> Option<DecodedFrameEntry> {
        let mut streams = self.streams.lock().unwrap();
        streams.get_mut(&stream_id).and_then(|queue| queue.entries.pop_front()).map(|(entry, _)| entry)
    }

    pub fn peek_latest(&self, stream_id: StreamId) -> Option<DecodedFrameEntry> {
        let streams = self.streams.lock().unwrap();
        streams.get(&stream_id).and_then(|queue| queue.entries.back()).map(|(entry, _)| entry.clone())
    }

    pub fn queue_depth(&self, stream_id: StreamId) -> usize {
        let streams = self.streams.lock().unwrap();
        streams.get(&stream_id).map(|queue| queue.entries.len()).unwrap_or(0)
    }

    pub fn oldest_age_ms(&self, stream_id: StreamId, now: Instant) -> Option<u64> {
        let streams = self.streams.lock().unwrap();
        streams
            .get(&stream_id)
            .and_then(|queue| queue.entries.front())
            .map(|(_, at)| now.duration_since(*at).as_millis() as u64)
    }

    pub fn latest_sequence(&self, stream_id: StreamId) -> Option<u64> {
        let streams = self.streams.lock().unwrap();
        streams.get(&stream_id).and_then(|queue| queue.entries.back()).map(|(entry, _)| entry.sequence)
    }

    /// Record the most recently rendered sequence and time for telemetry
    /// (spec.md §4.6).
    pub fn mark_presented(&self, stream_id: StreamId, sequence: u64, now: Instant) {
        let mut streams = self.streams.lock().unwrap();
        if let Some(queue) = streams.get_mut(&stream_id) {
            queue.last_presented_sequence = Some(sequence);
            queue.last_presented_at = Some(now);
        }
    }

    pub fn last_presented_sequence(&self, stream_id: StreamId) -> Option<u64> {
        let streams = self.streams.lock().unwrap();
        streams.get(&stream_id).and_then(|queue| queue.last_presented_sequence)
    }

    /// Purge a stream's entry on stream end (spec.md §4.6).
    pub fn clear(&self, stream_id: StreamId) {
        self.streams.lock().unwrap().remove(&stream_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::{ContentRect, DecodedPixelFormat};

    fn frame() -> NewDecodedFrame {
        NewDecodedFrame {
            pixels: bytes::Bytes::from_static(b"pixels"),
            width: 1920,
            height: 1080,
            format: DecodedPixelFormat::Nv12,
            content_rect: ContentRect { x: 0, y: 0, w: 1920, h: 1080 },
            decode_timestamp_ns: 0,
        }
    }

    #[test]
    fn sequence_is_strictly_increasing_per_stream() {
        let cache = DecodedFrameCache::new();
        let now = Instant::now();
        let a = cache.enqueue(StreamId(1), frame(), now);
        let b = cache.enqueue(StreamId(1), frame(), now);
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
    }

    #[test]
    fn streams_have_independent_sequences() {
        let cache = DecodedFrameCache::new();
        let now = Instant::now();
        let a = cache.enqueue(StreamId(1), frame(), now);
        let b = cache.enqueue(StreamId(2), frame(), now);
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 0);
    }

    #[test]
    fn emergency_trim_fires_once_depth_exceeds_max() {
        let cache = DecodedFrameCache::new();
        let now = Instant::now();
        let mut last_report = cache.enqueue(StreamId(1), frame(), now);
        for _ in 0..CACHE_MAX_QUEUE_DEPTH + 1 {
            last_report = cache.enqueue(StreamId(1), frame(), now);
        }
        assert!(last_report.emergency_drops > 0);
        assert_eq!(cache.queue_depth(StreamId(1)), CACHE_EMERGENCY_SAFE_DEPTH);
    }

    #[test]
    fn clear_purges_the_stream() {
        let cache = DecodedFrameCache::new();
        let now = Instant::now();
        cache.enqueue(StreamId(1), frame(), now);
        cache.clear(StreamId(1));
        assert_eq!(cache.queue_depth(StreamId(1)), 0);
        assert!(cache.peek_latest(StreamId(1)).is_none());
    }

    #[test]
    fn mark_presented_is_observable_via_last_presented_sequence() {
        let cache = DecodedFrameCache::new();
        let now = Instant::now();
        let report = cache.enqueue(StreamId(1), frame(), now);
        cache.mark_presented(StreamId(1), report.sequence, now);
        assert_eq!(cache.last_presented_sequence(StreamId(1)), Some(report.sequence));
    }
}
