use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::frame::ContentRect;

/// Decoded pixel buffer pixel layout produced by the (external) decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedPixelFormat {
    Nv12,
    Rgba,
    Bgra,
    P010,
}

/// One decoded frame sitting in a stream's [`mirage-cache`] queue.
///
/// Invariants (spec.md §3): `sequence` is strictly increasing per stream;
/// the cache retains at most `maxQueueDepth` entries per stream.
#[derive(Debug, Clone)]
pub struct DecodedFrameEntry {
    pub pixels: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: DecodedPixelFormat,
    pub content_rect: ContentRect,
    /// Monotonic presentation sequence, assigned by the cache on enqueue.
    pub sequence: u64,
    pub decode_timestamp_ns: u64,
}
