//! `WorkItem`: one encoder output handed to the packet sender (spec.md
//! §4.3).

use bytes::Bytes;
use mirage_core::{ContentRect, DimensionToken, Epoch, StreamId};

/// Callbacks invoked around sending a keyframe (spec.md §4.3 point 5).
/// Implementations typically update `StreamContext`'s pending-keyframe
/// state in `mirage-host`.
pub trait KeyframeCallbacks: Send + Sync {
    fn on_send_start(&self, frame_number: u32);
    fn on_send_complete(&self, frame_number: u32);
}

/// One encoder output queued for fragmentation, pacing, and egress.
pub struct WorkItem {
    pub encoded_data: Bytes,
    pub is_keyframe: bool,
    pub presentation_time_ns: u64,
    pub content_rect: ContentRect,
    pub stream_id: StreamId,
    pub frame_number: u32,
    pub sequence_start: u32,
    pub dimension_token: DimensionToken,
    pub epoch: Epoch,
    /// FEC block size; `0` or `1` disables parity generation.
    pub fec_block_size: u32,
    /// Generation this item was enqueued under (spec.md §4.3 point 1,
    /// GLOSSARY "Generation").
    pub generation: u64,
    /// Set when this item should carry the wire `discontinuity` flag on
    /// its first fragment (spec.md §4.3).
    pub discontinuity: bool,
    pub callbacks: Option<Box<dyn KeyframeCallbacks>>,
}
