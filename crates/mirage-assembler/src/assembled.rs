use bytes::Bytes;
use mirage_core::{ContentRect, DimensionToken, Epoch, StreamId};

/// A complete, reassembled bitstream frame, ready for the (external)
/// decoder.
#[derive(Debug, Clone)]
pub struct AssembledFrame {
    pub stream_id: StreamId,
    pub frame_number: u32,
    pub timestamp_ns: u64,
    pub is_keyframe: bool,
    pub content_rect: ContentRect,
    pub dimension_token: DimensionToken,
    pub epoch: Epoch,
    pub data: Bytes,
}
