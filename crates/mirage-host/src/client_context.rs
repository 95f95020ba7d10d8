//! Per-client host-side bookkeeping: the set of streams opened for a
//! connected client plus its audio pipeline (spec.md §4.4, §4.9).

use std::collections::HashMap;
use std::sync::Arc;

use mirage_core::policy::KeyframePolicy;
use mirage_core::{DeviceId, StreamId};
use mirage_sender::GenerationControl;

use crate::audio::AudioPipeline;
use crate::error::HostError;
use crate::stream_context::StreamContext;

/// One connected client: its device identity, the streams the host has
/// opened for it, and its audio pipeline.
pub struct ClientContext {
    device_id: DeviceId,
    streams: HashMap<StreamId, StreamContext>,
    audio: AudioPipeline,
}

impl ClientContext {
    pub fn new(device_id: DeviceId) -> Self {
        Self { device_id, streams: HashMap::new(), audio: AudioPipeline::new() }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// `generation` should be the same [`GenerationControl`] handed to the
    /// `mirage-sender` packet sender driving this stream's egress, so a
    /// hard recovery's queue reset actually reaches it (spec.md §4.4
    /// "Recovery", §9 "Generation & epoch").
    pub fn open_stream(
        &mut self,
        stream_id: StreamId,
        key_frame_interval_frames: u32,
        frame_rate: u32,
        policy: KeyframePolicy,
        generation: Arc<GenerationControl>,
    ) -> &mut StreamContext {
        self.streams.entry(stream_id).or_insert_with(|| {
            StreamContext::new(stream_id, key_frame_interval_frames, frame_rate, policy, generation)
        })
    }

    pub fn stream(&self, stream_id: StreamId) -> Result<&StreamContext, HostError> {
        self.streams.get(&stream_id).ok_or(HostError::UnknownStream(stream_id))
    }

    pub fn stream_mut(&mut self, stream_id: StreamId) -> Result<&mut StreamContext, HostError> {
        self.streams.get_mut(&stream_id).ok_or(HostError::UnknownStream(stream_id))
    }

    pub fn close_stream(&mut self, stream_id: StreamId) {
        self.streams.remove(&stream_id);
    }

    pub fn streams(&self) -> impl Iterator<Item = &StreamContext> {
        self.streams.values()
    }

    pub fn audio(&self) -> &AudioPipeline {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioPipeline {
        &mut self.audio
    }

    /// Explicit disconnect or transport failure (spec.md §4.8): drops all
    /// per-stream state for this client. The caller is responsible for
    /// cancelling the corresponding sender/assembler tasks, which this
    /// context does not own.
    pub fn reset(&mut self) {
        self.streams.clear();
        self.audio = AudioPipeline::new();
    }
}
