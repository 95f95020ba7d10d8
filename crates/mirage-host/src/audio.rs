//! Host audio pipeline (spec.md §4.9): one audio pipeline per client, bound
//! to a source stream with fallback, plus a mute-while-streaming hook
//! shared across every client's pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};

use mirage_core::StreamId;

/// Audio codec carried alongside video for a stream (spec.md §4.9: "the
/// same encryption scheme as video", format carried out of band from the
/// video codec negotiation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Opus,
    Pcm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub codec: AudioCodec,
    pub sample_rate: u32,
    pub channel_count: u16,
}

/// Result of a source-stream lifecycle change reaching the audio pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFallback {
    /// Source kept streaming; nothing changed.
    Unaffected,
    /// The source stopped and another eligible stream took over.
    FellBackTo(StreamId),
    /// The source stopped and no eligible stream remained.
    Stopped,
}

/// One client's audio pipeline: bound to a source [`StreamId`], with an
/// ordered fallback list of other eligible streams for the same client
/// (spec.md §4.9).
pub struct AudioPipeline {
    source: Option<StreamId>,
    eligible: Vec<StreamId>,
    last_started_format: Option<AudioFormat>,
}

impl AudioPipeline {
    pub fn new() -> Self {
        Self { source: None, eligible: Vec::new(), last_started_format: None }
    }

    pub fn source(&self) -> Option<StreamId> {
        self.source
    }

    /// A stream became eligible to carry audio (it started). If no source
    /// is currently bound, it becomes the source.
    pub fn register_eligible(&mut self, stream_id: StreamId) {
        if !self.eligible.contains(&stream_id) {
            self.eligible.push(stream_id);
        }
        if self.source.is_none() {
            self.source = Some(stream_id);
        }
    }

    /// A stream stopped. Returns the fallback outcome for the audio
    /// pipeline (spec.md §4.9).
    pub fn on_stream_stopped(&mut self, stream_id: StreamId) -> AudioFallback {
        self.eligible.retain(|s| *s != stream_id);

        if self.source != Some(stream_id) {
            return AudioFallback::Unaffected;
        }

        match self.eligible.first().copied() {
            Some(next) => {
                self.source = Some(next);
                AudioFallback::FellBackTo(next)
            }
            None => {
                self.source = None;
                self.last_started_format = None;
                AudioFallback::Stopped
            }
        }
    }

    /// Whether `audioStreamStarted` must be (re-)sent for `format`: only
    /// when codec/sampleRate/channelCount changed since the last send
    /// (spec.md §4.9).
    pub fn note_started(&mut self, format: AudioFormat) -> bool {
        if self.last_started_format == Some(format) {
            return false;
        }
        self.last_started_format = Some(format);
        true
    }
}

impl Default for AudioPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference-counted mute predicate shared across every client's audio
/// pipeline (spec.md §4.9: "muted iff `muteLocalAudioWhileStreaming` ∧ any
/// audio pipeline active").
pub struct MuteWhileStreamingHook {
    mute_local_audio_while_streaming: bool,
    active_pipelines: AtomicUsize,
}

impl MuteWhileStreamingHook {
    pub fn new(mute_local_audio_while_streaming: bool) -> Self {
        Self { mute_local_audio_while_streaming, active_pipelines: AtomicUsize::new(0) }
    }

    pub fn pipeline_activated(&self) {
        self.active_pipelines.fetch_add(1, Ordering::AcqRel);
    }

    pub fn pipeline_deactivated(&self) {
        self.active_pipelines.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1))).ok();
    }

    pub fn is_muted(&self) -> bool {
        self.mute_local_audio_while_streaming && self.active_pipelines.load(Ordering::Acquire) > 0
    }
}
