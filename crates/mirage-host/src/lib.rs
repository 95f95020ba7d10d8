//! Host-side session orchestration: per-stream keyframe/loss-mode policy,
//! per-client bookkeeping, the audio fallback pipeline, and session-state
//! broadcast (spec.md §4.4, §4.9, §2 component 4 "Host Stream Context").

pub mod audio;
pub mod client_context;
pub mod error;
pub mod session;
pub mod stream_context;

pub use audio::{AudioCodec, AudioFallback, AudioFormat, AudioPipeline, MuteWhileStreamingHook};
pub use client_context::ClientContext;
pub use error::HostError;
pub use session::HostSession;
pub use stream_context::{KeyframeEmission, KeyframeReason, RecoveryOutcome, StreamContext};
