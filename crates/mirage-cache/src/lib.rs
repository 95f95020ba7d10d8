//! Decoded-frame cache & present scheduler (spec.md §2 component 5, §4.6,
//! §4.7): a process-wide, lock-protected multi-producer/single-consumer
//! queue of decoded frames per stream, and a display-synchronized
//! scheduler that picks the next frame for presentation.

mod cache;
mod present;

pub use cache::{DecodedFrameCache, EnqueueReport, NewDecodedFrame};
pub use present::{PresentOutcome, PresentScheduler, Presenter, TargetFps};
