pub mod capabilities;
pub mod codec;
pub mod cursor;
pub mod decoded;
pub mod errors;
pub mod frame;
pub mod ids;
pub mod input;
pub mod policy;
pub mod quality;
pub mod session;

pub use capabilities::{HardwareClass, HardwareIconHint, MirageHostCapabilities, PROTOCOL_VERSION};
pub use codec::{ColorSpace, EncoderConfig, PixelFormat, VideoCodec};
pub use cursor::{CursorPositionSnapshot, CursorSnapshot};
pub use decoded::{DecodedFrameEntry, DecodedPixelFormat};
pub use errors::MirageError;
pub use frame::{ContentRect, DimensionToken, Epoch, FrameFlags, FrameHeader};
pub use ids::{DeviceId, StreamId, WindowId};
pub use input::{GesturePhase, InputEvent, MouseButton};
pub use quality::{QualityTestPlan, QualityTestStage, QualityTestStageResult};
pub use session::{SessionState, StreamKind};
