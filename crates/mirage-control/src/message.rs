//! Control-channel message catalogue (spec.md §4.8, §6 "Control-plane
//! message stream"): every type is carried as a JSON body behind
//! `mirage_wire::envelope`'s `{type: u8, length: u32, body}` framing. The
//! wire type byte is [`MessageType`]; the body is this module's matching
//! payload struct. Unknown type bytes are logged and ignored by the
//! reader, never treated as a disconnect (spec.md §4.8).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mirage_core::{
    ColorSpace, ContentRect, CursorPositionSnapshot, CursorSnapshot, DeviceId, EncoderConfig,
    InputEvent, MirageHostCapabilities, PixelFormat, QualityTestPlan, QualityTestStage,
    QualityTestStageResult, SessionState, StreamId, StreamKind, VideoCodec, WindowId,
};

use crate::error::ControlError;

/// Stable wire type ID for each control message (spec.md §6: "Message
/// types (stable IDs)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Hello = 0,
    HelloResponse = 1,
    WindowList = 2,
    WindowUpdate = 3,
    StartStream = 4,
    StopStream = 5,
    StreamStarted = 6,
    StreamStopped = 7,
    StreamMetricsUpdate = 8,
    StreamPaused = 9,
    StreamResumed = 10,
    KeyframeRequest = 11,
    DisplayResolutionChange = 12,
    StreamScaleChange = 13,
    StreamRefreshRateChange = 14,
    StreamEncoderSettingsChange = 15,
    ContentBoundsUpdate = 16,
    SessionStateUpdate = 17,
    UnlockRequest = 18,
    UnlockResponse = 19,
    LoginDisplayReady = 20,
    LoginDisplayStopped = 21,
    DesktopStreamStarted = 22,
    DesktopStreamStopped = 23,
    AppList = 24,
    AppListRequest = 25,
    SelectApp = 26,
    AppStreamStarted = 27,
    WindowAddedToStream = 28,
    WindowCooldownStarted = 29,
    WindowCooldownCancelled = 30,
    ReturnToAppSelection = 31,
    AppTerminated = 32,
    MenuBarUpdate = 33,
    MenuActionRequest = 34,
    MenuActionResult = 35,
    Ping = 36,
    Pong = 37,
    QualityTestRequest = 38,
    QualityTestResult = 39,
    QualityProbeRequest = 40,
    QualityProbeResult = 41,
    AudioStreamStarted = 42,
    AudioStreamStopped = 43,
    InputEvent = 44,
    Disconnect = 45,
    Error = 46,
    CursorUpdate = 47,
    CursorPositionUpdate = 48,
}

impl TryFrom<u8> for MessageType {
    type Error = ControlError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use MessageType::*;
        Ok(match value {
            0 => Hello,
            1 => HelloResponse,
            2 => WindowList,
            3 => WindowUpdate,
            4 => StartStream,
            5 => StopStream,
            6 => StreamStarted,
            7 => StreamStopped,
            8 => StreamMetricsUpdate,
            9 => StreamPaused,
            10 => StreamResumed,
            11 => KeyframeRequest,
            12 => DisplayResolutionChange,
            13 => StreamScaleChange,
            14 => StreamRefreshRateChange,
            15 => StreamEncoderSettingsChange,
            16 => ContentBoundsUpdate,
            17 => SessionStateUpdate,
            18 => UnlockRequest,
            19 => UnlockResponse,
            20 => LoginDisplayReady,
            21 => LoginDisplayStopped,
            22 => DesktopStreamStarted,
            23 => DesktopStreamStopped,
            24 => AppList,
            25 => AppListRequest,
            26 => SelectApp,
            27 => AppStreamStarted,
            28 => WindowAddedToStream,
            29 => WindowCooldownStarted,
            30 => WindowCooldownCancelled,
            31 => ReturnToAppSelection,
            32 => AppTerminated,
            33 => MenuBarUpdate,
            34 => MenuActionRequest,
            35 => MenuActionResult,
            36 => Ping,
            37 => Pong,
            38 => QualityTestRequest,
            39 => QualityTestResult,
            40 => QualityProbeRequest,
            41 => QualityProbeResult,
            42 => AudioStreamStarted,
            43 => AudioStreamStopped,
            44 => InputEvent,
            45 => Disconnect,
            46 => Error,
            47 => CursorUpdate,
            48 => CursorPositionUpdate,
            other => return Err(ControlError::UnknownMessageType(other)),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloMessage {
    pub device_id: DeviceId,
    pub target_device_id: Option<DeviceId>,
    pub protocol_version: u32,
    /// Pre-serialized capability/negotiation bytes, signed as part of the
    /// hello (spec.md §4.2) — kept opaque here so this crate doesn't need
    /// to know `mirage-security`'s canonicalization.
    pub declared_capabilities: Vec<u8>,
    pub negotiation: Vec<u8>,
    pub user_scope_id: String,
    pub key_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub timestamp_ms: u64,
    pub nonce: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloResponseMessage {
    pub accepted: bool,
    pub reason: Option<String>,
    pub host_capabilities: Option<MirageHostCapabilities>,
    pub session_state: Option<SessionState>,
    pub data_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub window_id: WindowId,
    pub title: String,
    pub app_bundle_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowListMessage {
    pub windows: Vec<WindowSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowUpdateMessage {
    pub window: WindowSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStreamMessage {
    pub window_id: Option<WindowId>,
    pub kind: StreamKind,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub encoder: EncoderConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopStreamMessage {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStartedMessage {
    pub stream_id: StreamId,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub codec: VideoCodec,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStoppedMessage {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetricsUpdateMessage {
    pub stream_id: StreamId,
    pub encoded_fps: f64,
    pub bitrate_bps: u64,
    pub rtt_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPausedMessage {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResumedMessage {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeRequestMessage {
    pub stream_id: StreamId,
}

/// Resize request, carried in points (spec.md §4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayResolutionChangeMessage {
    pub stream_id: StreamId,
    pub width_points: u32,
    pub height_points: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamScaleChangeMessage {
    pub stream_id: StreamId,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRefreshRateChangeMessage {
    pub stream_id: StreamId,
    pub target_fps: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEncoderSettingsChangeMessage {
    pub stream_id: StreamId,
    pub pixel_format: Option<PixelFormat>,
    pub color_space: Option<ColorSpace>,
    pub bitrate_bps: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBoundsUpdateMessage {
    pub stream_id: StreamId,
    pub content_rect: ContentRect,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateUpdateMessage {
    pub state: SessionState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequestMessage {
    pub passphrase_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponseMessage {
    pub accepted: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginDisplayReadyMessage {
    pub stream_id: StreamId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginDisplayStoppedMessage {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopStreamStartedMessage {
    pub stream_id: StreamId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopStreamStoppedMessage {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub bundle_id: String,
    pub display_name: String,
    pub pinned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppListMessage {
    pub apps: Vec<AppSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AppListRequestMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectAppMessage {
    pub bundle_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStreamStartedMessage {
    pub stream_id: StreamId,
    pub bundle_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowAddedToStreamMessage {
    pub stream_id: StreamId,
    pub window: WindowSummary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCooldownStartedMessage {
    pub window_id: WindowId,
    pub cooldown_ms: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCooldownCancelledMessage {
    pub window_id: WindowId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReturnToAppSelectionMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTerminatedMessage {
    pub bundle_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuBarUpdateMessage {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuActionRequestMessage {
    pub action_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuActionResultMessage {
    pub action_id: String,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PingMessage {
    pub nonce: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PongMessage {
    pub nonce: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityTestRequestMessage {
    pub plan: QualityTestPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityTestResultMessage {
    pub test_id: Uuid,
    pub results: Vec<QualityTestStageResult>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProbeRequestMessage {
    pub test_id: Uuid,
    pub stage: QualityTestStage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProbeResultMessage {
    pub test_id: Uuid,
    pub result: QualityTestStageResult,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStreamStartedMessage {
    pub source_stream_id: StreamId,
    pub sample_rate: u32,
    pub channel_count: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioStreamStoppedMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEventMessage {
    pub stream_id: StreamId,
    pub event: InputEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectMessage {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdateMessage {
    pub cursor: CursorSnapshot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPositionUpdateMessage {
    pub position: CursorPositionSnapshot,
}

/// One fully-typed control message, tagged by [`MessageType`] on the wire
/// but untagged in its JSON body (the envelope's type byte already carries
/// that information).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControlMessage {
    Hello(HelloMessage),
    HelloResponse(HelloResponseMessage),
    WindowList(WindowListMessage),
    WindowUpdate(WindowUpdateMessage),
    StartStream(StartStreamMessage),
    StopStream(StopStreamMessage),
    StreamStarted(StreamStartedMessage),
    StreamStopped(StreamStoppedMessage),
    StreamMetricsUpdate(StreamMetricsUpdateMessage),
    StreamPaused(StreamPausedMessage),
    StreamResumed(StreamResumedMessage),
    KeyframeRequest(KeyframeRequestMessage),
    DisplayResolutionChange(DisplayResolutionChangeMessage),
    StreamScaleChange(StreamScaleChangeMessage),
    StreamRefreshRateChange(StreamRefreshRateChangeMessage),
    StreamEncoderSettingsChange(StreamEncoderSettingsChangeMessage),
    ContentBoundsUpdate(ContentBoundsUpdateMessage),
    SessionStateUpdate(SessionStateUpdateMessage),
    UnlockRequest(UnlockRequestMessage),
    UnlockResponse(UnlockResponseMessage),
    LoginDisplayReady(LoginDisplayReadyMessage),
    LoginDisplayStopped(LoginDisplayStoppedMessage),
    DesktopStreamStarted(DesktopStreamStartedMessage),
    DesktopStreamStopped(DesktopStreamStoppedMessage),
    AppList(AppListMessage),
    AppListRequest(AppListRequestMessage),
    SelectApp(SelectAppMessage),
    AppStreamStarted(AppStreamStartedMessage),
    WindowAddedToStream(WindowAddedToStreamMessage),
    WindowCooldownStarted(WindowCooldownStartedMessage),
    WindowCooldownCancelled(WindowCooldownCancelledMessage),
    ReturnToAppSelection(ReturnToAppSelectionMessage),
    AppTerminated(AppTerminatedMessage),
    MenuBarUpdate(MenuBarUpdateMessage),
    MenuActionRequest(MenuActionRequestMessage),
    MenuActionResult(MenuActionResultMessage),
    Ping(PingMessage),
    Pong(PongMessage),
    QualityTestRequest(QualityTestRequestMessage),
    QualityTestResult(QualityTestResultMessage),
    QualityProbeRequest(QualityProbeRequestMessage),
    QualityProbeResult(QualityProbeResultMessage),
    AudioStreamStarted(AudioStreamStartedMessage),
    AudioStreamStopped(AudioStreamStoppedMessage),
    InputEvent(InputEventMessage),
    Disconnect(DisconnectMessage),
    Error(ErrorMessage),
    CursorUpdate(CursorUpdateMessage),
    CursorPositionUpdate(CursorPositionUpdateMessage),
}

impl ControlMessage {
    pub fn message_type(&self) -> MessageType {
        use ControlMessage::*;
        match self {
            Hello(_) => MessageType::Hello,
            HelloResponse(_) => MessageType::HelloResponse,
            WindowList(_) => MessageType::WindowList,
            WindowUpdate(_) => MessageType::WindowUpdate,
            StartStream(_) => MessageType::StartStream,
            StopStream(_) => MessageType::StopStream,
            StreamStarted(_) => MessageType::StreamStarted,
            StreamStopped(_) => MessageType::StreamStopped,
            StreamMetricsUpdate(_) => MessageType::StreamMetricsUpdate,
            StreamPaused(_) => MessageType::StreamPaused,
            StreamResumed(_) => MessageType::StreamResumed,
            KeyframeRequest(_) => MessageType::KeyframeRequest,
            DisplayResolutionChange(_) => MessageType::DisplayResolutionChange,
            StreamScaleChange(_) => MessageType::StreamScaleChange,
            StreamRefreshRateChange(_) => MessageType::StreamRefreshRateChange,
            StreamEncoderSettingsChange(_) => MessageType::StreamEncoderSettingsChange,
            ContentBoundsUpdate(_) => MessageType::ContentBoundsUpdate,
            SessionStateUpdate(_) => MessageType::SessionStateUpdate,
            UnlockRequest(_) => MessageType::UnlockRequest,
            UnlockResponse(_) => MessageType::UnlockResponse,
            LoginDisplayReady(_) => MessageType::LoginDisplayReady,
            LoginDisplayStopped(_) => MessageType::LoginDisplayStopped,
            DesktopStreamStarted(_) => MessageType::DesktopStreamStarted,
            DesktopStreamStopped(_) => MessageType::DesktopStreamStopped,
            AppList(_) => MessageType::AppList,
            AppListRequest(_) => MessageType::AppListRequest,
            SelectApp(_) => MessageType::SelectApp,
            AppStreamStarted(_) => MessageType::AppStreamStarted,
            WindowAddedToStream(_) => MessageType::WindowAddedToStream,
            WindowCooldownStarted(_) => MessageType::WindowCooldownStarted,
            WindowCooldownCancelled(_) => MessageType::WindowCooldownCancelled,
            ReturnToAppSelection(_) => MessageType::ReturnToAppSelection,
            AppTerminated(_) => MessageType::AppTerminated,
            MenuBarUpdate(_) => MessageType::MenuBarUpdate,
            MenuActionRequest(_) => MessageType::MenuActionRequest,
            MenuActionResult(_) => MessageType::MenuActionResult,
            Ping(_) => MessageType::Ping,
            Pong(_) => MessageType::Pong,
            QualityTestRequest(_) => MessageType::QualityTestRequest,
            QualityTestResult(_) => MessageType::QualityTestResult,
            QualityProbeRequest(_) => MessageType::QualityProbeRequest,
            QualityProbeResult(_) => MessageType::QualityProbeResult,
            AudioStreamStarted(_) => MessageType::AudioStreamStarted,
            AudioStreamStopped(_) => MessageType::AudioStreamStopped,
            InputEvent(_) => MessageType::InputEvent,
            Disconnect(_) => MessageType::Disconnect,
            Error(_) => MessageType::Error,
            CursorUpdate(_) => MessageType::CursorUpdate,
            CursorPositionUpdate(_) => MessageType::CursorPositionUpdate,
        }
    }

    /// Serialize the body (the envelope's type byte is written separately
    /// by the caller from [`Self::message_type`]).
    pub fn encode_body(&self) -> Result<Vec<u8>, ControlError> {
        use ControlMessage::*;
        let bytes = match self {
            Hello(m) => serde_json::to_vec(m),
            HelloResponse(m) => serde_json::to_vec(m),
            WindowList(m) => serde_json::to_vec(m),
            WindowUpdate(m) => serde_json::to_vec(m),
            StartStream(m) => serde_json::to_vec(m),
            StopStream(m) => serde_json::to_vec(m),
            StreamStarted(m) => serde_json::to_vec(m),
            StreamStopped(m) => serde_json::to_vec(m),
            StreamMetricsUpdate(m) => serde_json::to_vec(m),
            StreamPaused(m) => serde_json::to_vec(m),
            StreamResumed(m) => serde_json::to_vec(m),
            KeyframeRequest(m) => serde_json::to_vec(m),
            DisplayResolutionChange(m) => serde_json::to_vec(m),
            StreamScaleChange(m) => serde_json::to_vec(m),
            StreamRefreshRateChange(m) => serde_json::to_vec(m),
            StreamEncoderSettingsChange(m) => serde_json::to_vec(m),
            ContentBoundsUpdate(m) => serde_json::to_vec(m),
            SessionStateUpdate(m) => serde_json::to_vec(m),
            UnlockRequest(m) => serde_json::to_vec(m),
            UnlockResponse(m) => serde_json::to_vec(m),
            LoginDisplayReady(m) => serde_json::to_vec(m),
            LoginDisplayStopped(m) => serde_json::to_vec(m),
            DesktopStreamStarted(m) => serde_json::to_vec(m),
            DesktopStreamStopped(m) => serde_json::to_vec(m),
            AppList(m) => serde_json::to_vec(m),
            AppListRequest(m) => serde_json::to_vec(m),
            SelectApp(m) => serde_json::to_vec(m),
            AppStreamStarted(m) => serde_json::to_vec(m),
            WindowAddedToStream(m) => serde_json::to_vec(m),
            WindowCooldownStarted(m) => serde_json::to_vec(m),
            WindowCooldownCancelled(m) => serde_json::to_vec(m),
            ReturnToAppSelection(m) => serde_json::to_vec(m),
            AppTerminated(m) => serde_json::to_vec(m),
            MenuBarUpdate(m) => serde_json::to_vec(m),
            MenuActionRequest(m) => serde_json::to_vec(m),
            MenuActionResult(m) => serde_json::to_vec(m),
            Ping(m) => serde_json::to_vec(m),
            Pong(m) => serde_json::to_vec(m),
            QualityTestRequest(m) => serde_json::to_vec(m),
            QualityTestResult(m) => serde_json::to_vec(m),
            QualityProbeRequest(m) => serde_json::to_vec(m),
            QualityProbeResult(m) => serde_json::to_vec(m),
            AudioStreamStarted(m) => serde_json::to_vec(m),
            AudioStreamStopped(m) => serde_json::to_vec(m),
            InputEvent(m) => serde_json::to_vec(m),
            Disconnect(m) => serde_json::to_vec(m),
            Error(m) => serde_json::to_vec(m),
            CursorUpdate(m) => serde_json::to_vec(m),
            CursorPositionUpdate(m) => serde_json::to_vec(m),
        }?;
        Ok(bytes)
    }

    /// Parse `body` according to `message_type`. Returns
    /// `ControlError::UnknownMessageType` for a type byte outside the
    /// catalogue; callers are expected to log and ignore per spec.md §4.8
    /// rather than disconnect.
    pub fn decode(message_type: u8, body: &[u8]) -> Result<Self, ControlError> {
        let message_type = MessageType::try_from(message_type)?;
        Ok(match message_type {
            MessageType::Hello => ControlMessage::Hello(serde_json::from_slice(body)?),
            MessageType::HelloResponse => ControlMessage::HelloResponse(serde_json::from_slice(body)?),
            MessageType::WindowList => ControlMessage::WindowList(serde_json::from_slice(body)?),
            MessageType::WindowUpdate => ControlMessage::WindowUpdate(serde_json::from_slice(body)?),
            MessageType::StartStream => ControlMessage::StartStream(serde_json::from_slice(body)?),
            MessageType::StopStream => ControlMessage::StopStream(serde_json::from_slice(body)?),
            MessageType::StreamStarted => ControlMessage::StreamStarted(serde_json::from_slice(body)?),
            MessageType::StreamStopped => ControlMessage::StreamStopped(serde_json::from_slice(body)?),
            MessageType::StreamMetricsUpdate => {
                ControlMessage::StreamMetricsUpdate(serde_json::from_slice(body)?)
            }
            MessageType::StreamPaused => ControlMessage::StreamPaused(serde_json::from_slice(body)?),
            MessageType::StreamResumed => ControlMessage::StreamResumed(serde_json::from_slice(body)?),
            MessageType::KeyframeRequest => ControlMessage::KeyframeRequest(serde_json::from_slice(body)?),
            MessageType::DisplayResolutionChange => {
                ControlMessage::DisplayResolutionChange(serde_json::from_slice(body)?)
            }
            MessageType::StreamScaleChange => ControlMessage::StreamScaleChange(serde_json::from_slice(body)?),
            MessageType::StreamRefreshRateChange => {
                ControlMessage::StreamRefreshRateChange(serde_json::from_slice(body)?)
            }
            MessageType::StreamEncoderSettingsChange => {
                ControlMessage::StreamEncoderSettingsChange(serde_json::from_slice(body)?)
            }
            MessageType::ContentBoundsUpdate => {
                ControlMessage::ContentBoundsUpdate(serde_json::from_slice(body)?)
            }
            MessageType::SessionStateUpdate => {
                ControlMessage::SessionStateUpdate(serde_json::from_slice(body)?)
            }
            MessageType::UnlockRequest => ControlMessage::UnlockRequest(serde_json::from_slice(body)?),
            MessageType::UnlockResponse => ControlMessage::UnlockResponse(serde_json::from_slice(body)?),
            MessageType::LoginDisplayReady => ControlMessage::LoginDisplayReady(serde_json::from_slice(body)?),
            MessageType::LoginDisplayStopped => {
                ControlMessage::LoginDisplayStopped(serde_json::from_slice(body)?)
            }
            MessageType::DesktopStreamStarted => {
                ControlMessage::DesktopStreamStarted(serde_json::from_slice(body)?)
            }
            MessageType::DesktopStreamStopped => {
                ControlMessage::DesktopStreamStopped(serde_json::from_slice(body)?)
            }
            MessageType::AppList => ControlMessage::AppList(serde_json::from_slice(body)?),
            MessageType::AppListRequest => ControlMessage::AppListRequest(serde_json::from_slice(body)?),
            MessageType::SelectApp => ControlMessage::SelectApp(serde_json::from_slice(body)?),
            MessageType::AppStreamStarted => ControlMessage::AppStreamStarted(serde_json::from_slice(body)?),
            MessageType::WindowAddedToStream => {
                ControlMessage::WindowAddedToStream(serde_json::from_slice(body)?)
            }
            MessageType::WindowCooldownStarted => {
                ControlMessage::WindowCooldownStarted(serde_json::from_slice(body)?)
            }
            MessageType::WindowCooldownCancelled => {
                ControlMessage::WindowCooldownCancelled(serde_json::from_slice(body)?)
            }
            MessageType::ReturnToAppSelection => {
                ControlMessage::ReturnToAppSelection(serde_json::from_slice(body)?)
            }
            MessageType::AppTerminated => ControlMessage::AppTerminated(serde_json::from_slice(body)?),
            MessageType::MenuBarUpdate => ControlMessage::MenuBarUpdate(serde_json::from_slice(body)?),
            MessageType::MenuActionRequest => ControlMessage::MenuActionRequest(serde_json::from_slice(body)?),
            MessageType::MenuActionResult => ControlMessage::MenuActionResult(serde_json::from_slice(body)?),
            MessageType::Ping => ControlMessage::Ping(serde_json::from_slice(body)?),
            MessageType::Pong => ControlMessage::Pong(serde_json::from_slice(body)?),
            MessageType::QualityTestRequest => {
                ControlMessage::QualityTestRequest(serde_json::from_slice(body)?)
            }
            MessageType::QualityTestResult => ControlMessage::QualityTestResult(serde_json::from_slice(body)?),
            MessageType::QualityProbeRequest => {
                ControlMessage::QualityProbeRequest(serde_json::from_slice(body)?)
            }
            MessageType::QualityProbeResult => {
                ControlMessage::QualityProbeResult(serde_json::from_slice(body)?)
            }
            MessageType::AudioStreamStarted => {
                ControlMessage::AudioStreamStarted(serde_json::from_slice(body)?)
            }
            MessageType::AudioStreamStopped => {
                ControlMessage::AudioStreamStopped(serde_json::from_slice(body)?)
            }
            MessageType::InputEvent => ControlMessage::InputEvent(serde_json::from_slice(body)?),
            MessageType::Disconnect => ControlMessage::Disconnect(serde_json::from_slice(body)?),
            MessageType::Error => ControlMessage::Error(serde_json::from_slice(body)?),
            MessageType::CursorUpdate => ControlMessage::CursorUpdate(serde_json::from_slice(body)?),
            MessageType::CursorPositionUpdate => {
                ControlMessage::CursorPositionUpdate(serde_json::from_slice(body)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_roundtrips_through_type_and_body() {
        let message = ControlMessage::Ping(PingMessage { nonce: 42 });
        let message_type = message.message_type();
        let body = message.encode_body().unwrap();

        let decoded = ControlMessage::decode(message_type as u8, &body).unwrap();
        assert!(matches!(decoded, ControlMessage::Ping(PingMessage { nonce: 42 })));
    }

    #[test]
    fn stream_started_roundtrips() {
        let message = ControlMessage::StreamStarted(StreamStartedMessage {
            stream_id: StreamId(7),
            width: 1920,
            height: 1080,
            frame_rate: 120,
            codec: VideoCodec::Hevc,
        });
        let body = message.encode_body().unwrap();
        let decoded = ControlMessage::decode(MessageType::StreamStarted as u8, &body).unwrap();
        match decoded {
            ControlMessage::StreamStarted(m) => {
                assert_eq!(m.stream_id, StreamId(7));
                assert_eq!(m.frame_rate, 120);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_byte_is_rejected() {
        assert!(matches!(
            ControlMessage::decode(255, b"{}"),
            Err(ControlError::UnknownMessageType(255))
        ));
    }
}
