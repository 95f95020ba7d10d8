//! Client connection façade tying the control plane ([`mirage_control`])
//! and the per-stream state this crate owns (adaptive loop, metrics/cursor
//! stores) together (spec.md §2 component 8 "client-side", §4.8).
//!
//! This module owns no socket; [`ClientConnection::handle_message`] is a
//! pure dispatch function so the connection/lifecycle/adaptive state
//! machines stay unit-testable without a live TLS transport. The async
//! read loop that pulls [`mirage_control::ControlMessage`]s off a
//! [`mirage_control::ControlStream`] is a thin wrapper
//! ([`ClientConnection::recv_event`]) around that dispatch.

use std::collections::HashMap;
use std::time::Instant;

use tracing::warn;

use mirage_control::{
    ConnectionMachine, ControlError, ControlMessage, ControlStream, StreamGeometry,
    StreamLifecycleMachine,
};
use mirage_core::policy::AdaptivePolicy;
use mirage_core::{
    CursorPositionSnapshot, CursorSnapshot, MirageHostCapabilities, PixelFormat, SessionState, StreamId,
    VideoCodec,
};

use crate::adaptive::AdaptiveLoop;
use crate::error::ClientError;
use crate::stores::{ClientObservedMetrics, CursorStore, HostReportedMetrics, MetricsStore, PositionStore};

/// One dispatched outcome of an incoming control message, for the caller
/// (UI layer / data-plane wiring) to react to. Messages this façade has no
/// state-machine opinion about (app lists, menu bar, window list, ...)
/// pass through as [`ClientEvent::Passthrough`] rather than being dropped,
/// since spec.md §4.8 scopes this crate to stream lifecycle + adaptive +
/// telemetry, not the full UI surface.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connected { host_capabilities: MirageHostCapabilities, session_state: SessionState, data_port: u16 },
    Rejected { reason: String },
    StreamStarted { stream_id: StreamId, geometry: StreamGeometry, codec: VideoCodec },
    StreamStopped { stream_id: StreamId },
    StreamPaused { stream_id: StreamId },
    StreamResumed { stream_id: StreamId },
    SessionStateChanged(SessionState),
    ResizeCorrectionRequired { stream_id: StreamId, corrected: StreamGeometry },
    CursorChanged(CursorSnapshot),
    PositionChanged(CursorPositionSnapshot),
    Disconnected { reason: String },
    Passthrough(ControlMessage),
    /// An unrecognized message type byte arrived; logged, never a
    /// disconnect (spec.md §4.1, §4.8).
    UnknownMessageIgnored,
}

/// Ties [`ConnectionMachine`], per-stream [`StreamLifecycleMachine`]s, this
/// crate's [`AdaptiveLoop`]s, and the metrics/cursor/position stores
/// together for one client-side session.
pub struct ClientConnection {
    connection: ConnectionMachine,
    streams: HashMap<StreamId, StreamLifecycleMachine>,
    adaptive: HashMap<StreamId, AdaptiveLoop>,
    adaptive_policy: AdaptivePolicy,
    metrics: MetricsStore,
    cursors: CursorStore,
    positions: PositionStore,
}

impl ClientConnection {
    pub fn new(adaptive_policy: AdaptivePolicy) -> Self {
        Self {
            connection: ConnectionMachine::new(),
            streams: HashMap::new(),
            adaptive: HashMap::new(),
            adaptive_policy,
            metrics: MetricsStore::new(),
            cursors: CursorStore::new(),
            positions: PositionStore::new(),
        }
    }

    pub fn connection_state(&self) -> &mirage_control::ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn metrics(&self) -> &MetricsStore {
        &self.metrics
    }

    pub fn cursors(&self) -> &CursorStore {
        &self.cursors
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn stream(&self, stream_id: StreamId) -> Option<&StreamLifecycleMachine> {
        self.streams.get(&stream_id)
    }

    fn target_fps(&self, stream_id: StreamId) -> Option<f64> {
        use mirage_control::StreamLifecycleState::*;
        match self.streams.get(&stream_id)?.state() {
            Started { geometry, .. } | Active { geometry, .. } | Paused { geometry, .. } => {
                Some(geometry.frame_rate as f64)
            }
            Requested | Stopped => None,
        }
    }

    pub fn begin_connecting(&mut self) -> Result<(), ClientError> {
        Ok(self.connection.begin_connecting()?)
    }

    pub fn transport_ready(&mut self, now: Instant) -> Result<(), ClientError> {
        Ok(self.connection.transport_ready(now)?)
    }

    /// Starts tracking a stream requested locally (spec.md §4.8
    /// `requested` state) so later `streamStarted`/`streamStopped`
    /// messages have somewhere to land.
    pub fn stream_requested(&mut self, stream_id: StreamId) {
        self.streams.entry(stream_id).or_insert_with(StreamLifecycleMachine::new);
        self.adaptive.entry(stream_id).or_insert_with(|| {
            AdaptiveLoop::new(
                crate::adaptive::AdaptiveMode::Disabled,
                self.adaptive_policy,
                0,
                PixelFormat::Bgra8,
            )
        });
    }

    /// Adaptive loop for one stream, created lazily at the baseline the
    /// `streamStarted` message negotiated.
    pub fn adaptive_mut(
        &mut self,
        stream_id: StreamId,
        mode: crate::adaptive::AdaptiveMode,
        baseline_bitrate_bps: u64,
        baseline_pixel_format: PixelFormat,
    ) -> &mut AdaptiveLoop {
        self.adaptive
            .entry(stream_id)
            .and_modify(|a| a.set_mode(mode))
            .or_insert_with(|| AdaptiveLoop::new(mode, self.adaptive_policy, baseline_bitrate_bps, baseline_pixel_format))
    }

    /// First UDP data packet observed for `stream_id` (spec.md §4.8: "the
    /// client enters `active` only after the first UDP packet for the
    /// stream is received").
    pub fn note_first_data_packet(&mut self, stream_id: StreamId) -> Result<(), ClientError> {
        let lifecycle = self.streams.get_mut(&stream_id).ok_or(ClientError::UnknownStream(stream_id))?;
        Ok(lifecycle.on_first_data_packet()?)
    }

    /// Dispatches one decoded control message, updating connection,
    /// lifecycle, and telemetry state and returning the event the caller
    /// should react to.
    pub fn handle_message(&mut self, now: Instant, message: ControlMessage) -> ClientEvent {
        match message {
            ControlMessage::HelloResponse(resp) => {
                if !resp.accepted {
                    let reason = resp.reason.unwrap_or_else(|| "rejected".to_string());
                    self.connection.hello_rejected(reason.clone());
                    return ClientEvent::Rejected { reason };
                }
                let (Some(caps), Some(session_state), Some(data_port)) =
                    (resp.host_capabilities, resp.session_state, resp.data_port)
                else {
                    let reason = "accepted hello missing required fields".to_string();
                    self.connection.hello_rejected(reason.clone());
                    return ClientEvent::Rejected { reason };
                };
                match self.connection.hello_accepted(caps.clone(), session_state, data_port) {
                    Ok(()) => ClientEvent::Connected { host_capabilities: caps, session_state, data_port },
                    Err(e) => ClientEvent::Rejected { reason: e.to_string() },
                }
            }
            ControlMessage::SessionStateUpdate(update) => {
                let _ = self.connection.update_session_state(update.state);
                ClientEvent::SessionStateChanged(update.state)
            }
            ControlMessage::StreamStarted(started) => {
                let geometry =
                    StreamGeometry { width: started.width, height: started.height, frame_rate: started.frame_rate };
                let lifecycle = self.streams.entry(started.stream_id).or_insert_with(StreamLifecycleMachine::new);
                let _ = lifecycle.on_started(started.stream_id, geometry, started.codec);
                ClientEvent::StreamStarted { stream_id: started.stream_id, geometry, codec: started.codec }
            }
            ControlMessage::StreamStopped(stopped) => {
                if let Some(lifecycle) = self.streams.get_mut(&stopped.stream_id) {
                    lifecycle.on_stopped();
                }
                self.streams.remove(&stopped.stream_id);
                self.adaptive.remove(&stopped.stream_id);
                self.metrics.clear(stopped.stream_id);
                self.cursors.clear(stopped.stream_id);
                self.positions.clear(stopped.stream_id);
                ClientEvent::StreamStopped { stream_id: stopped.stream_id }
            }
            ControlMessage::StreamPaused(paused) => {
                if let Some(lifecycle) = self.streams.get_mut(&paused.stream_id) {
                    let _ = lifecycle.on_paused();
                }
                ClientEvent::StreamPaused { stream_id: paused.stream_id }
            }
            ControlMessage::StreamResumed(resumed) => {
                if let Some(lifecycle) = self.streams.get_mut(&resumed.stream_id) {
                    let _ = lifecycle.on_resumed();
                }
                ClientEvent::StreamResumed { stream_id: resumed.stream_id }
            }
            ControlMessage::StreamMetricsUpdate(update) => {
                self.metrics.update_host_metrics(
                    update.stream_id,
                    HostReportedMetrics {
                        encoded_fps: update.encoded_fps,
                        bitrate_bps: update.bitrate_bps,
                        rtt_ms: update.rtt_ms,
                    },
                );
                if let Some(target_fps) = self.target_fps(update.stream_id) {
                    if let Some(loop_) = self.adaptive.get_mut(&update.stream_id) {
                        // Transport/decode backpressure come from the assembler
                        // and cache, not this message; a separate caller with
                        // those signals drives the bound flags directly.
                        loop_.record_encoded_fps_sample(now, update.encoded_fps, target_fps, false, false);
                    }
                }
                ClientEvent::Passthrough(ControlMessage::StreamMetricsUpdate(update))
            }
            ControlMessage::CursorUpdate(update) => {
                let applied = self.cursors.update(
                    update.cursor.stream_id,
                    update.cursor.cursor_type.clone(),
                    update.cursor.visible,
                );
                match applied {
                    Some(snapshot) => ClientEvent::CursorChanged(snapshot),
                    None => ClientEvent::Passthrough(ControlMessage::CursorUpdate(update)),
                }
            }
            ControlMessage::CursorPositionUpdate(update) => {
                let snapshot =
                    self.positions.update(update.position.stream_id, update.position.x, update.position.y);
                ClientEvent::PositionChanged(snapshot)
            }
            ControlMessage::QualityTestResult(result) => {
                ClientEvent::Passthrough(ControlMessage::QualityTestResult(result))
            }
            ControlMessage::Disconnect(reason) => {
                let reason = reason.reason;
                self.disconnect(reason.clone());
                ClientEvent::Disconnected { reason }
            }
            other => ClientEvent::Passthrough(other),
        }
    }

    /// Decrypts one control-channel envelope into a [`ClientEvent`].
    /// Unknown message types are logged and ignored, never treated as a
    /// disconnect (spec.md §4.1, §4.8).
    pub async fn recv_event(&mut self, stream: &mut ControlStream, now: Instant) -> Result<ClientEvent, ClientError> {
        let envelope = stream.recv().await?;
        match ControlMessage::decode(envelope.message_type, &envelope.body) {
            Ok(message) => Ok(self.handle_message(now, message)),
            Err(ControlError::UnknownMessageType(t)) => {
                warn!(message_type = t, "ignoring unknown control message type");
                Ok(ClientEvent::UnknownMessageIgnored)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Explicit disconnect or transport failure (spec.md §4.8): clears all
    /// per-stream state, cursor/metric stores, and resets adaptive state.
    /// Socket/task teardown is the caller's responsibility.
    pub fn disconnect(&mut self, reason: impl Into<String>) {
        self.connection.disconnect(reason);
        self.streams.clear();
        self.adaptive.clear();
        self.metrics.clear_all();
        self.cursors.clear_all();
        self.positions.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_control::messages::{
        HelloResponseMessage, SessionStateUpdateMessage, StreamStartedMessage, StreamStoppedMessage,
    };
    use mirage_core::{DeviceId, HardwareClass, HardwareIconHint};

    fn caps() -> MirageHostCapabilities {
        MirageHostCapabilities {
            max_streams: 4,
            supports_hevc: true,
            supports_p3_color_space: false,
            max_frame_rate: 120,
            protocol_version: 2,
            device_id: DeviceId::new_random(),
            identity_key_id: "k1".to_string(),
            hardware_class: HardwareClass {
                family: "mac".to_string(),
                icon_hint: HardwareIconHint::Desktop,
                model_id: "Mac15,1".to_string(),
                color: None,
            },
        }
    }

    #[test]
    fn hello_response_accepted_transitions_to_connected() {
        let mut conn = ClientConnection::new(AdaptivePolicy::default());
        conn.begin_connecting().unwrap();
        conn.transport_ready(Instant::now()).unwrap();

        let event = conn.handle_message(
            Instant::now(),
            ControlMessage::HelloResponse(HelloResponseMessage {
                accepted: true,
                reason: None,
                host_capabilities: Some(caps()),
                session_state: Some(SessionState::active()),
                data_port: Some(7000),
            }),
        );
        assert!(matches!(event, ClientEvent::Connected { .. }));
        assert!(conn.is_connected());
    }

    #[test]
    fn stream_stopped_clears_all_associated_state() {
        let mut conn = ClientConnection::new(AdaptivePolicy::default());
        conn.stream_requested(StreamId(1));
        conn.handle_message(
            Instant::now(),
            ControlMessage::StreamStarted(StreamStartedMessage {
                stream_id: StreamId(1),
                width: 1920,
                height: 1080,
                frame_rate: 120,
                codec: VideoCodec::H264,
            }),
        );
        conn.metrics.update_host_metrics(
            StreamId(1),
            HostReportedMetrics { encoded_fps: 60.0, bitrate_bps: 1, rtt_ms: None },
        );
        conn.cursors.update(StreamId(1), "arrow".to_string(), true);

        conn.handle_message(Instant::now(), ControlMessage::StreamStopped(StreamStoppedMessage { stream_id: StreamId(1) }));

        assert!(conn.stream(StreamId(1)).is_none());
        assert!(conn.metrics.snapshot(StreamId(1)).is_none());
        assert!(conn.cursors.latest(StreamId(1)).is_none());
    }

    #[test]
    fn session_state_update_is_forwarded_once_connected() {
        let mut conn = ClientConnection::new(AdaptivePolicy::default());
        conn.begin_connecting().unwrap();
        conn.transport_ready(Instant::now()).unwrap();
        conn.handle_message(
            Instant::now(),
            ControlMessage::HelloResponse(HelloResponseMessage {
                accepted: true,
                reason: None,
                host_capabilities: Some(caps()),
                session_state: Some(SessionState::active()),
                data_port: Some(7000),
            }),
        );
        let mut locked = SessionState::active();
        locked.locked = true;
        let event =
            conn.handle_message(Instant::now(), ControlMessage::SessionStateUpdate(SessionStateUpdateMessage { state: locked }));
        assert!(matches!(event, ClientEvent::SessionStateChanged(s) if s.locked));
    }

    #[test]
    fn disconnect_clears_every_store() {
        let mut conn = ClientConnection::new(AdaptivePolicy::default());
        conn.stream_requested(StreamId(1));
        conn.cursors.update(StreamId(1), "arrow".to_string(), true);
        conn.disconnect("transport closed");
        assert!(conn.stream(StreamId(1)).is_none());
        assert!(conn.cursors.latest(StreamId(1)).is_none());
        assert!(matches!(conn.connection_state(), mirage_control::ConnectionState::Disconnected { .. }));
    }
}
