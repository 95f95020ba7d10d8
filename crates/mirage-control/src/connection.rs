//! Client-view connection state machine (spec.md §4.8): `idle → connecting
//! → connected{host} → disconnected | error`.

use std::time::{Duration, Instant};

use mirage_core::policy::MANUAL_APPROVAL_TIMEOUT_MS;
use mirage_core::{MirageHostCapabilities, SessionState};

use crate::error::ControlError;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Idle,
    /// Transport is being established; `hello` has not necessarily been
    /// sent yet.
    Connecting,
    /// `hello` was sent and a manual-approval timer is running, waiting on
    /// `helloResponse`.
    AwaitingHelloResponse { deadline: Instant },
    Connected {
        host_capabilities: MirageHostCapabilities,
        session_state: SessionState,
        data_port: u16,
    },
    Disconnected { reason: String },
    Error { reason: String },
}

/// Drives [`ConnectionState`] transitions (spec.md §4.8 "Connection
/// states"). Holds no I/O itself — callers own the transport and feed
/// observed events in.
pub struct ConnectionMachine {
    state: ConnectionState,
}

impl ConnectionMachine {
    pub fn new() -> Self {
        Self { state: ConnectionState::Idle }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// `connect(host, transport)` → connecting (spec.md §4.8).
    pub fn begin_connecting(&mut self) -> Result<(), ControlError> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Disconnected { .. } | ConnectionState::Error { .. } => {
                self.state = ConnectionState::Connecting;
                Ok(())
            }
            _ => Err(ControlError::StateMismatch(format!(
                "cannot begin connecting from {:?}",
                self.state
            ))),
        }
    }

    /// Transport ready: send `hello` and start the manual-approval timer
    /// (spec.md §4.8: "1.5 s").
    pub fn transport_ready(&mut self, now: Instant) -> Result<(), ControlError> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::AwaitingHelloResponse {
                    deadline: now + Duration::from_millis(MANUAL_APPROVAL_TIMEOUT_MS),
                };
                Ok(())
            }
            _ => Err(ControlError::StateMismatch(format!(
                "transport_ready called outside Connecting ({:?})",
                self.state
            ))),
        }
    }

    pub fn hello_response_deadline_elapsed(&self, now: Instant) -> bool {
        matches!(self.state, ConnectionState::AwaitingHelloResponse { deadline } if now >= deadline)
    }

    /// `helloResponse.accepted` (spec.md §4.8).
    pub fn hello_accepted(
        &mut self,
        host_capabilities: MirageHostCapabilities,
        session_state: SessionState,
        data_port: u16,
    ) -> Result<(), ControlError> {
        match self.state {
            ConnectionState::AwaitingHelloResponse { .. } => {
                self.state = ConnectionState::Connected { host_capabilities, session_state, data_port };
                Ok(())
            }
            _ => Err(ControlError::StateMismatch(format!(
                "hello_accepted called outside AwaitingHelloResponse ({:?})",
                self.state
            ))),
        }
    }

    /// `helloResponse.rejected` or hello-response timeout → disconnected
    /// (spec.md §4.8).
    pub fn hello_rejected(&mut self, reason: impl Into<String>) {
        self.state = ConnectionState::Disconnected { reason: reason.into() };
    }

    pub fn update_session_state(&mut self, session_state: SessionState) -> Result<(), ControlError> {
        match &mut self.state {
            ConnectionState::Connected { session_state: current, .. } => {
                *current = session_state;
                Ok(())
            }
            _ => Err(ControlError::StateMismatch("not connected".to_string())),
        }
    }

    /// Any transport failure or explicit `disconnect` (spec.md §4.8):
    /// clears to `Disconnected`. Per-stream state, cursor/metric stores,
    /// and data-plane sockets are torn down by the caller, which owns
    /// those resources; this machine only records the connection-level
    /// transition.
    pub fn disconnect(&mut self, reason: impl Into<String>) {
        self.state = ConnectionState::Disconnected { reason: reason.into() };
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = ConnectionState::Error { reason: reason.into() };
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::{DeviceId, HardwareClass, HardwareIconHint};

    fn sample_caps() -> MirageHostCapabilities {
        MirageHostCapabilities {
            max_streams: 4,
            supports_hevc: true,
            supports_p3_color_space: true,
            max_frame_rate: 120,
            protocol_version: 2,
            device_id: DeviceId::new_random(),
            identity_key_id: "key-1".to_string(),
            hardware_class: HardwareClass {
                family: "mac".to_string(),
                icon_hint: HardwareIconHint::Laptop,
                model_id: "MacBookPro18,1".to_string(),
                color: None,
            },
        }
    }

    #[test]
    fn happy_path_reaches_connected() {
        let mut machine = ConnectionMachine::new();
        machine.begin_connecting().unwrap();
        machine.transport_ready(Instant::now()).unwrap();
        machine.hello_accepted(sample_caps(), SessionState::active(), 7879).unwrap();
        assert!(machine.is_connected());
    }

    #[test]
    fn rejection_goes_to_disconnected() {
        let mut machine = ConnectionMachine::new();
        machine.begin_connecting().unwrap();
        machine.transport_ready(Instant::now()).unwrap();
        machine.hello_rejected("identity rejected");
        assert!(matches!(machine.state(), ConnectionState::Disconnected { .. }));
    }

    #[test]
    fn hello_accepted_out_of_state_is_rejected() {
        let mut machine = ConnectionMachine::new();
        assert!(machine.hello_accepted(sample_caps(), SessionState::active(), 1).is_err());
    }

    #[test]
    fn approval_timer_expires_after_the_configured_deadline() {
        let mut machine = ConnectionMachine::new();
        machine.begin_connecting().unwrap();
        let start = Instant::now();
        machine.transport_ready(start).unwrap();
        assert!(!machine.hello_response_deadline_elapsed(start));
        assert!(machine.hello_response_deadline_elapsed(start + Duration::from_millis(MANUAL_APPROVAL_TIMEOUT_MS)));
    }
}
