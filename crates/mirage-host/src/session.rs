//! Host session: the set of connected clients and session-state broadcast
//! (spec.md §3 `SessionState`: "broadcast to all clients on change").

use std::collections::HashMap;

use mirage_core::{DeviceId, SessionState};

use crate::client_context::ClientContext;

/// Owns every connected client's [`ClientContext`] and the host's current
/// OS session state.
pub struct HostSession {
    session_state: SessionState,
    clients: HashMap<DeviceId, ClientContext>,
}

impl HostSession {
    pub fn new() -> Self {
        Self { session_state: SessionState::default(), clients: HashMap::new() }
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn connect_client(&mut self, device_id: DeviceId) -> &mut ClientContext {
        self.clients.entry(device_id).or_insert_with(|| ClientContext::new(device_id))
    }

    pub fn client(&self, device_id: DeviceId) -> Option<&ClientContext> {
        self.clients.get(&device_id)
    }

    pub fn client_mut(&mut self, device_id: DeviceId) -> Option<&mut ClientContext> {
        self.clients.get_mut(&device_id)
    }

    pub fn disconnect_client(&mut self, device_id: DeviceId) {
        self.clients.remove(&device_id);
    }

    pub fn connected_clients(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.clients.keys().copied()
    }

    /// Updates the session state and returns every connected client that
    /// needs a `sessionStateUpdate` (i.e. all of them, since the state is
    /// shared); returns an empty vec if the state did not actually change.
    pub fn update_session_state(&mut self, new_state: SessionState) -> Vec<DeviceId> {
        if new_state == self.session_state {
            return Vec::new();
        }
        self.session_state = new_state;
        self.clients.keys().copied().collect()
    }
}

impl Default for HostSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_change_notifies_every_connected_client() {
        let mut session = HostSession::new();
        let a = DeviceId::new_random();
        let b = DeviceId::new_random();
        session.connect_client(a);
        session.connect_client(b);

        let targets = session.update_session_state(SessionState::locked_screen());
        assert_eq!(targets.len(), 2);
        assert_eq!(session.session_state(), SessionState::locked_screen());
    }

    #[test]
    fn unchanged_state_notifies_nobody() {
        let mut session = HostSession::new();
        session.connect_client(DeviceId::new_random());
        assert!(session.update_session_state(SessionState::active()).is_empty());
    }

    #[test]
    fn disconnecting_a_client_drops_its_context() {
        let mut session = HostSession::new();
        let a = DeviceId::new_random();
        session.connect_client(a);
        session.disconnect_client(a);
        assert!(session.client(a).is_none());
    }
}
