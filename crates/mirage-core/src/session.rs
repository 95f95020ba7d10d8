use serde::{Deserialize, Serialize};

/// Host OS session state (spec.md §3 `SessionState`). Updated by the
/// OS-session monitor (out of core scope) and broadcast to all clients on
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub active: bool,
    pub locked: bool,
    pub logged_out: bool,
    pub sleeping: bool,
    pub switched_out: bool,
}

impl SessionState {
    pub const fn active() -> Self {
        Self {
            active: true,
            locked: false,
            logged_out: false,
            sleeping: false,
            switched_out: false,
        }
    }

    pub const fn locked_screen() -> Self {
        Self {
            active: true,
            locked: true,
            logged_out: false,
            sleeping: false,
            switched_out: false,
        }
    }

    /// Which [`StreamKind`] is permitted given this session state.
    pub fn permitted_stream_kind(&self) -> Option<StreamKind> {
        if self.sleeping || self.logged_out {
            return None;
        }
        if self.locked {
            return Some(StreamKind::LoginDisplay);
        }
        if self.active && !self.switched_out {
            return Some(StreamKind::Regular);
        }
        None
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::active()
    }
}

/// Kind of stream permitted under a given [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    Regular,
    LoginDisplay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_session_only_permits_login_display() {
        assert_eq!(
            SessionState::locked_screen().permitted_stream_kind(),
            Some(StreamKind::LoginDisplay)
        );
    }

    #[test]
    fn sleeping_permits_nothing() {
        let mut s = SessionState::active();
        s.sleeping = true;
        assert_eq!(s.permitted_stream_kind(), None);
    }

    #[test]
    fn switched_out_blocks_regular_streams() {
        let mut s = SessionState::active();
        s.switched_out = true;
        assert_eq!(s.permitted_stream_kind(), None);
    }
}
