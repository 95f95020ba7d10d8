//! Handshake replay protection (spec.md §4.2: "a replay protector that
//! remembers `(keyID, timestampMs, nonce)` tuples for a bounded window and
//! rejects duplicates").
//!
//! Callers pass `now_ms` explicitly rather than the protector reading a
//! clock itself, so the window logic stays deterministic and testable.

use std::collections::VecDeque;

use crate::error::SecurityError;

struct SeenHello {
    key_id: Vec<u8>,
    timestamp_ms: u64,
    nonce: Vec<u8>,
}

pub struct ReplayProtector {
    window_ms: u64,
    max_entries: usize,
    seen: VecDeque<SeenHello>,
}

impl ReplayProtector {
    pub fn new(window_ms: u64, max_entries: usize) -> Self {
        Self { window_ms, max_entries, seen: VecDeque::with_capacity(max_entries.min(256)) }
    }

    /// Check `(key_id, timestamp_ms, nonce)` against the window anchored at
    /// `now_ms`, and record it if accepted. Rejects timestamps outside the
    /// window and exact tuple duplicates within it.
    pub fn check_and_record(
        &mut self,
        key_id: &[u8],
        timestamp_ms: u64,
        nonce: &[u8],
        now_ms: u64,
    ) -> Result<(), SecurityError> {
        let age = now_ms.saturating_sub(timestamp_ms);
        let skew = timestamp_ms.saturating_sub(now_ms);
        if age > self.window_ms || skew > self.window_ms {
            return Err(SecurityError::ReplayDetected);
        }

        while let Some(front) = self.seen.front() {
            if now_ms.saturating_sub(front.timestamp_ms) > self.window_ms {
                self.seen.pop_front();
            } else {
                break;
            }
        }

        let duplicate = self
            .seen
            .iter()
            .any(|entry| entry.key_id == key_id && entry.timestamp_ms == timestamp_ms && entry.nonce == nonce);
        if duplicate {
            return Err(SecurityError::ReplayDetected);
        }

        if self.seen.len() >= self.max_entries {
            self.seen.pop_front();
        }
        self.seen.push_back(SeenHello {
            key_id: key_id.to_vec(),
            timestamp_ms,
            nonce: nonce.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_first_occurrence_then_rejects_replay() {
        let mut protector = ReplayProtector::new(30_000, 64);
        assert!(protector.check_and_record(b"key-1", 1_000, b"nonce-a", 1_000).is_ok());
        assert!(matches!(
            protector.check_and_record(b"key-1", 1_000, b"nonce-a", 1_500),
            Err(SecurityError::ReplayDetected)
        ));
    }

    #[test]
    fn rejects_timestamp_outside_window() {
        let mut protector = ReplayProtector::new(5_000, 64);
        assert!(matches!(
            protector.check_and_record(b"key-1", 0, b"nonce-a", 10_000),
            Err(SecurityError::ReplayDetected)
        ));
    }

    #[test]
    fn evicts_entries_once_the_window_passes() {
        let mut protector = ReplayProtector::new(1_000, 64);
        assert!(protector.check_and_record(b"key-1", 0, b"nonce-a", 0).is_ok());
        // Same tuple, now far outside the window relative to `now_ms` —
        // rejected for staleness, not replay, and the old entry is pruned.
        assert!(protector.check_and_record(b"key-1", 0, b"nonce-a", 5_000).is_err());
        assert!(protector.seen.is_empty());
    }

    #[test]
    fn distinct_nonces_at_the_same_timestamp_do_not_collide() {
        let mut protector = ReplayProtector::new(30_000, 64);
        assert!(protector.check_and_record(b"key-1", 1_000, b"nonce-a", 1_000).is_ok());
        assert!(protector.check_and_record(b"key-1", 1_000, b"nonce-b", 1_000).is_ok());
    }
}
