//! Metrics, cursor, and cursor-position stores (spec.md §2 component 10,
//! §4.12): thread-safe maps keyed by [`StreamId`], small critical sections
//! per spec.md §5 "Shared resources" (ii).

use std::collections::HashMap;
use std::sync::Mutex;

use mirage_core::{CursorPositionSnapshot, CursorSnapshot, QualityTestStageResult, StreamId};

/// Host-reported encode-side metrics (`streamMetricsUpdate`, spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostReportedMetrics {
    pub encoded_fps: f64,
    pub bitrate_bps: u64,
    pub rtt_ms: Option<f64>,
}

/// Client-observed decode/present-side metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientObservedMetrics {
    pub decoded_fps: f64,
    pub present_fps: f64,
    pub dropped_frames: u64,
}

/// Merged per-stream snapshot (spec.md §4.12: "`updateClientMetrics` and
/// `updateHostMetrics` merge into a single snapshot").
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamMetricsSnapshot {
    pub host: Option<HostReportedMetrics>,
    pub client: Option<ClientObservedMetrics>,
    pub last_quality_result: Option<QualityTestStageResult>,
}

#[derive(Default)]
struct MetricsMap {
    entries: HashMap<StreamId, StreamMetricsSnapshot>,
}

/// Thread-safe metrics map (spec.md §4.12, §5 "Metrics/cursor/position
/// stores: small critical sections; readers may hold the lock briefly").
pub struct MetricsStore {
    inner: Mutex<MetricsMap>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(MetricsMap::default()) }
    }

    pub fn update_host_metrics(&self, stream_id: StreamId, metrics: HostReportedMetrics) {
        let mut guard = self.inner.lock().expect("metrics store mutex poisoned");
        guard.entries.entry(stream_id).or_default().host = Some(metrics);
    }

    pub fn update_client_metrics(&self, stream_id: StreamId, metrics: ClientObservedMetrics) {
        let mut guard = self.inner.lock().expect("metrics store mutex poisoned");
        guard.entries.entry(stream_id).or_default().client = Some(metrics);
    }

    pub fn update_quality_result(&self, stream_id: StreamId, result: QualityTestStageResult) {
        let mut guard = self.inner.lock().expect("metrics store mutex poisoned");
        guard.entries.entry(stream_id).or_default().last_quality_result = Some(result);
    }

    pub fn snapshot(&self, stream_id: StreamId) -> Option<StreamMetricsSnapshot> {
        let guard = self.inner.lock().expect("metrics store mutex poisoned");
        guard.entries.get(&stream_id).copied()
    }

    /// Clear on stream stop (spec.md §4.12).
    pub fn clear(&self, stream_id: StreamId) {
        let mut guard = self.inner.lock().expect("metrics store mutex poisoned");
        guard.entries.remove(&stream_id);
    }

    /// Clear-all on disconnect (spec.md §4.12).
    pub fn clear_all(&self) {
        let mut guard = self.inner.lock().expect("metrics store mutex poisoned");
        guard.entries.clear();
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe cursor-shape store, deduplicated and sequenced per stream
/// (spec.md §4.12: "Cursor updates are deduplicated (same type+visible →
/// no change) and sequenced per stream").
pub struct CursorStore {
    inner: Mutex<HashMap<StreamId, CursorSnapshot>>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Applies an incoming `(cursor_type, visible)` pair, assigning the
    /// next sequence number only if it differs from the current snapshot.
    /// Returns `None` when the update is a no-op.
    pub fn update(&self, stream_id: StreamId, cursor_type: String, visible: bool) -> Option<CursorSnapshot> {
        let mut guard = self.inner.lock().expect("cursor store mutex poisoned");
        let next_sequence = guard.get(&stream_id).map(|s| s.sequence + 1).unwrap_or(0);
        if let Some(existing) = guard.get(&stream_id) {
            if existing.cursor_type == cursor_type && existing.visible == visible {
                return None;
            }
        }
        let snapshot = CursorSnapshot { stream_id, cursor_type, visible, sequence: next_sequence };
        guard.insert(stream_id, snapshot.clone());
        Some(snapshot)
    }

    pub fn latest(&self, stream_id: StreamId) -> Option<CursorSnapshot> {
        self.inner.lock().expect("cursor store mutex poisoned").get(&stream_id).cloned()
    }

    pub fn clear(&self, stream_id: StreamId) {
        self.inner.lock().expect("cursor store mutex poisoned").remove(&stream_id);
    }

    pub fn clear_all(&self) {
        self.inner.lock().expect("cursor store mutex poisoned").clear();
    }
}

impl Default for CursorStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe cursor-position store, monotonically sequenced per stream
/// (spec.md §3 `CursorPositionSnapshot`). Unlike [`CursorStore`], every
/// update is sequenced: position is a continuous signal, not a
/// discrete shape/visibility toggle.
pub struct PositionStore {
    inner: Mutex<HashMap<StreamId, CursorPositionSnapshot>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    pub fn update(&self, stream_id: StreamId, x: f64, y: f64) -> CursorPositionSnapshot {
        let mut guard = self.inner.lock().expect("position store mutex poisoned");
        let next_sequence = guard.get(&stream_id).map(|s| s.sequence + 1).unwrap_or(0);
        let snapshot = CursorPositionSnapshot { stream_id, x, y, sequence: next_sequence };
        guard.insert(stream_id, snapshot);
        snapshot
    }

    pub fn latest(&self, stream_id: StreamId) -> Option<CursorPositionSnapshot> {
        self.inner.lock().expect("position store mutex poisoned").get(&stream_id).copied()
    }

    pub fn clear(&self, stream_id: StreamId) {
        self.inner.lock().expect("position store mutex poisoned").remove(&stream_id);
    }

    pub fn clear_all(&self) {
        self.inner.lock().expect("position store mutex poisoned").clear();
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_merge_host_and_client_reports() {
        let store = MetricsStore::new();
        store.update_host_metrics(
            StreamId(1),
            HostReportedMetrics { encoded_fps: 119.5, bitrate_bps: 50_000_000, rtt_ms: Some(12.0) },
        );
        store.update_client_metrics(
            StreamId(1),
            ClientObservedMetrics { decoded_fps: 118.0, present_fps: 119.0, dropped_frames: 2 },
        );
        let snapshot = store.snapshot(StreamId(1)).unwrap();
        assert_eq!(snapshot.host.unwrap().encoded_fps, 119.5);
        assert_eq!(snapshot.client.unwrap().dropped_frames, 2);
    }

    #[test]
    fn metrics_clear_removes_only_that_stream() {
        let store = MetricsStore::new();
        store.update_host_metrics(StreamId(1), HostReportedMetrics { encoded_fps: 60.0, bitrate_bps: 1, rtt_ms: None });
        store.update_host_metrics(StreamId(2), HostReportedMetrics { encoded_fps: 60.0, bitrate_bps: 1, rtt_ms: None });
        store.clear(StreamId(1));
        assert!(store.snapshot(StreamId(1)).is_none());
        assert!(store.snapshot(StreamId(2)).is_some());
    }

    #[test]
    fn cursor_update_is_deduplicated_by_type_and_visibility() {
        let store = CursorStore::new();
        let first = store.update(StreamId(1), "arrow".to_string(), true).unwrap();
        assert_eq!(first.sequence, 0);
        assert!(store.update(StreamId(1), "arrow".to_string(), true).is_none());
        let second = store.update(StreamId(1), "ibeam".to_string(), true).unwrap();
        assert_eq!(second.sequence, 1);
    }

    #[test]
    fn position_updates_are_always_sequenced() {
        let store = PositionStore::new();
        let a = store.update(StreamId(1), 0.1, 0.2);
        let b = store.update(StreamId(1), 0.1, 0.2);
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
    }

    #[test]
    fn clear_all_empties_every_stream() {
        let store = CursorStore::new();
        store.update(StreamId(1), "arrow".to_string(), true);
        store.update(StreamId(2), "arrow".to_string(), true);
        store.clear_all();
        assert!(store.latest(StreamId(1)).is_none());
        assert!(store.latest(StreamId(2)).is_none());
    }
}
