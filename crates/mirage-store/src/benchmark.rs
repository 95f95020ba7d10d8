//! Persisted codec benchmark record (spec.md §6 "Persisted state": `{version,
//! width, height, frameRate, hostEncodeMs?, clientDecodeMs?, measuredAt}`,
//! "stored in a per-user cache path, not backed up, overwrite-atomically").

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, write_json_atomic};
use crate::error::StoreError;

/// One measured encode/decode pass for a given resolution and frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecBenchmarkRecord {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub host_encode_ms: Option<f64>,
    pub client_decode_ms: Option<f64>,
    /// Milliseconds since the Unix epoch.
    pub measured_at: u64,
}

impl CodecBenchmarkRecord {
    pub fn now(
        version: u32,
        width: u32,
        height: u32,
        frame_rate: u32,
        host_encode_ms: Option<f64>,
        client_decode_ms: Option<f64>,
    ) -> Self {
        let measured_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { version, width, height, frame_rate, host_encode_ms, client_decode_ms, measured_at }
    }
}

/// Resolves and persists the single benchmark record to a per-user cache
/// directory. Not backed up: lives under the OS cache root, not the
/// documents/config root `dirs` also exposes.
pub struct BenchmarkStore {
    path: PathBuf,
}

impl BenchmarkStore {
    /// Uses the platform cache directory (`dirs::cache_dir()`), namespaced
    /// under `mirage/`.
    pub fn default_location() -> Result<Self, StoreError> {
        let cache_dir = dirs::cache_dir().ok_or(StoreError::NoUserDirectory)?;
        Ok(Self::at_path(cache_dir.join("mirage").join("codec-benchmark.json")))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<CodecBenchmarkRecord>, StoreError> {
        read_json(&self.path)
    }

    pub fn save(&self, record: &CodecBenchmarkRecord) -> Result<(), StoreError> {
        write_json_atomic(&self.path, record)
    }
}
