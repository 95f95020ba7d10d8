use serde::{Deserialize, Serialize};

use crate::ids::StreamId;

/// Cursor shape/visibility state for one stream, monotonically sequenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorSnapshot {
    pub stream_id: StreamId,
    pub cursor_type: String,
    pub visible: bool,
    pub sequence: u64,
}

/// Cursor pointer position for one stream, in normalised `[0.0, 1.0]`
/// coordinates, monotonically sequenced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPositionSnapshot {
    pub stream_id: StreamId,
    pub x: f64,
    pub y: f64,
    pub sequence: u64,
}
