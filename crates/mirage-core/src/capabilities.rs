use serde::{Deserialize, Serialize};

use crate::ids::DeviceId;

/// Icon hint advertised alongside `MirageHostCapabilities`, consumed by UI
/// layers (out of core scope) to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareIconHint {
    Desktop,
    Laptop,
    Server,
    Unknown,
}

/// Host hardware family, used for client-side UI and codec-ladder
/// decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareClass {
    pub family: String,
    pub icon_hint: HardwareIconHint,
    pub model_id: String,
    pub color: Option<String>,
}

/// Advertised capability set (spec.md §3 `MirageHostCapabilities`, §6
/// "Capability advertisement" text-record fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirageHostCapabilities {
    pub max_streams: u32,
    pub supports_hevc: bool,
    pub supports_p3_color_space: bool,
    pub max_frame_rate: u32,
    pub protocol_version: u32,
    pub device_id: DeviceId,
    pub identity_key_id: String,
    pub hardware_class: HardwareClass,
}

/// Current protocol version emitted by this implementation. Message types
/// are stable across versions (spec.md §4.1); this only gates handshake
/// feature negotiation.
pub const PROTOCOL_VERSION: u32 = 2;
