use serde::{Deserialize, Serialize};

/// Hardware video codec negotiated for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
}

/// Pixel format ladder used by the adaptive-quality loop (spec.md §4.10).
/// Ordered coarsest-last: stepping down walks left-to-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Bgr10a2,
    Bgra8,
    P010,
    Nv12,
}

impl PixelFormat {
    /// Next coarser format in the degradation ladder, or `None` at the
    /// floor (`Nv12`). `Bgr10a2` and `Bgra8` both step to `P010` (same
    /// color-space class, spec.md §4.10: "first try a format step...
    /// preserving color space").
    pub fn step_down(self) -> Option<Self> {
        match self {
            PixelFormat::Bgr10a2 | PixelFormat::Bgra8 => Some(PixelFormat::P010),
            PixelFormat::P010 => Some(PixelFormat::Nv12),
            PixelFormat::Nv12 => None,
        }
    }

    /// Inverse of [`step_down`](Self::step_down), bounded by `baseline`:
    /// never restores past the stream's configured baseline format.
    pub fn step_up(self, baseline: PixelFormat) -> Option<Self> {
        let next = match self {
            PixelFormat::Nv12 => PixelFormat::P010,
            PixelFormat::P010 => baseline,
            PixelFormat::Bgr10a2 | PixelFormat::Bgra8 => return None,
        };
        if Self::rank(next) > Self::rank(baseline) {
            None
        } else {
            Some(next)
        }
    }

    fn rank(self) -> u8 {
        match self {
            PixelFormat::Bgr10a2 | PixelFormat::Bgra8 => 0,
            PixelFormat::P010 => 1,
            PixelFormat::Nv12 => 2,
        }
    }
}

/// Color space tag carried alongside pixel format steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Srgb,
    DisplayP3,
    Bt709,
}

/// Host-side encoder configuration for one stream (subset of `StreamContext`
/// per spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub codec: VideoCodec,
    pub pixel_format: PixelFormat,
    pub color_space: ColorSpace,
    pub quality: f32,
    pub key_frame_interval: u32,
    pub min_bitrate_bps: u64,
    pub max_bitrate_bps: u64,
    pub keyframe_quality: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            pixel_format: PixelFormat::Bgra8,
            color_space: ColorSpace::Srgb,
            quality: 0.8,
            key_frame_interval: 240,
            min_bitrate_bps: 2_000_000,
            max_bitrate_bps: 50_000_000,
            keyframe_quality: 0.9,
        }
    }
}
