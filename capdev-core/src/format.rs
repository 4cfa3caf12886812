//! Video and audio sample formats
//!
//! Formats are shared by the capability model, requested configurations and
//! the frames handed to callbacks. Frame intervals are expressed in 100ns
//! units, the native time base of the capture framework.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of 100ns units in one second
pub const INTERVAL_UNITS_PER_SECOND: i64 = 10_000_000;

/// Pixel or encoding format of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoFormat {
    /// Wildcard, only meaningful in a request
    Any,
    /// Format reported by the device but not understood
    Unknown,
    /// 32-bit ARGB
    ARGB,
    /// 32-bit RGB with unused alpha
    XRGB,
    /// Planar 4:2:0
    I420,
    /// Semi-planar 4:2:0
    NV12,
    /// Planar 4:2:0, V before U
    YV12,
    /// 8-bit greyscale
    Y800,
    /// Packed 4:2:2, YVYU order
    YVYU,
    /// Packed 4:2:2, YUYV order
    YUY2,
    /// Packed 4:2:2, UYVY order
    UYVY,
    /// Packed 4:2:2, UYVY with BT.709 colorimetry
    HDYC,
    /// Motion JPEG
    MJPEG,
    /// H.264 elementary stream
    H264,
}

impl VideoFormat {
    /// Whether the format carries compressed samples
    pub fn is_compressed(&self) -> bool {
        matches!(self, VideoFormat::MJPEG | VideoFormat::H264)
    }

    /// Whether a request for `self` is satisfied by hardware producing `actual`
    pub fn accepts(&self, actual: VideoFormat) -> bool {
        *self == VideoFormat::Any || *self == actual
    }

    /// Whether the framework can convert `self` into `target` with a
    /// conversion filter. Compressed output is never synthesized.
    pub fn converts_to(&self, target: VideoFormat) -> bool {
        if target == VideoFormat::Any || *self == target {
            return true;
        }
        *self != VideoFormat::Unknown && !target.is_compressed() && target != VideoFormat::Unknown
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Encoding of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    /// Wildcard, only meaningful in a request
    Any,
    /// Format reported by the device but not understood
    Unknown,
    /// 16-bit PCM
    Wave16bit,
    /// 32-bit float PCM
    WaveFloat,
    /// AAC
    AAC,
    /// Dolby AC-3
    AC3,
    /// MPEG audio
    MPGA,
}

impl AudioFormat {
    /// Whether the format carries compressed samples
    pub fn is_compressed(&self) -> bool {
        matches!(self, AudioFormat::AAC | AudioFormat::AC3 | AudioFormat::MPGA)
    }

    /// Whether a request for `self` is satisfied by hardware producing `actual`
    pub fn accepts(&self, actual: AudioFormat) -> bool {
        *self == AudioFormat::Any || *self == actual
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Convert a frame rate into a frame interval in 100ns units
pub fn frame_interval_from_fps(fps: f64) -> i64 {
    if fps <= 0.0 {
        return 0;
    }
    (INTERVAL_UNITS_PER_SECOND as f64 / fps) as i64
}

/// Convert a frame interval in 100ns units into a frame rate
pub fn fps_from_frame_interval(interval: i64) -> f64 {
    if interval <= 0 {
        return 0.0;
    }
    INTERVAL_UNITS_PER_SECOND as f64 / interval as f64
}
