//! Requested and resolved capture configurations

use crate::caps::{AudioCapabilitySet, VideoCapabilitySet};
use crate::catalog::DeviceId;
use crate::format::{frame_interval_from_fps, AudioFormat, VideoFormat};
use serde::{Deserialize, Serialize};

/// Default capacity of frame queues handed out by a device
pub const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 8;

/// Video configuration asked for by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedVideoConfig {
    /// Device to open; empty name and path select the first device
    pub device: DeviceId,
    /// Location identifier, preferred over the path when set
    pub location: Option<String>,
    /// Requested width in pixels
    pub width: u32,
    /// Requested height in pixels
    pub height: u32,
    /// Requested frame interval in 100ns units, `None` for the fastest rate
    pub frame_interval: Option<i64>,
    /// Format the hardware must produce
    pub internal_format: VideoFormat,
    /// Format delivered to the callback
    pub format: VideoFormat,
    /// Accept the device's native default mode and skip matching
    pub use_default: bool,
}

impl Default for RequestedVideoConfig {
    fn default() -> Self {
        Self {
            device: DeviceId::default(),
            location: None,
            width: 0,
            height: 0,
            frame_interval: None,
            internal_format: VideoFormat::Any,
            format: VideoFormat::Any,
            use_default: true,
        }
    }
}

impl RequestedVideoConfig {
    /// Explicit resolution request on the default device
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            use_default: false,
            ..Self::default()
        }
    }

    /// Request the device's native default mode
    pub fn device_default() -> Self {
        Self::default()
    }

    /// Select the device by identity
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = device;
        self
    }

    /// Select the device by physical location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Request a frame rate
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.frame_interval = Some(frame_interval_from_fps(fps));
        self
    }

    /// Request a frame interval in 100ns units
    pub fn with_frame_interval(mut self, frame_interval: i64) -> Self {
        self.frame_interval = Some(frame_interval);
        self
    }

    /// Request the format delivered to the callback
    pub fn with_format(mut self, format: VideoFormat) -> Self {
        self.format = format;
        self
    }

    /// Require the hardware to produce a specific format
    pub fn with_internal_format(mut self, format: VideoFormat) -> Self {
        self.internal_format = format;
        self
    }
}

/// Concrete video mode applied to the capture pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NegotiatedVideo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame interval in 100ns units
    pub frame_interval: i64,
    /// Format produced by the hardware
    pub format: VideoFormat,
}

/// Outcome of matching a video request against a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVideoConfig {
    /// Request as given by the caller
    pub request: RequestedVideoConfig,
    /// Capability the request was resolved against
    pub capability: Option<VideoCapabilitySet>,
    /// Mode to apply, `None` to keep the device default
    pub negotiated: Option<NegotiatedVideo>,
}

impl ResolvedVideoConfig {
    /// Format the callback receives
    pub fn output_format(&self) -> VideoFormat {
        match (self.request.format, self.negotiated) {
            (VideoFormat::Any, Some(mode)) => mode.format,
            (format, _) => format,
        }
    }

    /// Whether a conversion filter is needed between pin and sink
    pub fn needs_conversion(&self) -> bool {
        match self.negotiated {
            Some(mode) => {
                self.request.format != VideoFormat::Any && self.request.format != mode.format
            }
            None => false,
        }
    }
}

/// Where audio samples are taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioSource {
    /// A stand-alone audio capture device
    Device,
    /// The audio capture pin of the configured video device
    VideoDevicePin,
    /// The sibling audio filter belonging to the configured video device
    SeparateFilter,
}

/// What happens to captured audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioMode {
    /// Deliver samples to the callback
    Capture,
    /// Render through the DirectSound output endpoint
    DirectSound,
    /// Render through the waveOut output endpoint
    WaveOut,
}

/// Audio configuration asked for by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAudioConfig {
    /// Device to open when `source` is `Device`
    pub device: DeviceId,
    /// Where the samples come from
    pub source: AudioSource,
    /// Requested sample rate in Hz
    pub sample_rate: u32,
    /// Requested channel count
    pub channels: u32,
    /// Requested audio format
    pub format: AudioFormat,
    /// Capture to callback or render to an output endpoint
    pub mode: AudioMode,
    /// Accept the device's native default mode and skip matching
    pub use_default: bool,
}

impl Default for RequestedAudioConfig {
    fn default() -> Self {
        Self {
            device: DeviceId::default(),
            source: AudioSource::Device,
            sample_rate: 0,
            channels: 0,
            format: AudioFormat::Any,
            mode: AudioMode::Capture,
            use_default: true,
        }
    }
}

impl RequestedAudioConfig {
    /// Explicit request on the default audio device
    pub fn new(sample_rate: u32, channels: u32) -> Self {
        Self {
            sample_rate,
            channels,
            use_default: false,
            ..Self::default()
        }
    }

    /// Select the device by identity
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = device;
        self
    }

    /// Select where samples come from
    pub fn with_source(mut self, source: AudioSource) -> Self {
        self.source = source;
        self
    }

    /// Request an audio format
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Select capture or rendering
    pub fn with_mode(mut self, mode: AudioMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Concrete audio mode applied to the capture pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NegotiatedAudio {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u32,
    /// Format produced by the hardware
    pub format: AudioFormat,
}

/// Outcome of matching an audio request against a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAudioConfig {
    /// Request as given by the caller
    pub request: RequestedAudioConfig,
    /// Capability the request was resolved against
    pub capability: Option<AudioCapabilitySet>,
    /// Mode to apply, `None` to keep the device default
    pub negotiated: Option<NegotiatedAudio>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_video_defaults() {
        let config = RequestedVideoConfig::default();
        assert!(config.use_default);
        assert_eq!(config.format, VideoFormat::Any);
        assert!(config.device.is_unspecified());

        let config = RequestedVideoConfig::new(1280, 720)
            .with_fps(30.0)
            .with_format(VideoFormat::XRGB)
            .with_location("0000.0014.0000.002.002.000.000.000.000");
        assert!(!config.use_default);
        assert_eq!(config.frame_interval, Some(333_333));
        assert_eq!(
            config.location.as_deref(),
            Some("0000.0014.0000.002.002.000.000.000.000")
        );
    }

    #[test]
    fn test_output_format_and_conversion() {
        let resolved = ResolvedVideoConfig {
            request: RequestedVideoConfig::new(640, 480),
            capability: None,
            negotiated: Some(NegotiatedVideo {
                width: 640,
                height: 480,
                frame_interval: 333_333,
                format: VideoFormat::MJPEG,
            }),
        };
        assert_eq!(resolved.output_format(), VideoFormat::MJPEG);
        assert!(!resolved.needs_conversion());

        let converted = ResolvedVideoConfig {
            request: RequestedVideoConfig::new(640, 480).with_format(VideoFormat::XRGB),
            ..resolved
        };
        assert_eq!(converted.output_format(), VideoFormat::XRGB);
        assert!(converted.needs_conversion());
    }

    #[test]
    fn test_config_serializes() {
        let config = RequestedAudioConfig::new(48_000, 2).with_mode(AudioMode::WaveOut);
        let json = serde_json::to_string(&config).unwrap();
        let back: RequestedAudioConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
