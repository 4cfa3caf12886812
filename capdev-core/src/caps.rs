//! Capability sets describing what a capture pin can produce

use crate::error::{CaptureError, CaptureResult};
use crate::format::{AudioFormat, VideoFormat};
use serde::{Deserialize, Serialize};

/// Supported video ranges of one capture pin media type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoCapabilitySet {
    /// Minimum frame width in pixels
    pub min_width: u32,
    /// Maximum frame width in pixels
    pub max_width: u32,
    /// Width granularity
    pub width_step: u32,
    /// Minimum frame height in pixels
    pub min_height: u32,
    /// Maximum frame height in pixels
    pub max_height: u32,
    /// Height granularity
    pub height_step: u32,
    /// Shortest frame interval (fastest rate), 100ns units
    pub min_frame_interval: i64,
    /// Longest frame interval (slowest rate), 100ns units
    pub max_frame_interval: i64,
    /// Format produced by the pin
    pub format: VideoFormat,
}

impl VideoCapabilitySet {
    /// A single discrete mode, as exposed by encoded exception devices
    pub fn fixed(width: u32, height: u32, frame_interval: i64, format: VideoFormat) -> Self {
        Self {
            min_width: width,
            max_width: width,
            width_step: 1,
            min_height: height,
            max_height: height,
            height_step: 1,
            min_frame_interval: frame_interval,
            max_frame_interval: frame_interval,
            format,
        }
    }

    /// Whether every ranged field collapses to a single value
    pub fn is_fixed(&self) -> bool {
        self.min_width == self.max_width
            && self.min_height == self.max_height
            && self.min_frame_interval == self.max_frame_interval
    }

    /// Check the range invariants
    pub fn validate(&self) -> CaptureResult<()> {
        if self.min_width > self.max_width || self.min_height > self.max_height {
            return Err(CaptureError::InvalidCapability {
                message: format!(
                    "inverted resolution range {}x{}..{}x{}",
                    self.min_width, self.min_height, self.max_width, self.max_height
                ),
            });
        }
        if self.width_step == 0 || self.height_step == 0 {
            return Err(CaptureError::InvalidCapability {
                message: "granularity must be at least 1".to_string(),
            });
        }
        if self.min_frame_interval > self.max_frame_interval {
            return Err(CaptureError::InvalidCapability {
                message: format!(
                    "inverted frame interval range {}..{}",
                    self.min_frame_interval, self.max_frame_interval
                ),
            });
        }
        Ok(())
    }

    /// Round a width down to the nearest valid step, `None` outside the range
    pub fn snap_width(&self, width: u32) -> Option<u32> {
        snap(width, self.min_width, self.max_width, self.width_step)
    }

    /// Round a height down to the nearest valid step, `None` outside the range
    pub fn snap_height(&self, height: u32) -> Option<u32> {
        snap(height, self.min_height, self.max_height, self.height_step)
    }

    /// Whether a frame interval lies within the supported range
    pub fn contains_interval(&self, frame_interval: i64) -> bool {
        frame_interval >= self.min_frame_interval && frame_interval <= self.max_frame_interval
    }

    /// Whether the exact mode is producible without rounding
    pub fn contains(&self, width: u32, height: u32, frame_interval: i64) -> bool {
        self.snap_width(width) == Some(width)
            && self.snap_height(height) == Some(height)
            && self.contains_interval(frame_interval)
    }
}

/// Supported audio ranges of one capture pin media type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioCapabilitySet {
    /// Minimum channel count
    pub min_channels: u32,
    /// Maximum channel count
    pub max_channels: u32,
    /// Channel count granularity
    pub channels_step: u32,
    /// Minimum sample rate in Hz
    pub min_sample_rate: u32,
    /// Maximum sample rate in Hz
    pub max_sample_rate: u32,
    /// Sample rate granularity
    pub sample_rate_step: u32,
    /// Format produced by the pin
    pub format: AudioFormat,
}

impl AudioCapabilitySet {
    /// A single discrete mode
    pub fn fixed(channels: u32, sample_rate: u32, format: AudioFormat) -> Self {
        Self {
            min_channels: channels,
            max_channels: channels,
            channels_step: 1,
            min_sample_rate: sample_rate,
            max_sample_rate: sample_rate,
            sample_rate_step: 1,
            format,
        }
    }

    /// Check the range invariants
    pub fn validate(&self) -> CaptureResult<()> {
        if self.min_channels > self.max_channels || self.min_sample_rate > self.max_sample_rate {
            return Err(CaptureError::InvalidCapability {
                message: format!(
                    "inverted audio range {}ch@{}..{}ch@{}",
                    self.min_channels, self.min_sample_rate, self.max_channels, self.max_sample_rate
                ),
            });
        }
        if self.channels_step == 0 || self.sample_rate_step == 0 {
            return Err(CaptureError::InvalidCapability {
                message: "granularity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Round a channel count down to the nearest valid step
    pub fn snap_channels(&self, channels: u32) -> Option<u32> {
        snap(channels, self.min_channels, self.max_channels, self.channels_step)
    }

    /// Round a sample rate down to the nearest valid step
    pub fn snap_sample_rate(&self, sample_rate: u32) -> Option<u32> {
        snap(
            sample_rate,
            self.min_sample_rate,
            self.max_sample_rate,
            self.sample_rate_step,
        )
    }
}

fn snap(value: u32, min: u32, max: u32, step: u32) -> Option<u32> {
    if value < min || value > max {
        return None;
    }
    let step = step.max(1);
    Some(min + (value - min) / step * step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webcam() -> VideoCapabilitySet {
        VideoCapabilitySet {
            min_width: 640,
            max_width: 1920,
            width_step: 8,
            min_height: 480,
            max_height: 1080,
            height_step: 8,
            min_frame_interval: 166_666,
            max_frame_interval: 666_666,
            format: VideoFormat::YUY2,
        }
    }

    #[test]
    fn test_snap_rounds_down_within_range() {
        let caps = webcam();
        assert_eq!(caps.snap_width(1283), Some(1280));
        assert_eq!(caps.snap_width(640), Some(640));
        assert_eq!(caps.snap_width(1920), Some(1920));
        assert_eq!(caps.snap_width(600), None);
        assert_eq!(caps.snap_width(2000), None);
    }

    #[test]
    fn test_contains() {
        let caps = webcam();
        assert!(caps.contains(1280, 720, 333_333));
        assert!(!caps.contains(1281, 720, 333_333));
        assert!(!caps.contains(1280, 720, 100_000));
    }

    #[test]
    fn test_fixed_caps() {
        let caps = VideoCapabilitySet::fixed(1920, 1080, 166_833, VideoFormat::H264);
        assert!(caps.is_fixed());
        assert!(caps.validate().is_ok());
        assert!(caps.contains(1920, 1080, 166_833));
        assert!(!webcam().is_fixed());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut caps = webcam();
        caps.width_step = 0;
        assert!(caps.validate().is_err());

        let mut caps = webcam();
        caps.min_frame_interval = 1_000_000;
        assert!(caps.validate().is_err());

        let audio = AudioCapabilitySet {
            min_channels: 2,
            max_channels: 1,
            channels_step: 1,
            min_sample_rate: 8000,
            max_sample_rate: 48000,
            sample_rate_step: 1,
            format: AudioFormat::Wave16bit,
        };
        assert!(audio.validate().is_err());
    }

    #[test]
    fn test_audio_snap() {
        let audio = AudioCapabilitySet {
            min_channels: 1,
            max_channels: 2,
            channels_step: 1,
            min_sample_rate: 8000,
            max_sample_rate: 48000,
            sample_rate_step: 100,
            format: AudioFormat::Wave16bit,
        };
        assert_eq!(audio.snap_sample_rate(44_150), Some(44_100));
        assert_eq!(audio.snap_channels(3), None);
        assert!(AudioCapabilitySet::fixed(2, 48_000, AudioFormat::AAC).validate().is_ok());
    }
}
