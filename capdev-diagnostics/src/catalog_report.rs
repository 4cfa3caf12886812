//! Snapshot of what enumeration saw
//!
//! Quirky capture hardware is diagnosed from the catalog the host produced:
//! which devices showed up, which modes they claimed and whether their
//! audio and location could be resolved. A [`CatalogReport`] captures that
//! in a serializable form.

use crate::error::DiagnosticsResult;
use capdev_core::{
    fps_from_frame_interval, AudioCapabilitySet, AudioDeviceEntry, DeviceCatalogEntry,
    VideoCapabilitySet, VideoDeviceEntry,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report line for one enumerated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Display name
    pub name: String,
    /// Device path
    pub path: String,
    /// Physical location, if resolved
    pub location_id: Option<String>,
    /// Audio can be captured alongside this device
    pub has_attached_audio: bool,
    /// Audio comes from a sibling filter
    pub audio_is_separate_filter: bool,
    /// Human readable capability ranges, in device order
    pub modes: Vec<String>,
}

impl DeviceReport {
    fn from_entry<C>(entry: &DeviceCatalogEntry<C>, describe: impl Fn(&C) -> String) -> Self {
        Self {
            name: entry.id.name.clone(),
            path: entry.id.path.clone(),
            location_id: entry.location_id.clone(),
            has_attached_audio: entry.has_attached_audio,
            audio_is_separate_filter: entry.audio_is_separate_filter,
            modes: entry.capabilities.iter().map(describe).collect(),
        }
    }

    /// Whether the device reported no usable mode
    pub fn is_unusable(&self) -> bool {
        self.modes.is_empty()
    }
}

/// Device counts of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    /// Video devices found
    pub video_devices: usize,
    /// Audio devices found
    pub audio_devices: usize,
    /// Devices without any usable mode
    pub unusable: usize,
    /// Video devices whose location could not be resolved
    pub without_location: usize,
}

/// Serializable snapshot of a device catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogReport {
    /// When the snapshot was taken
    pub generated_at: DateTime<Utc>,
    /// Video devices in enumeration order
    pub video: Vec<DeviceReport>,
    /// Audio devices in enumeration order
    pub audio: Vec<DeviceReport>,
}

impl CatalogReport {
    /// Build a report from enumeration results
    pub fn from_entries(video: &[VideoDeviceEntry], audio: &[AudioDeviceEntry]) -> Self {
        Self {
            generated_at: Utc::now(),
            video: video
                .iter()
                .map(|entry| DeviceReport::from_entry(entry, describe_video))
                .collect(),
            audio: audio
                .iter()
                .map(|entry| DeviceReport::from_entry(entry, describe_audio))
                .collect(),
        }
    }

    /// Device counts
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            video_devices: self.video.len(),
            audio_devices: self.audio.len(),
            unusable: self
                .video
                .iter()
                .chain(self.audio.iter())
                .filter(|d| d.is_unusable())
                .count(),
            without_location: self.video.iter().filter(|d| d.location_id.is_none()).count(),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> DiagnosticsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report written by [`CatalogReport::to_json_pretty`]
    pub fn from_json(json: &str) -> DiagnosticsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn describe_video(caps: &VideoCapabilitySet) -> String {
    if caps.is_fixed() {
        return format!(
            "{}x{} {} @ {:.2} fps",
            caps.min_width,
            caps.min_height,
            caps.format,
            fps_from_frame_interval(caps.min_frame_interval)
        );
    }
    format!(
        "{}x{}..{}x{} step {}x{} {} @ {:.2}..{:.2} fps",
        caps.min_width,
        caps.min_height,
        caps.max_width,
        caps.max_height,
        caps.width_step,
        caps.height_step,
        caps.format,
        fps_from_frame_interval(caps.max_frame_interval),
        fps_from_frame_interval(caps.min_frame_interval)
    )
}

fn describe_audio(caps: &AudioCapabilitySet) -> String {
    if caps.min_channels == caps.max_channels && caps.min_sample_rate == caps.max_sample_rate {
        return format!("{} ch @ {} Hz {}", caps.min_channels, caps.min_sample_rate, caps.format);
    }
    format!(
        "{}..{} ch @ {}..{} Hz {}",
        caps.min_channels,
        caps.max_channels,
        caps.min_sample_rate,
        caps.max_sample_rate,
        caps.format
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use capdev_core::{AudioFormat, DeviceId, VideoFormat};

    fn catalog() -> (Vec<VideoDeviceEntry>, Vec<AudioDeviceEntry>) {
        let mut webcam = VideoDeviceEntry::new(
            DeviceId::new("HD Pro Webcam C920", "usb#cam#1"),
            vec![VideoCapabilitySet {
                min_width: 160,
                max_width: 1920,
                width_step: 8,
                min_height: 120,
                max_height: 1080,
                height_step: 8,
                min_frame_interval: 333_333,
                max_frame_interval: 2_000_000,
                format: VideoFormat::MJPEG,
            }],
        );
        webcam.location_id = Some("0000.0014.0000.002.002.000.000.000.000".to_string());

        let mut c875 = VideoDeviceEntry::new(
            DeviceId::new("AVerMedia HD Capture C875", "usb#c875#1"),
            vec![VideoCapabilitySet::fixed(1920, 1080, 166_833, VideoFormat::H264)],
        );
        c875.has_attached_audio = true;

        let empty = VideoDeviceEntry::new(DeviceId::new("No Modes", "empty#1"), Vec::new());
        let mic = AudioDeviceEntry::new(
            DeviceId::new("Microphone", "mic#1"),
            vec![AudioCapabilitySet::fixed(2, 48_000, AudioFormat::Wave16bit)],
        );
        (vec![webcam, c875, empty], vec![mic])
    }

    #[test]
    fn test_report_describes_modes() {
        let (video, audio) = catalog();
        let report = CatalogReport::from_entries(&video, &audio);

        assert_eq!(report.video[1].modes, vec!["1920x1080 H264 @ 59.94 fps".to_string()]);
        assert!(report.video[0].modes[0].starts_with("160x120..1920x1080 step 8x8"));
        assert!(report.video[0].modes[0].ends_with("5.00..30.00 fps"));
        assert_eq!(report.audio[0].modes.len(), 1);
        assert!(report.audio[0].modes[0].starts_with("2 ch @ 48000 Hz"));
    }

    #[test]
    fn test_summary_counts() {
        let (video, audio) = catalog();
        let summary = CatalogReport::from_entries(&video, &audio).summary();
        assert_eq!(
            summary,
            CatalogSummary {
                video_devices: 3,
                audio_devices: 1,
                unusable: 1,
                without_location: 2,
            }
        );
    }

    #[test]
    fn test_json_output_parses_back() {
        let (video, audio) = catalog();
        let report = CatalogReport::from_entries(&video, &audio);
        let json = report.to_json_pretty().unwrap();
        assert!(json.contains("\"generated_at\""));
        assert!(json.contains("AVerMedia HD Capture C875"));

        let back = CatalogReport::from_json(&json).unwrap();
        assert_eq!(back, report);
    }
}
