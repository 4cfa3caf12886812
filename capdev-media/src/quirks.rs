//! Static descriptions of encoded-output capture hardware
//!
//! Some capture cards do not expose a standard video capture pin and cannot be
//! queried generically. They produce one fixed encoded mode, so enumeration
//! synthesizes their capability from this table instead.

use capdev_core::{
    AudioCapabilitySet, AudioFormat, NegotiatedAudio, NegotiatedVideo, VideoCapabilitySet,
    VideoFormat,
};

/// Fixed output of an encoded capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedDevice {
    /// Short description used in logs
    pub label: &'static str,
    /// Encoding of the video stream
    pub video_format: VideoFormat,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// 100ns units
    pub frame_interval: i64,
    /// Encoding of the audio stream
    pub audio_format: AudioFormat,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u32,
}

impl EncodedDevice {
    /// The single discrete video mode
    pub fn video_caps(&self) -> VideoCapabilitySet {
        VideoCapabilitySet::fixed(self.width, self.height, self.frame_interval, self.video_format)
    }

    /// The single discrete audio mode
    pub fn audio_caps(&self) -> AudioCapabilitySet {
        AudioCapabilitySet::fixed(self.channels, self.sample_rate, self.audio_format)
    }

    /// Video mode the device always runs in
    pub fn video_mode(&self) -> NegotiatedVideo {
        NegotiatedVideo {
            width: self.width,
            height: self.height,
            frame_interval: self.frame_interval,
            format: self.video_format,
        }
    }

    /// Audio mode the device always runs in
    pub fn audio_mode(&self) -> NegotiatedAudio {
        NegotiatedAudio {
            sample_rate: self.sample_rate,
            channels: self.channels,
            format: self.audio_format,
        }
    }
}

pub const HD_PVR1: EncodedDevice = EncodedDevice {
    label: "Hauppauge HD PVR",
    video_format: VideoFormat::H264,
    width: 1920,
    height: 1080,
    frame_interval: 333_667,
    audio_format: AudioFormat::AAC,
    sample_rate: 48_000,
    channels: 2,
};

pub const HD_PVR2: EncodedDevice = EncodedDevice {
    label: "Hauppauge HD PVR 2",
    frame_interval: 166_833,
    ..HD_PVR1
};

pub const ROXIO: EncodedDevice = EncodedDevice {
    label: "Roxio Game Capture",
    frame_interval: 166_833,
    ..HD_PVR1
};

pub const AV_LGP: EncodedDevice = EncodedDevice {
    label: "AVerMedia Live Gamer Portable",
    frame_interval: 166_833,
    ..HD_PVR1
};

/// Name substring that identifies an encoded device
#[derive(Debug, Clone, Copy)]
pub struct NameQuirk {
    pub pattern: &'static str,
    pub device: EncodedDevice,
}

/// Output pin name that identifies an encoded device lacking a capture pin
#[derive(Debug, Clone, Copy)]
pub struct PinQuirk {
    pub pin_name: &'static str,
    pub device: EncodedDevice,
}

/// Immutable lookup of known exception devices
#[derive(Debug, Clone, Copy)]
pub struct QuirkTable {
    names: &'static [NameQuirk],
    pins: &'static [PinQuirk],
}

static NAME_QUIRKS: &[NameQuirk] = &[
    NameQuirk {
        pattern: "C875",
        device: AV_LGP,
    },
    NameQuirk {
        pattern: "Prif Streambox",
        device: AV_LGP,
    },
    NameQuirk {
        pattern: "C835",
        device: AV_LGP,
    },
    NameQuirk {
        pattern: "Hauppauge HD PVR Capture",
        device: HD_PVR1,
    },
];

static PIN_QUIRKS: &[PinQuirk] = &[
    PinQuirk {
        pin_name: "656",
        device: HD_PVR2,
    },
    PinQuirk {
        pin_name: "TS Out",
        device: ROXIO,
    },
];

static BUILTIN: QuirkTable = QuirkTable {
    names: NAME_QUIRKS,
    pins: PIN_QUIRKS,
};

static EMPTY: QuirkTable = QuirkTable {
    names: &[],
    pins: &[],
};

impl QuirkTable {
    /// Table of all known exception devices
    pub fn builtin() -> &'static QuirkTable {
        &BUILTIN
    }

    /// Table that matches nothing
    pub fn empty() -> &'static QuirkTable {
        &EMPTY
    }

    /// Encoded description for a device name, first matching pattern wins
    pub fn match_name(&self, device_name: &str) -> Option<&EncodedDevice> {
        self.names
            .iter()
            .find(|quirk| device_name.contains(quirk.pattern))
            .map(|quirk| &quirk.device)
    }

    /// Exception pins to try, in priority order
    pub fn pin_quirks(&self) -> &[PinQuirk] {
        self.pins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_patterns() {
        let table = QuirkTable::builtin();
        assert_eq!(table.match_name("AVerMedia C875 USB").map(|d| d.label), Some(AV_LGP.label));
        assert_eq!(
            table.match_name("Hauppauge HD PVR Capture Device").map(|d| d.label),
            Some(HD_PVR1.label)
        );
        assert!(table.match_name("Integrated Webcam").is_none());
        assert!(QuirkTable::empty().match_name("C875").is_none());
    }

    #[test]
    fn test_encoded_caps_are_fixed() {
        let name_quirks = NAME_QUIRKS.iter().map(|q| q.device);
        for quirk in name_quirks.chain(PIN_QUIRKS.iter().map(|q| q.device)) {
            let caps = quirk.video_caps();
            assert!(caps.is_fixed());
            assert_eq!(caps.width_step, 1);
            assert_eq!(caps.height_step, 1);
            assert!(caps.validate().is_ok());
            assert!(quirk.audio_caps().validate().is_ok());
        }
    }

    #[test]
    fn test_pin_quirk_order() {
        let names: Vec<_> = QuirkTable::builtin()
            .pin_quirks()
            .iter()
            .map(|q| q.pin_name)
            .collect();
        assert_eq!(names, vec!["656", "TS Out"]);
    }
}
