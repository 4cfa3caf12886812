//! # capdev - Capture Device Abstraction
//!
//! capdev discovers audio/video capture hardware exposed by the host's media
//! subsystem, matches a requested configuration against what each device
//! supports and drives the capture pipeline that delivers timestamped frames
//! to a callback.
//!
//! ## Key Features
//!
//! - **Accurate catalogs**: encoded capture cards are described from a quirk
//!   table instead of their bogus raw modes
//! - **Identical models**: devices are told apart by physical location
//! - **Safe lifecycle**: partial failures roll back, teardown is total
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use capdev::{Capdev, RequestedVideoConfig, SimulatedHost};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let capdev = Capdev::init()?;
//!     let mut device = capdev.simulated_device(Arc::new(SimulatedHost::new()));
//!
//!     for entry in device.enumerate_video_devices()? {
//!         println!("{} ({} modes)", entry.name(), entry.capabilities.len());
//!     }
//!
//!     let request = RequestedVideoConfig::new(1280, 720).with_fps(30.0);
//!     let mut frames = device.start_video_queue(request)?;
//!     while let Some(frame) = frames.recv().await {
//!         println!("{} bytes at {}", frame.data.len(), frame.start_time);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use capdev_core::{
    fps_from_frame_interval, frame_interval_from_fps, AudioCapabilitySet, AudioDeviceEntry,
    AudioFormat, AudioMode, AudioSource, CaptureError, CaptureResult, DeviceCatalogEntry,
    DeviceCategory, DeviceId, DeviceRegistry, ErrorCategory, GraphState, HostError, HostResult,
    InstanceRecord, MediaFramework, NegotiatedAudio, NegotiatedVideo, RawDevice, RawSample,
    RequestedAudioConfig, RequestedVideoConfig, ResolvedAudioConfig, ResolvedVideoConfig,
    ResultCode, SampleSink, StreamKind, VideoCapabilitySet, VideoDeviceEntry, VideoFormat,
    WindowHandle, DEFAULT_FRAME_QUEUE_CAPACITY,
};

#[cfg(feature = "media")]
pub use capdev_media::{
    frame_queue, match_audio, match_video, select_device, AudioCallback, CaptureGraph, Device,
    DeviceEnumerator, DeviceOptions, DialogKind, DispatchStats, Fault, Frame, FrameReceiver,
    NoMatch, OwnedFrame, QuirkTable, SimulatedDevice, SimulatedHost, VideoCallback,
};

#[cfg(feature = "diagnostics")]
pub use capdev_diagnostics::{CatalogReport, CatalogSummary, DebugLogger, DiagnosticsError};

// Public API modules
pub mod config;

// Re-export main API types
pub use config::CaptureSettings;
#[cfg(feature = "media")]
pub use config::WithSettings;

#[cfg(feature = "media")]
use std::sync::Arc;

/// Main entry point for capdev
#[derive(Debug, Clone)]
pub struct Capdev {
    settings: CaptureSettings,
}

impl Capdev {
    /// Initialize capdev with default settings
    pub fn init() -> CaptureResult<Self> {
        Self::init_with(CaptureSettings::default())
    }

    /// Initialize with custom settings
    ///
    /// Installs the logging subscriber when `debug_logging` or `log_filter`
    /// asks for it and the diagnostics feature is enabled.
    pub fn init_with(settings: CaptureSettings) -> CaptureResult<Self> {
        settings.validate()?;

        #[cfg(feature = "diagnostics")]
        if settings.debug_logging || settings.log_filter.is_some() {
            let filter = settings
                .log_filter
                .as_deref()
                .unwrap_or_else(|| DebugLogger::default_filter(settings.debug_logging));
            DebugLogger::init_logging(filter).map_err(|e| CaptureError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        }

        tracing::debug!("capdev initialized with {:?}", settings);
        Ok(Self { settings })
    }

    /// Active settings
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Open a device instance on the given host collaborators
    #[cfg(feature = "media")]
    pub fn device(
        &self,
        framework: Arc<dyn MediaFramework>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Device {
        Device::new(framework, registry).with_settings(&self.settings)
    }

    /// Open a device instance on an in-memory host
    #[cfg(feature = "media")]
    pub fn simulated_device(&self, host: Arc<SimulatedHost>) -> Device {
        Device::simulated(host).with_settings(&self.settings)
    }

    /// Enumerate both categories and snapshot the result
    #[cfg(all(feature = "media", feature = "diagnostics"))]
    pub fn catalog_report(&self, device: &Device) -> CaptureResult<CatalogReport> {
        let video = device.enumerate_video_devices()?;
        let audio = device.enumerate_audio_devices()?;
        Ok(CatalogReport::from_entries(&video, &audio))
    }
}
