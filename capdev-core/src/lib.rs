//! # capdev core
//!
//! Data model, error taxonomy and host collaborator traits shared by the
//! capdev crates. Everything in here is plain data or a trait seam; the
//! behavior lives in `capdev-media`.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod caps;
pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod host;
pub mod state;

// Re-export main types
pub use caps::{AudioCapabilitySet, VideoCapabilitySet};
pub use catalog::{AudioDeviceEntry, DeviceCatalogEntry, DeviceId, VideoDeviceEntry};
pub use config::{
    AudioMode, AudioSource, NegotiatedAudio, NegotiatedVideo, RequestedAudioConfig,
    RequestedVideoConfig, ResolvedAudioConfig, ResolvedVideoConfig, DEFAULT_FRAME_QUEUE_CAPACITY,
};
pub use error::{CaptureError, CaptureResult, ErrorCategory, ResultCode};
pub use format::{
    fps_from_frame_interval, frame_interval_from_fps, AudioFormat, VideoFormat,
    INTERVAL_UNITS_PER_SECOND,
};
pub use host::{
    ConnectionId, DeviceCategory, DeviceRegistry, FilterId, GraphId, HostError, HostResult,
    InstanceRecord, MediaFramework, PinCategory, PinDirection, PinId, PinQuery, PropertyTarget,
    RawDevice, RawSample, Route, SampleSink, WindowHandle, CAMERA_INTERFACE_CLASS,
};
pub use state::{GraphState, StreamKind};
