//! Host collaborator seams
//!
//! The native filter/pin primitives and the device-instance registry belong
//! to the platform. capdev only talks to them through the two traits in this
//! module: [`MediaFramework`] for graph building and sample delivery, and
//! [`DeviceRegistry`] for physical location lookups. Native objects are
//! referred to by opaque ids; the host owns the objects behind them.

use crate::caps::{AudioCapabilitySet, VideoCapabilitySet};
use crate::config::{AudioMode, NegotiatedAudio, NegotiatedVideo};
use crate::format::VideoFormat;
use crate::state::StreamKind;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Device interface class of cameras, used for location lookups
pub const CAMERA_INTERFACE_CLASS: &str = "{65e8773d-8f56-11d0-a3b9-00a0c9223196}";

/// Failure reported by a host collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A native call returned a failure code
    #[error("{operation} failed (code {code:#010x})")]
    Failed {
        /// Native operation that failed
        operation: String,
        /// Native result code
        code: i32,
    },

    /// The device is held exclusively by another client
    #[error("device is in use by another application")]
    InUse,

    /// A referenced native object does not exist
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing object
        what: String,
    },
}

impl HostError {
    /// Failure of a native operation with its result code
    pub fn failed(operation: impl Into<String>, code: i32) -> Self {
        HostError::Failed {
            operation: operation.into(),
            code,
        }
    }

    /// Missing native object
    pub fn not_found(what: impl Into<String>) -> Self {
        HostError::NotFound { what: what.into() }
    }
}

/// Result type alias for host calls
pub type HostResult<T> = Result<T, HostError>;

/// Native graph builder object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(pub u64);

/// Native filter object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(pub u64);

/// Pin of a native filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinId(pub u64);

/// Established pin-to-sink connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Native window handle used as a property page owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Device category walked during enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCategory {
    /// Video input devices
    Video,
    /// Audio input devices
    Audio,
}

/// Name and path of a device as reported by the category walk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawDevice {
    /// Friendly name
    pub name: String,
    /// Device path, empty when the host does not report one
    pub path: String,
}

impl RawDevice {
    /// Create a raw device record
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinDirection {
    /// Pin consumes samples
    Input,
    /// Pin produces samples
    Output,
}

/// Pin category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinCategory {
    /// Capture output
    Capture,
    /// Preview output
    Preview,
}

/// Pin lookup by media type, category and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinQuery {
    /// Media type carried by the pin
    pub media: StreamKind,
    /// Pin category
    pub category: PinCategory,
    /// Pin direction
    pub direction: PinDirection,
}

impl PinQuery {
    /// Capture output pin carrying `media`
    pub fn capture_output(media: StreamKind) -> Self {
        Self {
            media,
            category: PinCategory::Capture,
            direction: PinDirection::Output,
        }
    }
}

/// One sample handed to a sink by the delivery thread
#[derive(Debug, Clone, Copy)]
pub struct RawSample<'a> {
    /// Sample payload, valid only for the duration of the call
    pub data: &'a [u8],
    /// Presentation start time, 100ns units
    pub start_time: i64,
    /// Presentation stop time, 100ns units
    pub stop_time: i64,
}

/// Receiver of samples registered with the host
///
/// `on_sample` runs on the host's delivery thread, never on the control
/// thread.
pub trait SampleSink: Send + Sync {
    /// Handle one sample
    fn on_sample(&self, sample: RawSample<'_>);
}

/// Where a connected output pin delivers its samples
#[derive(Clone)]
pub enum Route {
    /// Deliver to a sample sink, converting video first when `convert_to` is set
    Capture {
        /// Target format of an intermediate conversion filter
        convert_to: Option<VideoFormat>,
        /// Sink receiving samples
        sink: Arc<dyn SampleSink>,
    },
    /// Render audio to an output endpoint
    Render(AudioMode),
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Capture { convert_to, .. } => f
                .debug_struct("Capture")
                .field("convert_to", convert_to)
                .finish_non_exhaustive(),
            Route::Render(mode) => f.debug_tuple("Render").field(mode).finish(),
        }
    }
}

/// Object whose property page should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyTarget {
    /// The filter itself
    Filter(FilterId),
    /// The crossbar feeding a filter; `upstream` skips to the crossbar
    /// before that one
    Crossbar {
        /// Filter the crossbar feeds
        filter: FilterId,
        /// Look one crossbar further upstream
        upstream: bool,
    },
}

/// Native media framework primitives
pub trait MediaFramework: Send + Sync {
    /// Allocate a graph builder
    fn create_graph(&self) -> HostResult<GraphId>;

    /// Release a graph builder and everything still inside it
    fn destroy_graph(&self, graph: GraphId);

    /// Walk a device category
    fn enumerate_devices(&self, category: DeviceCategory) -> HostResult<Vec<RawDevice>>;

    /// Instantiate the filter object of a device
    fn instantiate(&self, category: DeviceCategory, device: &RawDevice) -> HostResult<FilterId>;

    /// Release a filter object
    fn release(&self, filter: FilterId);

    /// Find a sibling audio filter belonging to the same physical device
    fn find_audio_sibling(&self, device_path: &str) -> HostResult<Option<RawDevice>>;

    /// Add a filter to a graph
    fn add_filter(&self, graph: GraphId, filter: FilterId) -> HostResult<()>;

    /// Remove a filter from a graph
    fn remove_filter(&self, graph: GraphId, filter: FilterId);

    /// Find a pin by media type, category and direction
    fn find_pin(&self, filter: FilterId, query: PinQuery) -> HostResult<Option<PinId>>;

    /// Find a pin by its name
    fn find_pin_by_name(
        &self,
        filter: FilterId,
        direction: PinDirection,
        name: &str,
    ) -> HostResult<Option<PinId>>;

    /// Supported video modes of a pin
    fn video_caps(&self, pin: PinId) -> HostResult<Vec<VideoCapabilitySet>>;

    /// Supported audio modes of a pin
    fn audio_caps(&self, pin: PinId) -> HostResult<Vec<AudioCapabilitySet>>;

    /// Apply a video mode to a pin
    fn set_video_format(&self, pin: PinId, mode: &NegotiatedVideo) -> HostResult<()>;

    /// Currently active video mode of a pin
    fn video_format(&self, pin: PinId) -> HostResult<Option<NegotiatedVideo>>;

    /// Apply an audio mode to a pin
    fn set_audio_format(&self, pin: PinId, mode: &NegotiatedAudio) -> HostResult<()>;

    /// Currently active audio mode of a pin
    fn audio_format(&self, pin: PinId) -> HostResult<Option<NegotiatedAudio>>;

    /// Connect an output pin along a route
    fn connect(&self, graph: GraphId, pin: PinId, route: Route) -> HostResult<ConnectionId>;

    /// Tear down a connection
    fn disconnect(&self, graph: GraphId, connection: ConnectionId);

    /// Start sample delivery
    fn run(&self, graph: GraphId) -> HostResult<()>;

    /// Stop sample delivery; returns once the delivery thread is idle
    fn stop(&self, graph: GraphId);

    /// Show the native property page of an object
    fn open_property_page(&self, window: WindowHandle, target: PropertyTarget) -> HostResult<()>;
}

/// One device-instance record of the system device registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstanceRecord {
    /// Instance identifier, `None` when the property could not be read
    pub instance_id: Option<String>,
    /// Location information, `None` when the property could not be read
    pub location: Option<String>,
}

impl InstanceRecord {
    /// Record with both properties present
    pub fn new(instance_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            instance_id: Some(instance_id.into()),
            location: Some(location.into()),
        }
    }
}

/// System device-instance registry
pub trait DeviceRegistry: Send + Sync {
    /// Present device instances of an interface class
    fn instance_records(&self, class: &str) -> HostResult<Vec<InstanceRecord>>;
}
