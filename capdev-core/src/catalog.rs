//! Device catalog entries produced by enumeration

use crate::caps::{AudioCapabilitySet, VideoCapabilitySet};
use serde::{Deserialize, Serialize};

/// Identity of a capture device as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId {
    /// Human readable display name
    pub name: String,
    /// Platform-stable device path
    pub path: String,
}

impl DeviceId {
    /// Create a device identity
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Whether neither name nor path is set, i.e. "the default device"
    pub fn is_unspecified(&self) -> bool {
        self.name.is_empty() && self.path.is_empty()
    }
}

/// One enumerated device and the capabilities it exposes
///
/// Entries are rebuilt on every enumeration call and never mutated after
/// construction, so a catalog always reflects the hardware present at the
/// time of the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCatalogEntry<C> {
    /// Display name and path
    pub id: DeviceId,
    /// Physical location, used to tell identical models apart
    pub location_id: Option<String>,
    /// Capabilities in the order the device reported them
    pub capabilities: Vec<C>,
    /// Whether audio can be captured alongside this device
    pub has_attached_audio: bool,
    /// Whether that audio comes from a separate sibling filter
    pub audio_is_separate_filter: bool,
}

impl<C> DeviceCatalogEntry<C> {
    /// Entry without location or audio attachment
    pub fn new(id: DeviceId, capabilities: Vec<C>) -> Self {
        Self {
            id,
            location_id: None,
            capabilities,
            has_attached_audio: false,
            audio_is_separate_filter: false,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Device path
    pub fn path(&self) -> &str {
        &self.id.path
    }

    /// Whether the device is present but exposes nothing usable
    pub fn is_unusable(&self) -> bool {
        self.capabilities.is_empty()
    }
}

/// Catalog entry for a video capture device
pub type VideoDeviceEntry = DeviceCatalogEntry<VideoCapabilitySet>;

/// Catalog entry for an audio capture device
pub type AudioDeviceEntry = DeviceCatalogEntry<AudioCapabilitySet>;
