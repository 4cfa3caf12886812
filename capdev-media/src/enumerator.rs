//! Device enumeration
//!
//! Walks a host device category and turns every readable device into a
//! catalog entry. A single device that cannot be inspected is logged and
//! skipped; only a failure of the walk itself fails the call.

use crate::location::resolve_location;
use crate::quirks::{EncodedDevice, QuirkTable};
use capdev_core::{
    AudioDeviceEntry, CaptureError, CaptureResult, DeviceCategory, DeviceId, DeviceRegistry,
    FilterId, HostResult, InstanceRecord, MediaFramework, PinDirection, PinQuery, RawDevice,
    StreamKind, VideoDeviceEntry, CAMERA_INTERFACE_CLASS,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Filter instantiated for inspection, released on drop unless kept
pub(crate) struct FilterGuard<'a> {
    framework: &'a dyn MediaFramework,
    filter: FilterId,
    armed: bool,
}

impl<'a> FilterGuard<'a> {
    pub(crate) fn instantiate(
        framework: &'a dyn MediaFramework,
        category: DeviceCategory,
        device: &RawDevice,
    ) -> HostResult<Self> {
        let filter = framework.instantiate(category, device)?;
        Ok(Self {
            framework,
            filter,
            armed: true,
        })
    }

    pub(crate) fn id(&self) -> FilterId {
        self.filter
    }

    /// Hand ownership of the filter to the caller
    pub(crate) fn keep(mut self) -> FilterId {
        self.armed = false;
        self.filter
    }
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.framework.release(self.filter);
        }
    }
}

/// Builds device catalogs from the host's current hardware state
///
/// Nothing is cached: every call re-walks the category, so plugging or
/// unplugging a device shows up on the next call.
pub struct DeviceEnumerator {
    framework: Arc<dyn MediaFramework>,
    registry: Arc<dyn DeviceRegistry>,
    quirks: &'static QuirkTable,
    resolve_locations: bool,
}

impl DeviceEnumerator {
    /// Enumerator using the builtin quirk table and location resolution
    pub fn new(framework: Arc<dyn MediaFramework>, registry: Arc<dyn DeviceRegistry>) -> Self {
        Self {
            framework,
            registry,
            quirks: QuirkTable::builtin(),
            resolve_locations: true,
        }
    }

    /// Replace the quirk table
    pub fn with_quirks(mut self, quirks: &'static QuirkTable) -> Self {
        self.quirks = quirks;
        self
    }

    /// Enable or disable registry lookups for location identifiers
    pub fn with_location_resolution(mut self, enabled: bool) -> Self {
        self.resolve_locations = enabled;
        self
    }

    pub(crate) fn quirks(&self) -> &'static QuirkTable {
        self.quirks
    }

    /// Enumerate video capture devices
    pub fn video_devices(&self) -> CaptureResult<Vec<VideoDeviceEntry>> {
        let raw = self.walk(DeviceCategory::Video)?;
        let records = self.instance_records();

        let mut devices = Vec::with_capacity(raw.len());
        for device in &raw {
            match self.inspect_video(device, &records) {
                Ok(Some(entry)) => {
                    debug!(
                        "Found video device '{}' with {} capabilities (location: {:?})",
                        entry.id.name,
                        entry.capabilities.len(),
                        entry.location_id
                    );
                    devices.push(entry);
                }
                Ok(None) => debug!("Skipping '{}': no usable capture pin", device.name),
                Err(e) => warn!("Skipping unreadable video device '{}': {}", device.name, e),
            }
        }

        info!("Enumerated {} video devices", devices.len());
        Ok(devices)
    }

    /// Enumerate audio capture devices
    pub fn audio_devices(&self) -> CaptureResult<Vec<AudioDeviceEntry>> {
        let raw = self.walk(DeviceCategory::Audio)?;

        let mut devices = Vec::with_capacity(raw.len());
        for device in &raw {
            match self.inspect_audio(device) {
                Ok(Some(entry)) => devices.push(entry),
                Ok(None) => debug!("Skipping '{}': no audio capture pin", device.name),
                Err(e) => warn!("Skipping unreadable audio device '{}': {}", device.name, e),
            }
        }

        info!("Enumerated {} audio devices", devices.len());
        Ok(devices)
    }

    fn walk(&self, category: DeviceCategory) -> CaptureResult<Vec<RawDevice>> {
        self.framework
            .enumerate_devices(category)
            .map_err(|e| CaptureError::DeviceEnumerationFailed {
                reason: format!("{:?} category: {}", category, e),
            })
    }

    fn instance_records(&self) -> Vec<InstanceRecord> {
        if !self.resolve_locations {
            return Vec::new();
        }
        match self.registry.instance_records(CAMERA_INTERFACE_CLASS) {
            Ok(records) => records,
            Err(e) => {
                debug!("Device registry unavailable, locations left empty: {}", e);
                Vec::new()
            }
        }
    }

    fn inspect_video(
        &self,
        device: &RawDevice,
        records: &[InstanceRecord],
    ) -> HostResult<Option<VideoDeviceEntry>> {
        let id = DeviceId::new(device.name.clone(), device.path.clone());
        let location = resolve_location(&device.path, records);

        if let Some(encoded) = self.quirks.match_name(&device.name) {
            debug!("'{}' matches quirk {}", device.name, encoded.label);
            return Ok(Some(encoded_entry(id, location, encoded)));
        }

        let filter = FilterGuard::instantiate(&*self.framework, DeviceCategory::Video, device)?;
        let pin = self
            .framework
            .find_pin(filter.id(), PinQuery::capture_output(StreamKind::Video))?;

        let Some(pin) = pin else {
            return self.inspect_exception_pins(filter.id(), id, location);
        };

        let capabilities = self
            .framework
            .video_caps(pin)?
            .into_iter()
            .filter(|caps| match caps.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Dropping capability of '{}': {}", device.name, e);
                    false
                }
            })
            .collect();

        let audio_pin = self
            .framework
            .find_pin(filter.id(), PinQuery::capture_output(StreamKind::Audio))
            .unwrap_or_else(|e| {
                debug!("Audio pin lookup failed on '{}': {}", device.name, e);
                None
            });

        let mut entry = VideoDeviceEntry::new(id, capabilities);
        entry.location_id = location;
        if audio_pin.is_some() {
            entry.has_attached_audio = true;
        } else if !device.path.is_empty() {
            let sibling = self
                .framework
                .find_audio_sibling(&device.path)
                .unwrap_or_else(|e| {
                    debug!("Audio sibling lookup failed on '{}': {}", device.name, e);
                    None
                });
            entry.audio_is_separate_filter = sibling.is_some();
            entry.has_attached_audio = entry.audio_is_separate_filter;
        }

        Ok(Some(entry))
    }

    fn inspect_exception_pins(
        &self,
        filter: FilterId,
        id: DeviceId,
        location: Option<String>,
    ) -> HostResult<Option<VideoDeviceEntry>> {
        for quirk in self.quirks.pin_quirks() {
            let pin = self
                .framework
                .find_pin_by_name(filter, PinDirection::Output, quirk.pin_name)?;
            if pin.is_some() {
                debug!(
                    "'{}' exposes '{}' pin, treating as {}",
                    id.name, quirk.pin_name, quirk.device.label
                );
                return Ok(Some(encoded_entry(id, location, &quirk.device)));
            }
        }
        Ok(None)
    }

    fn inspect_audio(&self, device: &RawDevice) -> HostResult<Option<AudioDeviceEntry>> {
        let filter = FilterGuard::instantiate(&*self.framework, DeviceCategory::Audio, device)?;
        let Some(pin) = self
            .framework
            .find_pin(filter.id(), PinQuery::capture_output(StreamKind::Audio))?
        else {
            return Ok(None);
        };

        let capabilities = self
            .framework
            .audio_caps(pin)?
            .into_iter()
            .filter(|caps| caps.validate().is_ok())
            .collect();

        Ok(Some(AudioDeviceEntry::new(
            DeviceId::new(device.name.clone(), device.path.clone()),
            capabilities,
        )))
    }
}

fn encoded_entry(
    id: DeviceId,
    location: Option<String>,
    encoded: &EncodedDevice,
) -> VideoDeviceEntry {
    VideoDeviceEntry {
        id,
        location_id: location,
        capabilities: vec![encoded.video_caps()],
        has_attached_audio: true,
        audio_is_separate_filter: false,
    }
}
