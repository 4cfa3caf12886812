//! Configuration types and defaults

use capdev_core::{CaptureError, CaptureResult, DEFAULT_FRAME_QUEUE_CAPACITY};
use serde::{Deserialize, Serialize};

#[cfg(feature = "media")]
use capdev_media::{Device, DeviceOptions};

/// Global capdev configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Log filter directives used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
    /// Look up physical device locations in the device registry
    pub resolve_locations: bool,
    /// Apply the builtin exception-device table during enumeration
    pub apply_quirks: bool,
    /// Capacity of frame queues handed out by devices
    pub frame_queue_capacity: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_filter: None,
            resolve_locations: true,
            apply_quirks: true,
            frame_queue_capacity: DEFAULT_FRAME_QUEUE_CAPACITY,
        }
    }
}

impl CaptureSettings {
    /// Parse and validate settings from JSON; missing fields take defaults
    pub fn from_json_str(json: &str) -> CaptureResult<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| CaptureError::InvalidConfiguration {
                message: format!("Malformed capture settings: {}", e),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> CaptureResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CaptureError::InvalidConfiguration {
            message: format!("Failed to serialize capture settings: {}", e),
        })
    }

    /// Check the settings for values no device can work with
    pub fn validate(&self) -> CaptureResult<()> {
        if self.frame_queue_capacity == 0 {
            return Err(CaptureError::InvalidConfiguration {
                message: "frame_queue_capacity must be at least 1".to_string(),
            });
        }
        if self.log_filter.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(CaptureError::InvalidConfiguration {
                message: "log_filter must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Device behavior switches derived from these settings
    #[cfg(feature = "media")]
    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            resolve_locations: self.resolve_locations,
            apply_quirks: self.apply_quirks,
            frame_queue_capacity: self.frame_queue_capacity,
        }
    }
}

/// Apply [`CaptureSettings`] to a device
#[cfg(feature = "media")]
pub trait WithSettings {
    /// Rebuild with the options derived from `settings`
    fn with_settings(self, settings: &CaptureSettings) -> Self;
}

#[cfg(feature = "media")]
impl WithSettings for Device {
    fn with_settings(self, settings: &CaptureSettings) -> Self {
        self.with_options(settings.device_options())
    }
}
