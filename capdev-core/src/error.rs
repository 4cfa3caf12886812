//! Error types for capdev

use crate::host::HostError;
use crate::state::{GraphState, StreamKind};
use thiserror::Error;

/// Main error type for capture device operations
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Walking a device category failed as a whole
    #[error("Device enumeration failed: {reason}")]
    DeviceEnumerationFailed {
        /// Failure reason
        reason: String,
    },

    /// The requested device is not present
    #[error("Device not found: {device_id}")]
    DeviceNotFound {
        /// Device name, path or location that was asked for
        device_id: String,
    },

    /// No capability of the device satisfies the request
    #[error("No matching capability on {device}: {reason}")]
    NoMatch {
        /// Device display name
        device: String,
        /// Which constraint could not be met
        reason: String,
    },

    /// A capability set violates its range invariants
    #[error("Invalid capability: {message}")]
    InvalidCapability {
        /// What is wrong with it
        message: String,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// The host refused a configuration the matcher accepted
    #[error("Configuration rejected for {stream} stream: {reason}")]
    ConfigurationRejected {
        /// Stream being configured
        stream: StreamKind,
        /// Failure reason
        reason: String,
    },

    /// Operation not permitted in the current lifecycle state
    #[error("Invalid state for {operation}: graph is {state}")]
    InvalidState {
        /// Operation that was attempted
        operation: &'static str,
        /// State at the time of the call
        state: GraphState,
    },

    /// `start` was called before the graph was connected
    #[error("Capture graph not ready to start: graph is {state}")]
    NotReady {
        /// State at the time of the call
        state: GraphState,
    },

    /// `start` was called on a running graph
    #[error("Capture graph already started")]
    AlreadyStarted,

    /// The host could not allocate the graph objects
    #[error("Failed to build capture graph: {source}")]
    GraphBuildFailed {
        /// Host failure
        #[source]
        source: HostError,
    },

    /// A stream could not be connected; nothing is left connected
    #[error("Failed to connect {stream} stream: {source}")]
    ConnectFailed {
        /// Stream whose connection failed
        stream: StreamKind,
        /// Host failure
        #[source]
        source: HostError,
    },

    /// The host refused to start sample delivery
    #[error("Failed to start capture: {source}")]
    StartFailed {
        /// Host failure
        #[source]
        source: HostError,
    },

    /// The device is held exclusively by another client
    #[error("Device in use: {device}")]
    DeviceInUse {
        /// Device display name
        device: String,
    },

    /// Any other host collaborator failure
    #[error("Host error: {source}")]
    Host {
        /// Host failure
        #[from]
        source: HostError,
    },
}

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    /// Check if the caller can recover by retrying, relaxing the request or
    /// resetting the graph
    pub fn is_recoverable(&self) -> bool {
        match self {
            CaptureError::NoMatch { .. } => true,
            CaptureError::DeviceInUse { .. } => true,
            CaptureError::NotReady { .. } => true,
            CaptureError::AlreadyStarted => true,
            CaptureError::ConnectFailed { .. } => true,
            CaptureError::StartFailed { .. } => true,
            CaptureError::GraphBuildFailed { .. } => true,
            CaptureError::ConfigurationRejected { .. } => true,
            CaptureError::InvalidCapability { .. } => false,
            CaptureError::InvalidConfiguration { .. } => false,
            _ => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            CaptureError::DeviceEnumerationFailed { .. } => ErrorCategory::Device,
            CaptureError::DeviceNotFound { .. } => ErrorCategory::Device,
            CaptureError::DeviceInUse { .. } => ErrorCategory::Device,
            CaptureError::NoMatch { .. } => ErrorCategory::Configuration,
            CaptureError::InvalidCapability { .. } => ErrorCategory::Configuration,
            CaptureError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            CaptureError::ConfigurationRejected { .. } => ErrorCategory::Configuration,
            CaptureError::InvalidState { .. } => ErrorCategory::State,
            CaptureError::NotReady { .. } => ErrorCategory::State,
            CaptureError::AlreadyStarted => ErrorCategory::State,
            CaptureError::GraphBuildFailed { .. } => ErrorCategory::Host,
            CaptureError::ConnectFailed { .. } => ErrorCategory::Host,
            CaptureError::StartFailed { .. } => ErrorCategory::Host,
            CaptureError::Host { .. } => ErrorCategory::Host,
        }
    }

    /// Coarse result code, as reported by `start`
    pub fn code(&self) -> ResultCode {
        match self {
            CaptureError::DeviceInUse { .. } => ResultCode::InUse,
            CaptureError::NotReady { .. } => ResultCode::NotReady,
            CaptureError::AlreadyStarted => ResultCode::AlreadyStarted,
            _ => ResultCode::Error,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Device presence and availability
    Device,
    /// Requested or resolved configuration
    Configuration,
    /// Lifecycle ordering
    State,
    /// Failures reported by the host media framework
    Host,
}

/// Coarse outcome of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Sample delivery is running
    Success,
    /// The device is held by another client
    InUse,
    /// The graph is not connected yet
    NotReady,
    /// The graph was already running
    AlreadyStarted,
    /// Any other failure
    Error,
}

impl<T> From<&CaptureResult<T>> for ResultCode {
    fn from(result: &CaptureResult<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Success,
            Err(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let not_ready = CaptureError::NotReady {
            state: GraphState::Built,
        };
        assert_eq!(not_ready.category(), ErrorCategory::State);
        assert_eq!(not_ready.code(), ResultCode::NotReady);
        assert!(not_ready.is_recoverable());

        let bad_caps = CaptureError::InvalidCapability {
            message: "granularity must be at least 1".to_string(),
        };
        assert_eq!(bad_caps.category(), ErrorCategory::Configuration);
        assert!(!bad_caps.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = CaptureError::NotReady {
            state: GraphState::Built,
        };
        assert_eq!(
            error.to_string(),
            "Capture graph not ready to start: graph is built"
        );

        let error = CaptureError::ConnectFailed {
            stream: StreamKind::Audio,
            source: HostError::failed("connect audio pin", -1),
        };
        assert!(error.to_string().starts_with("Failed to connect audio stream"));
    }

    #[test]
    fn test_result_code_from_result() {
        let ok: CaptureResult<()> = Ok(());
        assert_eq!(ResultCode::from(&ok), ResultCode::Success);

        let in_use: CaptureResult<()> = Err(CaptureError::DeviceInUse {
            device: "USB Camera".to_string(),
        });
        assert_eq!(ResultCode::from(&in_use), ResultCode::InUse);

        let host: CaptureResult<()> = Err(HostError::failed("run graph", 5).into());
        assert_eq!(ResultCode::from(&host), ResultCode::Error);
    }
}
