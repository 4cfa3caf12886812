//! Structured debug logging system

use crate::error::{DiagnosticsError, DiagnosticsResult};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset and debug logging is off
pub const DEFAULT_FILTER: &str = "info";

/// Filter used when `RUST_LOG` is unset and debug logging is on
pub const DEBUG_FILTER: &str = "capdev=debug,capdev_core=debug,capdev_media=debug,info";

/// Debug logger for structured logging
#[derive(Debug, Default)]
pub struct DebugLogger;

impl DebugLogger {
    /// Filter directives for a debug switch
    pub fn default_filter(debug_logging: bool) -> &'static str {
        if debug_logging {
            DEBUG_FILTER
        } else {
            DEFAULT_FILTER
        }
    }

    /// Install a fmt subscriber filtered by `RUST_LOG`, else by `default_filter`
    ///
    /// Returns `false` when a global subscriber was already installed; the
    /// existing one stays in place.
    pub fn init_logging(default_filter: &str) -> DiagnosticsResult<bool> {
        let filter = Self::build_filter(default_filter)?;
        match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
            Ok(()) => {
                tracing::debug!("Logging initialized");
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn build_filter(default_filter: &str) -> DiagnosticsResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(default_filter).map_err(|e| DiagnosticsError::InvalidFilter {
            filter: default_filter.to_string(),
            reason: e.to_string(),
        })
    }
}
