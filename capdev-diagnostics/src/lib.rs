//! # capdev diagnostics
//!
//! Debugging tools for capdev: structured logging setup and serializable
//! snapshots of enumerated device catalogs.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod catalog_report;
pub mod debug_logger;
pub mod error;

// Re-export main types
pub use catalog_report::{CatalogReport, CatalogSummary, DeviceReport};
pub use debug_logger::{DebugLogger, DEBUG_FILTER, DEFAULT_FILTER};
pub use error::{DiagnosticsError, DiagnosticsResult};
