//! Error types for capdev diagnostics

use thiserror::Error;

/// Errors raised by diagnostics tooling
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    /// A log filter directive could not be parsed
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected directive string
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A report could not be serialized
    #[error("Report serialization failed: {source}")]
    Serialization {
        /// Serializer failure
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for diagnostics operations
pub type DiagnosticsResult<T> = Result<T, DiagnosticsError>;
