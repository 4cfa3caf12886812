//! Capture graph lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a capture graph
///
/// Normal transitions only move forward; `stop` returns a started graph to
/// `Connected`, and reset/shutdown return to `Uninitialized` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphState {
    /// No native graph exists
    Uninitialized,
    /// Graph objects allocated, no source configured
    Built,
    /// At least one source filter added and configured
    Configured,
    /// Sources wired to their sinks
    Connected,
    /// Samples are being delivered
    Started,
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphState::Uninitialized => "uninitialized",
            GraphState::Built => "built",
            GraphState::Configured => "configured",
            GraphState::Connected => "connected",
            GraphState::Started => "started",
        };
        f.write_str(name)
    }
}

/// Media stream handled by the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Video samples
    Video,
    /// Audio samples
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => f.write_str("video"),
            StreamKind::Audio => f.write_str("audio"),
        }
    }
}
