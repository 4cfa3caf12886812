//! # capdev media
//!
//! Device enumeration, configuration matching and the capture graph
//! lifecycle. The native filter graph is reached through the
//! [`MediaFramework`](capdev_core::MediaFramework) and
//! [`DeviceRegistry`](capdev_core::DeviceRegistry) traits; [`SimulatedHost`]
//! implements both in memory.

#![warn(clippy::all)]

pub mod device;
pub mod dispatch;
pub mod enumerator;
pub mod graph;
pub mod location;
pub mod matcher;
pub mod quirks;
pub mod simulated;

// Re-export main types
pub use capdev_core::DEFAULT_FRAME_QUEUE_CAPACITY;
pub use device::{Device, DeviceOptions};
pub use dispatch::{
    frame_queue, AudioCallback, DispatchStats, Frame, FrameCallback, FrameDispatcher,
    FrameReceiver, OwnedFrame, VideoCallback,
};
pub use enumerator::DeviceEnumerator;
pub use graph::{CaptureGraph, DialogKind, PipelineHandle};
pub use location::resolve_location;
pub use matcher::{match_audio, match_video, select_device, validate_audio, validate_video, NoMatch};
pub use quirks::{EncodedDevice, QuirkTable};
pub use simulated::{Fault, SimulatedDevice, SimulatedHost};
