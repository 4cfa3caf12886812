//! Per-instance capture device facade
//!
//! [`Device`] bundles enumeration, matching and one [`CaptureGraph`]. Control
//! methods take `&mut self`; callbacks run on the host's delivery thread and
//! cannot reach back into the device, so reconfiguring from a frame handler
//! goes through [`frame_queue`] and a task that owns the device.

use crate::dispatch::{frame_queue, AudioCallback, DispatchStats, FrameReceiver, VideoCallback};
use crate::enumerator::DeviceEnumerator;
use crate::graph::{CaptureGraph, DialogKind};
use crate::matcher::{match_audio, match_video, select_device};
use crate::quirks::QuirkTable;
use crate::simulated::SimulatedHost;
use capdev_core::{
    AudioDeviceEntry, AudioSource, CaptureError, CaptureResult, DeviceId, DeviceRegistry,
    GraphState, MediaFramework, RequestedAudioConfig, RequestedVideoConfig, ResolvedAudioConfig,
    ResolvedVideoConfig, StreamKind, VideoDeviceEntry, WindowHandle, DEFAULT_FRAME_QUEUE_CAPACITY,
};
use std::sync::Arc;
use tracing::info;

/// Behavior switches of a [`Device`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Look up physical locations in the device registry
    pub resolve_locations: bool,
    /// Apply the builtin exception-device table
    pub apply_quirks: bool,
    /// Capacity of frame queues built by the device
    pub frame_queue_capacity: usize,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            resolve_locations: true,
            apply_quirks: true,
            frame_queue_capacity: DEFAULT_FRAME_QUEUE_CAPACITY,
        }
    }
}

/// One capture device instance: at most one video and one audio source
pub struct Device {
    framework: Arc<dyn MediaFramework>,
    registry: Arc<dyn DeviceRegistry>,
    options: DeviceOptions,
    graph: CaptureGraph,
}

impl Device {
    /// Device backed by the given host collaborators
    pub fn new(framework: Arc<dyn MediaFramework>, registry: Arc<dyn DeviceRegistry>) -> Self {
        let options = DeviceOptions::default();
        let graph = CaptureGraph::new(
            Arc::clone(&framework),
            build_enumerator(&framework, &registry, &options),
        );
        Self {
            framework,
            registry,
            options,
            graph,
        }
    }

    /// Device backed by an in-memory host
    pub fn simulated(host: Arc<SimulatedHost>) -> Self {
        Self::new(host.clone(), host)
    }

    /// Replace the options; any existing pipeline is torn down
    pub fn with_options(mut self, options: DeviceOptions) -> Self {
        self.options = options;
        self.graph = CaptureGraph::new(
            Arc::clone(&self.framework),
            build_enumerator(&self.framework, &self.registry, &options),
        );
        self
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    /// Current video devices; re-walks the hardware on every call
    pub fn enumerate_video_devices(&self) -> CaptureResult<Vec<VideoDeviceEntry>> {
        self.graph.enumerator().video_devices()
    }

    /// Current audio devices; re-walks the hardware on every call
    pub fn enumerate_audio_devices(&self) -> CaptureResult<Vec<AudioDeviceEntry>> {
        self.graph.enumerator().audio_devices()
    }

    /// Locate the requested video device and match the request against it
    pub fn resolve_video(
        &self,
        request: &RequestedVideoConfig,
    ) -> CaptureResult<ResolvedVideoConfig> {
        let entries = self.enumerate_video_devices()?;
        let entry = select_device(&entries, &request.device, request.location.as_deref())
            .ok_or_else(|| CaptureError::DeviceNotFound {
                device_id: request_label(&request.device, request.location.as_deref()),
            })?;
        Ok(match_video(request, entry)?)
    }

    /// Locate the requested audio device and match the request against it
    ///
    /// Audio taken from the video device is matched when the source is
    /// configured, against the pin that actually carries it.
    pub fn resolve_audio(
        &self,
        request: &RequestedAudioConfig,
    ) -> CaptureResult<ResolvedAudioConfig> {
        if request.source != AudioSource::Device {
            return Ok(ResolvedAudioConfig {
                request: request.clone(),
                capability: None,
                negotiated: None,
            });
        }
        let entries = self.enumerate_audio_devices()?;
        let entry = select_device(&entries, &request.device, None).ok_or_else(|| {
            CaptureError::DeviceNotFound {
                device_id: request_label(&request.device, None),
            }
        })?;
        Ok(match_audio(request, entry)?)
    }

    /// See [`CaptureGraph::create_graph`]
    pub fn create_graph(&mut self) -> CaptureResult<()> {
        self.graph.create_graph()
    }

    /// See [`CaptureGraph::set_video_config`]
    pub fn set_video_config(&mut self, resolved: ResolvedVideoConfig) -> CaptureResult<()> {
        self.graph.set_video_config(resolved)
    }

    /// See [`CaptureGraph::set_audio_config`]
    pub fn set_audio_config(&mut self, resolved: ResolvedAudioConfig) -> CaptureResult<()> {
        self.graph.set_audio_config(resolved)
    }

    pub fn set_video_callback(&mut self, callback: Option<VideoCallback>) {
        self.graph.set_video_callback(callback);
    }

    pub fn set_audio_callback(&mut self, callback: Option<AudioCallback>) {
        self.graph.set_audio_callback(callback);
    }

    /// See [`CaptureGraph::connect_filters`]
    pub fn connect_filters(&mut self) -> CaptureResult<()> {
        self.graph.connect_filters()
    }

    /// See [`CaptureGraph::start`]
    pub fn start(&mut self) -> CaptureResult<()> {
        self.graph.start()
    }

    /// See [`CaptureGraph::stop`]
    pub fn stop(&mut self) {
        self.graph.stop();
    }

    /// See [`CaptureGraph::reset_graph`]
    pub fn reset_graph(&mut self) -> CaptureResult<()> {
        self.graph.reset_graph()
    }

    /// See [`CaptureGraph::shutdown_graph`]
    pub fn shutdown_graph(&mut self) {
        self.graph.shutdown_graph();
    }

    pub fn state(&self) -> GraphState {
        self.graph.state()
    }

    pub fn is_valid(&self) -> bool {
        self.graph.is_valid()
    }

    pub fn video_config(&self) -> Option<&ResolvedVideoConfig> {
        self.graph.video_config()
    }

    pub fn audio_config(&self) -> Option<&ResolvedAudioConfig> {
        self.graph.audio_config()
    }

    pub fn video_device_id(&self) -> Option<&DeviceId> {
        self.graph.video_device_id()
    }

    pub fn audio_device_id(&self) -> Option<&DeviceId> {
        self.graph.audio_device_id()
    }

    pub fn dispatch_stats(&self, stream: StreamKind) -> Option<DispatchStats> {
        self.graph.dispatch_stats(stream)
    }

    /// Show a native property page of a configured source
    pub fn open_dialog(&self, window: WindowHandle, kind: DialogKind) -> CaptureResult<()> {
        self.graph.open_dialog(window, kind)
    }

    /// Rebuild the graph and capture video with `callback`
    ///
    /// Runs reset, resolve, configure, connect and start in one go. On
    /// failure the graph is left built but unconfigured.
    pub fn start_video(
        &mut self,
        request: RequestedVideoConfig,
        callback: VideoCallback,
    ) -> CaptureResult<()> {
        self.graph.reset_graph()?;
        let resolved = self.resolve_video(&request)?;
        self.graph.set_video_callback(Some(callback));

        if let Err(e) = self.run_video(resolved) {
            self.graph.reset_graph()?;
            return Err(e);
        }

        let configured = (self.graph.video_device_id(), self.graph.video_config());
        if let (Some(device), Some(config)) = configured {
            info!(
                "Capturing '{}' as {} ({:?})",
                device.name,
                config.output_format(),
                config.negotiated
            );
        }
        Ok(())
    }

    fn run_video(&mut self, resolved: ResolvedVideoConfig) -> CaptureResult<()> {
        self.graph.set_video_config(resolved)?;
        self.graph.connect_filters()?;
        self.graph.start()
    }

    /// Like [`Device::start_video`], delivering frames to a queue
    pub fn start_video_queue(
        &mut self,
        request: RequestedVideoConfig,
    ) -> CaptureResult<FrameReceiver<ResolvedVideoConfig>> {
        let (callback, receiver) = frame_queue(self.options.frame_queue_capacity);
        self.start_video(request, callback)?;
        Ok(receiver)
    }
}

fn build_enumerator(
    framework: &Arc<dyn MediaFramework>,
    registry: &Arc<dyn DeviceRegistry>,
    options: &DeviceOptions,
) -> DeviceEnumerator {
    let quirks = if options.apply_quirks {
        QuirkTable::builtin()
    } else {
        QuirkTable::empty()
    };
    DeviceEnumerator::new(Arc::clone(framework), Arc::clone(registry))
        .with_quirks(quirks)
        .with_location_resolution(options.resolve_locations)
}

fn request_label(device: &DeviceId, location: Option<&str>) -> String {
    match location.filter(|loc| !loc.is_empty()) {
        Some(location) => format!("location {}", location),
        None if device.is_unspecified() => "default device".to_string(),
        None => format!("'{}' {}", device.name, device.path),
    }
}
