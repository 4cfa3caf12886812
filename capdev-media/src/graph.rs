//! Capture graph lifecycle
//!
//! [`CaptureGraph`] drives one pipeline through
//! `Uninitialized -> Built -> Configured -> Connected -> Started`. Every
//! native object the pipeline acquires is owned by a [`PipelineHandle`];
//! dropping the handle stops delivery and releases all of them, so
//! `reset_graph`, `shutdown_graph` and dropping the graph are all the same
//! teardown.

use crate::dispatch::{AudioCallback, DispatchStats, Frame, FrameDispatcher, VideoCallback};
use crate::enumerator::{DeviceEnumerator, FilterGuard};
use crate::matcher::{match_audio, select_device, validate_audio, validate_video};
use crate::quirks::EncodedDevice;
use capdev_core::{
    AudioDeviceEntry, AudioMode, AudioSource, CaptureError, CaptureResult, ConnectionId,
    DeviceCategory, DeviceId, FilterId, GraphId, GraphState, HostError, MediaFramework,
    PinDirection, PinId, PinQuery, PropertyTarget, RawDevice, ResolvedAudioConfig,
    ResolvedVideoConfig, Route, SampleSink, StreamKind, VideoCapabilitySet, WindowHandle,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Native property page to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogKind {
    /// Video source filter settings
    ConfigVideo,
    /// Audio source filter settings
    ConfigAudio,
    /// Crossbar feeding the video source
    ConfigCrossbar,
    /// Crossbar one step further upstream
    ConfigCrossbar2,
}

/// Source filter placed in the graph
#[derive(Debug, Clone)]
struct SourceFilter {
    device: DeviceId,
    filter: FilterId,
    pin: PinId,
    /// Whether this source releases the filter; audio taken from the video
    /// device's own pin shares the video filter
    owned: bool,
    encoded: Option<EncodedDevice>,
}

/// Native objects of one pipeline
///
/// Dropping the handle stops delivery, disconnects, removes and releases the
/// source filters, then destroys the graph.
pub struct PipelineHandle {
    id: Uuid,
    framework: Arc<dyn MediaFramework>,
    graph: GraphId,
    video: Option<SourceFilter>,
    audio: Option<SourceFilter>,
    connections: Vec<ConnectionId>,
    video_dispatcher: Option<Arc<FrameDispatcher<ResolvedVideoConfig>>>,
    audio_dispatcher: Option<Arc<FrameDispatcher<ResolvedAudioConfig>>>,
    running: bool,
}

impl PipelineHandle {
    fn new(framework: Arc<dyn MediaFramework>, graph: GraphId) -> Self {
        Self {
            id: Uuid::new_v4(),
            framework,
            graph,
            video: None,
            audio: None,
            connections: Vec::new(),
            video_dispatcher: None,
            audio_dispatcher: None,
            running: false,
        }
    }

    /// Identifier used in log lines
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the host is delivering samples
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn replace_source(&mut self, stream: StreamKind, source: SourceFilter) {
        let previous = match stream {
            StreamKind::Video => self.video.replace(source),
            StreamKind::Audio => self.audio.replace(source),
        };
        if let Some(previous) = previous {
            self.discard(previous);
        }
    }

    fn discard(&mut self, source: SourceFilter) {
        let sharer = self
            .video
            .iter_mut()
            .chain(self.audio.iter_mut())
            .find(|other| other.filter == source.filter);
        match sharer {
            Some(other) => other.owned |= source.owned,
            None if source.owned => {
                self.framework.remove_filter(self.graph, source.filter);
                self.framework.release(source.filter);
            }
            None => {}
        }
    }

    fn activate(&self, video: Option<&ResolvedVideoConfig>, audio: Option<&ResolvedAudioConfig>) {
        if let (Some(dispatcher), Some(config)) = (&self.video_dispatcher, video) {
            dispatcher.activate(config.clone());
        }
        if let (Some(dispatcher), Some(config)) = (&self.audio_dispatcher, audio) {
            dispatcher.activate(config.clone());
        }
    }

    fn deactivate(&self) {
        if let Some(dispatcher) = &self.video_dispatcher {
            dispatcher.deactivate();
        }
        if let Some(dispatcher) = &self.audio_dispatcher {
            dispatcher.deactivate();
        }
    }

    fn halt(&mut self) {
        self.deactivate();
        if self.running {
            self.framework.stop(self.graph);
            self.running = false;
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.halt();
        for connection in self.connections.drain(..) {
            self.framework.disconnect(self.graph, connection);
        }
        if let Some(video) = self.video.take() {
            self.discard(video);
        }
        if let Some(audio) = self.audio.take() {
            self.discard(audio);
        }
        self.framework.destroy_graph(self.graph);
        debug!("Pipeline {} torn down", self.id);
    }
}

/// Lifecycle state machine of one capture pipeline
pub struct CaptureGraph {
    framework: Arc<dyn MediaFramework>,
    enumerator: DeviceEnumerator,
    state: GraphState,
    pipeline: Option<PipelineHandle>,
    video: Option<ResolvedVideoConfig>,
    audio: Option<ResolvedAudioConfig>,
    video_callback: Option<VideoCallback>,
    audio_callback: Option<AudioCallback>,
}

impl CaptureGraph {
    /// Create an uninitialized graph; devices are located through `enumerator`
    pub fn new(framework: Arc<dyn MediaFramework>, enumerator: DeviceEnumerator) -> Self {
        Self {
            framework,
            enumerator,
            state: GraphState::Uninitialized,
            pipeline: None,
            video: None,
            audio: None,
            video_callback: None,
            audio_callback: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Whether the native graph exists
    pub fn is_valid(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn enumerator(&self) -> &DeviceEnumerator {
        &self.enumerator
    }

    /// Handler for video frames, taken into use by the next `connect_filters`
    pub fn set_video_callback(&mut self, callback: Option<VideoCallback>) {
        self.video_callback = callback;
    }

    /// Handler for audio frames, taken into use by the next `connect_filters`
    pub fn set_audio_callback(&mut self, callback: Option<AudioCallback>) {
        self.audio_callback = callback;
    }

    /// Allocate the native graph
    pub fn create_graph(&mut self) -> CaptureResult<()> {
        match self.state {
            GraphState::Uninitialized => {}
            GraphState::Built => return Ok(()),
            state => {
                return Err(CaptureError::InvalidState {
                    operation: "create_graph",
                    state,
                })
            }
        }

        let graph = self
            .framework
            .create_graph()
            .map_err(|source| CaptureError::GraphBuildFailed { source })?;
        let pipeline = PipelineHandle::new(Arc::clone(&self.framework), graph);
        info!("Capture graph built (pipeline {})", pipeline.id);
        self.pipeline = Some(pipeline);
        self.state = GraphState::Built;
        Ok(())
    }

    /// Place the video source described by `resolved` in the graph
    ///
    /// Replaces a previously configured video source. On failure the graph
    /// is left exactly as it was.
    pub fn set_video_config(&mut self, resolved: ResolvedVideoConfig) -> CaptureResult<()> {
        let graph = self.configurable_graph("set_video_config")?;

        let entries = self.enumerator.video_devices()?;
        let request = &resolved.request;
        let entry = select_device(&entries, &request.device, request.location.as_deref())
            .ok_or_else(|| CaptureError::DeviceNotFound {
                device_id: describe_device(&request.device, request.location.as_deref()),
            })?;
        let raw = RawDevice::new(entry.id.name.clone(), entry.id.path.clone());
        let name_quirk = self.enumerator.quirks().match_name(&entry.id.name).copied();

        let framework = &*self.framework;
        let category = DeviceCategory::Video;
        let (source, resolved) = attach_source(framework, graph, category, &raw, |filter| {
            let (pin, encoded) = self.video_pin(filter, name_quirk)?;
            let live = match &encoded {
                Some(encoded) => vec![encoded.video_caps()],
                None => live_video_caps(framework, pin)?,
            };
            validate_video(&resolved, &live)?;

            let mut resolved = resolved;
            match (resolved.negotiated, encoded) {
                (Some(_), Some(_)) => {}
                (Some(mode), None) => framework.set_video_format(pin, &mode).map_err(|e| {
                    CaptureError::ConfigurationRejected {
                        stream: StreamKind::Video,
                        reason: e.to_string(),
                    }
                })?,
                (None, Some(encoded)) => resolved.negotiated = Some(encoded.video_mode()),
                (None, None) => resolved.negotiated = framework.video_format(pin)?,
            }

            let source = SourceFilter {
                device: entry.id.clone(),
                filter,
                pin,
                owned: true,
                encoded,
            };
            Ok((source, resolved))
        })?;

        info!(
            "Video source '{}' configured ({:?})",
            source.device.name, resolved.negotiated
        );
        self.pipeline_mut()?.replace_source(StreamKind::Video, source);
        self.video = Some(resolved);
        self.state = GraphState::Configured;
        Ok(())
    }

    /// Place the audio source described by `resolved` in the graph
    ///
    /// `AudioSource::VideoDevicePin` and `AudioSource::SeparateFilter` take
    /// the audio of the configured video device, so that source has to be
    /// configured first.
    pub fn set_audio_config(&mut self, resolved: ResolvedAudioConfig) -> CaptureResult<()> {
        let graph = self.configurable_graph("set_audio_config")?;

        let (source, resolved) = match resolved.request.source {
            AudioSource::Device => {
                let entries = self.enumerator.audio_devices()?;
                let entry = select_device(&entries, &resolved.request.device, None).ok_or_else(|| {
                    CaptureError::DeviceNotFound {
                        device_id: describe_device(&resolved.request.device, None),
                    }
                })?;
                let raw = RawDevice::new(entry.id.name.clone(), entry.id.path.clone());
                self.attach_audio_filter(graph, &raw, resolved)?
            }
            AudioSource::SeparateFilter => {
                let video = self.video_source("separate audio filter")?;
                let sibling = self
                    .framework
                    .find_audio_sibling(&video.device.path)?
                    .ok_or_else(|| CaptureError::DeviceNotFound {
                        device_id: format!("audio filter of '{}'", video.device.name),
                    })?;
                self.attach_audio_filter(graph, &sibling, resolved)?
            }
            AudioSource::VideoDevicePin => {
                let video = self.video_source("video device audio pin")?.clone();
                let pin = self
                    .framework
                    .find_pin(video.filter, PinQuery::capture_output(StreamKind::Audio))?
                    .ok_or_else(|| CaptureError::ConfigurationRejected {
                        stream: StreamKind::Audio,
                        reason: format!("'{}' has no audio capture pin", video.device.name),
                    })?;
                let resolved =
                    self.apply_audio(&video.device, pin, video.encoded.as_ref(), resolved)?;
                let source = SourceFilter {
                    owned: false,
                    pin,
                    ..video
                };
                (source, resolved)
            }
        };

        info!(
            "Audio source '{}' configured ({:?}, {:?})",
            source.device.name, resolved.request.mode, resolved.negotiated
        );
        self.pipeline_mut()?.replace_source(StreamKind::Audio, source);
        self.audio = Some(resolved);
        self.state = GraphState::Configured;
        Ok(())
    }

    /// Wire the configured sources to their sinks
    ///
    /// Either every configured stream ends up connected or none does.
    pub fn connect_filters(&mut self) -> CaptureResult<()> {
        if self.state != GraphState::Configured {
            return Err(CaptureError::InvalidState {
                operation: "connect_filters",
                state: self.state,
            });
        }

        let video_callback: VideoCallback = match self.video_callback.clone() {
            Some(callback) => callback,
            None => Arc::new(discard_frame::<ResolvedVideoConfig>),
        };
        let audio_callback: AudioCallback = match self.audio_callback.clone() {
            Some(callback) => callback,
            None => Arc::new(discard_frame::<ResolvedAudioConfig>),
        };
        let video_config = self.video.as_ref();
        let audio_config = self.audio.as_ref();
        let pipeline = self.pipeline.as_mut().ok_or(CaptureError::InvalidState {
            operation: "connect_filters",
            state: self.state,
        })?;

        let mut made = Vec::new();
        let mut video_dispatcher = None;
        let mut audio_dispatcher = None;

        let outcome = (|| -> CaptureResult<()> {
            if let (Some(source), Some(config)) = (&pipeline.video, video_config) {
                let dispatcher = Arc::new(FrameDispatcher::new(StreamKind::Video, video_callback));
                let sink: Arc<dyn SampleSink> = dispatcher.clone();
                let route = Route::Capture {
                    convert_to: config.needs_conversion().then(|| config.output_format()),
                    sink,
                };
                let connection = self
                    .framework
                    .connect(pipeline.graph, source.pin, route)
                    .map_err(|source| CaptureError::ConnectFailed {
                        stream: StreamKind::Video,
                        source,
                    })?;
                made.push(connection);
                video_dispatcher = Some(dispatcher);
            }

            if let (Some(source), Some(config)) = (&pipeline.audio, audio_config) {
                let route = match config.request.mode {
                    AudioMode::Capture => {
                        let dispatcher =
                            Arc::new(FrameDispatcher::new(StreamKind::Audio, audio_callback));
                        let sink: Arc<dyn SampleSink> = dispatcher.clone();
                        audio_dispatcher = Some(dispatcher);
                        Route::Capture {
                            convert_to: None,
                            sink,
                        }
                    }
                    mode => Route::Render(mode),
                };
                let connection = self
                    .framework
                    .connect(pipeline.graph, source.pin, route)
                    .map_err(|source| CaptureError::ConnectFailed {
                        stream: StreamKind::Audio,
                        source,
                    })?;
                made.push(connection);
            }
            Ok(())
        })();

        if let Err(e) = outcome {
            warn!(
                "Connecting pipeline {} failed, rolling back {} connections: {}",
                pipeline.id,
                made.len(),
                e
            );
            for connection in made {
                self.framework.disconnect(pipeline.graph, connection);
            }
            return Err(e);
        }

        pipeline.connections = made;
        pipeline.video_dispatcher = video_dispatcher;
        pipeline.audio_dispatcher = audio_dispatcher;
        info!("Pipeline {} connected", pipeline.id);
        self.state = GraphState::Connected;
        Ok(())
    }

    /// Begin sample delivery
    pub fn start(&mut self) -> CaptureResult<()> {
        match self.state {
            GraphState::Connected => {}
            GraphState::Started => return Err(CaptureError::AlreadyStarted),
            state => return Err(CaptureError::NotReady { state }),
        }

        let device = self.video_device_id().or(self.audio_device_id()).map(|id| id.name.clone());
        let pipeline = self.pipeline.as_mut().ok_or(CaptureError::NotReady { state: self.state })?;

        // Dispatchers go live first so the first samples are not dropped
        pipeline.activate(self.video.as_ref(), self.audio.as_ref());
        match self.framework.run(pipeline.graph) {
            Ok(()) => {
                pipeline.running = true;
                self.state = GraphState::Started;
                info!("Pipeline {} started", pipeline.id);
                Ok(())
            }
            Err(e) => {
                pipeline.deactivate();
                self.framework.stop(pipeline.graph);
                warn!("Pipeline {} failed to start: {}", pipeline.id, e);
                match e {
                    HostError::InUse => Err(CaptureError::DeviceInUse {
                        device: device.unwrap_or_default(),
                    }),
                    source => Err(CaptureError::StartFailed { source }),
                }
            }
        }
    }

    /// Halt sample delivery
    ///
    /// Does nothing unless started. When it returns no callback is running
    /// and none will run until the next `start`.
    pub fn stop(&mut self) {
        if self.state != GraphState::Started {
            return;
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.halt();
            info!("Pipeline {} stopped", pipeline.id);
        }
        self.state = GraphState::Connected;
    }

    /// Tear everything down and build a fresh, empty graph
    ///
    /// If the rebuild fails the graph stays uninitialized and the error is
    /// returned.
    pub fn reset_graph(&mut self) -> CaptureResult<()> {
        self.shutdown_graph();
        self.create_graph()
    }

    /// Tear everything down without rebuilding
    pub fn shutdown_graph(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            info!("Shutting down pipeline {} ({})", pipeline.id, self.state);
        }
        self.video = None;
        self.audio = None;
        self.state = GraphState::Uninitialized;
    }

    /// Resolved video configuration of the configured source
    pub fn video_config(&self) -> Option<&ResolvedVideoConfig> {
        self.video.as_ref()
    }

    /// Resolved audio configuration of the configured source
    pub fn audio_config(&self) -> Option<&ResolvedAudioConfig> {
        self.audio.as_ref()
    }

    /// Identity of the device feeding the video stream
    pub fn video_device_id(&self) -> Option<&DeviceId> {
        self.pipeline.as_ref()?.video.as_ref().map(|s| &s.device)
    }

    /// Identity of the device feeding the audio stream
    pub fn audio_device_id(&self) -> Option<&DeviceId> {
        self.pipeline.as_ref()?.audio.as_ref().map(|s| &s.device)
    }

    /// Delivery counters of a connected stream
    pub fn dispatch_stats(&self, stream: StreamKind) -> Option<DispatchStats> {
        let pipeline = self.pipeline.as_ref()?;
        match stream {
            StreamKind::Video => pipeline.video_dispatcher.as_ref().map(|d| d.stats()),
            StreamKind::Audio => pipeline.audio_dispatcher.as_ref().map(|d| d.stats()),
        }
    }

    /// Show a native property page owned by `window`
    pub fn open_dialog(&self, window: WindowHandle, kind: DialogKind) -> CaptureResult<()> {
        let (stream, source) = match kind {
            DialogKind::ConfigAudio => (StreamKind::Audio, self.source(StreamKind::Audio)),
            _ => (StreamKind::Video, self.source(StreamKind::Video)),
        };
        let filter = source
            .ok_or_else(|| CaptureError::InvalidConfiguration {
                message: format!("no {} source configured", stream),
            })?
            .filter;

        let target = match kind {
            DialogKind::ConfigVideo | DialogKind::ConfigAudio => PropertyTarget::Filter(filter),
            DialogKind::ConfigCrossbar => PropertyTarget::Crossbar {
                filter,
                upstream: false,
            },
            DialogKind::ConfigCrossbar2 => PropertyTarget::Crossbar {
                filter,
                upstream: true,
            },
        };
        self.framework.open_property_page(window, target)?;
        Ok(())
    }

    fn source(&self, stream: StreamKind) -> Option<&SourceFilter> {
        let pipeline = self.pipeline.as_ref()?;
        match stream {
            StreamKind::Video => pipeline.video.as_ref(),
            StreamKind::Audio => pipeline.audio.as_ref(),
        }
    }

    fn video_source(&self, purpose: &str) -> CaptureResult<&SourceFilter> {
        self.source(StreamKind::Video)
            .ok_or_else(|| CaptureError::InvalidConfiguration {
                message: format!("{} requires a configured video source", purpose),
            })
    }

    fn configurable_graph(&self, operation: &'static str) -> CaptureResult<GraphId> {
        match (self.state, self.pipeline.as_ref()) {
            (GraphState::Built | GraphState::Configured, Some(pipeline)) => Ok(pipeline.graph),
            (state, _) => Err(CaptureError::InvalidState { operation, state }),
        }
    }

    fn pipeline_mut(&mut self) -> CaptureResult<&mut PipelineHandle> {
        let state = self.state;
        self.pipeline.as_mut().ok_or(CaptureError::InvalidState {
            operation: "configure",
            state,
        })
    }

    fn video_pin(
        &self,
        filter: FilterId,
        name_quirk: Option<EncodedDevice>,
    ) -> CaptureResult<(PinId, Option<EncodedDevice>)> {
        if let Some(pin) = self
            .framework
            .find_pin(filter, PinQuery::capture_output(StreamKind::Video))?
        {
            return Ok((pin, name_quirk));
        }
        for quirk in self.enumerator.quirks().pin_quirks() {
            if let Some(pin) = self
                .framework
                .find_pin_by_name(filter, PinDirection::Output, quirk.pin_name)?
            {
                return Ok((pin, Some(name_quirk.unwrap_or(quirk.device))));
            }
        }
        Err(CaptureError::ConfigurationRejected {
            stream: StreamKind::Video,
            reason: "device has no video output pin".to_string(),
        })
    }

    fn attach_audio_filter(
        &self,
        graph: GraphId,
        raw: &RawDevice,
        resolved: ResolvedAudioConfig,
    ) -> CaptureResult<(SourceFilter, ResolvedAudioConfig)> {
        let framework = &*self.framework;
        attach_source(framework, graph, DeviceCategory::Audio, raw, |filter| {
            let pin = framework
                .find_pin(filter, PinQuery::capture_output(StreamKind::Audio))?
                .ok_or_else(|| CaptureError::ConfigurationRejected {
                    stream: StreamKind::Audio,
                    reason: format!("'{}' has no audio capture pin", raw.name),
                })?;
            let device = DeviceId::new(raw.name.clone(), raw.path.clone());
            let resolved = self.apply_audio(&device, pin, None, resolved)?;
            let source = SourceFilter {
                device,
                filter,
                pin,
                owned: true,
                encoded: None,
            };
            Ok((source, resolved))
        })
    }

    fn apply_audio(
        &self,
        device: &DeviceId,
        pin: PinId,
        encoded: Option<&EncodedDevice>,
        resolved: ResolvedAudioConfig,
    ) -> CaptureResult<ResolvedAudioConfig> {
        let live = match encoded {
            Some(encoded) => vec![encoded.audio_caps()],
            None => self.framework.audio_caps(pin)?,
        };

        // Audio pins of video devices are not in the audio catalog, so
        // explicit requests for them are matched here against the live caps
        let mut resolved = if resolved.negotiated.is_none() && !resolved.request.use_default {
            let entry = AudioDeviceEntry::new(device.clone(), live.clone());
            match_audio(&resolved.request, &entry)?
        } else {
            resolved
        };
        validate_audio(&resolved, &live)?;

        match (resolved.negotiated, encoded) {
            (Some(_), Some(_)) => {}
            (Some(mode), None) => self.framework.set_audio_format(pin, &mode).map_err(|e| {
                CaptureError::ConfigurationRejected {
                    stream: StreamKind::Audio,
                    reason: e.to_string(),
                }
            })?,
            (None, Some(encoded)) => resolved.negotiated = Some(encoded.audio_mode()),
            (None, None) => resolved.negotiated = self.framework.audio_format(pin)?,
        }
        Ok(resolved)
    }
}

/// Instantiate a device filter, add it to the graph and run `inspect` on it
///
/// On any failure the filter is taken out of the graph again and released.
fn attach_source<T>(
    framework: &dyn MediaFramework,
    graph: GraphId,
    category: DeviceCategory,
    device: &RawDevice,
    inspect: impl FnOnce(FilterId) -> CaptureResult<T>,
) -> CaptureResult<T> {
    let filter = FilterGuard::instantiate(framework, category, device)?;
    framework
        .add_filter(graph, filter.id())
        .map_err(|source| CaptureError::GraphBuildFailed { source })?;

    match inspect(filter.id()) {
        Ok(value) => {
            filter.keep();
            Ok(value)
        }
        Err(e) => {
            debug!("Removing '{}' from graph after failure: {}", device.name, e);
            framework.remove_filter(graph, filter.id());
            Err(e)
        }
    }
}

fn live_video_caps(
    framework: &dyn MediaFramework,
    pin: PinId,
) -> CaptureResult<Vec<VideoCapabilitySet>> {
    Ok(framework
        .video_caps(pin)?
        .into_iter()
        .filter(|caps| caps.validate().is_ok())
        .collect())
}

fn describe_device(device: &DeviceId, location: Option<&str>) -> String {
    match location.filter(|loc| !loc.is_empty()) {
        Some(location) => format!("'{}' at {}", device.name, location),
        None if device.is_unspecified() => "any device".to_string(),
        None if device.path.is_empty() => format!("'{}'", device.name),
        None => format!("'{}' ({})", device.name, device.path),
    }
}

fn discard_frame<C>(_frame: &Frame<'_, C>) {}
