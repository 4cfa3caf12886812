//! In-memory host for platforms without a native binding and for tests
//!
//! `SimulatedHost` implements both host collaborator traits over a list of
//! fake devices. Individual native operations can be made to fail, and
//! samples are pushed through running graphs with `deliver_video` /
//! `deliver_audio`, the way a native delivery thread would.

use capdev_core::{
    AudioCapabilitySet, ConnectionId, DeviceCategory, DeviceRegistry, FilterId, GraphId,
    HostError, HostResult, InstanceRecord, MediaFramework, NegotiatedAudio, NegotiatedVideo,
    PinCategory, PinDirection, PinId, PinQuery, PropertyTarget, RawDevice, RawSample, Route,
    SampleSink, StreamKind, VideoCapabilitySet, VideoFormat, WindowHandle,
    CAMERA_INTERFACE_CLASS,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

const E_FAIL: i32 = 0x8000_4005_u32 as i32;
const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;
const VFW_E_ALREADY_CONNECTED: i32 = 0x8004_0204_u32 as i32;
const VFW_E_NOT_IN_GRAPH: i32 = 0x8004_025F_u32 as i32;

/// Native operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    EnumerateVideo,
    EnumerateAudio,
    Registry,
    CreateGraph,
    AddFilter,
    SetFormat,
    ConnectVideo,
    ConnectAudio,
    Run,
}

/// A fake capture device
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub name: String,
    pub path: String,
    pub category: DeviceCategory,
    /// Capabilities of the video capture pin, `None` without such a pin
    pub video_caps: Option<Vec<VideoCapabilitySet>>,
    /// Capabilities of the audio capture pin, `None` without such a pin
    pub audio_caps: Option<Vec<AudioCapabilitySet>>,
    /// Extra output pins found by name only
    pub named_pins: Vec<String>,
    /// Path of the video device this audio filter belongs to
    pub sibling_of: Option<String>,
    /// Mode reported before any format is applied
    pub default_video: Option<NegotiatedVideo>,
    pub has_crossbar: bool,
    /// Filter cannot be instantiated
    pub unreadable: bool,
    /// Capability queries fail
    pub caps_unreadable: bool,
    /// Another client holds the device
    pub in_use: bool,
}

impl SimulatedDevice {
    fn base(name: &str, path: &str, category: DeviceCategory) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            category,
            video_caps: None,
            audio_caps: None,
            named_pins: Vec::new(),
            sibling_of: None,
            default_video: None,
            has_crossbar: false,
            unreadable: false,
            caps_unreadable: false,
            in_use: false,
        }
    }

    /// Video device with a standard capture pin
    pub fn camera(name: &str, path: &str, caps: Vec<VideoCapabilitySet>) -> Self {
        Self {
            video_caps: Some(caps),
            ..Self::base(name, path, DeviceCategory::Video)
        }
    }

    /// Video device without a capture pin, exposing a named output pin
    pub fn encoded(name: &str, path: &str, pin_name: &str) -> Self {
        Self {
            named_pins: vec![pin_name.to_string()],
            ..Self::base(name, path, DeviceCategory::Video)
        }
    }

    /// Audio input device
    pub fn microphone(name: &str, path: &str, caps: Vec<AudioCapabilitySet>) -> Self {
        Self {
            audio_caps: Some(caps),
            ..Self::base(name, path, DeviceCategory::Audio)
        }
    }

    /// Add an audio capture pin to this filter
    pub fn with_audio_pin(mut self, caps: Vec<AudioCapabilitySet>) -> Self {
        self.audio_caps = Some(caps);
        self
    }

    /// Tie this audio filter to a video device path
    pub fn sibling_of(mut self, video_path: &str) -> Self {
        self.sibling_of = Some(video_path.to_string());
        self
    }

    pub fn with_crossbar(mut self) -> Self {
        self.has_crossbar = true;
        self
    }

    pub fn with_default_video(mut self, mode: NegotiatedVideo) -> Self {
        self.default_video = Some(mode);
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    pub fn caps_unreadable(mut self) -> Self {
        self.caps_unreadable = true;
        self
    }

    pub fn in_use(mut self) -> Self {
        self.in_use = true;
        self
    }

    fn raw(&self) -> RawDevice {
        RawDevice::new(self.name.clone(), self.path.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinKind {
    Capture(StreamKind),
    Named,
}

#[derive(Debug)]
struct SimPin {
    filter: FilterId,
    kind: PinKind,
    name: String,
    active_video: Option<NegotiatedVideo>,
    active_audio: Option<NegotiatedAudio>,
}

#[derive(Debug)]
struct SimFilter {
    device: SimulatedDevice,
    pins: Vec<PinId>,
}

struct SimConnection {
    pin: PinId,
    stream: StreamKind,
    route: Route,
}

#[derive(Default)]
struct SimGraph {
    filters: HashSet<FilterId>,
    connections: HashMap<ConnectionId, SimConnection>,
    running: bool,
}

#[derive(Default)]
struct SimState {
    devices: Vec<SimulatedDevice>,
    records: Vec<InstanceRecord>,
    faults: HashSet<Fault>,
    next_id: u64,
    filters: HashMap<FilterId, SimFilter>,
    pins: HashMap<PinId, SimPin>,
    graphs: HashMap<GraphId, SimGraph>,
    run_calls: usize,
    conversions: Vec<VideoFormat>,
    property_pages: Vec<PropertyTarget>,
}

impl SimState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, fault: Fault, operation: &str) -> HostResult<()> {
        if self.faults.contains(&fault) {
            return Err(HostError::failed(operation, E_FAIL));
        }
        Ok(())
    }

    fn pin(&self, pin: PinId) -> HostResult<&SimPin> {
        self.pins
            .get(&pin)
            .ok_or_else(|| HostError::not_found(format!("pin {}", pin.0)))
    }

    fn device_of(&self, pin: PinId) -> HostResult<&SimulatedDevice> {
        let filter = self.pin(pin)?.filter;
        self.filters
            .get(&filter)
            .map(|f| &f.device)
            .ok_or_else(|| HostError::not_found(format!("filter {}", filter.0)))
    }
}

/// In-memory implementation of the host collaborators
#[derive(Default)]
pub struct SimulatedHost {
    state: Mutex<SimState>,
}

impl SimulatedHost {
    /// Host without devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with a fixed device list
    pub fn with_devices(devices: Vec<SimulatedDevice>) -> Self {
        let host = Self::new();
        host.state.lock().devices = devices;
        host
    }

    /// Attach a device
    pub fn plug(&self, device: SimulatedDevice) {
        self.state.lock().devices.push(device);
    }

    /// Detach every device with this path
    pub fn unplug(&self, path: &str) {
        self.state.lock().devices.retain(|d| d.path != path);
    }

    /// Replace the registry's instance records
    pub fn set_instance_records(&self, records: Vec<InstanceRecord>) {
        self.state.lock().records = records;
    }

    /// Make an operation fail until cleared
    pub fn fail(&self, fault: Fault) {
        self.state.lock().faults.insert(fault);
    }

    pub fn clear_fault(&self, fault: Fault) {
        self.state.lock().faults.remove(&fault);
    }

    /// Filter objects not yet released
    pub fn live_filters(&self) -> usize {
        self.state.lock().filters.len()
    }

    /// Graphs not yet destroyed
    pub fn live_graphs(&self) -> usize {
        self.state.lock().graphs.len()
    }

    /// Connections across all graphs
    pub fn connection_count(&self) -> usize {
        self.state.lock().graphs.values().map(|g| g.connections.len()).sum()
    }

    /// Whether any graph is running
    pub fn is_running(&self) -> bool {
        self.state.lock().graphs.values().any(|g| g.running)
    }

    /// Number of `run` calls, successful or not
    pub fn run_calls(&self) -> usize {
        self.state.lock().run_calls
    }

    /// Target formats of every conversion filter inserted so far
    pub fn conversions(&self) -> Vec<VideoFormat> {
        self.state.lock().conversions.clone()
    }

    /// Property pages opened so far
    pub fn opened_property_pages(&self) -> Vec<PropertyTarget> {
        self.state.lock().property_pages.clone()
    }

    /// Push a video sample through every running capture connection
    pub fn deliver_video(&self, data: &[u8], start_time: i64, stop_time: i64) -> usize {
        self.deliver(StreamKind::Video, data, start_time, stop_time)
    }

    /// Push an audio sample through every running capture connection
    pub fn deliver_audio(&self, data: &[u8], start_time: i64, stop_time: i64) -> usize {
        self.deliver(StreamKind::Audio, data, start_time, stop_time)
    }

    fn deliver(&self, stream: StreamKind, data: &[u8], start_time: i64, stop_time: i64) -> usize {
        // Sinks run outside the state lock, like on a real delivery thread
        let sinks: Vec<Arc<dyn SampleSink>> = {
            let state = self.state.lock();
            state
                .graphs
                .values()
                .filter(|graph| graph.running)
                .flat_map(|graph| graph.connections.values())
                .filter(|conn| conn.stream == stream)
                .filter_map(|conn| match &conn.route {
                    Route::Capture { sink, .. } => Some(Arc::clone(sink)),
                    Route::Render(_) => None,
                })
                .collect()
        };

        let sample = RawSample {
            data,
            start_time,
            stop_time,
        };
        for sink in &sinks {
            sink.on_sample(sample);
        }
        sinks.len()
    }
}

impl MediaFramework for SimulatedHost {
    fn create_graph(&self) -> HostResult<GraphId> {
        let mut state = self.state.lock();
        state.check(Fault::CreateGraph, "create filter graph")?;
        let graph = GraphId(state.next());
        state.graphs.insert(graph, SimGraph::default());
        debug!("Simulated graph {} created", graph.0);
        Ok(graph)
    }

    fn destroy_graph(&self, graph: GraphId) {
        self.state.lock().graphs.remove(&graph);
    }

    fn enumerate_devices(&self, category: DeviceCategory) -> HostResult<Vec<RawDevice>> {
        let state = self.state.lock();
        match category {
            DeviceCategory::Video => state.check(Fault::EnumerateVideo, "enumerate video devices")?,
            DeviceCategory::Audio => state.check(Fault::EnumerateAudio, "enumerate audio devices")?,
        }
        Ok(state
            .devices
            .iter()
            .filter(|d| d.category == category)
            .map(SimulatedDevice::raw)
            .collect())
    }

    fn instantiate(&self, category: DeviceCategory, device: &RawDevice) -> HostResult<FilterId> {
        let mut state = self.state.lock();
        let found = state
            .devices
            .iter()
            .find(|d| d.category == category && d.name == device.name && d.path == device.path)
            .cloned()
            .ok_or_else(|| HostError::not_found(format!("device '{}'", device.name)))?;
        if found.unreadable {
            return Err(HostError::failed(format!("bind '{}'", found.name), E_FAIL));
        }

        let filter = FilterId(state.next());
        let mut kinds = Vec::new();
        if found.video_caps.is_some() {
            kinds.push((PinKind::Capture(StreamKind::Video), "Capture".to_string()));
        }
        if found.audio_caps.is_some() {
            kinds.push((PinKind::Capture(StreamKind::Audio), "Audio".to_string()));
        }
        kinds.extend(found.named_pins.iter().map(|n| (PinKind::Named, n.clone())));

        let mut pins = Vec::with_capacity(kinds.len());
        for (kind, name) in kinds {
            let pin = PinId(state.next());
            state.pins.insert(
                pin,
                SimPin {
                    filter,
                    kind,
                    name,
                    active_video: None,
                    active_audio: None,
                },
            );
            pins.push(pin);
        }
        state.filters.insert(filter, SimFilter { device: found, pins });
        Ok(filter)
    }

    fn release(&self, filter: FilterId) {
        let mut state = self.state.lock();
        if let Some(removed) = state.filters.remove(&filter) {
            for pin in removed.pins {
                state.pins.remove(&pin);
            }
        }
    }

    fn find_audio_sibling(&self, device_path: &str) -> HostResult<Option<RawDevice>> {
        let state = self.state.lock();
        Ok(state
            .devices
            .iter()
            .find(|d| {
                d.category == DeviceCategory::Audio && d.sibling_of.as_deref() == Some(device_path)
            })
            .map(SimulatedDevice::raw))
    }

    fn add_filter(&self, graph: GraphId, filter: FilterId) -> HostResult<()> {
        let mut state = self.state.lock();
        state.check(Fault::AddFilter, "add filter to graph")?;
        if !state.filters.contains_key(&filter) {
            return Err(HostError::not_found(format!("filter {}", filter.0)));
        }
        let graph = state
            .graphs
            .get_mut(&graph)
            .ok_or_else(|| HostError::not_found(format!("graph {}", graph.0)))?;
        graph.filters.insert(filter);
        Ok(())
    }

    fn remove_filter(&self, graph: GraphId, filter: FilterId) {
        let mut state = self.state.lock();
        let pins: HashSet<PinId> = state
            .filters
            .get(&filter)
            .map(|f| f.pins.iter().copied().collect())
            .unwrap_or_default();
        if let Some(graph) = state.graphs.get_mut(&graph) {
            graph.filters.remove(&filter);
            graph.connections.retain(|_, conn| !pins.contains(&conn.pin));
        }
    }

    fn find_pin(&self, filter: FilterId, query: PinQuery) -> HostResult<Option<PinId>> {
        let state = self.state.lock();
        let sim = state
            .filters
            .get(&filter)
            .ok_or_else(|| HostError::not_found(format!("filter {}", filter.0)))?;
        if query.direction != PinDirection::Output || query.category != PinCategory::Capture {
            return Ok(None);
        }
        Ok(sim.pins.iter().copied().find(|pin| {
            state
                .pins
                .get(pin)
                .is_some_and(|p| p.kind == PinKind::Capture(query.media))
        }))
    }

    fn find_pin_by_name(
        &self,
        filter: FilterId,
        direction: PinDirection,
        name: &str,
    ) -> HostResult<Option<PinId>> {
        let state = self.state.lock();
        let sim = state
            .filters
            .get(&filter)
            .ok_or_else(|| HostError::not_found(format!("filter {}", filter.0)))?;
        if direction != PinDirection::Output {
            return Ok(None);
        }
        Ok(sim
            .pins
            .iter()
            .copied()
            .find(|pin| state.pins.get(pin).is_some_and(|p| p.name == name)))
    }

    fn video_caps(&self, pin: PinId) -> HostResult<Vec<VideoCapabilitySet>> {
        let state = self.state.lock();
        let device = state.device_of(pin)?;
        if device.caps_unreadable {
            return Err(HostError::failed("IAMStreamConfig::GetStreamCaps", E_FAIL));
        }
        Ok(device.video_caps.clone().unwrap_or_default())
    }

    fn audio_caps(&self, pin: PinId) -> HostResult<Vec<AudioCapabilitySet>> {
        let state = self.state.lock();
        let device = state.device_of(pin)?;
        if device.caps_unreadable {
            return Err(HostError::failed("IAMStreamConfig::GetStreamCaps", E_FAIL));
        }
        Ok(device.audio_caps.clone().unwrap_or_default())
    }

    fn set_video_format(&self, pin: PinId, mode: &NegotiatedVideo) -> HostResult<()> {
        let mut state = self.state.lock();
        state.check(Fault::SetFormat, "IAMStreamConfig::SetFormat")?;
        let supported = state.device_of(pin)?.video_caps.as_ref().is_some_and(|caps| {
            caps.iter().any(|c| {
                c.format == mode.format && c.contains(mode.width, mode.height, mode.frame_interval)
            })
        });
        if !supported {
            return Err(HostError::failed("IAMStreamConfig::SetFormat", E_INVALIDARG));
        }
        if let Some(sim) = state.pins.get_mut(&pin) {
            sim.active_video = Some(*mode);
        }
        Ok(())
    }

    fn video_format(&self, pin: PinId) -> HostResult<Option<NegotiatedVideo>> {
        let state = self.state.lock();
        if let Some(active) = state.pin(pin)?.active_video {
            return Ok(Some(active));
        }
        let device = state.device_of(pin)?;
        Ok(device.default_video.or_else(|| {
            device.video_caps.as_ref()?.first().map(|c| NegotiatedVideo {
                width: c.max_width,
                height: c.max_height,
                frame_interval: c.min_frame_interval,
                format: c.format,
            })
        }))
    }

    fn set_audio_format(&self, pin: PinId, mode: &NegotiatedAudio) -> HostResult<()> {
        let mut state = self.state.lock();
        state.check(Fault::SetFormat, "IAMStreamConfig::SetFormat")?;
        if let Some(sim) = state.pins.get_mut(&pin) {
            sim.active_audio = Some(*mode);
            return Ok(());
        }
        Err(HostError::not_found(format!("pin {}", pin.0)))
    }

    fn audio_format(&self, pin: PinId) -> HostResult<Option<NegotiatedAudio>> {
        let state = self.state.lock();
        if let Some(active) = state.pin(pin)?.active_audio {
            return Ok(Some(active));
        }
        let device = state.device_of(pin)?;
        Ok(device.audio_caps.as_ref().and_then(|caps| caps.first()).map(|c| NegotiatedAudio {
            sample_rate: c.max_sample_rate,
            channels: c.max_channels,
            format: c.format,
        }))
    }

    fn connect(&self, graph: GraphId, pin: PinId, route: Route) -> HostResult<ConnectionId> {
        let mut state = self.state.lock();
        let stream = match state.pin(pin)?.kind {
            PinKind::Capture(stream) => stream,
            PinKind::Named => StreamKind::Video,
        };
        match stream {
            StreamKind::Video => state.check(Fault::ConnectVideo, "connect video pin")?,
            StreamKind::Audio => state.check(Fault::ConnectAudio, "connect audio pin")?,
        }

        let filter = state.pin(pin)?.filter;
        let sim_graph = state
            .graphs
            .get(&graph)
            .ok_or_else(|| HostError::not_found(format!("graph {}", graph.0)))?;
        if !sim_graph.filters.contains(&filter) {
            return Err(HostError::failed("connect pin", VFW_E_NOT_IN_GRAPH));
        }
        if sim_graph.connections.values().any(|c| c.pin == pin) {
            return Err(HostError::failed("connect pin", VFW_E_ALREADY_CONNECTED));
        }

        if let Route::Capture {
            convert_to: Some(format),
            ..
        } = &route
        {
            state.conversions.push(*format);
        }

        let connection = ConnectionId(state.next());
        if let Some(sim_graph) = state.graphs.get_mut(&graph) {
            sim_graph.connections.insert(connection, SimConnection { pin, stream, route });
        }
        Ok(connection)
    }

    fn disconnect(&self, graph: GraphId, connection: ConnectionId) {
        if let Some(graph) = self.state.lock().graphs.get_mut(&graph) {
            graph.connections.remove(&connection);
        }
    }

    fn run(&self, graph: GraphId) -> HostResult<()> {
        let mut state = self.state.lock();
        state.run_calls += 1;
        state.check(Fault::Run, "IMediaControl::Run")?;

        let sim_graph = state
            .graphs
            .get(&graph)
            .ok_or_else(|| HostError::not_found(format!("graph {}", graph.0)))?;
        let busy = sim_graph
            .filters
            .iter()
            .filter_map(|f| state.filters.get(f))
            .any(|f| f.device.in_use);
        if busy {
            return Err(HostError::InUse);
        }

        if let Some(sim_graph) = state.graphs.get_mut(&graph) {
            sim_graph.running = true;
        }
        Ok(())
    }

    fn stop(&self, graph: GraphId) {
        if let Some(graph) = self.state.lock().graphs.get_mut(&graph) {
            graph.running = false;
        }
    }

    fn open_property_page(&self, _window: WindowHandle, target: PropertyTarget) -> HostResult<()> {
        let mut state = self.state.lock();
        let filter = match target {
            PropertyTarget::Filter(filter) => filter,
            PropertyTarget::Crossbar { filter, .. } => filter,
        };
        let sim = state
            .filters
            .get(&filter)
            .ok_or_else(|| HostError::not_found(format!("filter {}", filter.0)))?;
        if matches!(target, PropertyTarget::Crossbar { .. }) && !sim.device.has_crossbar {
            return Err(HostError::not_found("crossbar"));
        }
        state.property_pages.push(target);
        Ok(())
    }
}

impl DeviceRegistry for SimulatedHost {
    fn instance_records(&self, class: &str) -> HostResult<Vec<InstanceRecord>> {
        let state = self.state.lock();
        state.check(Fault::Registry, "SetupDiGetClassDevs")?;
        if class != CAMERA_INTERFACE_CLASS {
            return Ok(Vec::new());
        }
        Ok(state.records.clone())
    }
}
