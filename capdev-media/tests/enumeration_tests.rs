//! Integration tests for device enumeration
//!
//! Covers quirk handling, exception pins, location resolution and the
//! skipping of devices that cannot be inspected.

use capdev_core::*;
use capdev_media::*;
use std::sync::Arc;

const CAMERA_PATH: &str =
    r"\\?\usb#vid_046d&pid_0825&mi_00#6&2b8a6e6b&0&0000#{65e8773d-8f56-11d0-a3b9-00a0c9223196}\global";
const TWIN_PATH: &str =
    r"\\?\usb#vid_046d&pid_0825&mi_00#6&11111111&0&0000#{65e8773d-8f56-11d0-a3b9-00a0c9223196}\global";
const C875_PATH: &str = r"\\?\usb#vid_07ca&pid_0875#5&1a2b3c4d&0&2#{65e8773d-8f56-11d0-a3b9-00a0c9223196}\global";

fn webcam_caps() -> Vec<VideoCapabilitySet> {
    vec![
        VideoCapabilitySet {
            min_width: 160,
            max_width: 1920,
            width_step: 8,
            min_height: 120,
            max_height: 1080,
            height_step: 8,
            min_frame_interval: 333_333,
            max_frame_interval: 2_000_000,
            format: VideoFormat::MJPEG,
        },
        VideoCapabilitySet {
            min_width: 640,
            max_width: 1280,
            width_step: 1,
            min_height: 480,
            max_height: 720,
            height_step: 1,
            min_frame_interval: 333_333,
            max_frame_interval: 2_000_000,
            format: VideoFormat::YUY2,
        },
    ]
}

fn enumerator(host: &Arc<SimulatedHost>) -> DeviceEnumerator {
    DeviceEnumerator::new(host.clone(), host.clone())
}

// ============================================================================
// CATALOG CONTENT TESTS
// ============================================================================

#[test]
fn test_webcam_and_c875_catalog() {
    let host = Arc::new(SimulatedHost::with_devices(vec![
        SimulatedDevice::camera("HD Pro Webcam C920", CAMERA_PATH, webcam_caps()),
        // The C875 reports bogus raw modes; the quirk table knows better
        SimulatedDevice::camera("AVerMedia HD Capture C875", C875_PATH, webcam_caps()),
    ]));

    let devices = enumerator(&host).video_devices().unwrap();
    assert_eq!(devices.len(), 2);

    let webcam = &devices[0];
    assert_eq!(webcam.name(), "HD Pro Webcam C920");
    assert_eq!(webcam.capabilities, webcam_caps());
    assert!(!webcam.has_attached_audio);

    let c875 = &devices[1];
    assert_eq!(c875.name(), "AVerMedia HD Capture C875");
    assert_eq!(c875.path(), C875_PATH);
    assert_eq!(
        c875.capabilities,
        vec![VideoCapabilitySet::fixed(1920, 1080, 166_833, VideoFormat::H264)]
    );
    assert!(c875.has_attached_audio);
    assert!(!c875.audio_is_separate_filter);

    // Inspection never leaks filter objects
    assert_eq!(host.live_filters(), 0);
}

#[test]
fn test_enumeration_is_idempotent() {
    let host = Arc::new(SimulatedHost::with_devices(vec![
        SimulatedDevice::camera("HD Pro Webcam C920", CAMERA_PATH, webcam_caps()),
        SimulatedDevice::encoded("Roxio Video Capture USB", "roxio#1", "TS Out"),
    ]));
    let enumerator = enumerator(&host);

    let first = enumerator.video_devices().unwrap();
    let second = enumerator.video_devices().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_hotplug_shows_on_next_call() {
    let host = Arc::new(SimulatedHost::new());
    let enumerator = enumerator(&host);
    assert!(enumerator.video_devices().unwrap().is_empty());

    host.plug(SimulatedDevice::camera("HD Pro Webcam C920", CAMERA_PATH, webcam_caps()));
    assert_eq!(enumerator.video_devices().unwrap().len(), 1);

    host.unplug(CAMERA_PATH);
    assert!(enumerator.video_devices().unwrap().is_empty());
}

// ============================================================================
// QUIRK TESTS
// ============================================================================

#[test]
fn test_name_quirk_wins_over_exception_pin() {
    let host = Arc::new(SimulatedHost::with_devices(vec![SimulatedDevice::encoded(
        "Hauppauge HD PVR Capture Device",
        "hdpvr#1",
        "TS Out",
    )]));

    let devices = enumerator(&host).video_devices().unwrap();
    assert_eq!(devices.len(), 1);
    let caps = &devices[0].capabilities[0];
    assert_eq!(caps.format, VideoFormat::H264);
    assert_eq!(caps.min_frame_interval, 333_667);
}

#[test]
fn test_exception_pins_identify_encoded_devices() {
    let host = Arc::new(SimulatedHost::with_devices(vec![
        SimulatedDevice::encoded("Hauppauge HD PVR 2", "hdpvr2#1", "656"),
        SimulatedDevice::encoded("Roxio Video Capture USB", "roxio#1", "TS Out"),
        SimulatedDevice::encoded("Mystery Box", "mystery#1", "Analog Out"),
    ]));

    let devices = enumerator(&host).video_devices().unwrap();
    let names: Vec<_> = devices.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Hauppauge HD PVR 2", "Roxio Video Capture USB"]);
    for device in &devices {
        assert_eq!(
            device.capabilities,
            vec![VideoCapabilitySet::fixed(1920, 1080, 166_833, VideoFormat::H264)]
        );
        assert!(device.has_attached_audio);
    }
}

#[test]
fn test_quirks_can_be_disabled() {
    let host = Arc::new(SimulatedHost::with_devices(vec![SimulatedDevice::camera(
        "AVerMedia HD Capture C875",
        C875_PATH,
        webcam_caps(),
    )]));

    let devices = enumerator(&host)
        .with_quirks(QuirkTable::empty())
        .video_devices()
        .unwrap();
    assert_eq!(devices[0].capabilities, webcam_caps());
}

// ============================================================================
// AUDIO ATTACHMENT TESTS
// ============================================================================

#[test]
fn test_audio_attachment_flags() {
    let host = Arc::new(SimulatedHost::with_devices(vec![
        SimulatedDevice::camera("Camera With Mic", "cam#mic", webcam_caps())
            .with_audio_pin(vec![AudioCapabilitySet::fixed(2, 48_000, AudioFormat::Wave16bit)]),
        SimulatedDevice::camera("Capture Card", "card#1", webcam_caps()),
        SimulatedDevice::microphone(
            "Capture Card Audio",
            "card#audio",
            vec![AudioCapabilitySet::fixed(2, 48_000, AudioFormat::Wave16bit)],
        )
        .sibling_of("card#1"),
        SimulatedDevice::camera("Pathless Camera", "", webcam_caps()),
    ]));

    let devices = enumerator(&host).video_devices().unwrap();
    assert_eq!(devices.len(), 3);

    assert!(devices[0].has_attached_audio);
    assert!(!devices[0].audio_is_separate_filter);

    assert!(devices[1].has_attached_audio);
    assert!(devices[1].audio_is_separate_filter);

    assert!(!devices[2].has_attached_audio);
    assert!(!devices[2].audio_is_separate_filter);
}

#[test]
fn test_audio_catalog() {
    let host = Arc::new(SimulatedHost::with_devices(vec![
        SimulatedDevice::microphone(
            "Microphone",
            "mic#1",
            vec![
                AudioCapabilitySet::fixed(1, 44_100, AudioFormat::Wave16bit),
                // Zero granularity is dropped, the device is kept
                AudioCapabilitySet {
                    channels_step: 0,
                    ..AudioCapabilitySet::fixed(2, 48_000, AudioFormat::Wave16bit)
                },
            ],
        ),
        SimulatedDevice::camera("Camera", "cam#1", webcam_caps()),
    ]));

    let devices = enumerator(&host).audio_devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name(), "Microphone");
    assert_eq!(devices[0].capabilities.len(), 1);
}

// ============================================================================
// FAILURE HANDLING TESTS
// ============================================================================

#[test]
fn test_unreadable_devices_are_skipped() {
    let mut inverted = webcam_caps();
    inverted[0].min_width = 4000;

    let host = Arc::new(SimulatedHost::with_devices(vec![
        SimulatedDevice::camera("Broken Driver", "broken#1", webcam_caps()).unreadable(),
        SimulatedDevice::camera("Flaky Caps", "flaky#1", webcam_caps()).caps_unreadable(),
        SimulatedDevice::camera("No Modes", "empty#1", Vec::new()),
        SimulatedDevice::camera("Half Valid", "half#1", inverted),
        SimulatedDevice::camera("HD Pro Webcam C920", CAMERA_PATH, webcam_caps()),
    ]));

    let devices = enumerator(&host).video_devices().unwrap();
    let names: Vec<_> = devices.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["No Modes", "Half Valid", "HD Pro Webcam C920"]);

    assert!(devices[0].is_unusable());
    assert_eq!(devices[1].capabilities.len(), 1);
    assert_eq!(host.live_filters(), 0);
}

#[test]
fn test_category_walk_failure_is_reported() {
    let host = Arc::new(SimulatedHost::with_devices(vec![SimulatedDevice::camera(
        "HD Pro Webcam C920",
        CAMERA_PATH,
        webcam_caps(),
    )]));
    host.fail(Fault::EnumerateVideo);

    let err = enumerator(&host).video_devices().unwrap_err();
    assert!(matches!(err, CaptureError::DeviceEnumerationFailed { .. }));
    assert_eq!(err.category(), ErrorCategory::Device);

    // The audio walk is independent
    assert!(enumerator(&host).audio_devices().unwrap().is_empty());
}

// ============================================================================
// LOCATION TESTS
// ============================================================================

fn twin_host() -> Arc<SimulatedHost> {
    let host = Arc::new(SimulatedHost::with_devices(vec![
        SimulatedDevice::camera("HD Pro Webcam C920", CAMERA_PATH, webcam_caps()),
        SimulatedDevice::camera("HD Pro Webcam C920", TWIN_PATH, webcam_caps()),
    ]));
    host.set_instance_records(vec![
        InstanceRecord::new(
            r"USB\VID_046D&PID_0825&MI_00\6&11111111&0&0000",
            "0000.0014.0000.011.000.000.000.000.000",
        ),
        InstanceRecord {
            instance_id: None,
            location: Some("unreadable".to_string()),
        },
        InstanceRecord::new(
            r"USB\VID_046D&PID_0825&MI_00\6&2B8A6E6B&0&0000",
            "0000.0014.0000.002.002.000.000.000.000",
        ),
    ]);
    host
}

#[test]
fn test_identical_models_get_distinct_locations() {
    let host = twin_host();
    let devices = enumerator(&host).video_devices().unwrap();

    assert_eq!(
        devices[0].location_id.as_deref(),
        Some("0000.0014.0000.002.002.000.000.000.000")
    );
    assert_eq!(
        devices[1].location_id.as_deref(),
        Some("0000.0014.0000.011.000.000.000.000.000")
    );

    let chosen = select_device(
        &devices,
        &DeviceId::new("HD Pro Webcam C920", ""),
        Some("0000.0014.0000.011.000.000.000.000.000"),
    )
    .unwrap();
    assert_eq!(chosen.path(), TWIN_PATH);
}

#[test]
fn test_missing_location_is_not_an_error() {
    let host = twin_host();

    let disabled = enumerator(&host)
        .with_location_resolution(false)
        .video_devices()
        .unwrap();
    assert!(disabled.iter().all(|d| d.location_id.is_none()));

    host.fail(Fault::Registry);
    let unavailable = enumerator(&host).video_devices().unwrap();
    assert_eq!(unavailable.len(), 2);
    assert!(unavailable.iter().all(|d| d.location_id.is_none()));
}

#[test]
fn test_saved_location_falls_back_to_path_without_registry() {
    let host = twin_host();
    host.fail(Fault::Registry);
    let mut device = Device::simulated(host.clone());

    let request = RequestedVideoConfig::new(1280, 720)
        .with_fps(30.0)
        .with_device(DeviceId::new("HD Pro Webcam C920", TWIN_PATH))
        .with_location("0000.0014.0000.011.000.000.000.000.000");

    let resolved = device.resolve_video(&request).unwrap();
    assert_eq!(resolved.negotiated.unwrap().width, 1280);

    device.create_graph().unwrap();
    device.set_video_config(resolved).unwrap();
    assert_eq!(device.video_device_id().unwrap().path, TWIN_PATH);
}
