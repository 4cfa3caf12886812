//! Tests for the shared capture data model

use capdev_core::*;

#[test]
fn test_requests_persist_as_json() {
    // Applications store the selected device and mode between sessions
    let request = RequestedVideoConfig::new(1920, 1080)
        .with_device(DeviceId::new("HD Pro Webcam C920", "usb#cam#1"))
        .with_location("0000.0014.0000.002.002.000.000.000.000")
        .with_fps(30.0)
        .with_format(VideoFormat::I420);

    let json = serde_json::to_string(&request).unwrap();
    let back: RequestedVideoConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
    assert_eq!(back.frame_interval, Some(333_333));
    assert!(!back.use_default);
}

#[test]
fn test_device_default_request() {
    let request = RequestedVideoConfig::device_default();
    assert!(request.use_default);
    assert!(request.device.is_unspecified());
    assert_eq!(request.internal_format, VideoFormat::Any);

    let audio = RequestedAudioConfig::default();
    assert_eq!(audio.source, AudioSource::Device);
}

#[test]
fn test_conversion_only_when_formats_differ() {
    let mode = NegotiatedVideo {
        width: 1280,
        height: 720,
        frame_interval: 333_333,
        format: VideoFormat::YUY2,
    };
    let mut resolved = ResolvedVideoConfig {
        request: RequestedVideoConfig::new(1280, 720),
        capability: None,
        negotiated: Some(mode),
    };
    assert!(!resolved.needs_conversion());
    assert_eq!(resolved.output_format(), VideoFormat::YUY2);

    resolved.request.format = VideoFormat::ARGB;
    assert!(resolved.needs_conversion());
    assert_eq!(resolved.output_format(), VideoFormat::ARGB);

    resolved.request.format = VideoFormat::YUY2;
    assert!(!resolved.needs_conversion());
}

#[test]
fn test_catalog_entry_accessors() {
    let entry = VideoDeviceEntry::new(
        DeviceId::new("Hauppauge HD PVR Capture Device", "hdpvr#1"),
        vec![VideoCapabilitySet::fixed(1920, 1080, 333_667, VideoFormat::H264)],
    );
    assert_eq!(entry.name(), "Hauppauge HD PVR Capture Device");
    assert_eq!(entry.path(), "hdpvr#1");
    assert!(!entry.is_unusable());
    assert!(entry.location_id.is_none());

    let empty = AudioDeviceEntry::new(DeviceId::new("Line In", "line#1"), Vec::new());
    assert!(empty.is_unusable());
}

#[test]
fn test_interval_conversions() {
    assert_eq!(frame_interval_from_fps(30.0), 333_333);
    assert_eq!(frame_interval_from_fps(0.0), 0);
    assert!((fps_from_frame_interval(166_833) - 59.94).abs() < 0.01);
    assert_eq!(fps_from_frame_interval(0), 0.0);
}

#[test]
fn test_state_and_stream_names() {
    assert_eq!(GraphState::Uninitialized.to_string(), "uninitialized");
    assert_eq!(GraphState::Started.to_string(), "started");
    assert_eq!(StreamKind::Video.to_string(), "video");

    let error = CaptureError::InvalidState {
        operation: "connect_filters",
        state: GraphState::Built,
    };
    assert_eq!(
        error.to_string(),
        "Invalid state for connect_filters: graph is built"
    );
    assert_eq!(error.category(), ErrorCategory::State);
}
