//! Matching requested configurations against device capabilities

use capdev_core::{
    fps_from_frame_interval, AudioCapabilitySet, AudioDeviceEntry, CaptureError, CaptureResult,
    DeviceCatalogEntry, DeviceId, NegotiatedAudio, NegotiatedVideo, RequestedAudioConfig,
    RequestedVideoConfig, ResolvedAudioConfig, ResolvedVideoConfig, StreamKind,
    VideoCapabilitySet, VideoDeviceEntry,
};
use thiserror::Error;

/// No capability of a device satisfies a request
///
/// This is an expected outcome: the caller relaxes its constraints and asks
/// again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no capability of '{device}' satisfies {request}")]
pub struct NoMatch {
    /// Device display name
    pub device: String,
    /// Human readable form of the request
    pub request: String,
}

impl From<NoMatch> for CaptureError {
    fn from(no_match: NoMatch) -> Self {
        CaptureError::NoMatch {
            device: no_match.device,
            reason: format!("unsatisfiable request {}", no_match.request),
        }
    }
}

/// Resolve a video request against one catalog entry
///
/// Among the capabilities whose ranges contain the request, one producing the
/// requested output format directly wins over one needing conversion, then
/// the finer granularity wins, then enumeration order. Width and height are
/// rounded down to the capability's step, never outside its range.
pub fn match_video(
    requested: &RequestedVideoConfig,
    entry: &VideoDeviceEntry,
) -> Result<ResolvedVideoConfig, NoMatch> {
    if requested.use_default {
        return Ok(ResolvedVideoConfig {
            request: requested.clone(),
            capability: entry.capabilities.first().cloned(),
            negotiated: None,
        });
    }

    let mut best: Option<((bool, u64), &VideoCapabilitySet, NegotiatedVideo)> = None;
    for caps in &entry.capabilities {
        let Some(mode) = fit_video(requested, caps) else {
            continue;
        };
        let rank = (
            !requested.format.accepts(caps.format),
            caps.width_step as u64 + caps.height_step as u64,
        );
        if best.as_ref().map_or(true, |(best_rank, _, _)| rank < *best_rank) {
            best = Some((rank, caps, mode));
        }
    }

    match best {
        Some((_, caps, mode)) => Ok(ResolvedVideoConfig {
            request: requested.clone(),
            capability: Some(caps.clone()),
            negotiated: Some(mode),
        }),
        None => Err(NoMatch {
            device: entry.id.name.clone(),
            request: describe_video(requested),
        }),
    }
}

fn fit_video(
    requested: &RequestedVideoConfig,
    caps: &VideoCapabilitySet,
) -> Option<NegotiatedVideo> {
    if !requested.internal_format.accepts(caps.format)
        || !caps.format.converts_to(requested.format)
    {
        return None;
    }

    let width = caps.snap_width(requested.width)?;
    let height = caps.snap_height(requested.height)?;
    let frame_interval = match requested.frame_interval {
        Some(interval) if caps.contains_interval(interval) => interval,
        Some(_) => return None,
        None => caps.min_frame_interval,
    };

    Some(NegotiatedVideo {
        width,
        height,
        frame_interval,
        format: caps.format,
    })
}

fn describe_video(requested: &RequestedVideoConfig) -> String {
    let rate = match requested.frame_interval {
        Some(interval) => format!("{:.2} fps", fps_from_frame_interval(interval)),
        None => "any rate".to_string(),
    };
    format!(
        "{}x{} at {} ({} -> {})",
        requested.width, requested.height, rate, requested.internal_format, requested.format
    )
}

/// Resolve an audio request against one catalog entry
pub fn match_audio(
    requested: &RequestedAudioConfig,
    entry: &AudioDeviceEntry,
) -> Result<ResolvedAudioConfig, NoMatch> {
    if requested.use_default {
        return Ok(ResolvedAudioConfig {
            request: requested.clone(),
            capability: entry.capabilities.first().cloned(),
            negotiated: None,
        });
    }

    let mut best: Option<(u64, &AudioCapabilitySet, NegotiatedAudio)> = None;
    for caps in &entry.capabilities {
        let Some(mode) = fit_audio(requested, caps) else {
            continue;
        };
        let rank = caps.channels_step as u64 + caps.sample_rate_step as u64;
        if best.as_ref().map_or(true, |(best_rank, _, _)| rank < *best_rank) {
            best = Some((rank, caps, mode));
        }
    }

    match best {
        Some((_, caps, mode)) => Ok(ResolvedAudioConfig {
            request: requested.clone(),
            capability: Some(caps.clone()),
            negotiated: Some(mode),
        }),
        None => Err(NoMatch {
            device: entry.id.name.clone(),
            request: format!(
                "{} ch at {} Hz ({})",
                requested.channels, requested.sample_rate, requested.format
            ),
        }),
    }
}

fn fit_audio(
    requested: &RequestedAudioConfig,
    caps: &AudioCapabilitySet,
) -> Option<NegotiatedAudio> {
    if !requested.format.accepts(caps.format) {
        return None;
    }
    Some(NegotiatedAudio {
        sample_rate: caps.snap_sample_rate(requested.sample_rate)?,
        channels: caps.snap_channels(requested.channels)?,
        format: caps.format,
    })
}

/// Check a resolved video config against a filter's live capabilities
pub fn validate_video(
    resolved: &ResolvedVideoConfig,
    live: &[VideoCapabilitySet],
) -> CaptureResult<()> {
    let Some(mode) = resolved.negotiated else {
        return Ok(());
    };
    let supported = live.iter().any(|caps| {
        caps.format == mode.format && caps.contains(mode.width, mode.height, mode.frame_interval)
    });
    if supported {
        Ok(())
    } else {
        Err(CaptureError::ConfigurationRejected {
            stream: StreamKind::Video,
            reason: format!(
                "{}x{} {} at interval {} is not offered by the device",
                mode.width, mode.height, mode.format, mode.frame_interval
            ),
        })
    }
}

/// Check a resolved audio config against a filter's live capabilities
pub fn validate_audio(
    resolved: &ResolvedAudioConfig,
    live: &[AudioCapabilitySet],
) -> CaptureResult<()> {
    let Some(mode) = resolved.negotiated else {
        return Ok(());
    };
    let supported = live.iter().any(|caps| {
        caps.format == mode.format
            && caps.snap_channels(mode.channels) == Some(mode.channels)
            && caps.snap_sample_rate(mode.sample_rate) == Some(mode.sample_rate)
    });
    if supported {
        Ok(())
    } else {
        Err(CaptureError::ConfigurationRejected {
            stream: StreamKind::Audio,
            reason: format!(
                "{} ch at {} Hz {} is not offered by the device",
                mode.channels, mode.sample_rate, mode.format
            ),
        })
    }
}

/// Pick the catalog entry a request refers to
///
/// A non-empty location takes precedence over the path; the name, when set,
/// must always agree. When no entry carries the location (registry
/// unavailable, device moved) the path decides. A request naming nothing
/// selects the first entry.
pub fn select_device<'a, C>(
    entries: &'a [DeviceCatalogEntry<C>],
    device: &DeviceId,
    location: Option<&str>,
) -> Option<&'a DeviceCatalogEntry<C>> {
    let name_agrees =
        |entry: &DeviceCatalogEntry<C>| device.name.is_empty() || entry.id.name == device.name;

    if let Some(loc) = location.filter(|loc| !loc.is_empty()) {
        let by_location = entries
            .iter()
            .find(|entry| name_agrees(*entry) && entry.location_id.as_deref() == Some(loc));
        if by_location.is_some() {
            return by_location;
        }
    }

    entries.iter().find(|entry| {
        name_agrees(*entry) && (device.path.is_empty() || entry.id.path == device.path)
    })
}
