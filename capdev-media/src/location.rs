//! Physical location lookup for capture devices
//!
//! Two identical webcams share name and most of their path. The device
//! registry knows which USB port each instance sits on; the third segment of
//! the device path (`#`-separated) equals the third segment of the instance
//! id (`\`-separated), which ties the two together.

use capdev_core::InstanceRecord;

const PATH_SEPARATOR: char = '#';
const INSTANCE_SEPARATOR: char = '\\';
const ADDRESS_SEGMENT: usize = 2;

/// Device-address segment of a device path
pub fn path_address(device_path: &str) -> Option<&str> {
    device_path
        .split(PATH_SEPARATOR)
        .nth(ADDRESS_SEGMENT)
        .filter(|segment| !segment.is_empty())
}

/// Device-address segment of a registry instance id
pub fn instance_address(instance_id: &str) -> Option<&str> {
    instance_id
        .split(INSTANCE_SEPARATOR)
        .nth(ADDRESS_SEGMENT)
        .filter(|segment| !segment.is_empty())
}

/// Location of the first instance record whose address matches the path
///
/// Records with an unreadable id or location are skipped. No match is a
/// normal outcome.
pub fn resolve_location(device_path: &str, records: &[InstanceRecord]) -> Option<String> {
    let address = path_address(device_path)?;

    records.iter().find_map(|record| {
        let instance_id = record.instance_id.as_deref()?;
        let candidate = instance_address(instance_id)?;
        if !candidate.eq_ignore_ascii_case(address) {
            return None;
        }
        record.location.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = r"\\?\usb#vid_046d&pid_0825&mi_00#6&2b8a6e6b&0&0000#{65e8773d-8f56-11d0-a3b9-00a0c9223196}\global";

    #[test]
    fn test_address_segments() {
        assert_eq!(path_address(PATH), Some("6&2b8a6e6b&0&0000"));
        assert_eq!(
            instance_address(r"USB\VID_046D&PID_0825&MI_00\6&2B8A6E6B&0&0000"),
            Some("6&2B8A6E6B&0&0000")
        );
        assert_eq!(path_address("no-separators"), None);
        assert_eq!(instance_address(r"ROOT\MEDIA"), None);
    }

    #[test]
    fn test_resolve_picks_matching_instance() {
        let records = vec![
            InstanceRecord::new(
                r"USB\VID_046D&PID_0825&MI_00\6&11111111&0&0000",
                "0000.0014.0000.011.000.000.000.000.000",
            ),
            InstanceRecord::new(
                r"USB\VID_046D&PID_0825&MI_00\6&2B8A6E6B&0&0000",
                "0000.0014.0000.002.002.000.000.000.000",
            ),
        ];
        assert_eq!(
            resolve_location(PATH, &records).as_deref(),
            Some("0000.0014.0000.002.002.000.000.000.000")
        );
    }

    #[test]
    fn test_resolve_skips_unreadable_records() {
        let records = vec![
            InstanceRecord {
                instance_id: None,
                location: Some("bogus".to_string()),
            },
            InstanceRecord {
                instance_id: Some(r"USB\VID_046D&PID_0825&MI_00\6&2B8A6E6B&0&0000".to_string()),
                location: None,
            },
            InstanceRecord::new(r"ROOT\MEDIA", "short-id"),
        ];
        assert_eq!(resolve_location(PATH, &records), None);
    }

    #[test]
    fn test_resolve_without_match() {
        assert_eq!(resolve_location(PATH, &[]), None);
        assert_eq!(
            resolve_location("", &[InstanceRecord::new(r"A\B\C", "loc")]),
            None
        );
    }
}
