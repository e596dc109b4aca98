//! Volume info parser.
//!
//! Turns the `key: value` block the volume tool prints for one identifier
//! into a [`VolumeRecord`]. Keys are matched by prefix against the tool's
//! known vocabulary; anything else is ignored, and every missing field falls
//! back to a default.

use super::VolumeRecord;
use super::classify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    VolumeName,
    MediaName,
    VolumeSize,
    DiskSize,
    MountPoint,
    Protocol,
    Internal,
    Location,
    Removable,
    Bundle,
    PartitionType,
    Personality,
}

/// Key prefixes, checked in order.
const KEYS: &[(&str, Field)] = &[
    ("Volume Name", Field::VolumeName),
    ("Device / Media Name", Field::MediaName),
    ("Volume Size", Field::VolumeSize),
    ("Disk Size", Field::DiskSize),
    ("Total Size", Field::DiskSize),
    ("Mount Point", Field::MountPoint),
    ("Protocol", Field::Protocol),
    ("Bus Protocol", Field::Protocol),
    ("Internal", Field::Internal),
    ("Device Location", Field::Location),
    ("Removable Media", Field::Removable),
    ("Type (Bundle)", Field::Bundle),
    ("Partition Type", Field::PartitionType),
    ("File System Personality", Field::Personality),
];

#[derive(Default)]
struct RawInfo<'a> {
    volume_name: Option<&'a str>,
    media_name: Option<&'a str>,
    volume_size: Option<&'a str>,
    disk_size: Option<&'a str>,
    mount_point: Option<&'a str>,
    protocol: Option<&'a str>,
    internal: Option<bool>,
    location_external: bool,
    removable: bool,
    bundle: Option<&'a str>,
    partition_type: Option<&'a str>,
    personality: Option<&'a str>,
}

fn match_key(key: &str) -> Option<Field> {
    KEYS.iter()
        .find(|(prefix, _)| key.starts_with(prefix))
        .map(|(_, field)| *field)
}

fn usable(value: &str) -> Option<&str> {
    if classify::is_sentinel(value) || value.contains("(zero)") {
        None
    } else {
        Some(value)
    }
}

fn collect(text: &str) -> RawInfo<'_> {
    let mut raw = RawInfo::default();
    for line in text.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Some(field) = match_key(key.trim()) else {
            continue;
        };
        let value = value.trim();
        match field {
            Field::VolumeName => raw.volume_name = classify::normalize_name(value),
            Field::MediaName => raw.media_name = classify::normalize_name(value),
            Field::VolumeSize => raw.volume_size = usable(value),
            Field::DiskSize => {
                if raw.disk_size.is_none() {
                    raw.disk_size = usable(value);
                }
            }
            Field::MountPoint => raw.mount_point = classify::normalize_mount_point(value),
            Field::Protocol => {
                if raw.protocol.is_none() {
                    raw.protocol = usable(value);
                }
            }
            Field::Internal => raw.internal = Some(value.starts_with("Yes")),
            Field::Location => raw.location_external = value.starts_with("External"),
            Field::Removable => {
                raw.removable = value.starts_with("Removable") || value.starts_with("Yes")
            }
            Field::Bundle => raw.bundle = usable(value),
            Field::PartitionType => raw.partition_type = usable(value),
            Field::Personality => raw.personality = usable(value),
        }
    }
    raw
}

/// Parses the info block for `identifier`.
pub fn parse_volume_info(identifier: &str, text: &str) -> VolumeRecord {
    let raw = collect(text);

    let size_text = raw.volume_size.or(raw.disk_size).unwrap_or_default();
    let size_bytes = classify::parse_size_bytes(size_text);

    let explicit_efi = raw.bundle.is_some_and(classify::is_efi_type)
        || raw.partition_type.is_some_and(classify::is_efi_type);
    let is_efi = explicit_efi
        || classify::looks_like_efi(identifier, raw.volume_name.unwrap_or_default(), size_bytes);

    let display_name = match raw.volume_name.or(raw.media_name) {
        Some(name) => name.to_string(),
        None if is_efi => "EFI System Partition".to_string(),
        None => classify::synthesized_name(identifier),
    };

    let external_protocol = raw.protocol.is_some_and(classify::is_external_protocol);
    let is_internal = raw.internal.unwrap_or(true)
        && !external_protocol
        && !raw.removable
        && !raw.location_external;

    let volume_type = raw
        .bundle
        .or(raw.personality)
        .or(raw.partition_type)
        .unwrap_or("Unknown")
        .to_string();

    VolumeRecord {
        identifier: identifier.to_string(),
        display_name,
        size_text: size_text.to_string(),
        size_bytes,
        volume_type,
        mount_point: raw.mount_point.unwrap_or_default().to_string(),
        is_internal,
        is_efi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTERNAL_DATA: &str = "
   Device Identifier:         disk4s2
   Device Node:               /dev/disk4s2
   Whole:                     No
   Part of Whole:             disk4

   Volume Name:               DATA
   Mounted:                   No
   Mount Point:               Not applicable (none)

   Partition Type:            Microsoft Basic Data
   File System Personality:   ExFAT
   Type (Bundle):             exfat

   Protocol:                  USB
   Internal:                  No
   Disk Size:                 500.1 GB (500107862016 Bytes) (exactly 976773168 512-Byte-Units)
";

    const INTERNAL_EFI: &str = "
   Device Identifier:         disk0s1
   Device Node:               /dev/disk0s1
   Volume Name:               EFI
   Mounted:                   No
   Partition Type:            EFI
   File System Personality:   MS-DOS FAT32
   Type (Bundle):             msdos
   Name (User Visible):       MS-DOS (FAT32)
   Protocol:                  Apple Fabric
   Internal:                  Yes
   Disk Size:                 524.3 MB (524288000 Bytes) (exactly 1024000 512-Byte-Units)
";

    #[test]
    fn test_parse_external_unmounted() {
        let record = parse_volume_info("disk4s2", EXTERNAL_DATA);
        assert_eq!(record.identifier, "disk4s2");
        assert_eq!(record.display_name, "DATA");
        assert_eq!(record.mount_point, "");
        assert!(!record.is_mounted());
        assert!(!record.is_internal);
        assert!(!record.is_efi);
        assert_eq!(record.volume_type, "exfat");
        assert_eq!(record.size_bytes, Some(500_107_862_016));
        assert!(record.size_text.starts_with("500.1 GB"));
    }

    #[test]
    fn test_parse_minimal_block() {
        let text = "Volume Name: DATA\nDisk Size: 500.1 GB\nMount Point: Not applicable (none)\nInternal: No\n";
        let record = parse_volume_info("disk5s1", text);
        assert_eq!(record.display_name, "DATA");
        assert!(!record.is_mounted());
        assert!(!record.is_internal);
        assert_eq!(record.mount_point, "");
        assert_eq!(record.size_text, "500.1 GB");
    }

    #[test]
    fn test_parse_explicit_efi() {
        let record = parse_volume_info("disk0s1", INTERNAL_EFI);
        assert!(record.is_efi);
        assert!(record.is_internal);
        assert_eq!(record.display_name, "EFI");
        assert_eq!(record.volume_type, "msdos");
    }

    #[test]
    fn test_efi_heuristic_without_bundle() {
        let text = "Volume Name: Not applicable\nDisk Size: 209.7 MB (209715200 Bytes)\n";
        let record = parse_volume_info("disk2s1", text);
        assert!(record.is_efi);
        assert_eq!(record.display_name, "EFI System Partition");

        let second = parse_volume_info("disk2s2", text);
        assert!(!second.is_efi);
        assert_eq!(second.display_name, "Disk disk2s2");
    }

    #[test]
    fn test_mounted_volume() {
        let text = "Volume Name: Backup\nMount Point: /Volumes/Backup\nDevice Location: External\n";
        let record = parse_volume_info("disk6s2", text);
        assert_eq!(record.mount_point, "/Volumes/Backup");
        assert!(record.is_mounted());
        assert!(!record.is_internal);
        assert!(record.can_unmount());
    }

    #[test]
    fn test_media_name_fallback_and_noise() {
        let text = "garbage line without separator\n\
                    Volume Name: NO NAME\n\
                    Device / Media Name: SanDisk Ultra\n\
                    Removable Media: Removable\n\
                    Weird Key: value\n";
        let record = parse_volume_info("disk7s1", text);
        assert_eq!(record.display_name, "SanDisk Ultra");
        assert!(!record.is_internal);
    }

    #[test]
    fn test_empty_output_defaults() {
        let record = parse_volume_info("disk9s3", "");
        assert_eq!(record, VolumeRecord::bare("disk9s3"));
    }
}
