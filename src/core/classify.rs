//! Classification rules for volumes.
//!
//! Everything that decides "is this mounted / EFI / a system volume /
//! external" from loosely formatted tool output lives here, as small fixed
//! tables, so the heuristics can be tested on their own. The rules are
//! best-effort: tool versions disagree on wording and some of the EFI
//! detection is approximate.

use lazy_regex::regex_captures;

/// Values the volume tool prints where a field does not apply.
const ABSENT_SENTINELS: &[&str] = &["Not applicable", "Not applicable (none)", "(null)", "None"];

/// Additional placeholder names that never make a useful label.
const PLACEHOLDER_NAMES: &[&str] = &["NO NAME"];

/// User-visible volumes directory; anything under it is never protected.
pub const VOLUMES_DIR: &str = "/Volumes/";

/// Mount point prefixes owned by the OS.
const PROTECTED_PREFIXES: &[&str] = &[
    "/System/Volumes",
    "/private/var",
    "/Users",
    "/home",
    "/Library/Developer",
    "/Applications/Xcode",
];

/// Partition names/types that exist for the OS and are never offered.
const PSEUDO_PARTITIONS: &[&str] = &["Recovery", "VM", "Preboot", "Update", "ISC"];

/// Protocols that mark a device as external.
const EXTERNAL_PROTOCOLS: &[&str] = &["USB", "Thunderbolt", "FireWire", "Secure Digital", "SD"];

/// Size window (bytes) for an unlabelled EFI system partition.
const EFI_SIZE_RANGE: std::ops::RangeInclusive<u64> = 100_000_000..=400_000_000;

pub fn synthesized_name(identifier: &str) -> String {
    format!("Disk {}", identifier)
}

/// Returns true when a raw value means "absent".
pub fn is_sentinel(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || ABSENT_SENTINELS.contains(&value)
        || value.starts_with("Not applicable")
        || value.contains("Not mounted")
}

/// Normalizes a usable label, dropping sentinels and placeholder names.
pub fn normalize_name(value: &str) -> Option<&str> {
    let value = value.trim();
    if is_sentinel(value) || PLACEHOLDER_NAMES.contains(&value) {
        None
    } else {
        Some(value)
    }
}

/// A mount point is present only when it is an absolute path.
pub fn normalize_mount_point(value: &str) -> Option<&str> {
    let value = value.trim();
    if is_sentinel(value) || !value.starts_with('/') {
        None
    } else {
        Some(value)
    }
}

pub fn is_protected_mount_point(mount_point: &str) -> bool {
    let mount_point = mount_point.trim();
    if mount_point.starts_with(VOLUMES_DIR) {
        return false;
    }
    mount_point == "/"
        || PROTECTED_PREFIXES.iter().any(|prefix| {
            mount_point == *prefix
                || mount_point
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
}

/// Volumes kept in the authoritative set but not shown to the user.
pub fn is_hidden_volume(name: &str, mount_point: &str) -> bool {
    mount_point.contains("CoreSimulator") || name.contains("ASSETS") || name.contains("AssetData")
}

/// Matches a partition description against the pseudo-partition table on
/// word boundaries ("VM" must not match "VMware").
pub fn is_pseudo_partition(description: &str) -> bool {
    description
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| PSEUDO_PARTITIONS.contains(&word))
}

/// Whole-disk content naming a partition map or container rather than a
/// filesystem. Disks with such content carry their volumes as children.
pub fn is_partition_scheme(content: &str) -> bool {
    let content = content.trim();
    content.is_empty()
        || content.ends_with("_partition_scheme")
        || content.starts_with("APFS Container Scheme")
}

pub fn is_external_protocol(protocol: &str) -> bool {
    let protocol = protocol.trim();
    EXTERNAL_PROTOCOLS.iter().any(|p| {
        if p.contains(' ') {
            protocol.contains(p)
        } else {
            protocol.split_whitespace().any(|word| word == *p)
        }
    })
}

/// Explicit EFI markers: a bundle/partition type naming EFI.
pub fn is_efi_type(value: &str) -> bool {
    value.contains("EFI")
}

/// First partition of a whole disk, e.g. `disk0s1` but not `disk3s1s1`.
pub fn is_first_partition(identifier: &str) -> bool {
    regex_captures!(r"^disk\d+s1$", identifier).is_some()
}

/// Approximate EFI detection for tool versions that omit the bundle type.
///
/// A name or identifier carrying the EFI marker counts; otherwise a first
/// partition sized within the usual ESP window counts. This misclassifies
/// small first partitions on removable media and is only probabilistically
/// right.
pub fn looks_like_efi(identifier: &str, name: &str, size_bytes: Option<u64>) -> bool {
    if name.contains("EFI") || identifier.contains("EFI") {
        return true;
    }
    match size_bytes {
        Some(size) => EFI_SIZE_RANGE.contains(&size) && is_first_partition(identifier),
        None => false,
    }
}

/// Extracts an exact byte count from tool size text.
///
/// Accepts both `209.7 MB (209715200 Bytes)` and the bare `209.7 MB`
/// form, where decimal units are assumed as the tool prints them.
pub fn parse_size_bytes(text: &str) -> Option<u64> {
    if let Some((_, bytes)) = regex_captures!(r"\((\d+) Bytes\)", text) {
        return bytes.parse().ok();
    }
    let (_, number, unit) = regex_captures!(r"^\s*[*+]?([\d.]+)\s*([KMGTP]?B)\b", text)?;
    let number: f64 = number.parse().ok()?;
    let multiplier: f64 = match unit {
        "B" => 1.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        "PB" => 1e15,
        _ => return None,
    };
    Some((number * multiplier).round() as u64)
}

/// Extracts the whole-disk identifier from a partition identifier
/// e.g., disk4s1 -> disk4, disk3s1s1 -> disk3, disk4 -> disk4
pub fn parent_disk(identifier: &str) -> String {
    let bytes = identifier.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i] == b's' && bytes[i - 1].is_ascii_digit() {
            return identifier[..i].to_string();
        }
    }
    identifier.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(is_sentinel("Not applicable"));
        assert!(is_sentinel("Not applicable (none)"));
        assert!(is_sentinel("Not applicable (no file system)"));
        assert!(is_sentinel("Volume Not mounted"));
        assert!(is_sentinel("  "));
        assert!(!is_sentinel("/Volumes/DATA"));
        assert_eq!(normalize_name("NO NAME"), None);
        assert_eq!(normalize_name(" DATA "), Some("DATA"));
        assert_eq!(normalize_mount_point("Not applicable (none)"), None);
        assert_eq!(normalize_mount_point("/Volumes/X"), Some("/Volumes/X"));
    }

    #[test]
    fn test_protected_mount_points() {
        assert!(is_protected_mount_point("/"));
        assert!(is_protected_mount_point("/System/Volumes/Data"));
        assert!(is_protected_mount_point("/System/Volumes/VM"));
        assert!(is_protected_mount_point("/private/var/vm"));
        assert!(is_protected_mount_point("/Users/alex"));
        assert!(is_protected_mount_point("/Library/Developer/CoreSimulator/Volumes/iOS_21A328"));
        assert!(!is_protected_mount_point("/Volumes/Backup"));
        assert!(!is_protected_mount_point("/Volumes/EFI"));
        assert!(!is_protected_mount_point("/Usersdata"));
    }

    #[test]
    fn test_pseudo_partitions() {
        assert!(is_pseudo_partition("APFS Volume Preboot"));
        assert!(is_pseudo_partition("APFS Volume VM"));
        assert!(is_pseudo_partition("Apple_APFS_Recovery Container disk2"));
        assert!(is_pseudo_partition("Apple_APFS_ISC Container disk1"));
        assert!(!is_pseudo_partition("Microsoft Basic Data VMware"));
        assert!(!is_pseudo_partition("APFS Volume Macintosh HD - Data"));
    }

    #[test]
    fn test_efi_heuristics() {
        assert!(is_first_partition("disk0s1"));
        assert!(is_first_partition("disk12s1"));
        assert!(!is_first_partition("disk3s1s1"));
        assert!(!is_first_partition("disk0s2"));

        assert!(looks_like_efi("disk2s1", "Disk disk2s1", Some(209_715_200)));
        assert!(!looks_like_efi("disk2s2", "Disk disk2s2", Some(209_715_200)));
        assert!(!looks_like_efi("disk2s1", "Disk disk2s1", Some(64_000_000_000)));
        assert!(looks_like_efi("disk5s3", "EFI", None));
    }

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size_bytes("209.7 MB (209715200 Bytes)"), Some(209_715_200));
        assert_eq!(parse_size_bytes("500.1 GB"), Some(500_100_000_000));
        assert_eq!(parse_size_bytes("*500.3 GB"), Some(500_300_000_000));
        assert_eq!(parse_size_bytes("0 B"), Some(0));
        assert_eq!(parse_size_bytes("Unknown"), None);
    }

    #[test]
    fn test_partition_schemes() {
        assert!(is_partition_scheme("GUID_partition_scheme"));
        assert!(is_partition_scheme("FDisk_partition_scheme"));
        assert!(is_partition_scheme("APFS Container Scheme -"));
        assert!(!is_partition_scheme("DOS_FAT_32 STICK"));
        assert!(!is_partition_scheme("ExFAT"));
    }

    #[test]
    fn test_external_protocols() {
        assert!(is_external_protocol("USB"));
        assert!(is_external_protocol("Thunderbolt"));
        assert!(!is_external_protocol("PCI-Express"));
        assert!(!is_external_protocol("Apple Fabric"));
    }

    #[test]
    fn test_parent_disk() {
        assert_eq!(parent_disk("disk4s1"), "disk4");
        assert_eq!(parent_disk("disk4s2"), "disk4");
        assert_eq!(parent_disk("disk3s1s1"), "disk3");
        assert_eq!(parent_disk("disk0"), "disk0");
    }
}
