//! Parsers for the three listings the enumerator reads: the system mount
//! table, the volume tool's text disk listing and its plist external listing.

use lazy_regex::regex_captures;

use super::VolumeError;
use super::classify;

/// One `/dev/diskN... on <path> (<options>)` line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub identifier: String,
    pub mount_point: String,
    /// First mount option, which the mount table uses for the filesystem.
    pub filesystem: String,
}

/// One partition line from the text disk listing, or a whole disk that
/// carries a filesystem directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub identifier: String,
    pub description: String,
    pub size_text: String,
    /// From the enclosing `/dev/diskN (internal|external, ...)` header.
    pub internal: Option<bool>,
}

/// One partition, APFS volume or partitionless whole disk from the plist
/// external listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEntry {
    pub identifier: String,
    pub volume_name: Option<String>,
    pub size_bytes: u64,
    pub content: Option<String>,
    pub mount_point: Option<String>,
}

/// Parses the mount table, keeping only disk devices.
pub fn parse_mount_table(text: &str) -> Vec<MountEntry> {
    text.lines()
        .filter_map(|line| {
            let (_, device, mount_point, options) =
                regex_captures!(r"^/dev/(disk\S+) on (.+) \(([^()]*)\)$", line.trim_end())?;
            Some(MountEntry {
                identifier: device.to_string(),
                mount_point: mount_point.to_string(),
                filesystem: options.split(',').next().unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

/// Strips the directional isolate marks newer tool versions wrap names in.
fn clean_description(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\u{2068}' | '\u{2069}'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parses the hierarchical text listing.
///
/// Whole-disk entries (index 0) are kept only when they hold a filesystem
/// instead of a partition scheme. Pseudo partitions and zero-size entries
/// are dropped.
pub fn parse_disk_listing(text: &str) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    let mut internal = None;

    for line in text.lines() {
        if let Some((_, _disk, kind)) = regex_captures!(r"^/dev/(disk\d+) \(([^)]*)\):", line) {
            internal = if kind.starts_with("internal") {
                Some(true)
            } else if kind.starts_with("external") {
                Some(false)
            } else {
                None
            };
            continue;
        }

        let Some((_, index, description, size_text, identifier)) = regex_captures!(
            r"^\s+(\d+):\s+(.+?)\s+([*+]?[\d.]+\s+[KMGTP]?B)\s+(disk\w+)$",
            line.trim_end()
        ) else {
            continue;
        };

        let description = clean_description(description);
        if index == "0" && classify::is_partition_scheme(&description) {
            continue;
        }
        if classify::is_pseudo_partition(&description) {
            continue;
        }
        if classify::parse_size_bytes(size_text) == Some(0) {
            continue;
        }

        entries.push(ListingEntry {
            identifier: identifier.to_string(),
            description,
            size_text: size_text.trim_start_matches(['*', '+']).to_string(),
            internal,
        });
    }

    entries
}

fn string_field(dict: &plist::Dictionary, key: &str) -> Option<String> {
    dict.get(key)
        .and_then(|v| v.as_string())
        .filter(|s| !classify::is_sentinel(s))
        .map(str::to_string)
}

fn external_entry(dict: &plist::Dictionary) -> Option<ExternalEntry> {
    let identifier = string_field(dict, "DeviceIdentifier")?;
    let size_bytes = dict
        .get("Size")
        .and_then(|v| v.as_unsigned_integer())
        .unwrap_or(0);
    if size_bytes == 0 {
        return None;
    }

    let volume_name = string_field(dict, "VolumeName");
    let content = string_field(dict, "Content");
    let pseudo = [volume_name.as_deref(), content.as_deref()]
        .into_iter()
        .flatten()
        .any(classify::is_pseudo_partition);
    if pseudo {
        return None;
    }

    Some(ExternalEntry {
        identifier,
        volume_name,
        size_bytes,
        content,
        mount_point: string_field(dict, "MountPoint"),
    })
}

/// Parses `list -plist external` output into its partitions and APFS
/// volumes. A whole disk without children whose content is a filesystem is
/// reported as a volume itself.
pub fn parse_external_plist(bytes: &[u8]) -> Result<Vec<ExternalEntry>, VolumeError> {
    let plist: plist::Value =
        plist::from_bytes(bytes).map_err(|e| VolumeError::ParseError(e.to_string()))?;

    let all_disks = plist
        .as_dictionary()
        .and_then(|d| d.get("AllDisksAndPartitions"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| VolumeError::ParseError("Missing AllDisksAndPartitions".to_string()))?;

    let mut entries = Vec::new();
    for disk in all_disks {
        let Some(disk_dict) = disk.as_dictionary() else {
            continue;
        };
        let children: Vec<&plist::Dictionary> = ["Partitions", "APFSVolumes"]
            .into_iter()
            .filter_map(|key| disk_dict.get(key).and_then(|v| v.as_array()))
            .flatten()
            .filter_map(|child| child.as_dictionary())
            .collect();

        if children.is_empty() {
            let content = string_field(disk_dict, "Content").unwrap_or_default();
            if !classify::is_partition_scheme(&content) {
                entries.extend(external_entry(disk_dict));
            }
            continue;
        }
        entries.extend(children.into_iter().filter_map(external_entry));
    }

    Ok(entries)
}
