use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use super::VolumeRecord;
use super::classify;
use super::executor::{CommandExecutor, CommandLine};
use super::listing;
use super::parser::parse_volume_info;
use crate::utils::bytes_to_human;

/// One independent, read-only way of discovering volumes.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn discover(&self, executor: &dyn CommandExecutor) -> Vec<VolumeRecord>;
}

/// Runs `<tool> info /dev/<id>`; `None` when the tool fails.
async fn volume_info(
    executor: &dyn CommandExecutor,
    volume_tool: &str,
    identifier: &str,
) -> Option<VolumeRecord> {
    let command = CommandLine::new(volume_tool, ["info".to_string(), format!("/dev/{}", identifier)]);
    let output = executor.run(&command).await;
    if !output.success() {
        debug!(identifier, detail = %output.detail(), "volume info unavailable");
        return None;
    }
    Some(parse_volume_info(identifier, &output.stdout))
}

/// Volumes currently in the system mount table.
pub struct MountTableStrategy {
    pub volume_tool: String,
    pub mount_table_tool: String,
}

#[async_trait]
impl DiscoveryStrategy for MountTableStrategy {
    fn name(&self) -> &'static str {
        "mount-table"
    }

    async fn discover(&self, executor: &dyn CommandExecutor) -> Vec<VolumeRecord> {
        let output = executor
            .run(&CommandLine::new(&self.mount_table_tool, Vec::<String>::new()))
            .await;
        if !output.success() {
            warn!(detail = %output.detail(), "mount table unavailable");
            return Vec::new();
        }

        let mut records = Vec::new();
        for entry in listing::parse_mount_table(&output.stdout) {
            if classify::is_protected_mount_point(&entry.mount_point) {
                continue;
            }
            let mut record = volume_info(executor, &self.volume_tool, &entry.identifier)
                .await
                .unwrap_or_else(|| VolumeRecord::bare(&entry.identifier));

            record.mount_point = entry.mount_point.clone();
            if record.has_synthesized_name() {
                if let Some(last) = Path::new(&entry.mount_point).file_name() {
                    record.display_name = last.to_string_lossy().to_string();
                }
            }
            if record.volume_type == "Unknown" && !entry.filesystem.is_empty() {
                record.volume_type = entry.filesystem.clone();
            }
            records.push(record);
        }
        records
    }
}

/// Every partition in the volume tool's hierarchical listing, mounted or not.
pub struct FullListingStrategy {
    pub volume_tool: String,
}

#[async_trait]
impl DiscoveryStrategy for FullListingStrategy {
    fn name(&self) -> &'static str {
        "full-listing"
    }

    async fn discover(&self, executor: &dyn CommandExecutor) -> Vec<VolumeRecord> {
        let output = executor
            .run(&CommandLine::new(&self.volume_tool, ["list"]))
            .await;
        if !output.success() {
            warn!(detail = %output.detail(), "disk listing unavailable");
            return Vec::new();
        }

        let mut records = Vec::new();
        for entry in listing::parse_disk_listing(&output.stdout) {
            let record = match volume_info(executor, &self.volume_tool, &entry.identifier).await {
                Some(mut record) => {
                    if entry.internal == Some(false) {
                        record.is_internal = false;
                    }
                    record
                }
                None => {
                    let mut record = VolumeRecord::bare(&entry.identifier);
                    record.size_text = entry.size_text.clone();
                    record.size_bytes = classify::parse_size_bytes(&entry.size_text);
                    record.is_internal = entry.internal.unwrap_or(true);
                    record
                }
            };
            records.push(record);
        }
        records
    }
}

/// Partitions on non-internal devices only, read from the plist listing.
pub struct ExternalStrategy {
    pub volume_tool: String,
}

#[async_trait]
impl DiscoveryStrategy for ExternalStrategy {
    fn name(&self) -> &'static str {
        "external"
    }

    async fn discover(&self, executor: &dyn CommandExecutor) -> Vec<VolumeRecord> {
        let output = executor
            .run(&CommandLine::new(&self.volume_tool, ["list", "-plist", "external"]))
            .await;
        if !output.success() {
            warn!(detail = %output.detail(), "external listing unavailable");
            return Vec::new();
        }

        let entries = match listing::parse_external_plist(output.stdout.as_bytes()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "external listing unreadable");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let mut record = volume_info(executor, &self.volume_tool, &entry.identifier)
                .await
                .unwrap_or_else(|| VolumeRecord::bare(&entry.identifier));

            if record.has_synthesized_name() {
                if let Some(name) = &entry.volume_name {
                    record.display_name = name.clone();
                }
            }
            if !record.is_mounted() {
                if let Some(mount_point) = &entry.mount_point {
                    record.mount_point = mount_point.clone();
                }
            }
            if record.size_text.is_empty() {
                record.size_text = bytes_to_human(entry.size_bytes);
                record.size_bytes = Some(entry.size_bytes);
            }
            if let Some(content) = &entry.content {
                if record.volume_type == "Unknown" {
                    record.volume_type = content.clone();
                }
                record.is_efi |= classify::is_efi_type(content);
            }
            record.is_internal = false;
            records.push(record);
        }
        records
    }
}

/// Unions the discovery strategies into one authoritative volume set.
pub struct Enumerator {
    executor: Arc<dyn CommandExecutor>,
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl Enumerator {
    /// Strategies are listed in priority order: the first to report an
    /// identifier supplies its record.
    pub fn new(executor: Arc<dyn CommandExecutor>, strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        Self {
            executor,
            strategies,
        }
    }

    /// The mount table, full listing and external listing, in that order.
    pub fn standard(
        executor: Arc<dyn CommandExecutor>,
        volume_tool: &str,
        mount_table_tool: &str,
    ) -> Self {
        Self::new(
            executor,
            vec![
                Box::new(MountTableStrategy {
                    volume_tool: volume_tool.to_string(),
                    mount_table_tool: mount_table_tool.to_string(),
                }),
                Box::new(FullListingStrategy {
                    volume_tool: volume_tool.to_string(),
                }),
                Box::new(ExternalStrategy {
                    volume_tool: volume_tool.to_string(),
                }),
            ],
        )
    }

    /// Queries every strategy concurrently and merges the results.
    /// Issues only read commands.
    pub async fn enumerate(&self) -> Vec<VolumeRecord> {
        let executor = self.executor.as_ref();
        let batches = join_all(
            self.strategies
                .iter()
                .map(|strategy| async move {
                    let records = strategy.discover(executor).await;
                    debug!(strategy = strategy.name(), count = records.len(), "strategy finished");
                    records
                }),
        )
        .await;

        let volumes = merge(batches);
        info!(count = volumes.len(), "enumerated volumes");
        volumes
    }
}

/// Deduplicates by identifier, earliest batch winning, then sorts mounted
/// volumes first and by case-insensitive name, then identifier.
pub fn merge(batches: Vec<Vec<VolumeRecord>>) -> Vec<VolumeRecord> {
    let mut by_id: HashMap<String, VolumeRecord> = HashMap::new();
    for record in batches.into_iter().flatten() {
        by_id.entry(record.identifier.clone()).or_insert(record);
    }

    let mut volumes: Vec<VolumeRecord> = by_id.into_values().collect();
    volumes.sort_by(|a, b| {
        b.is_mounted()
            .cmp(&a.is_mounted())
            .then_with(|| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()))
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    volumes
}
