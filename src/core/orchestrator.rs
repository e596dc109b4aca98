//! Mount orchestrator.
//!
//! Drives volumes towards a desired state one at a time: a primary command,
//! then exactly one fallback path, folded into an [`OperationReport`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::classify;
use super::executor::{CommandExecutor, CommandLine, CommandOutput};
use super::{DesiredState, OperationReport, Outcome, VolumeOutcome, VolumeRecord};

/// Filesystem types tried, in order, when mounting an EFI partition directly.
const EFI_FILESYSTEMS: &[&str] = &["msdos", "exfat", "hfs"];

pub struct MountOrchestrator {
    executor: Arc<dyn CommandExecutor>,
    volume_tool: String,
    mount_tool: String,
    volumes_root: String,
    op_delay: Duration,
}

impl MountOrchestrator {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        volume_tool: &str,
        volumes_root: &str,
        op_delay: Duration,
    ) -> Self {
        Self {
            executor,
            volume_tool: volume_tool.to_string(),
            mount_tool: "mount".to_string(),
            volumes_root: volumes_root.trim_end_matches('/').to_string(),
            op_delay,
        }
    }

    fn tool(&self, args: &[&str]) -> CommandLine {
        CommandLine::new(&self.volume_tool, args.iter().copied())
    }

    /// Applies `desired` to every target in order.
    ///
    /// Targets are processed sequentially with a fixed pause between the
    /// ones that actually ran a command. Repeated identifiers are handled
    /// once, at their first position. Nothing here returns an error: every
    /// distinct target ends up with exactly one outcome.
    pub async fn apply(
        &self,
        volumes: &[VolumeRecord],
        targets: &[String],
        desired: DesiredState,
    ) -> OperationReport {
        let mut outcomes = Vec::with_capacity(targets.len());
        let mut executed_any = false;
        let mut seen = HashSet::new();

        for identifier in targets.iter().filter(|id| seen.insert(id.as_str())) {
            let outcome = match volumes.iter().find(|v| &v.identifier == identifier) {
                None => Outcome::Skipped("not present".to_string()),
                Some(volume) => match skip_reason(volume, desired) {
                    Some(reason) => Outcome::Skipped(reason.to_string()),
                    None => {
                        if executed_any && !self.op_delay.is_zero() {
                            tokio::time::sleep(self.op_delay).await;
                        }
                        executed_any = true;
                        match desired {
                            DesiredState::Mounted => self.mount(volume).await,
                            DesiredState::Unmounted => self.unmount(volume).await,
                            DesiredState::Ejected => self.eject(volume).await,
                        }
                    }
                },
            };

            match &outcome {
                Outcome::Failed(reason) => warn!(identifier, action = desired.verb(), reason, "operation failed"),
                _ => info!(identifier, action = desired.verb(), ?outcome, "operation finished"),
            }
            outcomes.push(VolumeOutcome {
                identifier: identifier.clone(),
                outcome,
            });
        }

        OperationReport::new(desired, outcomes)
    }

    /// Mounts a single EFI partition through the EFI path.
    pub async fn mount_efi(&self, volumes: &[VolumeRecord], identifier: &str) -> OperationReport {
        let volume = volumes.iter().find(|v| v.identifier == identifier);
        let outcome = match volume {
            None => Outcome::Skipped("not present".to_string()),
            Some(v) if !v.is_efi => Outcome::Skipped("not an EFI partition".to_string()),
            Some(v) if v.is_mounted() => Outcome::Skipped("already mounted".to_string()),
            Some(v) => self.mount(v).await,
        };
        info!(identifier, ?outcome, "EFI mount finished");
        OperationReport::new(
            DesiredState::Mounted,
            vec![VolumeOutcome {
                identifier: identifier.to_string(),
                outcome,
            }],
        )
    }

    async fn mount(&self, volume: &VolumeRecord) -> Outcome {
        let device = format!("/dev/{}", volume.identifier);
        let primary = self.executor.run(&self.tool(&["mount", &device])).await;
        if primary.success() {
            return Outcome::Success;
        }

        let last = if volume.is_efi {
            self.mount_efi_fallback(volume, &device).await
        } else {
            let parent = format!("/dev/{}", classify::parent_disk(&volume.identifier));
            self.executor.run(&self.tool(&["mountDisk", &parent])).await
        };

        outcome_of(&last)
    }

    /// Tries each candidate filesystem type into `<root>/EFI-<id>`.
    async fn mount_efi_fallback(&self, volume: &VolumeRecord, device: &str) -> CommandOutput {
        let dir = format!("{}/EFI-{}", self.volumes_root, volume.identifier);
        let mkdir = self
            .executor
            .run(&CommandLine::new("mkdir", ["-p", dir.as_str()]))
            .await;
        if !mkdir.success() {
            return mkdir;
        }

        let mut last = mkdir;
        for fs in EFI_FILESYSTEMS.iter().copied() {
            last = self
                .executor
                .run(&CommandLine::new(&self.mount_tool, ["-t", fs, device, dir.as_str()]))
                .await;
            if last.success() {
                break;
            }
        }
        last
    }

    async fn unmount(&self, volume: &VolumeRecord) -> Outcome {
        let device = format!("/dev/{}", volume.identifier);
        let primary = self.executor.run(&self.tool(&["unmount", &device])).await;
        if primary.success() {
            return Outcome::Success;
        }

        let forced = self
            .executor
            .run_privileged(&self.tool(&["unmount", "force", &device]))
            .await;
        outcome_of(&forced)
    }

    /// Ejects the whole device the volume lives on, retrying once with
    /// elevation.
    async fn eject(&self, volume: &VolumeRecord) -> Outcome {
        let device = format!("/dev/{}", classify::parent_disk(&volume.identifier));
        let command = self.tool(&["eject", &device]);
        let primary = self.executor.run(&command).await;
        if primary.success() {
            return Outcome::Success;
        }

        let elevated = self.executor.run_privileged(&command).await;
        outcome_of(&elevated)
    }
}

fn skip_reason(volume: &VolumeRecord, desired: DesiredState) -> Option<&'static str> {
    match desired {
        DesiredState::Mounted if volume.is_mounted() => Some("already mounted"),
        DesiredState::Unmounted if volume.is_system_volume() => Some("system volume"),
        DesiredState::Unmounted if !volume.is_mounted() => Some("already unmounted"),
        DesiredState::Ejected if volume.is_system_volume() => Some("system volume"),
        DesiredState::Ejected if volume.is_internal => Some("internal device"),
        _ => None,
    }
}

fn outcome_of(output: &CommandOutput) -> Outcome {
    if output.success() {
        Outcome::Success
    } else {
        Outcome::Failed(output.detail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;
    use crate::core::testing::ScriptedExecutor;

    fn volume(id: &str, mount_point: &str) -> VolumeRecord {
        let mut v = VolumeRecord::bare(id);
        v.mount_point = mount_point.to_string();
        v.is_internal = false;
        v
    }

    fn orchestrator(executor: Arc<ScriptedExecutor>) -> MountOrchestrator {
        MountOrchestrator::new(executor, "diskutil", "/Volumes", Duration::ZERO)
    }

    fn orchestrator_with_delay(executor: Arc<ScriptedExecutor>, delay: Duration) -> MountOrchestrator {
        MountOrchestrator::new(executor, "diskutil", "/Volumes", delay)
    }

    fn targets(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_system_volume_unmount_is_skipped() {
        let executor = Arc::new(ScriptedExecutor::new());
        let volumes = vec![volume("disk2s1", "/System/Volumes/Data")];
        let report = orchestrator(executor.clone())
            .apply(&volumes, &targets(&["disk2s1"]), DesiredState::Unmounted)
            .await;

        assert!(report.outcome_for("disk2s1").unwrap().is_skipped());
        assert_eq!(report.verdict, Verdict::NothingToDo);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mount_falls_back_to_whole_disk() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("diskutil mount /dev/disk4s2", CommandOutput::failed(1, "Volume failed to mount"))
                .on("diskutil mountDisk /dev/disk4", CommandOutput::ok("Volume(s) mounted successfully")),
        );
        let volumes = vec![volume("disk4s2", "")];
        let report = orchestrator(executor.clone())
            .apply(&volumes, &targets(&["disk4s2"]), DesiredState::Mounted)
            .await;

        assert_eq!(report.outcome_for("disk4s2"), Some(&Outcome::Success));
        assert_eq!(report.verdict, Verdict::AllSucceeded);
        assert_eq!(
            executor.calls(),
            ["diskutil mount /dev/disk4s2", "diskutil mountDisk /dev/disk4"]
        );
    }

    #[tokio::test]
    async fn test_forced_unmount_is_privileged() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("diskutil unmount /dev/disk4s1", CommandOutput::failed(1, "Resource busy"))
                .on("diskutil unmount force /dev/disk4s1", CommandOutput::failed(1, "Still busy")),
        );
        let volumes = vec![volume("disk4s1", "/Volumes/USB")];
        let report = orchestrator(executor.clone())
            .apply(&volumes, &targets(&["disk4s1"]), DesiredState::Unmounted)
            .await;

        assert_eq!(
            report.outcome_for("disk4s1"),
            Some(&Outcome::Failed("Still busy".to_string()))
        );
        assert_eq!(report.verdict, Verdict::AllFailed);
        assert_eq!(executor.privileged_calls(), ["diskutil unmount force /dev/disk4s1"]);
    }

    #[tokio::test]
    async fn test_mixed_batch_is_partial() {
        let executor = Arc::new(
            ScriptedExecutor::new().on("diskutil unmount /dev/disk4s1", CommandOutput::ok("")),
        );
        let volumes = vec![
            volume("disk4s1", "/Volumes/USB"),
            volume("disk5s1", "/Volumes/Busy"),
            volume("disk6s1", ""),
        ];
        let report = orchestrator(executor)
            .apply(
                &volumes,
                &targets(&["disk4s1", "disk5s1", "disk6s1", "disk9s9"]),
                DesiredState::Unmounted,
            )
            .await;

        assert_eq!(report.outcome_for("disk4s1"), Some(&Outcome::Success));
        assert!(matches!(report.outcome_for("disk5s1"), Some(Outcome::Failed(_))));
        assert_eq!(
            report.outcome_for("disk6s1"),
            Some(&Outcome::Skipped("already unmounted".to_string()))
        );
        assert_eq!(
            report.outcome_for("disk9s9"),
            Some(&Outcome::Skipped("not present".to_string()))
        );
        assert_eq!(report.verdict, Verdict::Partial);
    }

    #[tokio::test]
    async fn test_efi_mount_tries_filesystems() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("mkdir -p /Volumes/EFI-disk0s1", CommandOutput::ok(""))
                .on(
                    "mount -t msdos /dev/disk0s1 /Volumes/EFI-disk0s1",
                    CommandOutput::failed(1, "Invalid argument"),
                )
                .on("mount -t exfat /dev/disk0s1 /Volumes/EFI-disk0s1", CommandOutput::ok("")),
        );
        let mut efi = volume("disk0s1", "");
        efi.is_efi = true;
        let report = orchestrator(executor.clone()).mount_efi(&[efi], "disk0s1").await;

        assert_eq!(report.verdict, Verdict::AllSucceeded);
        assert_eq!(
            executor.calls(),
            [
                "diskutil mount /dev/disk0s1",
                "mkdir -p /Volumes/EFI-disk0s1",
                "mount -t msdos /dev/disk0s1 /Volumes/EFI-disk0s1",
                "mount -t exfat /dev/disk0s1 /Volumes/EFI-disk0s1",
            ]
        );
    }

    #[tokio::test]
    async fn test_efi_mount_skips_non_efi() {
        let executor = Arc::new(ScriptedExecutor::new());
        let report = orchestrator(executor.clone())
            .mount_efi(&[volume("disk4s2", "")], "disk4s2")
            .await;
        assert_eq!(report.verdict, Verdict::NothingToDo);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_executed_targets() {
        let delay = Duration::from_millis(400);
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("diskutil unmount /dev/disk4s1", CommandOutput::ok(""))
                .on("diskutil unmount /dev/disk6s1", CommandOutput::ok("")),
        );
        let volumes = vec![
            volume("disk4s1", "/Volumes/A"),
            volume("disk5s1", ""),
            volume("disk6s1", "/Volumes/C"),
        ];

        let started = tokio::time::Instant::now();
        let report = orchestrator_with_delay(executor, delay)
            .apply(
                &volumes,
                &targets(&["disk4s1", "disk5s1", "disk6s1"]),
                DesiredState::Unmounted,
            )
            .await;
        let elapsed = started.elapsed();

        assert_eq!(report.verdict, Verdict::AllSucceeded);
        assert!(report.outcome_for("disk5s1").unwrap().is_skipped());
        assert!(elapsed >= delay, "elapsed {elapsed:?}");
        assert!(elapsed < delay * 2, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_only_batch_never_waits() {
        let executor = Arc::new(ScriptedExecutor::new());
        let volumes = vec![volume("disk4s1", ""), volume("disk5s1", "")];

        let started = tokio::time::Instant::now();
        orchestrator_with_delay(executor, Duration::from_secs(5))
            .apply(&volumes, &targets(&["disk4s1", "disk5s1"]), DesiredState::Unmounted)
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_duplicate_targets_run_once() {
        let executor = Arc::new(
            ScriptedExecutor::new().on("diskutil unmount /dev/disk4s1", CommandOutput::ok("")),
        );
        let volumes = vec![volume("disk4s1", "/Volumes/USB"), volume("disk5s1", "")];
        let report = orchestrator(executor.clone())
            .apply(
                &volumes,
                &targets(&["disk4s1", "disk5s1", "disk4s1"]),
                DesiredState::Unmounted,
            )
            .await;

        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.identifier.as_str()).collect();
        assert_eq!(ids, ["disk4s1", "disk5s1"]);
        assert_eq!(report.verdict, Verdict::AllSucceeded);
        assert_eq!(executor.calls(), ["diskutil unmount /dev/disk4s1"]);
    }

    #[tokio::test]
    async fn test_eject_targets_whole_device() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("diskutil eject /dev/disk4", CommandOutput::failed(1, "Disk in use")),
        );
        let volumes = vec![volume("disk4s2", "/Volumes/USB")];
        let report = orchestrator(executor.clone())
            .apply(&volumes, &targets(&["disk4s2"]), DesiredState::Ejected)
            .await;

        assert_eq!(report.verdict, Verdict::AllFailed);
        assert_eq!(
            executor.calls(),
            ["diskutil eject /dev/disk4", "diskutil eject /dev/disk4"]
        );
        assert_eq!(executor.privileged_calls(), ["diskutil eject /dev/disk4"]);
    }

    #[tokio::test]
    async fn test_eject_unmounted_stick() {
        let executor = Arc::new(
            ScriptedExecutor::new().on("diskutil eject /dev/disk4", CommandOutput::ok("Disk /dev/disk4 ejected")),
        );
        let report = orchestrator(executor.clone())
            .apply(&[volume("disk4", "")], &targets(&["disk4"]), DesiredState::Ejected)
            .await;

        assert_eq!(report.outcome_for("disk4"), Some(&Outcome::Success));
        assert!(executor.privileged_calls().is_empty());
    }

    #[tokio::test]
    async fn test_eject_skips_system_and_internal() {
        let executor = Arc::new(ScriptedExecutor::new());
        let system = volume("disk2s1", "/System/Volumes/Data");
        let mut internal = volume("disk0s2", "");
        internal.is_internal = true;

        let report = orchestrator(executor.clone())
            .apply(&[system, internal], &targets(&["disk2s1", "disk0s2"]), DesiredState::Ejected)
            .await;

        assert_eq!(
            report.outcome_for("disk2s1"),
            Some(&Outcome::Skipped("system volume".to_string()))
        );
        assert_eq!(
            report.outcome_for("disk0s2"),
            Some(&Outcome::Skipped("internal device".to_string()))
        );
        assert_eq!(report.verdict, Verdict::NothingToDo);
        assert!(executor.calls().is_empty());
    }
}
