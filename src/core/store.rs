//! Selection/state store.
//!
//! The store is the single owner of the volume set and both selection sets.
//! Enumeration and mount work run on spawned tasks; their results come back
//! as [`StoreEvent`]s on a channel that the owner drains on its own turn, so
//! every mutation happens through `&mut self`.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use super::enumerator::Enumerator;
use super::orchestrator::MountOrchestrator;
use super::{DesiredState, OperationReport, VolumeRecord};

/// Background results delivered back to the store.
#[derive(Debug)]
pub enum StoreEvent {
    Refreshed(Vec<VolumeRecord>),
    Applied(OperationReport),
}

/// A volume plus its derived flags, for output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeView {
    #[serde(flatten)]
    pub record: VolumeRecord,
    pub is_mounted: bool,
    pub is_system_volume: bool,
    pub can_mount: bool,
    pub can_unmount: bool,
}

impl From<&VolumeRecord> for VolumeView {
    fn from(record: &VolumeRecord) -> Self {
        Self {
            record: record.clone(),
            is_mounted: record.is_mounted(),
            is_system_volume: record.is_system_volume(),
            can_mount: record.can_mount(),
            can_unmount: record.can_unmount(),
        }
    }
}

/// Read-only copy of the store state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub volumes: Vec<VolumeView>,
    pub pending_mount: Vec<String>,
    pub pending_unmount: Vec<String>,
    pub is_refreshing: bool,
    pub show_efi: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<OperationReport>,
}

pub struct VolumeStore {
    volumes: Vec<VolumeRecord>,
    pending_mount: BTreeSet<String>,
    pending_unmount: BTreeSet<String>,
    is_refreshing: bool,
    is_applying: bool,
    /// A refresh was requested while one was in flight after an operation.
    stale: bool,
    show_efi: bool,
    last_report: Option<OperationReport>,

    enumerator: Arc<Enumerator>,
    orchestrator: Arc<MountOrchestrator>,
    event_tx: mpsc::UnboundedSender<StoreEvent>,
    event_rx: mpsc::UnboundedReceiver<StoreEvent>,
}

impl VolumeStore {
    pub fn new(enumerator: Arc<Enumerator>, orchestrator: Arc<MountOrchestrator>, show_efi: bool) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            volumes: Vec::new(),
            pending_mount: BTreeSet::new(),
            pending_unmount: BTreeSet::new(),
            is_refreshing: false,
            is_applying: false,
            stale: false,
            show_efi,
            last_report: None,
            enumerator,
            orchestrator,
            event_tx,
            event_rx,
        }
    }

    /// Starts a background enumeration. Returns false when one is already
    /// running; the call is dropped, not queued.
    pub fn refresh(&mut self) -> bool {
        if self.is_refreshing {
            debug!("refresh already in flight, coalescing");
            return false;
        }
        self.is_refreshing = true;

        let enumerator = self.enumerator.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let volumes = enumerator.enumerate().await;
            let _ = tx.send(StoreEvent::Refreshed(volumes));
        });
        true
    }

    /// Applies every event already delivered. Returns whether any arrived.
    pub fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            changed = true;
        }
        changed
    }

    /// Waits for the next background result and applies it.
    pub async fn next_event(&mut self) {
        if let Some(event) = self.event_rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Waits until no refresh or operation is in flight.
    pub async fn settle(&mut self) {
        while self.is_busy() {
            self.next_event().await;
        }
    }

    fn handle_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Refreshed(volumes) => {
                self.volumes = volumes;
                self.reconcile();
                self.is_refreshing = false;
                if std::mem::take(&mut self.stale) {
                    self.refresh();
                }
            }
            StoreEvent::Applied(report) => {
                debug!(summary = %report.summary(), "operation applied");
                self.last_report = Some(report);
                self.is_applying = false;
                self.clear_all_selections();
                if !self.refresh() {
                    self.stale = true;
                }
            }
        }
    }

    /// Drops selections for identifiers no longer present.
    fn reconcile(&mut self) {
        let present: BTreeSet<&str> = self.volumes.iter().map(|v| v.identifier.as_str()).collect();
        self.pending_mount.retain(|id| present.contains(id.as_str()));
        self.pending_unmount.retain(|id| present.contains(id.as_str()));
    }

    pub fn toggle_mount_selection(&mut self, identifier: &str) {
        if !self.volume(identifier).is_some_and(VolumeRecord::can_mount) {
            return;
        }
        if !self.pending_mount.remove(identifier) {
            self.pending_unmount.remove(identifier);
            self.pending_mount.insert(identifier.to_string());
        }
    }

    pub fn toggle_unmount_selection(&mut self, identifier: &str) {
        if !self.volume(identifier).is_some_and(VolumeRecord::can_unmount) {
            return;
        }
        if !self.pending_unmount.remove(identifier) {
            self.pending_mount.remove(identifier);
            self.pending_unmount.insert(identifier.to_string());
        }
    }

    /// External volumes the user can see; bulk actions only touch these.
    fn external_visible(&self) -> impl Iterator<Item = &VolumeRecord> {
        self.volumes.iter().filter(|v| !v.is_internal && !v.is_hidden())
    }

    pub fn select_all_for_unmount(&mut self) {
        self.clear_all_selections();
        self.pending_unmount = self
            .external_visible()
            .filter(|v| v.can_unmount())
            .map(|v| v.identifier.clone())
            .collect();
    }

    pub fn clear_all_selections(&mut self) {
        self.pending_mount.clear();
        self.pending_unmount.clear();
    }

    pub fn mount_selected(&mut self) -> bool {
        let targets = self.pending_mount.iter().cloned().collect();
        self.apply(targets, DesiredState::Mounted)
    }

    pub fn unmount_selected(&mut self) -> bool {
        let targets = self.pending_unmount.iter().cloned().collect();
        self.apply(targets, DesiredState::Unmounted)
    }

    pub fn mount_all_external(&mut self) -> bool {
        let targets = self
            .external_visible()
            .filter(|v| !v.is_mounted() && !v.is_efi)
            .map(|v| v.identifier.clone())
            .collect();
        self.apply(targets, DesiredState::Mounted)
    }

    pub fn unmount_all_external(&mut self) -> bool {
        let targets = self
            .external_visible()
            .filter(|v| v.can_unmount())
            .map(|v| v.identifier.clone())
            .collect();
        self.apply(targets, DesiredState::Unmounted)
    }

    /// Ejects the device holding `identifier`.
    pub fn eject(&mut self, identifier: &str) -> bool {
        self.apply(vec![identifier.to_string()], DesiredState::Ejected)
    }

    /// Mounts one EFI partition through the orchestrator's EFI path.
    pub fn mount_efi(&mut self, identifier: &str) -> bool {
        if self.is_applying {
            return false;
        }
        self.is_applying = true;

        let orchestrator = self.orchestrator.clone();
        let volumes = self.volumes.clone();
        let identifier = identifier.to_string();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let report = orchestrator.mount_efi(&volumes, &identifier).await;
            let _ = tx.send(StoreEvent::Applied(report));
        });
        true
    }

    /// Runs one batch for arbitrary targets in the background. Returns
    /// false if a batch is already running.
    pub fn apply(&mut self, targets: Vec<String>, desired: DesiredState) -> bool {
        if self.is_applying {
            debug!(action = desired.verb(), "operation already running");
            return false;
        }
        self.is_applying = true;

        let orchestrator = self.orchestrator.clone();
        let volumes = self.volumes.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let report = orchestrator.apply(&volumes, &targets, desired).await;
            let _ = tx.send(StoreEvent::Applied(report));
        });
        true
    }

    pub fn toggle_efi_visibility(&mut self) {
        self.show_efi = !self.show_efi;
    }

    /// Volumes offered to the user: hidden volumes never, EFI partitions
    /// only while EFI visibility is on.
    pub fn visible_volumes(&self) -> Vec<&VolumeRecord> {
        self.volumes
            .iter()
            .filter(|v| !v.is_hidden() && (self.show_efi || !v.is_efi))
            .collect()
    }

    pub fn volume(&self, identifier: &str) -> Option<&VolumeRecord> {
        self.volumes.iter().find(|v| v.identifier == identifier)
    }

    #[cfg(test)]
    pub fn volumes(&self) -> &[VolumeRecord] {
        &self.volumes
    }

    pub fn pending_mount(&self) -> &BTreeSet<String> {
        &self.pending_mount
    }

    pub fn pending_unmount(&self) -> &BTreeSet<String> {
        &self.pending_unmount
    }

    pub fn is_refreshing(&self) -> bool {
        self.is_refreshing
    }

    pub fn is_applying(&self) -> bool {
        self.is_applying
    }

    pub fn is_busy(&self) -> bool {
        self.is_refreshing || self.is_applying
    }

    pub fn show_efi(&self) -> bool {
        self.show_efi
    }

    pub fn last_report(&self) -> Option<&OperationReport> {
        self.last_report.as_ref()
    }

    /// Copies the current state; `include_hidden` lists every volume
    /// instead of only the visible ones.
    pub fn snapshot(&self, include_hidden: bool) -> StoreSnapshot {
        let volumes = if include_hidden {
            self.volumes.iter().map(VolumeView::from).collect()
        } else {
            self.visible_volumes().into_iter().map(VolumeView::from).collect()
        };
        StoreSnapshot {
            volumes,
            pending_mount: self.pending_mount.iter().cloned().collect(),
            pending_unmount: self.pending_unmount.iter().cloned().collect(),
            is_refreshing: self.is_refreshing,
            show_efi: self.show_efi,
            last_report: self.last_report.clone(),
        }
    }
}
