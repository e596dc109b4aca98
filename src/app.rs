use crate::core::store::VolumeStore;
use crate::core::{AppState, VolumeRecord};

/// Interactive front-end state around the volume store.
pub struct App {
    pub store: VolumeStore,
    pub cursor: usize,
    pub state: AppState,
    pub should_quit: bool,
    pub tick: u64,
    pub privileged: bool,
    awaiting_report: bool,
}

impl App {
    pub fn new(store: VolumeStore, privileged: bool) -> Self {
        Self {
            store,
            cursor: 0,
            state: AppState::Idle,
            should_quit: false,
            tick: 0,
            privileged,
            awaiting_report: false,
        }
    }

    /// Applies finished background work and moves to the report popup once
    /// a running operation has completed.
    pub fn poll_store(&mut self) {
        if !self.store.drain_events() {
            return;
        }
        self.clamp_cursor();
        if self.awaiting_report && !self.store.is_applying() {
            self.awaiting_report = false;
            self.state = match self.store.last_report() {
                Some(report) => AppState::Report(report.clone()),
                None => AppState::Idle,
            };
        }
    }

    pub fn visible(&self) -> Vec<&VolumeRecord> {
        self.store.visible_volumes()
    }

    pub fn selected_volume(&self) -> Option<&VolumeRecord> {
        self.store.visible_volumes().get(self.cursor).copied()
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_volume().map(|v| v.identifier.clone())
    }

    fn clamp_cursor(&mut self) {
        let len = self.store.visible_volumes().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    pub fn select_next(&mut self) {
        let len = self.store.visible_volumes().len();
        if len > 0 {
            self.cursor = (self.cursor + 1) % len;
        }
    }

    pub fn select_previous(&mut self) {
        let len = self.store.visible_volumes().len();
        if len > 0 {
            self.cursor = if self.cursor == 0 { len - 1 } else { self.cursor - 1 };
        }
    }

    pub fn refresh(&mut self) {
        self.store.refresh();
    }

    pub fn toggle_mount(&mut self) {
        if let Some(id) = self.selected_id() {
            self.store.toggle_mount_selection(&id);
        }
    }

    pub fn toggle_unmount(&mut self) {
        if let Some(id) = self.selected_id() {
            self.store.toggle_unmount_selection(&id);
        }
    }

    pub fn select_all_for_unmount(&mut self) {
        self.store.select_all_for_unmount();
    }

    pub fn clear_selections(&mut self) {
        self.store.clear_all_selections();
    }

    pub fn toggle_efi_visibility(&mut self) {
        self.store.toggle_efi_visibility();
        self.clamp_cursor();
    }

    pub fn mount_selected(&mut self) {
        if self.store.pending_mount().is_empty() {
            return;
        }
        let count = self.store.pending_mount().len();
        if self.store.mount_selected() {
            self.begin(format!("Mounting {} volume(s)...", count));
        }
    }

    pub fn unmount_selected(&mut self) {
        if self.store.pending_unmount().is_empty() {
            return;
        }
        let count = self.store.pending_unmount().len();
        if self.store.unmount_selected() {
            self.begin(format!("Unmounting {} volume(s)...", count));
        }
    }

    pub fn mount_all_external(&mut self) {
        if self.store.mount_all_external() {
            self.begin("Mounting external volumes...".to_string());
        }
    }

    pub fn unmount_all_external(&mut self) {
        if self.store.unmount_all_external() {
            self.begin("Unmounting external volumes...".to_string());
        }
    }

    pub fn mount_efi(&mut self) {
        let Some((id, name, is_efi)) = self
            .selected_volume()
            .map(|v| (v.identifier.clone(), v.display_name.clone(), v.is_efi))
        else {
            return;
        };
        if !is_efi {
            self.state = AppState::Error(format!("{} is not an EFI partition", name));
            return;
        }
        if self.store.mount_efi(&id) {
            self.begin(format!("Mounting EFI partition {}...", id));
        }
    }

    /// Ejects the device under the cursor.
    pub fn eject(&mut self) {
        let Some((id, name, can_eject)) = self
            .selected_volume()
            .map(|v| (v.identifier.clone(), v.display_name.clone(), v.can_eject()))
        else {
            return;
        };
        if !can_eject {
            self.state = AppState::Error(format!("{} is not on an ejectable device", name));
            return;
        }
        if self.store.eject(&id) {
            self.begin(format!("Ejecting {}...", name));
        }
    }

    fn begin(&mut self, message: String) {
        self.awaiting_report = true;
        self.state = AppState::InProgress(message);
    }

    pub fn dismiss(&mut self) {
        self.state = AppState::Idle;
    }
}
