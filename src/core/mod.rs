pub mod classify;
pub mod enumerator;
pub mod executor;
pub mod listing;
pub mod orchestrator;
pub mod parser;
pub mod store;

#[cfg(test)]
pub mod testing;

use serde::Serialize;
use thiserror::Error;

/// One physical or logical storage unit as reported by the volume tool.
///
/// Records are rebuilt from scratch on every enumeration pass; nothing
/// mutates a record once the enumerator has handed it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRecord {
    pub identifier: String,
    pub display_name: String,
    pub size_text: String,
    /// Exact byte count when the tool printed one, used by the EFI heuristic.
    pub size_bytes: Option<u64>,
    #[serde(rename = "type")]
    pub volume_type: String,
    /// Empty when unmounted.
    pub mount_point: String,
    pub is_internal: bool,
    pub is_efi: bool,
}

impl VolumeRecord {
    /// A record with only the identifier known.
    pub fn bare(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            display_name: classify::synthesized_name(identifier),
            size_text: String::new(),
            size_bytes: None,
            volume_type: "Unknown".to_string(),
            mount_point: String::new(),
            is_internal: true,
            is_efi: false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        classify::normalize_mount_point(&self.mount_point).is_some()
    }

    pub fn is_system_volume(&self) -> bool {
        self.is_mounted() && classify::is_protected_mount_point(&self.mount_point)
    }

    pub fn can_mount(&self) -> bool {
        !self.is_mounted()
    }

    pub fn can_unmount(&self) -> bool {
        self.is_mounted() && !self.is_system_volume()
    }

    /// Only external devices are ejected, and never while a system volume
    /// is mounted from them.
    pub fn can_eject(&self) -> bool {
        !self.is_internal && !self.is_system_volume()
    }

    pub fn has_synthesized_name(&self) -> bool {
        self.display_name == classify::synthesized_name(&self.identifier)
    }

    pub fn is_hidden(&self) -> bool {
        classify::is_hidden_volume(&self.display_name, &self.mount_point)
    }
}

/// Target end-state for a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    Mounted,
    Unmounted,
    /// Every volume of the device unmounted and the device detached.
    Ejected,
}

impl DesiredState {
    pub fn verb(&self) -> &'static str {
        match self {
            DesiredState::Mounted => "mount",
            DesiredState::Unmounted => "unmount",
            DesiredState::Ejected => "eject",
        }
    }
}

/// Per-volume result of an `apply` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed(String),
    Skipped(String),
}

impl Outcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeOutcome {
    pub identifier: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    AllSucceeded,
    Partial,
    AllFailed,
    NothingToDo,
}

/// Aggregated result of one batch mount/unmount call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    pub desired_state: DesiredState,
    pub outcomes: Vec<VolumeOutcome>,
    pub verdict: Verdict,
}

impl OperationReport {
    pub fn new(desired_state: DesiredState, outcomes: Vec<VolumeOutcome>) -> Self {
        let verdict = verdict_for(&outcomes);
        Self {
            desired_state,
            outcomes,
            verdict,
        }
    }

    pub fn outcome_for(&self, identifier: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.identifier == identifier)
            .map(|o| &o.outcome)
    }

    /// Short human summary, e.g. "mount: 2 succeeded, 1 failed, 0 skipped".
    pub fn summary(&self) -> String {
        let count = |f: fn(&Outcome) -> bool| self.outcomes.iter().filter(|o| f(&o.outcome)).count();
        format!(
            "{}: {} succeeded, {} failed, {} skipped",
            self.desired_state.verb(),
            count(Outcome::is_success),
            count(|o| matches!(o, Outcome::Failed(_))),
            count(Outcome::is_skipped),
        )
    }
}

fn verdict_for(outcomes: &[VolumeOutcome]) -> Verdict {
    let attempted: Vec<&Outcome> = outcomes
        .iter()
        .map(|o| &o.outcome)
        .filter(|o| !o.is_skipped())
        .collect();
    if attempted.is_empty() {
        return Verdict::NothingToDo;
    }
    let succeeded = attempted.iter().filter(|o| o.is_success()).count();
    if succeeded == attempted.len() {
        Verdict::AllSucceeded
    } else if succeeded == 0 {
        Verdict::AllFailed
    } else {
        Verdict::Partial
    }
}

/// Application state machine for the interactive front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Idle,
    InProgress(String),
    Report(OperationReport),
    Error(String),
}

/// Errors surfaced outside the core flow: listing decode and one-shot
/// command results.
///
/// Command failures inside enumeration and orchestration are folded into
/// outcomes instead and never reach this type.
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown volume: {0}")]
    UnknownVolume(String),
}
