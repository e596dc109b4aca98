//! Scripted executor for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::executor::{CommandExecutor, CommandLine, CommandOutput};

/// Answers commands from a table keyed by the rendered command line.
/// Unscripted commands fail with exit code 1, like a missing device would.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, command: &str, output: CommandOutput) -> Self {
        self.set(command, output);
        self
    }

    pub fn set(&self, command: &str, output: CommandOutput) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), output);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn privileged_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, elevated)| *elevated)
            .map(|(c, _)| c.clone())
            .collect()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &CommandLine, elevated: bool) -> CommandOutput {
        let key = command.to_string();
        self.calls.lock().unwrap().push((key.clone(), elevated));
        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failed(1, format!("unscripted: {key}")))
    }
}

/// `diskutil info` text for a mounted external data volume.
pub fn info_text(name: &str, mount_point: &str, internal: bool, size: &str) -> String {
    format!(
        "   Device Identifier:         diskX\n\
         \x20  Volume Name:               {name}\n\
         \x20  Mounted:                   Yes\n\
         \x20  Mount Point:               {mount_point}\n\
         \x20  Type (Bundle):             exfat\n\
         \x20  Protocol:                  {protocol}\n\
         \x20  Internal:                  {internal}\n\
         \x20  Disk Size:                 {size}\n",
        protocol = if internal { "Apple Fabric" } else { "USB" },
        internal = if internal { "Yes" } else { "No" },
    )
}
