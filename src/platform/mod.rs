#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

use std::sync::Arc;

use crate::config::Config;
use crate::core::executor::{CommandExecutor, ProcessExecutor};

/// Builds the process executor for the current platform. Privileged calls
/// go through the OS prompt unless the process already runs as root.
pub fn get_executor(config: &Config, privileged: bool) -> Arc<dyn CommandExecutor> {
    Arc::new(process_executor(config, privileged))
}

fn process_executor(config: &Config, privileged: bool) -> ProcessExecutor {
    let executor = ProcessExecutor::new(config.command_timeout);
    if privileged {
        return executor;
    }

    #[cfg(target_os = "macos")]
    let executor = executor.with_elevation(Box::new(macos::OsascriptElevation));

    #[cfg(target_os = "linux")]
    let executor = executor.with_elevation(Box::new(linux::PkexecElevation));

    executor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_skips_elevation() {
        let config = Config::default();
        assert!(!process_executor(&config, true).elevates());
        assert_eq!(
            process_executor(&config, false).elevates(),
            cfg!(any(target_os = "macos", target_os = "linux"))
        );
    }
}
