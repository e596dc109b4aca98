use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_DIRECTIVE: &str = "drivedeck=info";
const LOG_FILE_NAME: &str = "drivedeck.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Default log location: the user's state directory, else the cache directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("drivedeck").join(LOG_FILE_NAME))
}

/// Logging for one-shot commands: human-readable events on stderr.
pub fn init_stderr() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Logging for the interactive mode, where the terminal belongs to the UI.
///
/// Events go to a non-blocking file writer. If the file cannot be opened
/// logging stays disabled and the error is returned for display.
pub fn init_file(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(default_log_path)
        .ok_or_else(|| anyhow::anyhow!("no state or cache directory for the log file"))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| LOG_FILE_NAME.to_string());

    if let Err(e) = fs::create_dir_all(&dir) {
        anyhow::bail!("create log directory failed: {} ({})", dir.display(), e);
    }

    let appender = tracing_appender::rolling::never(&dir, &file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false),
        )
        .try_init()?;

    // Keep the background writer alive for the rest of the process.
    let _ = LOG_GUARD.set(guard);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_path_names_the_file() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with("drivedeck/drivedeck.log"));
        }
    }
}
