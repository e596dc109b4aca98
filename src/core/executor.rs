use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// A program plus its arguments, executed without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The most useful text for a failure report: stderr, else stdout.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.exit_code)
    }
}

/// Process-execution boundary. Implementations never return an error:
/// spawn failures and timeouts become a non-success `CommandOutput`.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &CommandLine, elevated: bool) -> CommandOutput;

    async fn run(&self, command: &CommandLine) -> CommandOutput {
        self.execute(command, false).await
    }

    /// Requests one OS elevation prompt for this call.
    async fn run_privileged(&self, command: &CommandLine) -> CommandOutput {
        self.execute(command, true).await
    }
}

/// Turns a command into the one that asks the OS for elevation.
pub trait Elevation: Send + Sync {
    fn wrap(&self, command: &CommandLine) -> CommandLine;
}

/// Runs commands as child processes with a timeout.
pub struct ProcessExecutor {
    timeout: Duration,
    elevation: Option<Box<dyn Elevation>>,
}

impl ProcessExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, elevation: Box<dyn Elevation>) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// Whether privileged calls are routed through an OS prompt.
    pub fn elevates(&self) -> bool {
        self.elevation.is_some()
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, command: &CommandLine, elevated: bool) -> CommandOutput {
        let command = match (&self.elevation, elevated) {
            (Some(elevation), true) => elevation.wrap(command),
            _ => command.clone(),
        };
        debug!(%command, elevated, "executing");

        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Ok(Err(e)) => {
                warn!(%command, error = %e, "failed to spawn");
                CommandOutput::failed(-1, format!("failed to execute {}: {}", command.program, e))
            }
            Err(_) => {
                warn!(%command, timeout = ?self.timeout, "timed out");
                CommandOutput::failed(
                    -1,
                    format!("{} timed out after {:?}", command.program, self.timeout),
                )
            }
        };

        if !output.success() {
            debug!(%command, code = output.exit_code, stderr = %output.stderr.trim(), "command failed");
        }
        output
    }
}
