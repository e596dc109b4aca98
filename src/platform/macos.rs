use crate::core::executor::{CommandLine, Elevation};

/// Runs a command through `osascript`, which shows the system
/// administrator-password prompt once per call.
pub struct OsascriptElevation;

impl OsascriptElevation {
    /// AppleScript string literal for a shell command line.
    fn script_for(command: &CommandLine) -> String {
        let shell = command.to_string().replace('\\', "\\\\").replace('"', "\\\"");
        format!("do shell script \"{}\" with administrator privileges", shell)
    }
}

impl Elevation for OsascriptElevation {
    fn wrap(&self, command: &CommandLine) -> CommandLine {
        CommandLine::new("osascript", ["-e".to_string(), Self::script_for(command)])
    }
}
