use crate::core::executor::{CommandLine, Elevation};

/// Runs a command through `pkexec` (polkit), which prompts for
/// authentication once per call.
pub struct PkexecElevation;

impl Elevation for PkexecElevation {
    fn wrap(&self, command: &CommandLine) -> CommandLine {
        let mut args = Vec::with_capacity(command.args.len() + 1);
        args.push(command.program.clone());
        args.extend(command.args.iter().cloned());
        CommandLine::new("pkexec", args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_in_pkexec() {
        let cmd = CommandLine::new("umount", ["-l", "/media/usb"]);
        let wrapped = PkexecElevation.wrap(&cmd);
        assert_eq!(wrapped.to_string(), "pkexec umount -l /media/usb");
    }
}
