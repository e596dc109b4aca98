use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// Drivedeck: mount and unmount external volumes from the terminal.
#[derive(Parser, Debug)]
#[command(name = "drivedeck")]
#[command(about = "Mount and unmount external volumes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Volume tool binary.
    #[arg(long, env = "DRIVEDECK_VOLUME_TOOL", default_value = "diskutil", global = true)]
    pub volume_tool: String,

    /// Command that prints the system mount table.
    #[arg(long, env = "DRIVEDECK_MOUNT_TABLE_TOOL", default_value = "mount", global = true)]
    pub mount_table_tool: String,

    /// Per-command timeout in seconds.
    #[arg(long, env = "DRIVEDECK_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Pause between consecutive mount/unmount operations, in milliseconds.
    #[arg(long, env = "DRIVEDECK_OP_DELAY_MS", default_value_t = 400, global = true)]
    pub op_delay_ms: u64,

    /// User-visible volumes directory; EFI mount points are created here.
    #[arg(long, env = "DRIVEDECK_VOLUMES_ROOT", default_value = "/Volumes", global = true)]
    pub volumes_root: String,

    /// Hide EFI partitions from the volume list.
    #[arg(long, env = "DRIVEDECK_HIDE_EFI", global = true)]
    pub hide_efi: bool,

    /// Log file for the interactive mode.
    #[arg(long, env = "DRIVEDECK_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the current volume set.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Include hidden volumes and EFI partitions.
        #[arg(long)]
        all: bool,
    },
    /// Mount the given volumes.
    Mount {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Unmount the given volumes.
    Unmount {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Mount every unmounted external volume.
    MountExternal {
        #[arg(long)]
        json: bool,
    },
    /// Unmount every mounted external volume.
    UnmountExternal {
        #[arg(long)]
        json: bool,
    },
    /// Eject the device holding the given volume.
    Eject {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Mount one EFI partition, trying fallback filesystem types.
    MountEfi {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

/// Runtime settings resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub volume_tool: String,
    pub mount_table_tool: String,
    pub command_timeout: Duration,
    pub op_delay: Duration,
    pub volumes_root: String,
    pub show_efi: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            volume_tool: "diskutil".to_string(),
            mount_table_tool: "mount".to_string(),
            command_timeout: Duration::from_secs(30),
            op_delay: Duration::from_millis(400),
            volumes_root: "/Volumes".to_string(),
            show_efi: true,
            log_file: None,
        }
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            volume_tool: cli.volume_tool.clone(),
            mount_table_tool: cli.mount_table_tool.clone(),
            command_timeout: Duration::from_secs(cli.timeout_secs),
            op_delay: Duration::from_millis(cli.op_delay_ms),
            volumes_root: cli.volumes_root.clone(),
            show_efi: !cli.hide_efi,
            log_file: cli.log_file.clone(),
        }
    }
}
