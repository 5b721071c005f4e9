//! Command-line surface of `madb`

use clap::{Args, Parser, Subcommand};

use madb_app::{DispatchMode, ProjectOptions};
use madb_core::{DeviceFilter, PrefixStyle};

/// Run adb commands on multiple Android devices and emulators at once
#[derive(Parser, Debug)]
#[command(name = "madb", version)]
#[command(about = "Run adb commands on multiple Android devices and emulators at once", long_about = None)]
pub struct Cli {
    /// Restrict the command to real devices
    #[arg(short = 'd', global = true)]
    pub real_devices: bool,

    /// Restrict the command to emulators
    #[arg(short = 'e', global = true)]
    pub emulators: bool,

    /// Comma-separated device serials, qualifiers, indices (@N), nicknames or groups
    #[arg(short = 'n', value_name = "SPECIFIERS", global = true)]
    pub devices: Option<String>,

    /// Tag each output line with the device name, serial, or nothing
    #[arg(long, value_name = "STYLE", default_value_t = PrefixStyle::Name, global = true)]
    pub prefix: PrefixStyle,

    /// Run on one device after another instead of all at once
    #[arg(long, global = true)]
    pub seq: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn device_filter(&self) -> DeviceFilter {
        DeviceFilter {
            all_real: self.real_devices,
            all_emulators: self.emulators,
            tokens: self
                .devices
                .as_deref()
                .map(DeviceFilter::parse_token_list)
                .unwrap_or_default(),
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        if self.seq {
            DispatchMode::Sequential
        } else {
            DispatchMode::Concurrent
        }
    }
}

/// Flags selecting the Gradle module and variant when ids are not given
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Application module of a multi-module Gradle project
    #[arg(long, default_value = "")]
    pub module: String,

    /// Build variant to use, e.g. "debug"
    #[arg(long, default_value = "")]
    pub variant: String,

    /// Re-extract the variant properties instead of using the cache
    #[arg(long)]
    pub clear_cache: bool,
}

impl ProjectArgs {
    pub fn options(&self, build: bool) -> ProjectOptions {
        ProjectOptions {
            module: self.module.clone(),
            variant: self.variant.clone(),
            clear_cache: self.clear_cache,
            build,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an adb command on every device
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run an adb shell command on every device
    Shell {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run an external command once per device with ANDROID_SERIAL set
    Extern {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Launch the app on every device
    Start {
        #[command(flatten)]
        project: ProjectArgs,
        /// <application_id> <activity_name>, or nothing to read them from Gradle
        #[arg(value_name = "ID")]
        args: Vec<String>,
    },

    /// Force-stop the app on every device
    Stop {
        #[command(flatten)]
        project: ProjectArgs,
        /// <application_id>, or nothing to read it from Gradle
        #[arg(value_name = "ID")]
        args: Vec<String>,
    },

    /// Clear the app data on every device
    ClearData {
        #[command(flatten)]
        project: ProjectArgs,
        /// <application_id>, or nothing to read it from Gradle
        #[arg(value_name = "ID")]
        args: Vec<String>,
    },

    /// Uninstall the app from every device
    Uninstall {
        #[command(flatten)]
        project: ProjectArgs,
        /// Keep the app data and cache directories (adb uninstall -k)
        #[arg(long)]
        keep_data: bool,
        /// <application_id>, or nothing to read it from Gradle
        #[arg(value_name = "ID")]
        args: Vec<String>,
    },

    /// Install the best matching .apk of the app on every device
    Install {
        #[command(flatten)]
        project: ProjectArgs,
        /// Build the app with Gradle first
        #[arg(long)]
        build: bool,
    },

    /// Print the serials of the devices matching the specifiers
    Resolve {
        #[arg(required = true)]
        specifiers: Vec<String>,
    },

    /// Manage device nicknames
    #[command(subcommand)]
    Name(NameCommand),

    /// Manage device groups
    #[command(subcommand)]
    Group(GroupCommand),

    /// Manage default user ids
    #[command(subcommand)]
    User(UserCommand),

    /// Print the madb version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum NameCommand {
    /// Give a device a nickname
    Set { serial: String, nickname: String },
    /// Remove a nickname, given either the nickname or the serial
    Unset { name: String },
    /// List all nicknames
    List,
    /// Remove all nicknames
    ClearAll,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Add members to a group, creating it if needed
    Add {
        group: String,
        #[arg(required = true)]
        members: Vec<String>,
    },
    /// Remove members from a group
    Remove {
        group: String,
        #[arg(required = true)]
        members: Vec<String>,
    },
    /// Delete whole groups
    Delete {
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Rename a group
    Rename { old_name: String, new_name: String },
    /// List all groups
    List,
    /// Delete all groups
    ClearAll,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Set the default user id for a device
    Set { serial: String, user_id: String },
    /// Remove the default user id of a device
    Unset { serial: String },
    /// List all default user ids
    List,
    /// Remove all default user ids
    ClearAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("madb").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_global_flags() {
        let cli = parse(&["-d", "-n", "Tablet, @2,,LAB", "--prefix", "serial", "--seq", "exec", "devices"]);
        assert_eq!(
            cli.device_filter(),
            DeviceFilter {
                all_real: true,
                all_emulators: false,
                tokens: vec!["Tablet".to_string(), "@2".to_string(), "LAB".to_string()],
            }
        );
        assert_eq!(cli.prefix, PrefixStyle::Serial);
        assert_eq!(cli.dispatch_mode(), DispatchMode::Sequential);
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["version"]);
        assert!(cli.device_filter().is_unrestricted());
        assert_eq!(cli.prefix, PrefixStyle::Name);
        assert_eq!(cli.dispatch_mode(), DispatchMode::Concurrent);
    }

    #[test]
    fn test_passthrough_keeps_hyphen_args() {
        let cli = parse(&["-e", "shell", "ls", "-l", "/sdcard"]);
        match cli.command {
            Command::Shell { args } => assert_eq!(args, vec!["ls", "-l", "/sdcard"]),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(cli.emulators);
    }

    #[test]
    fn test_app_commands_accept_any_arg_count() {
        let cli = parse(&["start", "--variant", "debug", "com.example"]);
        match cli.command {
            Command::Start { project, args } => {
                assert_eq!(args, vec!["com.example"]);
                assert_eq!(project.options(false).variant, "debug");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_prefix_is_rejected() {
        assert!(Cli::try_parse_from(["madb", "--prefix", "nickname", "version"]).is_err());
    }

    #[test]
    fn test_management_subcommands() {
        let cli = parse(&["group", "add", "LAB", "Tablet", "@1"]);
        match cli.command {
            Command::Group(GroupCommand::Add { group, members }) => {
                assert_eq!(group, "LAB");
                assert_eq!(members, vec!["Tablet", "@1"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(matches!(
            parse(&["user", "clear-all"]).command,
            Command::User(UserCommand::ClearAll)
        ));
    }
}
