//! `exec`, `shell` and `extern`: pass-through commands run on every device

use madb_core::prelude::*;
use madb_core::Device;
use madb_daemon::{AdbTool, DeviceAction, DeviceCommand, OutputOptions};

use super::CommandContext;

/// Environment variable adb-aware tools read the target serial from
pub const ANDROID_SERIAL_ENV: &str = "ANDROID_SERIAL";

/// Replace `{{index}}`, `{{name}}` and `{{serial}}` in `arg`
pub fn expand_keywords(arg: &str, device: &Device) -> String {
    arg.replace("{{index}}", &device.index.to_string())
        .replace("{{name}}", device.display_name())
        .replace("{{serial}}", &device.serial)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassThrough {
    /// `adb -s <serial> <args...>`
    Adb,
    /// `adb -s <serial> shell <args...>`
    Shell,
    /// `<args...>` with `ANDROID_SERIAL` set
    External,
}

/// Runs the user's arguments for each device, keywords expanded
#[derive(Debug)]
struct PassThroughAction {
    kind: PassThrough,
    adb: AdbTool,
    output: OutputOptions,
    args: Vec<String>,
}

impl PassThroughAction {
    fn command_for(&self, device: &Device) -> Result<DeviceCommand> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| expand_keywords(arg, device))
            .collect();

        let cmd = match self.kind {
            PassThrough::Adb => self.adb.device_command(&device.serial).args(args),
            PassThrough::Shell => self
                .adb
                .device_command(&device.serial)
                .arg("shell")
                .args(args),
            PassThrough::External => {
                let (program, rest) = args
                    .split_first()
                    .ok_or_else(|| Error::usage("You must provide a command to run."))?;
                DeviceCommand::new(program)
                    .args(rest)
                    .env(ANDROID_SERIAL_ENV, &device.serial)
            }
        };
        Ok(cmd)
    }
}

impl DeviceAction for PassThroughAction {
    async fn run(&self, device: &Device) -> Result<()> {
        let cmd = self.command_for(device)?;
        let prefix = self.output.prefix_for(device, false);
        cmd.run_prefixed(&prefix, &self.output.stdout, &self.output.stderr)
            .await
    }
}

async fn run_pass_through(ctx: &CommandContext, kind: PassThrough, args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err(Error::usage("You must provide a command to run."));
    }

    ctx.run_on_targets(PassThroughAction {
        kind,
        adb: ctx.adb.clone(),
        output: ctx.output.clone(),
        args: args.to_vec(),
    })
    .await
}

/// `madb exec <adb args...>`
pub async fn exec(ctx: &CommandContext, args: &[String]) -> Result<()> {
    run_pass_through(ctx, PassThrough::Adb, args).await
}

/// `madb shell <args...>`
pub async fn shell(ctx: &CommandContext, args: &[String]) -> Result<()> {
    run_pass_through(ctx, PassThrough::Shell, args).await
}

/// `madb extern <command...>`
pub async fn extern_command(ctx: &CommandContext, args: &[String]) -> Result<()> {
    run_pass_through(ctx, PassThrough::External, args).await
}
