//! Command orchestration
//!
//! Every device command follows the same path: validate arguments, make sure
//! the adb server is up, read the config once, list and filter the attached
//! devices, then hand one [`DeviceAction`] to the dispatcher.

pub mod app;
pub mod device;
pub mod manage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use madb_core::prelude::*;
use madb_core::{select_devices, Device, DeviceFilter};
use madb_daemon::{dispatch, list_devices, AdbTool, DeviceAction, DispatchMode, OutputOptions};

use crate::config::ConfigStore;

pub use app::{
    clear_data, install, start, stop, uninstall, AppTarget, ProjectOptions,
};
pub use device::{exec, expand_keywords, extern_command, shell};

/// Version string printed by `madb version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a command needs from the command line and the environment
///
/// Built once by the binary; nothing here is global.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub adb: AdbTool,
    pub filter: DeviceFilter,
    pub output: OutputOptions,
    pub mode: DispatchMode,
    pub store: ConfigStore,
    pub work_dir: PathBuf,
}

impl CommandContext {
    /// Context targeting every device with default output
    pub fn new(adb: AdbTool, store: ConfigStore, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            adb,
            filter: DeviceFilter::default(),
            output: OutputOptions::default(),
            mode: DispatchMode::default(),
            store,
            work_dir: work_dir.into(),
        }
    }

    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Print one line to the console's stdout
    pub fn println(&self, line: impl AsRef<str>) -> Result<()> {
        let mut bytes = line.as_ref().as_bytes().to_vec();
        bytes.push(b'\n');
        self.output.stdout.write_atomic(&bytes)?;
        Ok(())
    }

    /// The devices selected by `filter`, from a fresh `adb devices -l`
    pub async fn select(&self, filter: &DeviceFilter) -> Result<Vec<Device>> {
        self.adb.start_server().await?;
        let cfg = self.store.read()?;
        let devices = list_devices(&self.adb, &cfg).await?;
        select_devices(&devices, filter, &cfg)
    }

    /// The devices targeted by the global flags
    pub async fn target_devices(&self) -> Result<Vec<Device>> {
        self.select(&self.filter).await
    }

    /// Run `action` on `devices` in the configured mode
    pub async fn run_on<A>(&self, devices: Vec<Device>, action: A) -> Result<()>
    where
        A: DeviceAction + Send + Sync + 'static,
    {
        dispatch(devices, Arc::new(action), self.mode).await
    }

    /// Select the targeted devices and run `action` on them
    pub async fn run_on_targets<A>(&self, action: A) -> Result<()>
    where
        A: DeviceAction + Send + Sync + 'static,
    {
        let devices = self.target_devices().await?;
        self.run_on(devices, action).await
    }
}

/// Print the serials of attached devices matching `specifiers`
///
/// Only the specifiers count; the global `-d`/`-e`/`-n` flags are ignored.
pub async fn resolve(ctx: &CommandContext, specifiers: &[String]) -> Result<()> {
    if specifiers.is_empty() {
        return Err(Error::usage("You must provide at least one device specifier."));
    }

    let devices = ctx.select(&DeviceFilter::from_tokens(specifiers.iter().cloned())).await?;
    for device in devices {
        ctx.println(&device.serial)?;
    }
    Ok(())
}

/// Print the madb version
pub fn version(ctx: &CommandContext) -> Result<()> {
    ctx.println(format!("madb version: {VERSION}"))
}


#[cfg(all(test, unix))]
mod tests {
    use super::test_support::*;
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_resolve_prints_matching_serials() {
        let temp = tempdir().unwrap();
        let (ctx, captured) = context(temp.path(), fake_adb(temp.path(), ""));
        ctx.store
            .update(|cfg| cfg.add_group_members("LAB", &["@3".to_string(), "deviceid01".to_string()]))
            .unwrap();

        resolve(&ctx, &["LAB".to_string()]).await.unwrap();
        assert_eq!(captured.stdout.contents(), "deviceid01\nemulator-5554\n");
    }

    #[tokio::test]
    async fn test_resolve_ignores_global_filter() {
        let temp = tempdir().unwrap();
        let (ctx, captured) = context(temp.path(), fake_adb(temp.path(), ""));
        let ctx = ctx.with_filter(DeviceFilter {
            all_emulators: true,
            ..Default::default()
        });

        resolve(&ctx, &["deviceid02".to_string()]).await.unwrap();
        assert_eq!(captured.stdout.contents(), "deviceid02\n");
    }

    #[tokio::test]
    async fn test_resolve_without_match_fails() {
        let temp = tempdir().unwrap();
        let (ctx, _) = context(temp.path(), fake_adb(temp.path(), ""));

        let err = resolve(&ctx, &["nosuchdevice".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::NoMatchingDevices));
    }

    #[tokio::test]
    async fn test_resolve_requires_specifiers() {
        let temp = tempdir().unwrap();
        let (ctx, _) = context(temp.path(), AdbTool::at(temp.path().join("missing-adb")));

        let err = resolve(&ctx, &[]).await.unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_version_output() {
        let temp = tempdir().unwrap();
        let (ctx, captured) = context(temp.path(), AdbTool::at("adb"));

        version(&ctx).unwrap();
        assert_eq!(captured.stdout.contents(), format!("madb version: {VERSION}\n"));
    }
}
