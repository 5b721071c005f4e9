//! Locating the external tools madb drives
//!
//! `adb` is looked up on `PATH` first, then under the Android SDK pointed to
//! by `ANDROID_HOME` or `ANDROID_SDK_ROOT`.

use std::path::{Path, PathBuf};

use madb_core::prelude::*;

use crate::process::DeviceCommand;

/// SDK environment variables checked when adb is not on `PATH`
const SDK_ENV_VARS: [&str; 2] = ["ANDROID_HOME", "ANDROID_SDK_ROOT"];

fn adb_file_name() -> &'static str {
    if cfg!(windows) {
        "adb.exe"
    } else {
        "adb"
    }
}

/// A located `adb` executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbTool {
    path: PathBuf,
}

impl AdbTool {
    /// Find adb on `PATH` or in the Android SDK
    pub fn locate() -> Result<Self> {
        if let Ok(path) = which::which("adb") {
            debug!("Using adb from PATH: {}", path.display());
            return Ok(Self { path });
        }

        for candidate in Self::sdk_candidates() {
            if candidate.is_file() {
                debug!("Using adb from the Android SDK: {}", candidate.display());
                return Ok(Self { path: candidate });
            }
        }

        Err(Error::AdbNotFound)
    }

    /// Use a specific adb executable
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<sdk>/platform-tools/adb` for every SDK variable that is set
    fn sdk_candidates() -> Vec<PathBuf> {
        SDK_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var_os(var))
            .map(|sdk| PathBuf::from(sdk).join("platform-tools").join(adb_file_name()))
            .collect()
    }

    /// `adb <args...>`
    pub fn command(&self) -> DeviceCommand {
        DeviceCommand::new(&self.path)
    }

    /// `adb -s <serial> <args...>`
    pub fn device_command(&self, serial: &str) -> DeviceCommand {
        self.command().args(["-s", serial])
    }

    /// Make sure the adb server is running before talking to devices
    pub async fn start_server(&self) -> Result<()> {
        self.command()
            .arg("start-server")
            .output()
            .await
            .map(|_| ())
            .map_err(|e| Error::AdbServer {
                reason: e.to_string(),
            })
    }
}

/// Whether the `flutter` tool is on `PATH`
pub fn flutter_available() -> bool {
    which::which("flutter").is_ok()
}
