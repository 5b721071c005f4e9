//! Device listing using `adb devices -l`

use std::time::Duration;
use tokio::time::timeout;

use madb_core::prelude::*;
use madb_core::{Config, Device};

use crate::tool_availability::AdbTool;

/// First line of `adb devices -l` output
pub const DEVICES_BANNER: &str = "List of devices attached";

/// Default timeout for `adb devices -l`
const DEVICES_TIMEOUT: Duration = Duration::from_secs(30);

/// Parse `adb devices -l` output into the devices madb can target
///
/// The first non-empty line must be [`DEVICES_BANNER`]. Lines without a
/// status and `offline` devices are skipped. Indices count the kept devices
/// from 1 in listing order. Nicknames and default user ids from `cfg` are
/// attached to each device.
pub fn build_directory(output: &str, cfg: &Config) -> Result<Vec<Device>> {
    let mut lines = output.lines().skip_while(|line| line.trim().is_empty());

    match lines.next().map(str::trim) {
        Some(DEVICES_BANNER) => {}
        first => {
            return Err(Error::unexpected_format(format!(
                "expected {DEVICES_BANNER:?} as the first line, got {:?}",
                first.unwrap_or_default()
            )))
        }
    }

    let mut devices = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (serial, status) = match fields.as_slice() {
            [serial, status, ..] => (*serial, *status),
            _ => continue,
        };
        if status == "offline" {
            trace!("Skipping offline device {}", serial);
            continue;
        }

        let qualifiers = fields[2..].iter().map(|q| q.to_string()).collect();
        let mut device = Device::new(serial, qualifiers, devices.len() + 1);
        device.nickname = nickname_for_device(&device, cfg);
        device.user_id = cfg.user_ids.get(serial).cloned();
        devices.push(device);
    }

    Ok(devices)
}

/// The nickname bound to the device's serial or to one of its qualifiers
fn nickname_for_device(device: &Device, cfg: &Config) -> Option<String> {
    cfg.names
        .iter()
        .find(|(_, target)| {
            device.serial == **target || device.qualifiers.iter().any(|q| q == *target)
        })
        .map(|(nickname, _)| nickname.clone())
}

/// List attached devices
pub async fn list_devices(adb: &AdbTool, cfg: &Config) -> Result<Vec<Device>> {
    list_devices_with_timeout(adb, cfg, DEVICES_TIMEOUT).await
}

/// List attached devices with a custom timeout
pub async fn list_devices_with_timeout(
    adb: &AdbTool,
    cfg: &Config,
    timeout_duration: Duration,
) -> Result<Vec<Device>> {
    let start = std::time::Instant::now();

    let output = timeout(timeout_duration, adb.command().args(["devices", "-l"]).output())
        .await
        .map_err(|_| Error::process("'adb devices -l' timed out"))??;

    let devices = build_directory(&output, cfg)?;
    info!("Found {} devices in {:?}", devices.len(), start.elapsed());

    Ok(devices)
}
