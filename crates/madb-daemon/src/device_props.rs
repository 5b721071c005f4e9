//! Querying device capabilities over adb

use regex::Regex;
use std::sync::LazyLock;

use madb_core::prelude::*;
use madb_core::Device;

use crate::tool_availability::AdbTool;

/// `[ro.sf.lcd_density]: [420]` in `getprop` output
static DENSITY_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[ro\.sf\.lcd_density\]: \[(\d+)\]").expect("Invalid density property regex")
});

const ABI_LINE_PREFIX: &str = "abi: ";

/// Extract the ABI list from `am get-config` output
///
/// The relevant line looks like `abi: arm64-v8a,armeabi-v7a,armeabi`.
pub fn parse_supported_abis(output: &str) -> Result<Vec<String>> {
    output
        .lines()
        .find_map(|line| line.trim_end().strip_prefix(ABI_LINE_PREFIX))
        .map(|abis| {
            abis.split(',')
                .map(str::trim)
                .filter(|abi| !abi.is_empty())
                .map(String::from)
                .collect()
        })
        .ok_or_else(|| {
            Error::device_property("could not extract the ABI list from the device configuration")
        })
}

/// Extract the numeric screen density from `getprop` output
pub fn parse_screen_density(output: &str) -> Result<u32> {
    DENSITY_PROPERTY
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| {
            Error::device_property("could not extract the screen density from the device properties")
        })
}

/// ABIs supported by `device`, most preferred first
pub async fn supported_abis(adb: &AdbTool, device: &Device) -> Result<Vec<String>> {
    let output = adb
        .device_command(&device.serial)
        .args(["shell", "am", "get-config"])
        .output()
        .await?;
    parse_supported_abis(&output)
}

/// Screen density of `device` in dpi
pub async fn screen_density(adb: &AdbTool, device: &Device) -> Result<u32> {
    let output = adb
        .device_command(&device.serial)
        .args(["shell", "getprop"])
        .output()
        .await?;
    parse_screen_density(&output)
}
