//! # madb-daemon - adb Process Management
//!
//! Talks to adb and the per-device child processes: device listing, device
//! property queries, line-prefixed output, and fan-out of one action to many
//! devices.
//!
//! Depends on [`madb_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Tools
//! - [`AdbTool`] - Locate adb and build `adb -s <serial>` commands
//!
//! ### Device Listing
//! - [`build_directory()`] - Parse `adb devices -l` output into [`madb_core::Device`]s
//! - [`list_devices()`] - Run `adb devices -l` and parse it
//!
//! ### Processes and Output
//! - [`DeviceCommand`] - A command line run with prefixed streaming or captured output
//! - [`LinePrefixer`], [`OutputSink`] - Whole-line prefixed console output
//! - [`OutputOptions`] - Prefix style plus the console streams
//!
//! ### Dispatch
//! - [`DeviceAction`] - Per-device work
//! - [`dispatch()`] - Run an action on many devices, sequentially or concurrently

pub mod device_props;
pub mod devices;
pub mod dispatch;
pub mod prefixer;
pub mod process;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tool_availability;

// Public API re-exports
pub use device_props::{parse_screen_density, parse_supported_abis, screen_density, supported_abis};
pub use devices::{build_directory, list_devices, list_devices_with_timeout, DEVICES_BANNER};
pub use dispatch::{dispatch, DeviceAction, DispatchMode, LocalDeviceAction};
pub use prefixer::{LinePrefixer, OutputOptions, OutputSink};
pub use process::DeviceCommand;
pub use tool_availability::{flutter_available, AdbTool};
