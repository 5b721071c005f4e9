//! # madb-core - Core Domain Types
//!
//! Foundation crate for madb, the multi-device adb runner. Provides domain
//! types, error handling, device specifier resolution, the persistent config
//! model, and build-variant output selection.
//!
//! This crate performs no process I/O and has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Devices (`device`)
//! - [`Device`] - A device attached to adb, with its index, nickname and user id
//! - [`DeviceKind`] - Real hardware or emulator
//! - [`PrefixStyle`] - Which tag precedes each line of device output
//!
//! ### Specifiers (`specifier`)
//! - [`DeviceFilter`] - `-d` / `-e` / `-n` selection built from the command line
//! - [`DeviceSpec`] - One resolved specifier (index or serial/qualifier/nickname)
//! - [`select_devices()`] - Expand groups and filter a device listing
//!
//! ### Configuration (`config`)
//! - [`Config`] - Nicknames, groups and default user ids with their invariants
//!
//! ### Variants (`variant`)
//! - [`VariantProperties`], [`VariantOutput`] - Build properties extracted from Gradle
//! - [`select_best_output()`] - Pick the `.apk` that fits a device
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` and user-error classification
//! - [`AggregateError`] - Per-device failures collected by a dispatch
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use madb_core::prelude::*;
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod specifier;
pub mod variant;

// Re-export commonly used types at crate root for convenience
pub use config::{Config, CONFIG_VERSION};
pub use device::{device_prefix, Device, DeviceKind, PrefixStyle, EMULATOR_SERIAL_PREFIX};
pub use error::{AggregateError, DeviceFailure, Error, Result, ResultExt};
pub use specifier::{
    expand_groups, filter_devices, is_index_token, is_valid_name, is_valid_serial, resolve,
    select_devices, validate_token, DeviceFilter, DeviceSpec,
};
pub use variant::{
    density_bucket, select_best_output, FilterType, OutputFilter, VariantOutput,
    VariantProperties,
};
