//! Connected device records and console output prefixes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Serial prefix that adb uses for emulator instances
pub const EMULATOR_SERIAL_PREFIX: &str = "emulator";

/// Whether a device is physical hardware or an emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Real,
    Emulator,
}

impl DeviceKind {
    /// Derive the kind from the adb serial
    pub fn from_serial(serial: &str) -> Self {
        if serial.starts_with(EMULATOR_SERIAL_PREFIX) {
            DeviceKind::Emulator
        } else {
            DeviceKind::Real
        }
    }
}

/// A device currently attached to adb
///
/// Devices are rebuilt from `adb devices -l` on every invocation and are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// adb serial (e.g. "HT4BVWV00023", "emulator-5554")
    pub serial: String,

    /// Real hardware or emulator
    pub kind: DeviceKind,

    /// Remaining tokens from the listing, e.g. "usb:3-3.4.2", "model:Nexus_9"
    pub qualifiers: Vec<String>,

    /// 1-based position in the listing (only meaningful within one invocation)
    pub index: usize,

    /// Nickname assigned with `madb name set`
    pub nickname: Option<String>,

    /// Default user id assigned with `madb user set`
    pub user_id: Option<String>,
}

impl Device {
    pub fn new(serial: impl Into<String>, qualifiers: Vec<String>, index: usize) -> Self {
        let serial = serial.into();
        Self {
            kind: DeviceKind::from_serial(&serial),
            serial,
            qualifiers,
            index,
            nickname: None,
            user_id: None,
        }
    }

    /// Nickname if one is set, otherwise the serial
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.serial)
    }

    pub fn is_emulator(&self) -> bool {
        self.kind == DeviceKind::Emulator
    }

    /// Whether `token` names this device by serial, nickname, or qualifier
    pub fn matches_token(&self, token: &str) -> bool {
        self.serial == token
            || self.nickname.as_deref() == Some(token)
            || self.qualifiers.iter().any(|q| q == token)
    }
}

/// Which tag to put in front of each line of device output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixStyle {
    /// Nickname, falling back to the serial
    #[default]
    Name,
    Serial,
    None,
}

impl FromStr for PrefixStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(PrefixStyle::Name),
            "serial" => Ok(PrefixStyle::Serial),
            "none" => Ok(PrefixStyle::None),
            other => Err(Error::usage(format!(
                "Invalid prefix style {other:?}. Choose one of: name, serial, none."
            ))),
        }
    }
}

impl fmt::Display for PrefixStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixStyle::Name => write!(f, "name"),
            PrefixStyle::Serial => write!(f, "serial"),
            PrefixStyle::None => write!(f, "none"),
        }
    }
}

/// Build the console prefix for a device, e.g. `"[MyPhone]\t"`
///
/// When `with_user` is set and the device has a default user id, the tag
/// becomes `[MyPhone:10]`. [`PrefixStyle::None`] always yields an empty prefix.
pub fn device_prefix(device: &Device, style: PrefixStyle, with_user: bool) -> String {
    let tag = match style {
        PrefixStyle::None => return String::new(),
        PrefixStyle::Name => device.display_name(),
        PrefixStyle::Serial => device.serial.as_str(),
    };

    match (&device.user_id, with_user) {
        (Some(user), true) => format!("[{tag}:{user}]\t"),
        _ => format!("[{tag}]\t"),
    }
}
