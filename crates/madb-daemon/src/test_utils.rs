//! Test utilities for daemon types
//!
//! Provides sample `adb` output, device builders, and an in-memory writer
//! for capturing prefixed console output.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use madb_core::Device;

/// `adb devices -l` output with two real devices and one emulator
pub const SAMPLE_DEVICES_OUTPUT: &str = "List of devices attached\n\
deviceid01       device usb:3-3.4.3 product:bullhead model:Nexus_5X device:bullhead\n\
deviceid02       device product:volantisg model:Nexus_9 device:flounder_lte\n\
emulator-5554    device product:sdk_google_phone_armv7 model:sdk_google_phone_armv7 device:generic\n\
\n";

/// Creates a test device with no qualifiers, nickname or user id.
pub fn test_device(serial: &str, index: usize) -> Device {
    Device::new(serial, Vec::new(), index)
}

/// Creates a test device with a nickname.
pub fn test_device_named(serial: &str, index: usize, nickname: &str) -> Device {
    Device {
        nickname: Some(nickname.to_string()),
        ..test_device(serial, index)
    }
}

/// Shared in-memory writer; clones see the same bytes
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
