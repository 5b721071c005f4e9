//! Application error types with rich context

use std::fmt;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // adb / Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("adb not found. Please make sure that adb is in your PATH or ANDROID_HOME is set.")]
    AdbNotFound,

    #[error("Failed to start adb server: {reason}")]
    AdbServer { reason: String },

    #[error("The output from 'adb devices -l' does not look as expected: {message}")]
    UnexpectedFormat { message: String },

    #[error("Process error: {message}")]
    Process { message: String },

    #[error("Failed to spawn process '{program}': {reason}")]
    ProcessSpawn { program: String, reason: String },

    #[error("'{program}' exited with code: {code:?}")]
    ProcessExit { program: String, code: Option<i32> },

    // ─────────────────────────────────────────────────────────────
    // User Specification Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid device specifier {token:?}. {reason}")]
    InvalidSpecifier { token: String, reason: String },

    #[error("Not a valid {kind}: {value:?}")]
    InvalidName { kind: &'static str, value: String },

    #[error("The provided name is already in use: {name:?}")]
    NameInUse { name: String },

    #[error("Not an existing group name: {name:?}")]
    UnknownGroup { name: String },

    #[error("{name:?} is neither a known nickname nor a device serial")]
    UnknownName { name: String },

    #[error("{message}")]
    Usage { message: String },

    #[error("No devices matching the device specifiers.")]
    NoMatchingDevices,

    // ─────────────────────────────────────────────────────────────
    // Build / Variant Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Could not find the matching .apk for device {device:?}")]
    NoMatchingOutput { device: String },

    #[error("Build error: {message}")]
    Build { message: String },

    #[error("Could not parse device property: {message}")]
    DeviceProperty { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Could not find the HOME directory.")]
    NoHomeDirectory,

    // ─────────────────────────────────────────────────────────────
    // Dispatch Errors
    // ─────────────────────────────────────────────────────────────
    #[error(transparent)]
    Dispatch(#[from] AggregateError),
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn unexpected_format(message: impl Into<String>) -> Self {
        Self::UnexpectedFormat {
            message: message.into(),
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn invalid_specifier(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpecifier {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_name(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidName {
            kind,
            value: value.into(),
        }
    }

    pub fn name_in_use(name: impl Into<String>) -> Self {
        Self::NameInUse { name: name.into() }
    }

    pub fn unknown_group(name: impl Into<String>) -> Self {
        Self::UnknownGroup { name: name.into() }
    }

    pub fn unknown_name(name: impl Into<String>) -> Self {
        Self::UnknownName { name: name.into() }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn no_matching_output(device: impl Into<String>) -> Self {
        Self::NoMatchingOutput {
            device: device.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn device_property(message: impl Into<String>) -> Self {
        Self::DeviceProperty {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error was caused by what the user typed, rather than by
    /// a device or the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidSpecifier { .. }
                | Error::InvalidName { .. }
                | Error::NameInUse { .. }
                | Error::UnknownGroup { .. }
                | Error::UnknownName { .. }
                | Error::Usage { .. }
                | Error::NoMatchingDevices
        )
    }

    /// Check if this error should abort the whole invocation
    ///
    /// Per-device failures are collected into [`Error::Dispatch`] instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AdbNotFound
                | Error::AdbServer { .. }
                | Error::UnexpectedFormat { .. }
                | Error::NoHomeDirectory
        ) || self.is_user_error()
    }
}

// ─────────────────────────────────────────────────────────────────
// Aggregated per-device failures
// ─────────────────────────────────────────────────────────────────

/// A single failed device, identified by its display name
#[derive(Debug)]
pub struct DeviceFailure {
    pub device: String,
    pub error: Error,
}

/// One error summarizing every device whose action failed
///
/// Failures are kept in the order they were observed.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<DeviceFailure>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, device: impl Into<String>, error: Error) {
        self.failures.push(DeviceFailure {
            device: device.into(),
            error,
        });
    }

    pub fn failures(&self) -> &[DeviceFailure] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate as an [`Error`]
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Dispatch(self))
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error occurred while running the command on the following devices:"
        )?;
        for failure in &self.failures {
            write!(f, "\n[{}]\t{}", failure.device, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::invalid_specifier("@abc", "'@' must be followed by a device index.");
        assert_eq!(
            err.to_string(),
            "Invalid device specifier \"@abc\". '@' must be followed by a device index."
        );

        let err = Error::AdbNotFound;
        assert!(err.to_string().contains("adb not found"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::AdbNotFound.is_fatal());
        assert!(Error::unexpected_format("banner missing").is_fatal());
        assert!(Error::NoMatchingDevices.is_fatal());
        assert!(!Error::process("exit 1").is_fatal());
        assert!(!Error::no_matching_output("Tablet").is_fatal());
    }

    #[test]
    fn test_error_is_user_error() {
        assert!(Error::invalid_specifier("#", "bad").is_user_error());
        assert!(Error::name_in_use("Phone").is_user_error());
        assert!(Error::unknown_group("lab").is_user_error());
        assert!(!Error::AdbNotFound.is_user_error());
    }

    #[test]
    fn test_aggregate_error_empty_is_ok() {
        let agg = AggregateError::new();
        assert!(agg.is_empty());
        assert!(agg.into_result().is_ok());
    }

    #[test]
    fn test_aggregate_error_message_lists_devices_in_order() {
        let mut agg = AggregateError::new();
        agg.push(
            "Tablet",
            Error::ProcessExit {
                program: "adb".to_string(),
                code: Some(1),
            },
        );
        agg.push("emulator-5554", Error::no_matching_output("emulator-5554"));

        insta::assert_snapshot!(agg.to_string(), @r#"
        Error occurred while running the command on the following devices:
        [Tablet]	'adb' exited with code: Some(1)
        [emulator-5554]	Could not find the matching .apk for device "emulator-5554"
        "#);
    }

    #[test]
    fn test_aggregate_error_into_result() {
        let mut agg = AggregateError::new();
        agg.push("Phone", Error::process("boom"));

        let err = agg.into_result().unwrap_err();
        match err {
            Error::Dispatch(agg) => {
                assert_eq!(agg.len(), 1);
                assert_eq!(agg.failures()[0].device, "Phone");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
