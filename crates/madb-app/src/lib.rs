//! madb-app - Config persistence, build properties, and command orchestration for madb
//!
//! This crate owns the config file on disk (including the one-time migration
//! from the legacy plain-text files), Gradle property extraction with its
//! cache, and one entry point per `madb` command.

pub mod build;
pub mod commands;
pub mod config;

// Re-export primary types
pub use build::{PropertyCache, VariantKey};
pub use commands::{CommandContext, ProjectOptions};
pub use config::{config_dir, ConfigStore};

// Re-export daemon types for the binary
pub use madb_daemon::{AdbTool, DispatchMode, OutputOptions};
