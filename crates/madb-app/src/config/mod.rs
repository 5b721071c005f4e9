//! Configuration persistence for madb
//!
//! Supports:
//! - `~/.madb/config.json` - nicknames, groups, default user ids
//! - `~/.madb/nicknames`, `~/.madb/users` - legacy files, migrated on first read

pub mod legacy;
pub mod store;

pub use store::{config_dir, ConfigStore, CONFIG_DIR_ENV, CONFIG_FILENAME, MADB_DIR};
