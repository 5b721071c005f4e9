//! Reading and writing `~/.madb/config.json`

use std::path::{Path, PathBuf};

use madb_core::prelude::*;
use madb_core::{Config, CONFIG_VERSION};

use super::legacy;

/// Overrides the config directory (mainly for tests and sandboxes)
pub const CONFIG_DIR_ENV: &str = "MADB_CONFIG_DIR";

/// Config directory name under the home directory
pub const MADB_DIR: &str = ".madb";

/// Config file name
pub const CONFIG_FILENAME: &str = "config.json";

/// Resolve the config directory: `$MADB_CONFIG_DIR`, else `~/.madb`
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::home_dir()
        .map(|home| home.join(MADB_DIR))
        .ok_or(Error::NoHomeDirectory)
}

/// Persistent home of the [`Config`]
///
/// One read and at most one write per invocation; there is no file locking.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Store in the default config directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(config_dir()?))
    }

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILENAME)
    }

    /// Load the config
    ///
    /// A missing file yields an empty config, after migrating legacy files
    /// when there are any. A corrupt file is deleted and an empty config is
    /// returned.
    pub fn read(&self) -> Result<Config> {
        let path = self.config_path();

        if !path.exists() {
            if let Some(migrated) = legacy::migrate(&self.dir)? {
                self.write(&migrated)?;
                legacy::retire(&self.dir)?;
                info!("Migrated legacy madb files into {:?}", path);
                return Ok(migrated);
            }

            debug!("No config file at {:?}, using an empty config", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))?;

        match serde_json::from_str::<Config>(&content) {
            Ok(cfg) => {
                debug!("Loaded config from {:?} (version {:?})", path, cfg.version);
                Ok(cfg)
            }
            Err(e) => {
                warn!("Config file {:?} is corrupt ({}), starting over", path, e);
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Failed to delete corrupt config {:?}: {}", path, e);
                }
                Ok(Config::default())
            }
        }
    }

    /// Save the config, stamped with the current version
    ///
    /// Whatever `cfg.version` holds is replaced by [`CONFIG_VERSION`], so a
    /// config read back after a write always carries the current version.
    /// Uses atomic write (temp file + rename).
    pub fn write(&self, cfg: &Config) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::config(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let stamped = Config {
            version: CONFIG_VERSION.to_string(),
            ..cfg.clone()
        };
        let content = serde_json::to_string_pretty(&stamped)?;

        let path = self.config_path();
        let temp_path = self.dir.join(".config.json.tmp");

        std::fs::write(&temp_path, content)
            .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
        std::fs::rename(&temp_path, &path)
            .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

        debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Read, apply `f`, and write back when `f` succeeds
    pub fn update<T>(&self, f: impl FnOnce(&mut Config) -> Result<T>) -> Result<T> {
        let mut cfg = self.read()?;
        let value = f(&mut cfg)?;
        self.write(&cfg)?;
        Ok(value)
    }
}
