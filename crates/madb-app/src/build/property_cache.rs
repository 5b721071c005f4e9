//! On-disk cache of extracted variant properties
//!
//! Running Gradle takes seconds, so properties are remembered per
//! [`VariantKey`] in `<config dir>/property_cache.json`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use madb_core::prelude::*;
use madb_core::VariantProperties;

use super::VariantKey;

/// Cache file name in the config directory
pub const PROPERTY_CACHE_FILENAME: &str = "property_cache.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    key: VariantKey,
    properties: VariantProperties,
    extracted_at: DateTime<Utc>,
}

/// Property cache stored in one JSON file
#[derive(Debug, Clone)]
pub struct PropertyCache {
    path: PathBuf,
}

impl PropertyCache {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(PROPERTY_CACHE_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached properties for `key`, if any
    pub fn get(&self, key: &VariantKey) -> Result<Option<VariantProperties>> {
        Ok(self.load()?.into_iter().find(|e| e.key == *key).map(|e| {
            debug!("Using properties of {:?} cached at {}", key, e.extracted_at);
            e.properties
        }))
    }

    /// Store `properties` for `key`, replacing any previous entry
    pub fn put(&self, key: &VariantKey, properties: &VariantProperties) -> Result<()> {
        let mut entries = self.load()?;
        entries.retain(|e| e.key != *key);
        entries.push(CacheEntry {
            key: key.clone(),
            properties: properties.clone(),
            extracted_at: Utc::now(),
        });
        self.save(&mut entries)
    }

    /// Drop the entry for `key`; a missing entry is not an error
    pub fn remove(&self, key: &VariantKey) -> Result<()> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.key != *key);
        if entries.len() != before {
            self.save(&mut entries)?;
        }
        Ok(())
    }

    fn load(&self) -> Result<Vec<CacheEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Could not decode the property cache file ({}). Resetting the cache.", e);
                std::fs::remove_file(&self.path)?;
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, entries: &mut [CacheEntry]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        let content = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
