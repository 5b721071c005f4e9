//! Android build integration
//!
//! madb does not build apps itself. It asks Gradle for the properties of a
//! build variant (application id, launcher activity, output `.apk` files),
//! caches them, and hands Flutter projects over to the `flutter` tool.

pub mod gradle;
pub mod property_cache;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use gradle::{extract_properties, find_gradle_wrapper, init_script_path, run_assemble};
pub use property_cache::PropertyCache;

/// Marker file of an Android Gradle project
pub const GRADLE_BUILD_FILE: &str = "build.gradle";

/// Marker file of a Flutter project
pub const FLUTTER_PROJECT_FILE: &str = "flutter.yaml";

pub fn is_gradle_project(dir: &Path) -> bool {
    dir.join(GRADLE_BUILD_FILE).is_file()
}

pub fn is_flutter_project(dir: &Path) -> bool {
    dir.join(FLUTTER_PROJECT_FILE).is_file()
}

/// Identifies one build variant of one module in a Gradle project
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    /// Project directory containing `build.gradle`
    pub dir: PathBuf,
    /// Sub-module name; empty for the top-level project
    #[serde(default)]
    pub module: String,
    /// Build variant (e.g. "debug"); empty lets the init script pick
    #[serde(default)]
    pub variant: String,
}

impl VariantKey {
    pub fn new(dir: impl Into<PathBuf>, module: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            module: module.into(),
            variant: variant.into(),
        }
    }

    /// Directory handed to Gradle with `-p`
    pub fn project_dir(&self) -> PathBuf {
        if self.module.is_empty() {
            self.dir.clone()
        } else {
            self.dir.join(&self.module)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_detection() {
        let temp = tempdir().unwrap();
        assert!(!is_gradle_project(temp.path()));
        assert!(!is_flutter_project(temp.path()));

        std::fs::write(temp.path().join(GRADLE_BUILD_FILE), "").unwrap();
        std::fs::write(temp.path().join(FLUTTER_PROJECT_FILE), "").unwrap();
        assert!(is_gradle_project(temp.path()));
        assert!(is_flutter_project(temp.path()));
    }

    #[test]
    fn test_project_dir_with_module() {
        let key = VariantKey::new("/work/app", "", "debug");
        assert_eq!(key.project_dir(), PathBuf::from("/work/app"));

        let key = VariantKey::new("/work/app", "wear", "debug");
        assert_eq!(key.project_dir(), PathBuf::from("/work/app/wear"));
    }
}
