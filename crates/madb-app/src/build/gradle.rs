//! Running the Gradle wrapper to extract variant properties

use std::path::{Path, PathBuf};

use madb_core::prelude::*;
use madb_core::VariantProperties;
use madb_daemon::DeviceCommand;

use super::VariantKey;

/// Overrides the location of the property-extraction init script
pub const INIT_SCRIPT_ENV: &str = "MADB_GRADLE_INIT_SCRIPT";

/// Init script file name in the config directory
pub const INIT_SCRIPT_FILENAME: &str = "madb_init.gradle";

/// Gradle task defined by the init script
pub const EXTRACT_TASK: &str = "madbExtractVariantProperties";

const WRAPPER_NAME: &str = "gradlew";

/// Find `gradlew` in `start` or the closest ancestor that has one
pub fn find_gradle_wrapper(start: &Path) -> Result<PathBuf> {
    let absolute = dunce::canonicalize(start)?;

    for dir in absolute.ancestors() {
        let wrapper = dir.join(WRAPPER_NAME);
        if wrapper.is_file() {
            debug!("Found Gradle wrapper at {:?}", wrapper);
            return Ok(wrapper);
        }
    }

    Err(Error::build(format!(
        "Could not find the Gradle wrapper in dir {:?} or its parent directories.",
        start.display().to_string()
    )))
}

/// Locate the init script: `$MADB_GRADLE_INIT_SCRIPT`, else `<config dir>/madb_init.gradle`
pub fn init_script_path(config_dir: &Path) -> Result<PathBuf> {
    let script = std::env::var_os(INIT_SCRIPT_ENV)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir.join(INIT_SCRIPT_FILENAME));

    if script.is_file() {
        Ok(script)
    } else {
        Err(Error::build(format!(
            "Could not find the {INIT_SCRIPT_FILENAME} script at {}",
            script.display()
        )))
    }
}

/// Command line that extracts the properties of `key` into `output_file`
fn extract_command(
    wrapper: &Path,
    init_script: &Path,
    output_file: &Path,
    key: &VariantKey,
) -> DeviceCommand {
    let mut output_arg = std::ffi::OsString::from("-PmadbOutputFile=");
    output_arg.push(output_file);

    let mut cmd = DeviceCommand::new(wrapper)
        .args(["--daemon", "-q", "-I"])
        .arg(init_script)
        .arg(output_arg)
        .arg("-p")
        .arg(key.project_dir());
    if !key.variant.is_empty() {
        cmd = cmd.arg(format!("-PmadbVariant={}", key.variant));
    }
    cmd.arg(EXTRACT_TASK)
}

/// Run Gradle and parse the properties it writes
///
/// Gradle's own output goes straight to the console so build failures stay
/// readable.
pub async fn extract_properties(key: &VariantKey, config_dir: &Path) -> Result<VariantProperties> {
    let wrapper = find_gradle_wrapper(&key.dir)?;
    let init_script = init_script_path(config_dir)?;
    let output_file = tempfile::Builder::new()
        .prefix("madb-variant-")
        .suffix(".json")
        .tempfile()?;

    info!("Extracting variant properties for {:?}", key);
    extract_command(&wrapper, &init_script, output_file.path(), key)
        .current_dir(&key.dir)
        .run_inherited()
        .await?;

    let content = std::fs::read_to_string(output_file.path())?;
    parse_properties(&content)
}

/// Parse the JSON the init script writes
pub fn parse_properties(content: &str) -> Result<VariantProperties> {
    if content.trim().is_empty() {
        return Err(Error::build(
            "Could not extract the variant properties: Gradle produced no output.",
        ));
    }
    serde_json::from_str(content)
        .map_err(|e| Error::build(format!("Could not parse the variant properties: {e}")))
}

/// Build the app with its assemble task
pub async fn run_assemble(dir: &Path, task: &str) -> Result<()> {
    let wrapper = find_gradle_wrapper(dir)?;
    info!("Running {} {}", wrapper.display(), task);

    DeviceCommand::new(wrapper)
        .args(["--daemon", task])
        .current_dir(dir)
        .run_inherited()
        .await
}
