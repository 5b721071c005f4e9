//! One-time migration from the pre-JSON config files
//!
//! Older madb versions kept two plain-text files in the config directory:
//! - `nicknames`: `<nickname> <serial>` per line
//! - `users`: `<serial> <user_id>` per line
//!
//! They are merged into a fresh [`Config`] and then renamed to `<name>.bak`.

use std::path::Path;

use madb_core::prelude::*;
use madb_core::Config;

pub const NICKNAMES_FILENAME: &str = "nicknames";
pub const USERS_FILENAME: &str = "users";
const LEGACY_FILES: [&str; 2] = [NICKNAMES_FILENAME, USERS_FILENAME];

/// Split a legacy line into exactly two whitespace-separated fields
fn two_fields(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(a), Some(b), None) => Some((a, b)),
        _ => None,
    }
}

/// Apply every well-formed line of `content` with `apply`
fn apply_lines(
    file: &str,
    content: &str,
    cfg: &mut Config,
    apply: impl Fn(&mut Config, &str, &str) -> Result<()>,
) {
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let outcome = match two_fields(line) {
            Some((a, b)) => apply(cfg, a, b),
            None => Err(Error::config("expected two columns")),
        };
        if let Err(e) = outcome {
            warn!("Skipping {} line {}: {:?} ({})", file, number + 1, line, e);
        }
    }
}

/// Build a config from legacy files in `dir`, if any exist
pub fn migrate(dir: &Path) -> Result<Option<Config>> {
    let nicknames = dir.join(NICKNAMES_FILENAME);
    let users = dir.join(USERS_FILENAME);

    if !nicknames.exists() && !users.exists() {
        return Ok(None);
    }

    let mut cfg = Config::default();

    if nicknames.exists() {
        let content = std::fs::read_to_string(&nicknames)?;
        apply_lines(NICKNAMES_FILENAME, &content, &mut cfg, |cfg, nickname, serial| {
            cfg.set_nickname(serial, nickname)
        });
    }

    if users.exists() {
        let content = std::fs::read_to_string(&users)?;
        apply_lines(USERS_FILENAME, &content, &mut cfg, |cfg, serial, user_id| {
            cfg.set_user_id(serial, user_id)
        });
    }

    Ok(Some(cfg))
}

/// Rename migrated legacy files to `<name>.bak`
pub fn retire(dir: &Path) -> Result<()> {
    for name in LEGACY_FILES {
        let path = dir.join(name);
        if path.exists() {
            let backup = dir.join(format!("{name}.bak"));
            std::fs::rename(&path, &backup)?;
            debug!("Moved {:?} to {:?}", path, backup);
        }
    }
    Ok(())
}
