//! Persistent madb configuration model
//!
//! Holds device nicknames, device groups, and default user ids. Reading and
//! writing the file lives in `madb-app`; this module owns the invariants that
//! every mutation must keep:
//! - nicknames and group names never overlap
//! - a serial has at most one nickname, and a nickname names one serial
//! - a group is never stored with zero members

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::prelude::*;
use crate::specifier::{is_index_token, is_valid_name, is_valid_serial, validate_token};

/// Version stamped into the config file by this build
pub const CONFIG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Contents of `~/.madb/config.json`
///
/// Maps are ordered so that lookups which scan them (nickname annotation,
/// listing) behave the same on every run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Version of madb that last wrote the file
    #[serde(default)]
    pub version: String,

    /// nickname -> serial or qualifier
    #[serde(default)]
    pub names: BTreeMap<String, String>,

    /// group name -> member specifiers
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,

    /// serial -> default user id
    #[serde(default, rename = "userIDs")]
    pub user_ids: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            names: BTreeMap::new(),
            groups: BTreeMap::new(),
            user_ids: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn is_nickname(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Whether `name` is taken by either a nickname or a group
    pub fn is_name_in_use(&self, name: &str) -> bool {
        self.is_nickname(name) || self.is_group(name)
    }

    /// The nickname assigned to `serial`, if any
    pub fn nickname_for(&self, serial: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, s)| s.as_str() == serial)
            .map(|(n, _)| n.as_str())
    }

    // ─────────────────────────────────────────────────────────────
    // Nicknames
    // ─────────────────────────────────────────────────────────────

    /// Assign `nickname` to `serial`
    ///
    /// `serial` may also be a qualifier or an `@N` index. An existing nickname
    /// of `serial` is replaced, and a nickname already bound to a different
    /// serial moves to this one. Group names are refused.
    pub fn set_nickname(&mut self, serial: &str, nickname: &str) -> Result<()> {
        if !is_valid_serial(serial) && !is_index_token(serial) {
            return Err(Error::invalid_name("device serial", serial));
        }
        if !is_valid_name(nickname) {
            return Err(Error::invalid_name("nickname", nickname));
        }
        if self.is_group(nickname) {
            return Err(Error::name_in_use(nickname));
        }

        if let Some(old) = self.nickname_for(serial).map(String::from) {
            debug!("Replacing nickname {} of {}", old, serial);
            self.names.remove(&old);
        }
        if let Some(previous) = self.names.insert(nickname.to_string(), serial.to_string()) {
            debug!("Moved nickname {} from {} to {}", nickname, previous, serial);
        }

        Ok(())
    }

    /// Remove the mapping whose nickname or serial equals `name`
    pub fn unset_nickname(&mut self, name: &str) -> Result<()> {
        if !is_valid_serial(name) && !is_valid_name(name) {
            return Err(Error::invalid_name("device serial or nickname", name));
        }

        let key = self
            .names
            .iter()
            .find(|(nickname, serial)| nickname.as_str() == name || serial.as_str() == name)
            .map(|(nickname, _)| nickname.clone())
            .ok_or_else(|| Error::unknown_name(name))?;

        self.names.remove(&key);
        Ok(())
    }

    pub fn clear_nicknames(&mut self) {
        self.names.clear();
    }

    // ─────────────────────────────────────────────────────────────
    // Groups
    // ─────────────────────────────────────────────────────────────

    /// Add members to `group`, creating it when needed
    ///
    /// Members keep their order and duplicates are dropped.
    pub fn add_group_members(&mut self, group: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Err(Error::usage("There must be at least one group member."));
        }
        if !is_valid_name(group) {
            return Err(Error::invalid_name("group name", group));
        }
        if self.is_nickname(group) {
            return Err(Error::name_in_use(group));
        }
        for member in members {
            validate_token(member)?;
        }

        let entry = self.groups.entry(group.to_string()).or_default();
        let combined: Vec<String> = entry.iter().chain(members.iter()).cloned().collect();
        *entry = remove_duplicates(combined);

        Ok(())
    }

    /// Remove members from an existing group; an emptied group is deleted
    pub fn remove_group_members(&mut self, group: &str, members: &[String]) -> Result<()> {
        if !is_valid_name(group) {
            return Err(Error::invalid_name("group name", group));
        }

        let current = self
            .groups
            .get_mut(group)
            .ok_or_else(|| Error::unknown_group(group))?;

        let removed: HashSet<&str> = members.iter().map(String::as_str).collect();
        current.retain(|m| !removed.contains(m.as_str()));

        if current.is_empty() {
            debug!("Group {} has no members left, deleting it", group);
            self.groups.remove(group);
        }

        Ok(())
    }

    /// Delete whole groups; nothing is deleted unless every name exists
    pub fn delete_groups(&mut self, names: &[String]) -> Result<()> {
        if let Some(missing) = names.iter().find(|n| !self.is_group(n)) {
            return Err(Error::unknown_group(missing.as_str()));
        }

        for name in names {
            self.groups.remove(name);
        }
        Ok(())
    }

    pub fn rename_group(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if !is_valid_name(old_name) {
            return Err(Error::invalid_name("group name", old_name));
        }
        if !is_valid_name(new_name) {
            return Err(Error::invalid_name("group name", new_name));
        }
        if !self.is_group(old_name) {
            return Err(Error::unknown_group(old_name));
        }
        if self.is_name_in_use(new_name) {
            return Err(Error::name_in_use(new_name));
        }

        if let Some(members) = self.groups.remove(old_name) {
            self.groups.insert(new_name.to_string(), members);
        }
        Ok(())
    }

    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    // ─────────────────────────────────────────────────────────────
    // Default user ids
    // ─────────────────────────────────────────────────────────────

    pub fn set_user_id(&mut self, serial: &str, user_id: &str) -> Result<()> {
        if !is_valid_serial(serial) {
            return Err(Error::invalid_name("device serial", serial));
        }
        if user_id.is_empty() || !user_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_name("user ID", user_id));
        }

        self.user_ids.insert(serial.to_string(), user_id.to_string());
        Ok(())
    }

    pub fn unset_user_id(&mut self, serial: &str) -> Result<()> {
        if !is_valid_serial(serial) {
            return Err(Error::invalid_name("device serial", serial));
        }
        if self.user_ids.remove(serial).is_none() {
            debug!("No default user id stored for {}", serial);
        }
        Ok(())
    }

    pub fn clear_user_ids(&mut self) {
        self.user_ids.clear();
    }
}

/// Drop repeated entries, keeping the first occurrence
pub fn remove_duplicates(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
