//! Device specifier validation, group expansion, and device filtering
//!
//! A specifier is one of:
//! - a device serial or qualifier (`HT4BVWV00023`, `usb:3-3.4.2`)
//! - a positional index into the current listing (`@1`, `@2`, ...)
//! - a nickname set with `madb name set`
//! - a group name set with `madb group add`, whose members are specifiers too
//!
//! Groups may contain themselves or form cycles; expansion keeps a visited set
//! so every group is expanded at most once.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::config::Config;
use crate::device::{Device, DeviceKind};
use crate::prelude::*;

/// Characters adb uses in serials and qualifiers
static SERIAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9:\-._]+$").expect("Invalid serial pattern regex"));

/// Nicknames and group names: word characters only
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("Invalid name pattern regex"));

/// Whether `serial` looks like an adb serial or qualifier
pub fn is_valid_serial(serial: &str) -> bool {
    SERIAL_PATTERN.is_match(serial)
}

/// Whether `name` is usable as a nickname or group name
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Parse the part after `@` as a 1-based device index
fn parse_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|&n| n > 0)
}

/// Whether `token` is a well-formed `@N` index specifier
pub fn is_index_token(token: &str) -> bool {
    token.strip_prefix('@').and_then(parse_index).is_some()
}

/// Check the syntax of a single specifier token
pub fn validate_token(token: &str) -> Result<()> {
    if let Some(digits) = token.strip_prefix('@') {
        return match parse_index(digits) {
            Some(_) => Ok(()),
            None => Err(Error::invalid_specifier(
                token,
                "'@' sign must be followed by a numeric device index starting from 1.",
            )),
        };
    }

    if is_valid_serial(token) || is_valid_name(token) {
        Ok(())
    } else {
        Err(Error::invalid_specifier(
            token,
            "Not a valid serial or a nickname.",
        ))
    }
}

/// A resolved predicate matched against each attached device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSpec {
    /// `@N`: the N-th device in the listing
    Index(usize),
    /// Serial, qualifier, or nickname
    Token(String),
}

impl DeviceSpec {
    fn from_token(token: &str) -> Self {
        match token.strip_prefix('@').and_then(parse_index) {
            Some(index) => DeviceSpec::Index(index),
            None => DeviceSpec::Token(token.to_string()),
        }
    }

    pub fn matches(&self, device: &Device) -> bool {
        match self {
            DeviceSpec::Index(index) => device.index == *index,
            DeviceSpec::Token(token) => device.matches_token(token),
        }
    }
}

/// Which devices the user asked for
///
/// Built once from the command line and passed down explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    /// `-d`: every real device
    pub all_real: bool,
    /// `-e`: every emulator
    pub all_emulators: bool,
    /// `-n`: explicit specifiers
    pub tokens: Vec<String>,
}

impl DeviceFilter {
    /// Filter with only explicit specifiers (as used by `madb resolve`)
    pub fn from_tokens(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Split a comma-separated `-n` value, ignoring empty tokens
    pub fn parse_token_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }

    /// No flags and no tokens: every device is targeted
    pub fn is_unrestricted(&self) -> bool {
        !self.all_real && !self.all_emulators && self.tokens.is_empty()
    }
}

/// Expand group names into their members, recursively
///
/// Tokens that are not group names pass through unchanged. Each group is
/// expanded at most once, so self-referencing and cyclic groups terminate.
/// Duplicate tokens are dropped, keeping the first occurrence.
pub fn expand_groups(tokens: &[String], groups: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut expanded = Vec::new();

    fn expand_into<'a>(
        token: &'a str,
        groups: &'a BTreeMap<String, Vec<String>>,
        visited: &mut HashSet<&'a str>,
        seen: &mut HashSet<&'a str>,
        expanded: &mut Vec<String>,
    ) {
        match groups.get(token) {
            Some(members) => {
                if !visited.insert(token) {
                    trace!("group {} already expanded, skipping", token);
                    return;
                }
                for member in members {
                    expand_into(member, groups, visited, seen, expanded);
                }
            }
            None => {
                if seen.insert(token) {
                    expanded.push(token.to_string());
                }
            }
        }
    }

    for token in tokens {
        expand_into(token, groups, &mut visited, &mut seen, &mut expanded);
    }

    expanded
}

/// Validate and expand specifier tokens into device predicates
///
/// All tokens are validated before anything is expanded, so a typo is
/// reported without touching any device.
pub fn resolve(tokens: &[String], cfg: &Config) -> Result<Vec<DeviceSpec>> {
    for token in tokens {
        validate_token(token)?;
    }

    let expanded = expand_groups(tokens, &cfg.groups);
    debug!("Expanded specifiers {:?} into {:?}", tokens, expanded);

    Ok(expanded.iter().map(|t| DeviceSpec::from_token(t)).collect())
}

/// Keep the devices selected by the flags or matched by any predicate
///
/// Order follows `devices`; each device appears at most once. An empty result
/// is an error because running a command on nothing is never intended.
pub fn filter_devices(
    devices: &[Device],
    specs: &[DeviceSpec],
    filter: &DeviceFilter,
) -> Result<Vec<Device>> {
    if filter.is_unrestricted() {
        return Ok(devices.to_vec());
    }

    let matched: Vec<Device> = devices
        .iter()
        .filter(|d| {
            (filter.all_real && d.kind == DeviceKind::Real)
                || (filter.all_emulators && d.kind == DeviceKind::Emulator)
                || specs.iter().any(|spec| spec.matches(d))
        })
        .cloned()
        .collect();

    if matched.is_empty() {
        return Err(Error::NoMatchingDevices);
    }

    Ok(matched)
}

/// Resolve the filter's tokens against `cfg` and apply it to `devices`
pub fn select_devices(devices: &[Device], filter: &DeviceFilter, cfg: &Config) -> Result<Vec<Device>> {
    let specs = resolve(&filter.tokens, cfg)?;
    filter_devices(devices, &specs, filter)
}
